pub mod codec;
pub mod formatting;
pub mod time;

pub use codec::decode_lenient;
pub use formatting::{decimal_to_wei, gwei_to_wei, wei_to_decimal};
pub use time::monotonic_nanos;
