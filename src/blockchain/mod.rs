pub mod abi;
pub mod gateway;

pub use abi::{encode_strategy_call, ContractBinding, ContractBindings, EncodedCall};
pub use gateway::{ChainGateway, ChainHandle};
