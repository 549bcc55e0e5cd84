use std::env;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::types::{GasBid, TipEstimate};

/// Check if mock mode is enabled
pub fn is_mock_mode() -> bool {
    env::var("API_MODE").unwrap_or_default() == "mock"
}

/// Mock 가스 입찰 - 네트워크 없이 파이프라인을 돌릴 때 사용
pub fn mock_gas_bid() -> GasBid {
    GasBid {
        gas_price_gwei: env_decimal("MOCK_GAS_PRICE_GWEI", dec!(50)),
        gas_limit: env_u64("MOCK_GAS_LIMIT", 300_000),
        estimated_cost_usd: env_decimal("MOCK_GAS_COST_USD", dec!(25)),
    }
}

/// Mock 팁 추정치 (lamports)
pub fn mock_tip_estimate() -> TipEstimate {
    TipEstimate {
        min: env_u64("MOCK_TIP_MIN", 1_000),
        median: env_u64("MOCK_TIP_MEDIAN", 20_000),
        p75: env_u64("MOCK_TIP_P75", 30_000),
        p95: env_u64("MOCK_TIP_P95", 60_000),
        recommended: env_u64("MOCK_TIP_RECOMMENDED", 25_000),
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_decimal(key: &str, default: Decimal) -> Decimal {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_gas_bid_is_valid() {
        let bid = mock_gas_bid();
        assert!(bid.validate().is_ok());
    }

    #[test]
    fn test_mock_tip_estimate_ordering() {
        let estimate = mock_tip_estimate();
        assert!(estimate.min <= estimate.median);
        assert!(estimate.median <= estimate.p75);
        assert!(estimate.p75 <= estimate.p95);
    }
}
