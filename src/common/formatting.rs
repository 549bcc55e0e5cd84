use anyhow::{anyhow, Result};
use ethers::types::U256 as EthersU256;
use rust_decimal::Decimal;

/// 사람 단위 금액(Decimal)을 토큰 최소 단위(wei 등)로 변환
///
/// 금액 연산은 전부 Decimal로 하고 온체인 경계에서만 정수로 내린다.
/// 소수부는 버린다 (절대 반올림하지 않는다).
pub fn decimal_to_wei(amount: Decimal, decimals: u32) -> Result<EthersU256> {
    if amount.is_sign_negative() {
        return Err(anyhow!("음수 금액은 wei로 변환할 수 없습니다: {}", amount));
    }
    let scale = Decimal::from(10u128.pow(decimals));
    let scaled = (amount * scale).trunc().normalize();
    let text = scaled.to_string();
    // normalize() 후에도 "123.0000" 형태가 남을 수 있으므로 소수점 이하 제거
    let integral = text.split('.').next().unwrap_or("0");
    EthersU256::from_dec_str(integral).map_err(|e| anyhow!("wei 변환 실패 ({}): {}", amount, e))
}

/// gwei 단위 가스 가격을 wei로 변환
pub fn gwei_to_wei(gas_price_gwei: Decimal) -> Result<EthersU256> {
    decimal_to_wei(gas_price_gwei, 9)
}

/// wei 값을 사람 단위 Decimal로 되돌림 (로그/결과 보고용)
pub fn wei_to_decimal(wei: EthersU256, decimals: u32) -> Decimal {
    let as_u128 = wei.min(EthersU256::from(u128::MAX)).as_u128();
    Decimal::from(as_u128) / Decimal::from(10u128.pow(decimals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_decimal_to_wei_whole() {
        let wei = decimal_to_wei(dec!(1), 18).unwrap();
        assert_eq!(wei, EthersU256::from_dec_str("1000000000000000000").unwrap());
    }

    #[test]
    fn test_decimal_to_wei_fractional() {
        let wei = decimal_to_wei(dec!(0.5), 18).unwrap();
        assert_eq!(wei, EthersU256::from_dec_str("500000000000000000").unwrap());
    }

    #[test]
    fn test_decimal_to_wei_large_amount() {
        // 대출 금액 10000 토큰
        let wei = decimal_to_wei(dec!(10000), 18).unwrap();
        assert_eq!(wei, EthersU256::from_dec_str("10000000000000000000000").unwrap());
    }

    #[test]
    fn test_gwei_to_wei() {
        let wei = gwei_to_wei(dec!(50)).unwrap();
        assert_eq!(wei, EthersU256::from(50_000_000_000u64));
    }

    #[test]
    fn test_truncation_not_rounding() {
        // 18자리 아래 정밀도는 버림
        let wei = decimal_to_wei(dec!(0.0000000000000000019), 18).unwrap();
        assert_eq!(wei, EthersU256::from(1u64));
    }

    #[test]
    fn test_negative_rejected() {
        assert!(decimal_to_wei(dec!(-1), 18).is_err());
    }

    #[test]
    fn test_wei_roundtrip() {
        let wei = EthersU256::from(1_500_000_000_000_000_000u64);
        assert_eq!(wei_to_decimal(wei, 18), dec!(1.5));
    }
}
