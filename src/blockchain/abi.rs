use std::collections::HashMap;

use ethers::abi::{Abi, Token};
use ethers::types::{H160, U256 as EthersU256};

use crate::common::formatting::decimal_to_wei;
use crate::config::SmartContractConfig;
use crate::constants::WEI_DECIMALS;
use crate::errors::{ExecutorError, ExecutorResult};
use crate::types::{Opportunity, StrategyKind};

/// 체인별 아비트래지 실행 컨트랙트 바인딩
#[derive(Debug, Clone)]
pub struct ContractBinding {
    pub chain_name: String,
    pub address: H160,
    pub abi: Abi,
}

impl ContractBinding {
    /// 시뮬레이션 반환값을 함수 출력 타입으로 디코딩
    ///
    /// 반환이 비어 있거나 출력 타입과 맞지 않으면 에러 - eth_call이
    /// "성공"했더라도 파싱 불가능한 반환은 리버트와 동일하게 취급한다.
    pub fn decode_profit(&self, function_name: &str, output: &[u8]) -> ExecutorResult<EthersU256> {
        let function = self
            .abi
            .function(function_name)
            .map_err(|e| ExecutorError::Protocol(format!("ABI에 {} 함수가 없습니다: {}", function_name, e)))?;
        let tokens = function
            .decode_output(output)
            .map_err(|e| ExecutorError::revert(Some(format!("반환값 디코딩 실패: {}", e))))?;
        match tokens.first() {
            Some(Token::Uint(profit)) => Ok(*profit),
            _ => Err(ExecutorError::revert(Some("반환값이 uint256 수익이 아닙니다".to_string()))),
        }
    }
}

/// chain_name(소문자) → 바인딩 테이블. 시작 시 한 번 구성되고 불변.
#[derive(Debug, Clone)]
pub struct ContractBindings {
    bindings: HashMap<String, ContractBinding>,
}

impl ContractBindings {
    pub fn from_config(configs: &[SmartContractConfig]) -> ExecutorResult<Self> {
        let mut bindings = HashMap::with_capacity(configs.len());
        for config in configs {
            let address: H160 = config.contract_address.parse().map_err(|_| {
                ExecutorError::Config(format!(
                    "체인 {}의 컨트랙트 주소가 유효하지 않습니다: {}",
                    config.chain_name, config.contract_address
                ))
            })?;
            let abi: Abi = match &config.abi {
                Some(raw) => serde_json::from_str(raw).map_err(|e| {
                    ExecutorError::Config(format!("체인 {}의 커스텀 ABI 파싱 실패: {}", config.chain_name, e))
                })?,
                None => serde_json::from_str(ARBITRAGE_EXECUTOR_ABI)
                    .map_err(|e| ExecutorError::Config(format!("내장 ABI 파싱 실패: {}", e)))?,
            };
            bindings.insert(
                config.chain_name.to_lowercase(),
                ContractBinding { chain_name: config.chain_name.clone(), address, abi },
            );
        }
        Ok(Self { bindings })
    }

    pub fn get(&self, chain_name: &str) -> Option<&ContractBinding> {
        self.bindings.get(&chain_name.to_lowercase())
    }
}

/// 인코딩된 컨트랙트 호출 - 시뮬레이션과 제출이 동일한 바이트를 공유한다
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedCall {
    pub function_name: &'static str,
    pub to: H160,
    pub call_data: Vec<u8>,
}

/// 전략별 엔트리포인트 선택 + 파라미터 인코딩
///
/// 같은 입력은 항상 같은 call data를 만든다. 파라미터 순서와 인코딩은
/// 온체인 아티팩트와의 계약이다.
pub fn encode_strategy_call(
    binding: &ContractBinding,
    opportunity: &Opportunity,
) -> ExecutorResult<EncodedCall> {
    opportunity.validate()?;

    let asset = to_h160(opportunity.asset);
    let amount_wei = to_wei(opportunity.amount)?;
    let min_profit_wei = to_wei(opportunity.min_profit)?;

    let (function_name, tokens) = match opportunity.strategy {
        // MevRouted는 CrossDex 인코딩을 쓰고 C5에서 MEV 경로로 표시된다
        StrategyKind::CrossDex | StrategyKind::MevRouted => {
            let source_dex = opportunity
                .source_dex
                .ok_or_else(|| ExecutorError::Policy("source_dex가 없습니다".to_string()))?;
            let target_dex = opportunity
                .target_dex
                .ok_or_else(|| ExecutorError::Policy("target_dex가 없습니다".to_string()))?;
            (
                "executeCrossDexArbitrage",
                vec![
                    Token::Address(asset),
                    Token::Uint(amount_wei),
                    Token::Address(to_h160(source_dex)),
                    Token::Address(to_h160(target_dex)),
                    Token::Uint(min_profit_wei),
                ],
            )
        }
        StrategyKind::MultiHop => (
            "executeMultiHopArbitrage",
            path_tokens(opportunity, asset, amount_wei, min_profit_wei)?,
        ),
        StrategyKind::Triangular => (
            "executeTriangularArbitrage",
            path_tokens(opportunity, asset, amount_wei, min_profit_wei)?,
        ),
    };

    let function = binding
        .abi
        .function(function_name)
        .map_err(|e| ExecutorError::Policy(format!("컨트랙트 ABI에 {} 함수가 없습니다: {}", function_name, e)))?;
    let call_data = function
        .encode_input(&tokens)
        .map_err(|e| ExecutorError::Protocol(format!("{} 인코딩 실패: {}", function_name, e)))?;

    Ok(EncodedCall { function_name, to: binding.address, call_data })
}

fn path_tokens(
    opportunity: &Opportunity,
    asset: H160,
    amount_wei: EthersU256,
    min_profit_wei: EthersU256,
) -> ExecutorResult<Vec<Token>> {
    let path = opportunity
        .resolved_path()?
        .into_iter()
        .map(|address| Token::Address(to_h160(address)))
        .collect();
    Ok(vec![
        Token::Address(asset),
        Token::Uint(amount_wei),
        Token::Array(path),
        Token::Uint(min_profit_wei),
    ])
}

fn to_h160(address: alloy::primitives::Address) -> H160 {
    H160::from_slice(address.as_slice())
}

fn to_wei(amount: rust_decimal::Decimal) -> ExecutorResult<EthersU256> {
    decimal_to_wei(amount, WEI_DECIMALS).map_err(|e| ExecutorError::Policy(e.to_string()))
}

/// FlashLoanArbitrage.sol 엔트리포인트 (배포 아티팩트와 동기화 유지)
const ARBITRAGE_EXECUTOR_ABI: &str = r#"[
    {
        "inputs": [
            {"name": "asset", "type": "address"},
            {"name": "amount", "type": "uint256"},
            {"name": "sourceDex", "type": "address"},
            {"name": "targetDex", "type": "address"},
            {"name": "minProfit", "type": "uint256"}
        ],
        "name": "executeCrossDexArbitrage",
        "outputs": [{"name": "profit", "type": "uint256"}],
        "stateMutability": "nonpayable",
        "type": "function"
    },
    {
        "inputs": [
            {"name": "asset", "type": "address"},
            {"name": "amount", "type": "uint256"},
            {"name": "path", "type": "address[]"},
            {"name": "minProfit", "type": "uint256"}
        ],
        "name": "executeMultiHopArbitrage",
        "outputs": [{"name": "profit", "type": "uint256"}],
        "stateMutability": "nonpayable",
        "type": "function"
    },
    {
        "inputs": [
            {"name": "asset", "type": "address"},
            {"name": "amount", "type": "uint256"},
            {"name": "path", "type": "address[]"},
            {"name": "minProfit", "type": "uint256"}
        ],
        "name": "executeTriangularArbitrage",
        "outputs": [{"name": "profit", "type": "uint256"}],
        "stateMutability": "nonpayable",
        "type": "function"
    }
]"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TokenPath;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    const WETH: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";
    const UNI_ROUTER: &str = "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D";
    const SUSHI_ROUTER: &str = "0xd9e1cE17f2641f24aE83637ab66a2cca9C378B9F";
    const CONTRACT: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

    fn binding() -> ContractBinding {
        ContractBindings::from_config(&[SmartContractConfig {
            chain_name: "ethereum".to_string(),
            contract_address: CONTRACT.to_string(),
            abi: None,
        }])
        .unwrap()
        .get("ethereum")
        .cloned()
        .unwrap()
    }

    fn opportunity(strategy: StrategyKind) -> Opportunity {
        Opportunity {
            id: "test".to_string(),
            chain_name: "ethereum".to_string(),
            asset: WETH.parse().unwrap(),
            amount: dec!(10000),
            strategy,
            source_dex: Some(UNI_ROUTER.parse().unwrap()),
            target_dex: Some(SUSHI_ROUTER.parse().unwrap()),
            path: Some(TokenPath::Csv(format!("{WETH},{UNI_ROUTER},{WETH}"))),
            min_profit: dec!(500),
            expected_profit: dec!(600),
            confidence_score: None,
            deadline: Some(Utc::now() + chrono::Duration::seconds(60)),
            expires_at_nanos: None,
            spread_bps: None,
            order_book_imbalance: None,
            volatility_percent: None,
            aoi_score: None,
            market_regime: None,
            use_mev: false,
            preferred_mev_provider: None,
            max_mev_tip: None,
            target_bundle_position: None,
            max_slippage_bps: None,
            max_gas_price_gwei: None,
            allow_partial_fill: false,
            signal_id: None,
            strategy_name: None,
            source_exchange: None,
            target_exchange: None,
        }
    }

    #[test]
    fn test_binding_lookup_case_insensitive() {
        let bindings = ContractBindings::from_config(&[SmartContractConfig {
            chain_name: "Ethereum".to_string(),
            contract_address: CONTRACT.to_string(),
            abi: None,
        }])
        .unwrap();
        assert!(bindings.get("ethereum").is_some());
        assert!(bindings.get("ETHEREUM").is_some());
        assert!(bindings.get("polygon").is_none());
    }

    #[test]
    fn test_cross_dex_encoding_deterministic() {
        let binding = binding();
        let op = opportunity(StrategyKind::CrossDex);
        let first = encode_strategy_call(&binding, &op).unwrap();
        let second = encode_strategy_call(&binding, &op).unwrap();
        assert_eq!(first.call_data, second.call_data);
        assert_eq!(first.function_name, "executeCrossDexArbitrage");
        assert_eq!(first.to, CONTRACT.parse::<H160>().unwrap());
    }

    #[test]
    fn test_selector_matches_abi() {
        let binding = binding();
        let op = opportunity(StrategyKind::CrossDex);
        let encoded = encode_strategy_call(&binding, &op).unwrap();
        let selector = binding.abi.function("executeCrossDexArbitrage").unwrap().short_signature();
        assert_eq!(&encoded.call_data[..4], &selector[..]);
    }

    #[test]
    fn test_strategies_use_distinct_selectors() {
        let binding = binding();
        let cross = encode_strategy_call(&binding, &opportunity(StrategyKind::CrossDex)).unwrap();
        let multi = encode_strategy_call(&binding, &opportunity(StrategyKind::MultiHop)).unwrap();
        let tri = encode_strategy_call(&binding, &opportunity(StrategyKind::Triangular)).unwrap();
        assert_ne!(cross.call_data[..4], multi.call_data[..4]);
        assert_ne!(multi.call_data[..4], tri.call_data[..4]);
    }

    #[test]
    fn test_mev_routed_uses_cross_dex_encoding() {
        let binding = binding();
        let cross = encode_strategy_call(&binding, &opportunity(StrategyKind::CrossDex)).unwrap();
        let routed = encode_strategy_call(&binding, &opportunity(StrategyKind::MevRouted)).unwrap();
        assert_eq!(cross.call_data, routed.call_data);
    }

    #[test]
    fn test_amount_lands_in_calldata_as_wei() {
        let binding = binding();
        let encoded = encode_strategy_call(&binding, &opportunity(StrategyKind::CrossDex)).unwrap();
        // 두 번째 파라미터 슬롯 (selector 4바이트 + 32바이트) = amount
        let amount_slot = &encoded.call_data[4 + 32..4 + 64];
        let amount = EthersU256::from_big_endian(amount_slot);
        assert_eq!(amount, EthersU256::from_dec_str("10000000000000000000000").unwrap());
    }

    #[test]
    fn test_short_triangular_path_rejected() {
        let binding = binding();
        let mut op = opportunity(StrategyKind::Triangular);
        op.path = Some(TokenPath::Csv(format!("{WETH},{UNI_ROUTER}")));
        let err = encode_strategy_call(&binding, &op).unwrap_err();
        assert!(err.is_policy());
    }

    #[test]
    fn test_decode_profit_roundtrip() {
        let binding = binding();
        let mut output = [0u8; 32];
        EthersU256::from(566u64).to_big_endian(&mut output);
        let profit = binding.decode_profit("executeCrossDexArbitrage", &output).unwrap();
        assert_eq!(profit, EthersU256::from(566u64));
    }

    #[test]
    fn test_decode_profit_empty_return_is_revert() {
        let binding = binding();
        let err = binding.decode_profit("executeCrossDexArbitrage", &[]).unwrap_err();
        assert!(err.is_revert());
    }
}
