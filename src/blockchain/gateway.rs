use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ethers::providers::{Http, Middleware, Provider};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Bytes, TransactionReceipt, TransactionRequest, H160, H256, U256 as EthersU256};
use tracing::{debug, info};

use crate::config::NodeConfig;
use crate::constants::HTTP_TIMEOUT_SECS;
use crate::errors::{ExecutorError, ExecutorResult};

/// 단일 체인 핸들: JSON-RPC 엔드포인트 + 체인 ID
#[derive(Debug, Clone)]
pub struct ChainHandle {
    pub chain_name: String,
    pub chain_id: u64,
    provider: Arc<Provider<Http>>,
}

impl ChainHandle {
    fn new(config: &NodeConfig) -> ExecutorResult<Self> {
        let url: reqwest::Url = config
            .rpc_url
            .parse()
            .map_err(|e| ExecutorError::Config(format!("체인 {}의 rpcUrl 파싱 실패: {}", config.chain_name, e)))?;
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| ExecutorError::Config(format!("HTTP 클라이언트 생성 실패: {}", e)))?;
        let provider = Provider::new(Http::new_with_client(url, http_client));
        Ok(Self {
            chain_name: config.chain_name.clone(),
            chain_id: config.chain_id,
            provider: Arc::new(provider),
        })
    }
}

/// 체인 이름 → 핸들 레지스트리. 시작 시 구성되고 이후 읽기 전용으로 공유된다.
#[derive(Debug, Clone)]
pub struct ChainGateway {
    handles: HashMap<String, Arc<ChainHandle>>,
}

impl ChainGateway {
    pub fn from_config(nodes: &[NodeConfig]) -> ExecutorResult<Self> {
        let mut handles = HashMap::with_capacity(nodes.len());
        for node in nodes {
            let handle = ChainHandle::new(node)?;
            info!("🔗 체인 게이트웨이 등록: {} (chain_id={})", node.chain_name, node.chain_id);
            handles.insert(node.chain_name.to_lowercase(), Arc::new(handle));
        }
        Ok(Self { handles })
    }

    /// 체인 핸들 조회. 미등록 체인은 정책 거부.
    pub fn chain(&self, chain_name: &str) -> ExecutorResult<Arc<ChainHandle>> {
        self.handles
            .get(&chain_name.to_lowercase())
            .cloned()
            .ok_or_else(|| ExecutorError::Policy(format!("등록되지 않은 체인: {}", chain_name)))
    }

    pub fn has_chain(&self, chain_name: &str) -> bool {
        self.handles.contains_key(&chain_name.to_lowercase())
    }

    /// 현재 블록 번호 조회
    pub async fn get_block_number(&self, chain: &ChainHandle) -> ExecutorResult<u64> {
        let number = chain
            .provider
            .get_block_number()
            .await
            .map_err(|e| ExecutorError::Transport(format!("{} eth_blockNumber 실패: {}", chain.chain_name, e)))?;
        Ok(number.as_u64())
    }

    /// 읽기 전용 호출 시뮬레이션 (eth_call)
    ///
    /// 리버트는 전송 실패와 구분되어 `Revert`로 돌아온다 - 재시도 대상이
    /// 아니라 사업적으로 부정적인 결과다.
    pub async fn simulate_call(
        &self,
        chain: &ChainHandle,
        to: H160,
        data: Vec<u8>,
        gas: EthersU256,
        gas_price: EthersU256,
        from: Option<H160>,
    ) -> ExecutorResult<Bytes> {
        let mut request = TransactionRequest::new()
            .to(to)
            .data(Bytes::from(data))
            .gas(gas)
            .gas_price(gas_price)
            .value(EthersU256::zero());
        if let Some(from) = from {
            request = request.from(from);
        }
        let typed: TypedTransaction = request.into();

        match chain.provider.call(&typed, None).await {
            Ok(output) => {
                debug!("✅ {} eth_call 성공: {} bytes 반환", chain.chain_name, output.len());
                Ok(output)
            }
            Err(e) => Err(classify_call_error(&e.to_string())),
        }
    }

    /// 서명된 트랜잭션 제출
    pub async fn send_raw_transaction(&self, chain: &ChainHandle, signed_hex: &str) -> ExecutorResult<H256> {
        let raw = hex::decode(signed_hex.trim_start_matches("0x"))
            .map_err(|e| ExecutorError::Protocol(format!("서명 트랜잭션 hex 디코딩 실패: {}", e)))?;
        let pending = chain
            .provider
            .send_raw_transaction(Bytes::from(raw))
            .await
            .map_err(|e| {
                ExecutorError::Transport(format!("{} eth_sendRawTransaction 실패: {}", chain.chain_name, e))
            })?;
        let tx_hash = *pending;
        info!("📤 {} 트랜잭션 제출됨: {:?}", chain.chain_name, tx_hash);
        Ok(tx_hash)
    }

    /// 트랜잭션 영수증 조회 (미포함이면 None)
    pub async fn get_receipt(
        &self,
        chain: &ChainHandle,
        tx_hash: H256,
    ) -> ExecutorResult<Option<TransactionReceipt>> {
        chain
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| ExecutorError::Transport(format!("{} 영수증 조회 실패: {}", chain.chain_name, e)))
    }

    /// 실행기 지갑 논스 조회 (제출 직전 단건 조회 - 런 간 논스 예약 없음)
    pub async fn get_nonce(&self, chain: &ChainHandle, address: H160) -> ExecutorResult<EthersU256> {
        chain
            .provider
            .get_transaction_count(address, None)
            .await
            .map_err(|e| ExecutorError::Transport(format!("{} 논스 조회 실패: {}", chain.chain_name, e)))
    }

    /// 체인 가스 가격 조회
    pub async fn get_gas_price(&self, chain: &ChainHandle) -> ExecutorResult<EthersU256> {
        chain
            .provider
            .get_gas_price()
            .await
            .map_err(|e| ExecutorError::Transport(format!("{} eth_gasPrice 실패: {}", chain.chain_name, e)))
    }
}

/// eth_call 오류 문자열 분류: 리버트 vs 전송 실패
fn classify_call_error(message: &str) -> ExecutorError {
    let lower = message.to_lowercase();
    if lower.contains("revert") {
        let reason = extract_revert_reason(message);
        ExecutorError::Revert { reason }
    } else {
        ExecutorError::Transport(message.to_string())
    }
}

fn extract_revert_reason(message: &str) -> Option<String> {
    for marker in ["execution reverted:", "reverted:", "revert:"] {
        if let Some(index) = message.find(marker) {
            let reason = message[index + marker.len()..].trim();
            if !reason.is_empty() {
                return Some(reason.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_registry_from_config() {
        let config = Config::load_test_config();
        let gateway = ChainGateway::from_config(&config.nodes).unwrap();
        assert!(gateway.has_chain("ethereum"));
        assert!(gateway.has_chain("Ethereum"));
        assert!(!gateway.has_chain("polygon"));

        let handle = gateway.chain("ethereum").unwrap();
        assert_eq!(handle.chain_id, 1);
    }

    #[test]
    fn test_unknown_chain_is_policy_rejection() {
        let config = Config::load_test_config();
        let gateway = ChainGateway::from_config(&config.nodes).unwrap();
        let err = gateway.chain("fantom").unwrap_err();
        assert!(err.is_policy());
    }

    #[test]
    fn test_revert_classification() {
        let err = classify_call_error("(code: 3, message: execution reverted: INSUFFICIENT_PROFIT, data: ...)");
        assert!(err.is_revert());
        match err {
            ExecutorError::Revert { reason } => {
                assert!(reason.unwrap().starts_with("INSUFFICIENT_PROFIT"));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_transport_classification() {
        let err = classify_call_error("error sending request: connection refused");
        assert!(matches!(err, ExecutorError::Transport(_)));
    }

    #[test]
    fn test_revert_without_reason() {
        let err = classify_call_error("execution reverted");
        match err {
            ExecutorError::Revert { reason } => assert!(reason.is_none()),
            _ => unreachable!(),
        }
    }
}
