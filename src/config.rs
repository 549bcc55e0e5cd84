use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_MAX_CONCURRENT_RUNS;

/// NATS 버스 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NatsConfig {
    pub url: String,
    /// 기회 수신 서브젝트 (예: magnus.opportunities.flashloan)
    pub opportunity_subject: String,
    /// 결과 발행 서브젝트 프리픽스
    #[serde(default = "default_result_subject")]
    pub result_subject: String,
    /// JetStream 영속 발행 사용 여부
    #[serde(default)]
    pub use_jet_stream: bool,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub use_tls: bool,
}

fn default_result_subject() -> String {
    crate::constants::RESULT_SUBJECT_PREFIX.to_string()
}

/// 체인 노드 엔드포인트
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    pub chain_name: String,
    pub rpc_url: String,
    pub chain_id: u64,
}

/// 체인별 아비트래지 실행 컨트랙트 바인딩
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartContractConfig {
    pub chain_name: String,
    pub contract_address: String,
    /// 커스텀 ABI JSON. 없으면 내장 실행기 ABI 사용
    #[serde(default)]
    pub abi: Option<String>,
}

/// 실행기 지갑 - privateKey는 환경 변수로도 주입 가능
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorWalletConfig {
    #[serde(default)]
    pub private_key: String,
}

/// 가스 입찰 오라클 (ML 서비스)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MlOptimizerConfig {
    pub base_url: String,
    #[serde(default = "default_gas_bidding_endpoint")]
    pub gas_bidding_endpoint: String,
}

fn default_gas_bidding_endpoint() -> String {
    "/api/v1/gas-bidding".to_string()
}

/// Jito 블록 엔진 (Solana 번들 릴레이)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JitoConfig {
    #[serde(default)]
    pub block_engine_url: Option<String>,
    /// 팁 플로어 오라클 엔드포인트
    #[serde(default)]
    pub tip_floor_url: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
}

/// SUAVE / EVM 번들 릴레이 - 체인별 빌더 URL 맵
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuaveConfig {
    #[serde(default)]
    pub builder_urls: HashMap<String, String>,
    #[serde(default)]
    pub auth_token: Option<String>,
}

/// 런타임 동작 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// 동시 파이프라인 런 상한
    #[serde(default = "default_max_concurrent_runs")]
    pub max_concurrent_runs: usize,
    /// 결정까지만 수행하고 제출은 건너뜀
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

fn default_max_concurrent_runs() -> usize {
    DEFAULT_MAX_CONCURRENT_RUNS
}

fn default_metrics_port() -> u16 {
    9464
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_concurrent_runs: default_max_concurrent_runs(),
            dry_run: false,
            metrics_port: default_metrics_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub nats: NatsConfig,
    pub nodes: Vec<NodeConfig>,
    #[serde(default)]
    pub smart_contracts: Vec<SmartContractConfig>,
    pub executor_wallet: ExecutorWalletConfig,
    pub ml_optimizer: MlOptimizerConfig,
    #[serde(default)]
    pub jito: JitoConfig,
    #[serde(default)]
    pub suave: SuaveConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl Config {
    /// JSON 설정 파일 로드
    pub async fn load(path: &str) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("설정 파일을 읽을 수 없습니다: {}", path))?;
        let config: Config =
            serde_json::from_str(&raw).with_context(|| format!("설정 파일 파싱 실패: {}", path))?;
        Ok(config)
    }

    /// 시작 시 설정 검증. 실행기 개인키 누락은 치명적이다.
    pub fn validate(&self) -> Result<()> {
        if self.executor_wallet.private_key.trim().is_empty() {
            return Err(anyhow!(
                "executorWallet.privateKey가 설정되지 않았습니다 (EXECUTOR_PRIVATE_KEY 환경 변수로도 주입 가능)"
            ));
        }
        if self.nats.url.is_empty() {
            return Err(anyhow!("nats.url이 비어 있습니다"));
        }
        if self.nats.opportunity_subject.is_empty() {
            return Err(anyhow!("nats.opportunitySubject가 비어 있습니다"));
        }
        if self.nodes.is_empty() {
            return Err(anyhow!("nodes[]에 체인이 하나도 없습니다"));
        }
        for node in &self.nodes {
            if node.rpc_url.is_empty() {
                return Err(anyhow!("체인 {}의 rpcUrl이 비어 있습니다", node.chain_name));
            }
            if node.chain_id == 0 {
                return Err(anyhow!("체인 {}의 chainId가 0입니다", node.chain_name));
            }
        }
        for contract in &self.smart_contracts {
            contract
                .contract_address
                .parse::<ethers::types::H160>()
                .map_err(|_| {
                    anyhow!(
                        "체인 {}의 contractAddress가 유효한 주소가 아닙니다: {}",
                        contract.chain_name,
                        contract.contract_address
                    )
                })?;
        }
        if self.runtime.max_concurrent_runs == 0 {
            return Err(anyhow!("runtime.maxConcurrentRuns는 1 이상이어야 합니다"));
        }
        Ok(())
    }

    /// 체인별 SUAVE 빌더 URL 조회 (소문자 비교)
    pub fn suave_builder_url(&self, chain_name: &str) -> Option<&str> {
        let wanted = chain_name.to_lowercase();
        self.suave
            .builder_urls
            .iter()
            .find(|(name, _)| name.to_lowercase() == wanted)
            .map(|(_, url)| url.as_str())
    }

    /// 단위 테스트용 최소 설정
    pub fn load_test_config() -> Self {
        let mut builder_urls = HashMap::new();
        builder_urls.insert("ethereum".to_string(), "http://localhost:18545/bundle".to_string());

        Config {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                opportunity_subject: "magnus.opportunities.flashloan".to_string(),
                result_subject: default_result_subject(),
                use_jet_stream: false,
                user: None,
                password: None,
                use_tls: false,
            },
            nodes: vec![
                NodeConfig {
                    chain_name: "ethereum".to_string(),
                    rpc_url: "http://localhost:8545".to_string(),
                    chain_id: 1,
                },
                NodeConfig {
                    chain_name: "solana".to_string(),
                    rpc_url: "http://localhost:8899".to_string(),
                    chain_id: 101,
                },
            ],
            smart_contracts: vec![SmartContractConfig {
                chain_name: "ethereum".to_string(),
                contract_address: "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string(),
                abi: None,
            }],
            executor_wallet: ExecutorWalletConfig {
                private_key: "0x0000000000000000000000000000000000000000000000000000000000000001"
                    .to_string(),
            },
            ml_optimizer: MlOptimizerConfig {
                base_url: "http://localhost:9000".to_string(),
                gas_bidding_endpoint: default_gas_bidding_endpoint(),
            },
            jito: JitoConfig {
                block_engine_url: Some("http://localhost:9100/api/v1/bundles".to_string()),
                tip_floor_url: Some("http://localhost:9100/api/v1/tip_floor".to_string()),
                auth_token: None,
            },
            suave: SuaveConfig { builder_urls, auth_token: None },
            runtime: RuntimeConfig::default(),
        }
    }
}
