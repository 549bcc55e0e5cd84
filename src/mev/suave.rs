use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::Config;
use crate::constants::{EVM_BUNDLE_DEADLINE_SECS, EVM_BUNDLE_POLL_INTERVAL_MS, HTTP_TIMEOUT_SECS};
use crate::errors::{ExecutorError, ExecutorResult};
use crate::mev::InclusionOutcome;

/// EVM 번들 릴레이 클라이언트 (SUAVE / Flashbots 계열 빌더)
pub struct SuaveClient {
    config: Arc<Config>,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// flashbots_getBundleStats 응답의 관심 필드
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BundleStats {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    block_number: Option<serde_json::Value>,
    #[serde(default)]
    is_simulated: Option<bool>,
}

impl SuaveClient {
    pub fn new(config: Arc<Config>) -> ExecutorResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| ExecutorError::Config(format!("SUAVE HTTP 클라이언트 생성 실패: {}", e)))?;
        Ok(Self { config, http_client })
    }

    fn builder_url(&self, chain_name: &str) -> ExecutorResult<String> {
        self.config
            .suave_builder_url(chain_name)
            .map(str::to_string)
            .ok_or_else(|| ExecutorError::Policy(format!("체인 {}에 빌더 URL이 설정되지 않았습니다", chain_name)))
    }

    async fn rpc_call(&self, url: &str, method: &str, params: serde_json::Value) -> ExecutorResult<serde_json::Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1,
        });
        let mut request = self.http_client.post(url).json(&body);
        if let Some(token) = &self.config.suave.auth_token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ExecutorError::Transport(format!("{} 요청 실패: {}", method, e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ExecutorError::Protocol(format!("{} 응답 {}: {}", method, status, text)));
        }

        let envelope: RpcResponse = response
            .json()
            .await
            .map_err(|e| ExecutorError::Protocol(format!("{} 응답 파싱 실패: {}", method, e)))?;
        if let Some(error) = envelope.error {
            return Err(ExecutorError::Protocol(format!("{} RPC 오류 {}: {}", method, error.code, error.message)));
        }
        envelope
            .result
            .ok_or_else(|| ExecutorError::Protocol(format!("{} 응답에 result가 없습니다", method)))
    }

    /// eth_sendBundle 제출. 반환값은 릴레이가 부여한 번들 해시.
    pub async fn submit_bundle(
        &self,
        chain_name: &str,
        signed_hex: &str,
        target_block: u64,
    ) -> ExecutorResult<String> {
        let url = self.builder_url(chain_name)?;
        let now = chrono::Utc::now().timestamp();
        let params = json!([{
            "txs": [signed_hex],
            "blockNumber": format!("0x{:x}", target_block),
            "minTimestamp": now,
            "maxTimestamp": now + 120,
            "revertingTxHashes": [],
        }]);

        let result = self.rpc_call(&url, "eth_sendBundle", params).await?;
        let bundle_hash = result
            .get("bundleHash")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .or_else(|| result.as_str().map(str::to_string))
            .ok_or_else(|| ExecutorError::Protocol("eth_sendBundle 응답에 bundleHash가 없습니다".to_string()))?;
        Ok(bundle_hash)
    }

    /// 포함 대기: 1초 주기로 상태 조회, 60초 데드라인
    ///
    /// 폴링 중 전송 오류는 시도 예산 안에서 계속한다. 데드라인 초과는
    /// 온체인 실패가 아니라 미확인으로 기록된다.
    pub async fn await_inclusion(
        &self,
        chain_name: &str,
        bundle_hash: &str,
        target_block: u64,
    ) -> InclusionOutcome {
        let url = match self.builder_url(chain_name) {
            Ok(url) => url,
            Err(e) => return InclusionOutcome::failed(e.to_string()),
        };
        let deadline = Instant::now() + Duration::from_secs(EVM_BUNDLE_DEADLINE_SECS);

        loop {
            if Instant::now() >= deadline {
                warn!("⏰ 번들 {} 포함 확인 타임아웃 ({}초)", bundle_hash, EVM_BUNDLE_DEADLINE_SECS);
                return InclusionOutcome::timeout();
            }

            let params = json!([{
                "bundleHash": bundle_hash,
                "blockNumber": format!("0x{:x}", target_block),
            }]);
            match self.rpc_call(&url, "flashbots_getBundleStats", params).await {
                Ok(result) => {
                    let stats: BundleStats = serde_json::from_value(result).unwrap_or_default();
                    match interpret_stats(&stats) {
                        Some(outcome) => return outcome,
                        None => debug!("👁️ 번들 {} 아직 미포함 (simulated={:?})", bundle_hash, stats.is_simulated),
                    }
                }
                Err(e) => {
                    // 시도 예산 내에서 폴링 지속
                    warn!("⚠️ 번들 {} 상태 조회 실패: {}", bundle_hash, e);
                }
            }

            tokio::time::sleep(Duration::from_millis(EVM_BUNDLE_POLL_INTERVAL_MS)).await;
        }
    }
}

/// 상태 응답 해석: 터미널이면 Some, 계속 대기면 None
fn interpret_stats(stats: &BundleStats) -> Option<InclusionOutcome> {
    if let Some(status) = stats.status.as_deref() {
        match status.to_lowercase().as_str() {
            "failed" | "dropped" => return Some(InclusionOutcome::failed(format!("번들 상태: {}", status))),
            "included" | "landed" => {
                return Some(InclusionOutcome::landed(parse_block_number(stats.block_number.as_ref())))
            }
            _ => {}
        }
    }
    // blockNumber가 채워지면 포함으로 간주
    if let Some(block) = parse_block_number(stats.block_number.as_ref()) {
        return Some(InclusionOutcome::landed(Some(block)));
    }
    None
}

fn parse_block_number(value: Option<&serde_json::Value>) -> Option<u64> {
    match value? {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => {
            let trimmed = s.trim_start_matches("0x");
            if s.starts_with("0x") {
                u64::from_str_radix(trimmed, 16).ok()
            } else {
                trimmed.parse().ok()
            }
        }
        _ => None,
    }
}
