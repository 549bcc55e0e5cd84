use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::common::codec::decode_lenient;
use crate::config::Config;
use crate::constants::{HTTP_TIMEOUT_SECS, SOLANA_BUNDLE_DEADLINE_SECS, SOLANA_BUNDLE_POLL_INTERVAL_MS};
use crate::errors::{ExecutorError, ExecutorResult};
use crate::mev::InclusionOutcome;
use crate::mocks;
use crate::types::TipEstimate;

/// Jito 블록 엔진 클라이언트 (Solana 번들 릴레이)
pub struct JitoClient {
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

/// getBundleStatuses value 항목
#[derive(Debug, Deserialize)]
struct BundleStatusValue {
    #[serde(default)]
    slot: Option<u64>,
    #[serde(default)]
    confirmation_status: Option<String>,
    #[serde(default)]
    err: Option<serde_json::Value>,
}

impl JitoClient {
    pub fn new(config: Arc<Config>) -> ExecutorResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| ExecutorError::Config(format!("Jito HTTP 클라이언트 생성 실패: {}", e)))?;
        Ok(Self { config, http_client })
    }

    fn block_engine_url(&self) -> ExecutorResult<&str> {
        self.config
            .jito
            .block_engine_url
            .as_deref()
            .ok_or_else(|| ExecutorError::Policy("jito.blockEngineUrl이 설정되지 않았습니다".to_string()))
    }

    async fn rpc_call(&self, method: &str, params: serde_json::Value) -> ExecutorResult<serde_json::Value> {
        let url = self.block_engine_url()?;
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1,
        });
        let mut request = self.http_client.post(url).json(&body);
        if let Some(token) = &self.config.jito.auth_token {
            request = request.header("x-jito-auth", token);
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

    /// 팁 플로어 오라클에서 현재 추정치 조회 (lamports)
    pub async fn fetch_tip_estimate(&self) -> ExecutorResult<TipEstimate> {
        if mocks::is_mock_mode() {
            return Ok(mocks::mock_tip_estimate());
        }
        let url = self
            .config
            .jito
            .tip_floor_url
            .as_deref()
            .ok_or_else(|| ExecutorError::Policy("jito.tipFloorUrl이 설정되지 않았습니다".to_string()))?;

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| ExecutorError::Transport(format!("팁 플로어 요청 실패: {}", e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExecutorError::Protocol(format!("팁 플로어 응답 {}", status)));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ExecutorError::Transport(format!("팁 플로어 응답 수신 실패: {}", e)))?;
        decode_lenient(&bytes).map_err(|e| ExecutorError::Protocol(format!("팁 플로어 응답 파싱 실패: {}", e)))
    }

    /// 팁 수수 계정 목록 조회 (어트리뷰션 기록용)
    pub async fn get_tip_accounts(&self) -> ExecutorResult<Vec<String>> {
        let result = self.rpc_call("getTipAccounts", json!([])).await?;
        serde_json::from_value(result)
            .map_err(|e| ExecutorError::Protocol(format!("getTipAccounts 응답 파싱 실패: {}", e)))
    }

    /// 번들 제출. 서명된 트랜잭션 hex를 base64로 변환해 보낸다.
    pub async fn submit_bundle(&self, signed_hex: &str, tip_lamports: u64) -> ExecutorResult<String> {
        let raw = hex::decode(signed_hex.trim_start_matches("0x"))
            .map_err(|e| ExecutorError::Protocol(format!("트랜잭션 hex 디코딩 실패: {}", e)))?;
        let encoded = BASE64.encode(raw);

        debug!("📤 jito sendBundle: {} bytes, tip {} lamports", encoded.len(), tip_lamports);
        let params = json!([
            [encoded],
            {"encoding": "base64", "skipPreflight": true, "maxRetries": 3}
        ]);
        let result = self.rpc_call("sendBundle", params).await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ExecutorError::Protocol("sendBundle 응답이 번들 id가 아닙니다".to_string()))
    }

    /// 포함 대기: 500ms 주기, 30초 데드라인
    pub async fn await_inclusion(&self, bundle_id: &str) -> InclusionOutcome {
        let deadline = Instant::now() + Duration::from_secs(SOLANA_BUNDLE_DEADLINE_SECS);

        loop {
            if Instant::now() >= deadline {
                warn!("⏰ jito 번들 {} 포함 확인 타임아웃 ({}초)", bundle_id, SOLANA_BUNDLE_DEADLINE_SECS);
                return InclusionOutcome::timeout();
            }

            match self.rpc_call("getBundleStatuses", json!([[bundle_id]])).await {
                Ok(result) => {
                    if let Some(outcome) = interpret_statuses(&result) {
                        return outcome;
                    }
                    debug!("👁️ jito 번들 {} 아직 미확정", bundle_id);
                }
                Err(e) => {
                    warn!("⚠️ jito 번들 {} 상태 조회 실패: {}", bundle_id, e);
                }
            }

            tokio::time::sleep(Duration::from_millis(SOLANA_BUNDLE_POLL_INTERVAL_MS)).await;
        }
    }
}

/// getBundleStatuses result 해석: 터미널이면 Some
fn interpret_statuses(result: &serde_json::Value) -> Option<InclusionOutcome> {
    let entry = result.get("value")?.as_array()?.first()?;
    if entry.is_null() {
        return None;
    }
    let status: BundleStatusValue = serde_json::from_value(entry.clone()).ok()?;

    if let Some(err) = &status.err {
        let failed = match err {
            serde_json::Value::Null => false,
            serde_json::Value::Object(map) => !(map.len() == 1 && map.contains_key("Ok")),
            _ => true,
        };
        if failed {
            return Some(InclusionOutcome::failed(format!("번들 실행 오류: {}", err)));
        }
    }

    match status.confirmation_status.as_deref() {
        Some("confirmed") | Some("finalized") => Some(InclusionOutcome::landed(status.slot)),
        Some("failed") => Some(InclusionOutcome::failed("번들 상태: failed")),
        _ => {
            // slot이 채워졌으면 랜딩으로 간주
            status.slot.map(|slot| InclusionOutcome::landed(Some(slot)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpret_confirmed_bundle() {
        let result = json!({
            "context": {"slot": 280000000},
            "value": [{"bundle_id": "abc", "slot": 280000001, "confirmation_status": "confirmed", "err": {"Ok": null}}]
        });
        let outcome = interpret_statuses(&result).unwrap();
        assert!(outcome.landed);
        assert_eq!(outcome.block_number, Some(280_000_001));
    }

    #[test]
    fn test_interpret_failed_bundle() {
        let result = json!({
            "value": [{"bundle_id": "abc", "slot": null, "confirmation_status": "processed",
                       "err": {"InstructionError": [0, "Custom"]}}]
        });
        let outcome = interpret_statuses(&result).unwrap();
        assert!(!outcome.landed);
        assert!(outcome.reason.unwrap().contains("InstructionError"));
    }

    #[test]
    fn test_interpret_unknown_bundle_keeps_polling() {
        let result = json!({"value": [null]});
        assert!(interpret_statuses(&result).is_none());

        let result = json!({"value": []});
        assert!(interpret_statuses(&result).is_none());
    }

    #[test]
    fn test_tip_estimate_decodes_case_insensitively() {
        let payload = br#"{"Min": 1000, "Median": 20000, "P75": 30000, "P95": 60000, "Recommended": 25000}"#;
        let estimate: TipEstimate = decode_lenient(payload).unwrap();
        assert_eq!(estimate.min, 1_000);
        assert_eq!(estimate.recommended, 25_000);
    }
}
