use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};

use crate::common::codec::decode_lenient;
use crate::config::Config;
use crate::constants::HTTP_TIMEOUT_SECS;
use crate::errors::{ExecutorError, ExecutorResult};
use crate::mocks;
use crate::types::{GasBid, Opportunity};

/// 가스 입찰 오라클 클라이언트 (ML 비딩 서비스)
///
/// 오라클 실패는 해당 기회에 대해 치명적이다 - 재시도 없이 런을 실패
/// 결과로 종료한다.
pub struct GasBidder {
    config: Arc<Config>,
    http_client: reqwest::Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GasBidRequest {
    chain_name: String,
    asset: String,
    amount: Decimal,
    expected_profit: Decimal,
}

impl GasBidder {
    pub fn new(config: Arc<Config>) -> ExecutorResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| ExecutorError::Config(format!("가스 오라클 HTTP 클라이언트 생성 실패: {}", e)))?;
        Ok(Self { config, http_client })
    }

    /// 기회에 대한 가스 입찰 조회
    pub async fn get_bid(&self, opportunity: &Opportunity) -> ExecutorResult<GasBid> {
        if mocks::is_mock_mode() {
            debug!("🎭 Mock 모드: 고정 가스 입찰 반환");
            return Ok(mocks::mock_gas_bid());
        }

        let url = format!(
            "{}{}",
            self.config.ml_optimizer.base_url.trim_end_matches('/'),
            self.config.ml_optimizer.gas_bidding_endpoint
        );
        let request = GasBidRequest {
            chain_name: opportunity.chain_name.clone(),
            asset: opportunity.asset.to_string(),
            amount: opportunity.amount,
            expected_profit: opportunity.expected_profit,
        };

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ExecutorError::GasBid(format!("오라클 요청 실패: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("❌ 가스 오라클 non-2xx 응답: {} - {}", status, body);
            return Err(ExecutorError::GasBid(format!("오라클 응답 {}: {}", status, body)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ExecutorError::GasBid(format!("오라클 응답 수신 실패: {}", e)))?;
        let bid: GasBid = decode_lenient(&bytes)
            .map_err(|e| ExecutorError::GasBid(format!("오라클 응답 역직렬화 실패: {}", e)))?;
        bid.validate()
            .map_err(|e| ExecutorError::GasBid(format!("오라클 응답 검증 실패: {}", e)))?;

        debug!(
            "⛽ 가스 입찰: {} gwei, limit {}, ${} ({})",
            bid.gas_price_gwei, bid.gas_limit, bid.estimated_cost_usd, opportunity.chain_name
        );
        Ok(bid)
    }
}
