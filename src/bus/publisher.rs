use async_nats::connection::State;
use async_nats::jetstream;
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, warn};

use crate::constants::{BUNDLE_RESULT_SUBJECT_PREFIX, STATUS_SUBJECT_PREFIX, TRAINING_SUBJECT};
use crate::types::{BundleOutcome, ExecutionResult, StatusTag, StatusUpdate, TrainingRecord};

/// 결과/상태 발행기 (C6)
///
/// 세 발행 레인이 한 연결을 공유한다:
///   1. 최종 결과 (영속 - JetStream 가능 시)
///   2. 상태 업데이트 (best-effort)
///   3. 학습 피드 투영 (best-effort)
/// 연결이 끊긴 상태의 발행은 경고 로그 후 드롭된다 - 버스가 죽어 있을 때의
/// 전달 보장은 코어의 책임이 아니다.
pub struct ResultPublisher {
    client: async_nats::Client,
    jetstream: Option<jetstream::Context>,
    result_subject_prefix: String,
}

/// 결과 서브젝트: flashloan.result.{chain_lowercased}
pub fn result_subject(prefix: &str, chain_name: &str) -> String {
    format!("{}{}", prefix, chain_name.to_lowercase())
}

/// 상태 서브젝트: flashloan.status.{opportunity_id}
pub fn status_subject(opportunity_id: &str) -> String {
    format!("{}{}", STATUS_SUBJECT_PREFIX, opportunity_id)
}

/// 번들 결과 서브젝트: mev.bundle.result.{provider}
pub fn bundle_subject(provider: &str) -> String {
    format!("{}{}", BUNDLE_RESULT_SUBJECT_PREFIX, provider)
}

impl ResultPublisher {
    pub fn new(client: async_nats::Client, use_jetstream: bool, result_subject_prefix: String) -> Self {
        let jetstream = if use_jetstream {
            Some(jetstream::new(client.clone()))
        } else {
            None
        };
        Self { client, jetstream, result_subject_prefix }
    }

    fn is_connected(&self) -> bool {
        self.client.connection_state() == State::Connected
    }

    /// 최종 결과 발행 (영속 레인)
    pub async fn publish_result(&self, result: &ExecutionResult) {
        let subject = result_subject(&self.result_subject_prefix, &result.chain_name);
        self.publish_durable(&subject, result).await;
    }

    /// 상태 업데이트 발행 (비영속)
    pub async fn publish_status(&self, opportunity_id: &str, status: StatusTag, detail: Option<String>) {
        let update = StatusUpdate {
            opportunity_id: opportunity_id.to_string(),
            status,
            timestamp: Utc::now(),
            detail,
        };
        let subject = status_subject(opportunity_id);
        self.publish_best_effort(&subject, &update).await;
    }

    /// 학습 피드 발행 (비영속)
    pub async fn publish_training(&self, record: &TrainingRecord) {
        self.publish_best_effort(TRAINING_SUBJECT, record).await;
    }

    /// 번들 결과 발행 (영속 레인)
    pub async fn publish_bundle_outcome(&self, outcome: &BundleOutcome) {
        let subject = bundle_subject(&outcome.provider.to_string());
        self.publish_durable(&subject, outcome).await;
    }

    /// 영속 발행: JetStream이 켜져 있으면 ack까지 대기, 스트림 오류 시
    /// 코어 발행으로 폴백한다.
    async fn publish_durable<T: Serialize>(&self, subject: &str, payload: &T) {
        if !self.is_connected() {
            warn!("📪 버스 연결 끊김 - {} 발행 드롭", subject);
            return;
        }
        let bytes = match serde_json::to_vec(payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("❌ {} 직렬화 실패: {}", subject, e);
                return;
            }
        };

        if let Some(js) = &self.jetstream {
            match js.publish(subject.to_string(), bytes.clone().into()).await {
                Ok(ack_future) => match ack_future.await {
                    Ok(_) => {
                        debug!("📬 {} JetStream 발행 완료", subject);
                        return;
                    }
                    Err(e) => warn!("⚠️ {} JetStream ack 실패, 코어 발행 폴백: {}", subject, e),
                },
                Err(e) => warn!("⚠️ {} JetStream 발행 실패, 코어 발행 폴백: {}", subject, e),
            }
        }

        if let Err(e) = self.client.publish(subject.to_string(), bytes.into()).await {
            warn!("📪 {} 발행 실패: {}", subject, e);
            return;
        }
        if let Err(e) = self.client.flush().await {
            warn!("⚠️ {} flush 실패: {}", subject, e);
        }
    }

    async fn publish_best_effort<T: Serialize>(&self, subject: &str, payload: &T) {
        if !self.is_connected() {
            warn!("📪 버스 연결 끊김 - {} 발행 드롭", subject);
            return;
        }
        let bytes = match serde_json::to_vec(payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("❌ {} 직렬화 실패: {}", subject, e);
                return;
            }
        };
        if let Err(e) = self.client.publish(subject.to_string(), bytes.into()).await {
            warn!("📪 {} 발행 실패: {}", subject, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_subject_lowercases_chain() {
        assert_eq!(
            result_subject(crate::constants::RESULT_SUBJECT_PREFIX, "Ethereum"),
            "flashloan.result.ethereum"
        );
        assert_eq!(
            result_subject(crate::constants::RESULT_SUBJECT_PREFIX, "solana"),
            "flashloan.result.solana"
        );
    }

    #[test]
    fn test_status_subject_embeds_opportunity_id() {
        assert_eq!(status_subject("E1"), "flashloan.status.E1");
    }

    #[test]
    fn test_bundle_subject_embeds_provider() {
        assert_eq!(bundle_subject("jito"), "mev.bundle.result.jito");
        assert_eq!(bundle_subject("suave"), "mev.bundle.result.suave");
    }
}
