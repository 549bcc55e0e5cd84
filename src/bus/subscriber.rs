use std::sync::Arc;

use anyhow::{Context, Result};
use futures_util::StreamExt;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::common::codec::decode_lenient;
use crate::config::Config;
use crate::core::OpportunityPipeline;
use crate::types::Opportunity;

/// 기회 서브젝트 구독자 (C8)
///
/// 메시지마다 새 PipelineRun을 만들어 동시 실행한다. 동시 런 수는
/// 세마포어로 상한을 두고, 상한에 닿으면 추가 메시지는 인테이크에서
/// 대기한다 (메모리 상한이 완전성보다 우선). 버스 구독은 전달 시
/// 자동 ack이다.
pub struct OpportunitySubscriber {
    client: async_nats::Client,
    config: Arc<Config>,
    pipeline: Arc<OpportunityPipeline>,
}

impl OpportunitySubscriber {
    pub fn new(client: async_nats::Client, config: Arc<Config>, pipeline: Arc<OpportunityPipeline>) -> Self {
        Self { client, config, pipeline }
    }

    /// 구독 루프. 종료 신호까지 돌고, 인플라이트 런을 모두 join한 뒤
    /// 반환한다 - 떠돌이 태스크를 남기지 않는다.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let subject = self.config.nats.opportunity_subject.clone();
        let mut subscription = self
            .client
            .subscribe(subject.clone())
            .await
            .with_context(|| format!("구독 실패: {}", subject))?;

        let limiter = Arc::new(Semaphore::new(self.config.runtime.max_concurrent_runs));
        let mut runs: JoinSet<()> = JoinSet::new();

        info!(
            "📡 기회 구독 시작: {} (동시 런 상한 {})",
            subject, self.config.runtime.max_concurrent_runs
        );

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("🛑 종료 신호 수신 - 인테이크 중단");
                        break;
                    }
                }
                message = subscription.next() => {
                    match message {
                        Some(message) => {
                            self.dispatch(&message.payload, &limiter, &mut runs).await;
                        }
                        None => {
                            warn!("📪 구독 스트림이 종료되었습니다");
                            break;
                        }
                    }
                }
                // 완료된 런을 수거하고 결과를 로그로 남긴다
                Some(joined) = runs.join_next(), if !runs.is_empty() => {
                    if let Err(e) = joined {
                        error!("❌ 파이프라인 태스크 join 실패: {}", e);
                    }
                }
            }
        }

        if let Err(e) = subscription.unsubscribe().await {
            warn!("구독 해제 실패: {}", e);
        }

        // 인플라이트 런 드레인
        let in_flight = runs.len();
        if in_flight > 0 {
            info!("⏳ 인플라이트 런 {}개 완료 대기 중...", in_flight);
        }
        while let Some(joined) = runs.join_next().await {
            if let Err(e) = joined {
                error!("❌ 파이프라인 태스크 join 실패: {}", e);
            }
        }
        info!("📡 구독 루프 종료");
        Ok(())
    }

    async fn dispatch(&self, payload: &[u8], limiter: &Arc<Semaphore>, runs: &mut JoinSet<()>) {
        // 역직렬화 실패 메시지는 로그 후 드롭 - 전략 필드 검증은
        // 파이프라인이 하고 거부 결과로 발행한다
        let opportunity: Opportunity = match decode_lenient(payload) {
            Ok(opportunity) => opportunity,
            Err(e) => {
                warn!("🗑️ 기회 메시지 역직렬화 실패, 드롭: {}", e);
                return;
            }
        };
        debug!("📥 기회 디코딩: {} ({})", opportunity.id, opportunity.chain_name);

        let permit = match Arc::clone(limiter).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                warn!("🗑️ 세마포어 닫힘 - 기회 {} 드롭", opportunity.id);
                return;
            }
        };

        let pipeline = Arc::clone(&self.pipeline);
        runs.spawn(async move {
            let _permit = permit;
            pipeline.execute(opportunity).await;
        });
    }
}
