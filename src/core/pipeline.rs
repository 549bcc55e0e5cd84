use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::blockchain::{ChainGateway, ChainHandle};
use crate::builder::TransactionBuilder;
use crate::config::Config;
use crate::constants::{RECEIPT_POLL_INTERVAL_SECS, RECEIPT_POLL_MAX_ATTEMPTS};
use crate::core::stats::ExecutionStatsTracker;
use crate::bus::ResultPublisher;
use crate::common::time::monotonic_nanos;
use crate::errors::ExecutorError;
use crate::gas::GasBidder;
use crate::mev::MevCoordinator;
use crate::simulation::{SimulationReport, Simulator};
use crate::types::{
    ExecutionResult, GasBid, Opportunity, PipelineState, RunTiming, SimulationOutcome, StatusTag,
    TrainingRecord,
};

/// 기회 하나의 생애: 런 로컬 상태 + 단조 타이밍
///
/// 오케스트레이터 공유 인스턴스에 필드를 두지 않는다 - 동시 런이
/// 서로의 타임스탬프를 덮어쓰는 사고를 원천 차단한다.
struct PipelineRun {
    state: PipelineState,
    timing: RunTiming,
}

impl PipelineRun {
    fn new() -> Self {
        Self {
            state: PipelineState::Received,
            timing: RunTiming { received_nanos: monotonic_nanos(), ..Default::default() },
        }
    }
}

/// 기회별 상태 머신 오케스트레이터 (C7)
///
/// 수신 → 입찰 → 시뮬레이션 → 판정 → (표준 제출 | MEV 번들) → 포함 대기
/// → 결과 발행. 어떤 분기든 정확히 한 번의 최종 결과 발행으로 끝나고,
/// 예외는 파이프라인 밖으로 나가지 않는다.
pub struct OpportunityPipeline {
    config: Arc<Config>,
    gateway: Arc<ChainGateway>,
    gas_bidder: GasBidder,
    simulator: Simulator,
    builder: TransactionBuilder,
    mev: MevCoordinator,
    publisher: Arc<ResultPublisher>,
    stats: Arc<ExecutionStatsTracker>,
}

impl OpportunityPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<Config>,
        gateway: Arc<ChainGateway>,
        gas_bidder: GasBidder,
        simulator: Simulator,
        builder: TransactionBuilder,
        mev: MevCoordinator,
        publisher: Arc<ResultPublisher>,
        stats: Arc<ExecutionStatsTracker>,
    ) -> Self {
        Self { config, gateway, gas_bidder, simulator, builder, mev, publisher, stats }
    }

    /// 기회 하나를 터미널까지 실행한다. 절대 에러를 반환하지 않는다 -
    /// 모든 장애는 실패 결과 레코드로 변환된다.
    pub async fn execute(&self, opportunity: Opportunity) {
        self.stats.record_received().await;
        let mut run = PipelineRun::new();

        info!(
            "📨 기회 수신: {} ({} / {}, expected ${})",
            opportunity.id, opportunity.chain_name, opportunity.strategy, opportunity.expected_profit
        );
        self.publisher.publish_status(&opportunity.id, StatusTag::Received, None).await;

        let result = match self.run_to_completion(&opportunity, &mut run).await {
            Ok(result) => result,
            Err(e) => {
                // 정책 거부는 Rejected, 그 외 장애는 Failed
                run.state = if e.is_policy() { PipelineState::Rejected } else { PipelineState::Failed };
                warn!("❌ {} 런 종료 ({}): {}", opportunity.id, run.state, e);
                let mut result = make_result(&opportunity, &run, false);
                result.reason = Some(e.to_string());
                result
            }
        };

        // 최종 결과 먼저, 터미널 상태는 그 뒤에 (순서 계약)
        self.publisher.publish_result(&result).await;
        let training = TrainingRecord::from_result(&result, &opportunity);
        self.publisher.publish_training(&training).await;

        let terminal = if result.success { StatusTag::Confirmed } else { StatusTag::Failed };
        self.publisher.publish_status(&opportunity.id, terminal, result.reason.clone()).await;

        self.stats.record_result(&result).await;
        info!(
            "🏁 {} 종료: {} (success={}, net={:?})",
            result.opportunity_id, result.final_state, result.success, result.estimated_profit_usd
        );
        // 런 상태는 여기서 드롭된다 - 재시작 간 영속 없음
    }

    async fn run_to_completion(
        &self,
        opportunity: &Opportunity,
        run: &mut PipelineRun,
    ) -> Result<ExecutionResult, ExecutorError> {
        // 수신 시점에 이미 만료된 기회는 비용을 쓰지 않는다
        if opportunity.is_expired(Utc::now()) {
            run.state = PipelineState::Rejected;
            let mut result = make_result(opportunity, run, false);
            result.reason = Some("deadline exceeded".to_string());
            return Ok(result);
        }

        // 체인 레지스트리 해석 + 전략 필드 검증 - 오라클 왕복 전에 거른다
        self.gateway.chain(&opportunity.chain_name)?;
        opportunity.validate()?;

        // 가스 입찰 - 실패는 해당 기회에 치명적
        run.state = PipelineState::Bidding;
        self.publisher.publish_status(&opportunity.id, StatusTag::Simulating, None).await;
        let bid = self.gas_bidder.get_bid(opportunity).await?;

        // 리스크 상한: 입찰 가스 가격이 기회의 한도를 넘으면 거부
        if let Some(max_gwei) = opportunity.max_gas_price_gwei {
            if bid.gas_price_gwei > max_gwei {
                run.state = PipelineState::Rejected;
                let mut result = make_result(opportunity, run, false);
                result.gas_price_gwei = Some(bid.gas_price_gwei);
                result.reason =
                    Some(format!("gas price {} gwei exceeds limit {} gwei", bid.gas_price_gwei, max_gwei));
                return Ok(result);
            }
        }

        // 시뮬레이션
        run.state = PipelineState::Simulating;
        run.timing.sim_started_nanos = Some(monotonic_nanos());
        let report = self.simulator.simulate(opportunity, &bid).await?;
        run.timing.sim_completed_nanos = Some(monotonic_nanos());

        // 판정: 수익 없이는 제출 없다
        if !report.outcome.feasible {
            run.state = PipelineState::Rejected;
            let mut result = make_result(opportunity, run, false);
            apply_bid(&mut result, &bid, &report.outcome);
            result.reason = Some(rejection_reason(&report.outcome));
            info!("🚫 {} 거부: {}", opportunity.id, result.reason.as_deref().unwrap_or(""));
            return Ok(result);
        }

        // 제출 직전 데드라인 재확인
        if opportunity.is_expired(Utc::now()) {
            run.state = PipelineState::Rejected;
            let mut result = make_result(opportunity, run, false);
            apply_bid(&mut result, &bid, &report.outcome);
            result.reason = Some("deadline exceeded".to_string());
            return Ok(result);
        }

        run.state = PipelineState::Building;
        let chain = self.gateway.chain(&opportunity.chain_name)?;

        // dry run: 판정까지만 수행하고 제출은 생략
        if self.config.runtime.dry_run {
            run.timing.submitted_nanos = Some(monotonic_nanos());
            run.timing.confirmed_nanos = Some(monotonic_nanos());
            run.state = PipelineState::Confirmed;
            let mut result = make_result(opportunity, run, true);
            apply_bid(&mut result, &bid, &report.outcome);
            result.estimated_profit_usd = Some(report.outcome.estimated_net_profit_usd);
            result.reason = Some("dry run - 제출 생략".to_string());
            info!("🧪 {} dry run: net ${}", opportunity.id, report.outcome.estimated_net_profit_usd);
            return Ok(result);
        }

        let signed_hex = self.builder.build_and_sign(opportunity, &bid, &report.call, &chain).await?;

        let mev_branch = opportunity.use_mev && self.mev.available_for(opportunity);
        if mev_branch {
            Ok(self.submit_mev(opportunity, run, &bid, &report, &chain, &signed_hex).await)
        } else {
            self.submit_standard(opportunity, run, &bid, &report, &chain, &signed_hex).await
        }
    }

    /// 표준 경로: eth_sendRawTransaction + 영수증 폴링
    async fn submit_standard(
        &self,
        opportunity: &Opportunity,
        run: &mut PipelineRun,
        bid: &GasBid,
        report: &SimulationReport,
        chain: &Arc<ChainHandle>,
        signed_hex: &str,
    ) -> Result<ExecutionResult, ExecutorError> {
        run.state = PipelineState::Submitting;
        self.publisher.publish_status(&opportunity.id, StatusTag::Submitting, None).await;

        let tx_hash = self.gateway.send_raw_transaction(chain, signed_hex).await?;
        run.timing.submitted_nanos = Some(monotonic_nanos());
        let tx_hash_hex = format!("{:?}", tx_hash);

        run.state = PipelineState::Pending;
        self.publisher
            .publish_status(&opportunity.id, StatusTag::Pending, Some(tx_hash_hex.clone()))
            .await;

        for attempt in 1..=RECEIPT_POLL_MAX_ATTEMPTS {
            tokio::time::sleep(Duration::from_secs(RECEIPT_POLL_INTERVAL_SECS)).await;

            match self.gateway.get_receipt(chain, tx_hash).await {
                Ok(Some(receipt)) => {
                    run.timing.confirmed_nanos = Some(monotonic_nanos());
                    let reverted = receipt.status == Some(0u64.into());
                    let block_number = receipt.block_number.map(|n| n.as_u64());

                    if reverted {
                        run.state = PipelineState::Failed;
                        let mut result = make_result(opportunity, run, false);
                        apply_bid(&mut result, bid, &report.outcome);
                        result.transaction_hash = Some(tx_hash_hex);
                        result.block_number = block_number;
                        result.reason = Some("transaction reverted on-chain".to_string());
                        return Ok(result);
                    }

                    run.state = PipelineState::Confirmed;
                    let mut result = make_result(opportunity, run, true);
                    apply_bid(&mut result, bid, &report.outcome);
                    result.transaction_hash = Some(tx_hash_hex);
                    result.block_number = block_number;
                    result.estimated_profit_usd = Some(report.outcome.estimated_net_profit_usd);
                    info!(
                        "✅ {} 확정: 블록 {:?}, net ${}",
                        opportunity.id, block_number, report.outcome.estimated_net_profit_usd
                    );
                    return Ok(result);
                }
                Ok(None) => {
                    debug!("👁️ {} 영수증 대기 ({}/{})", opportunity.id, attempt, RECEIPT_POLL_MAX_ATTEMPTS);
                }
                Err(e) => {
                    // 폴링 중 전송 오류는 시도 예산 안에서 계속
                    warn!("⚠️ {} 영수증 조회 실패 ({}/{}): {}", opportunity.id, attempt, RECEIPT_POLL_MAX_ATTEMPTS, e);
                }
            }
        }

        // 영수증 미확인 - 트랜잭션은 여전히 포함될 수 있다. 재시도도 취소도 없다.
        run.state = PipelineState::TimedOut;
        let mut result = make_result(opportunity, run, false);
        apply_bid(&mut result, bid, &report.outcome);
        result.transaction_hash = Some(tx_hash_hex);
        result.reason = Some("receipt timeout - transaction may still land".to_string());
        Ok(result)
    }

    /// MEV 경로: 번들 제출 + 포함 대기 (제공자별 폴링은 C5가 소유)
    async fn submit_mev(
        &self,
        opportunity: &Opportunity,
        run: &mut PipelineRun,
        bid: &GasBid,
        report: &SimulationReport,
        chain: &Arc<ChainHandle>,
        signed_hex: &str,
    ) -> ExecutionResult {
        run.state = PipelineState::BundleSubmitting;
        self.publisher.publish_status(&opportunity.id, StatusTag::SubmittingMev, None).await;
        run.timing.submitted_nanos = Some(monotonic_nanos());

        run.state = PipelineState::BundlePending;
        let outcome = self.mev.submit_and_await(opportunity, signed_hex, chain).await;
        self.publisher.publish_bundle_outcome(&outcome).await;

        run.state = if outcome.success {
            run.timing.confirmed_nanos = Some(monotonic_nanos());
            PipelineState::Confirmed
        } else if outcome.reason.as_deref() == Some("Confirmation timeout") {
            PipelineState::TimedOut
        } else {
            PipelineState::Failed
        };

        let mut result = make_result(opportunity, run, outcome.success);
        apply_bid(&mut result, bid, &report.outcome);
        result.mev_provider = Some(outcome.provider);
        result.bundle_id = outcome.bundle_id;
        result.tip_lamports = outcome.tip_lamports;
        result.block_number = outcome.block_number;
        result.reason = outcome.reason;
        if outcome.success {
            result.estimated_profit_usd = Some(report.outcome.estimated_net_profit_usd);
            info!("✅ {} 번들 랜딩: 블록 {:?} ({})", opportunity.id, result.block_number, outcome.provider);
        }
        result
    }
}

/// 런 컨텍스트에서 결과 레코드 골격 생성
fn make_result(opportunity: &Opportunity, run: &PipelineRun, success: bool) -> ExecutionResult {
    ExecutionResult {
        opportunity_id: opportunity.id.clone(),
        chain_name: opportunity.chain_name.clone(),
        strategy: opportunity.strategy,
        success,
        final_state: run.state,
        transaction_hash: None,
        block_number: None,
        expected_profit_usd: opportunity.expected_profit,
        estimated_profit_usd: None,
        gas_price_gwei: None,
        gas_cost_usd: None,
        flash_loan_fee_usd: None,
        reason: None,
        mev_provider: None,
        bundle_id: None,
        tip_lamports: None,
        was_frontrun: false,
        was_backrun: false,
        timing: run.timing,
        completed_at: Utc::now(),
    }
}

fn apply_bid(result: &mut ExecutionResult, bid: &GasBid, outcome: &SimulationOutcome) {
    result.gas_price_gwei = Some(bid.gas_price_gwei);
    result.gas_cost_usd = Some(outcome.costs.gas_usd);
    result.flash_loan_fee_usd = Some(outcome.costs.flash_loan_fee_usd);
}

/// 거부 사유 문자열: 리버트와 수익성 부족을 구분한다
fn rejection_reason(outcome: &SimulationOutcome) -> String {
    match &outcome.revert_reason {
        Some(revert) => format!("simulation reverted: {}", revert),
        None => format!("unprofitable: net ${} <= 0", outcome.estimated_net_profit_usd),
    }
}
