use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::time::nanos_to_millis;
use crate::errors::{ExecutorError, ExecutorResult};

/// 아비트래지 전략 종류
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    #[serde(alias = "cross_dex", alias = "crossdex", alias = "CROSS_DEX", alias = "CROSSDEX")]
    CrossDex,
    #[serde(alias = "multi_hop", alias = "multihop", alias = "MULTI_HOP", alias = "MULTIHOP")]
    MultiHop,
    #[serde(alias = "triangular", alias = "TRIANGULAR")]
    Triangular,
    #[serde(alias = "mev_routed", alias = "mevrouted", alias = "MEV_ROUTED", alias = "MEVROUTED")]
    MevRouted,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::CrossDex => write!(f, "CrossDex"),
            StrategyKind::MultiHop => write!(f, "MultiHop"),
            StrategyKind::Triangular => write!(f, "Triangular"),
            StrategyKind::MevRouted => write!(f, "MevRouted"),
        }
    }
}

/// MEV 번들 릴레이 제공자
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MevProviderKind {
    #[serde(alias = "Jito", alias = "JITO")]
    Jito,
    #[serde(alias = "Suave", alias = "SUAVE")]
    Suave,
}

impl std::fmt::Display for MevProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MevProviderKind::Jito => write!(f, "jito"),
            MevProviderKind::Suave => write!(f, "suave"),
        }
    }
}

/// 경로 필드 - 프로듀서에 따라 주소 배열 또는 콤마 구분 문자열로 온다
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TokenPath {
    List(Vec<Address>),
    Csv(String),
}

impl TokenPath {
    pub fn resolve(&self) -> ExecutorResult<Vec<Address>> {
        match self {
            TokenPath::List(addresses) => Ok(addresses.clone()),
            TokenPath::Csv(raw) => raw
                .split(',')
                .map(|part| {
                    part.trim()
                        .parse::<Address>()
                        .map_err(|e| ExecutorError::Policy(format!("경로 주소 파싱 실패 '{}': {}", part.trim(), e)))
                })
                .collect(),
        }
    }
}

/// 버스에서 수신하는 아비트래지 기회 (불변)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Opportunity {
    pub id: String,
    #[serde(alias = "chain")]
    pub chain_name: String,
    pub asset: Address,
    pub amount: Decimal,
    pub strategy: StrategyKind,

    // 전략별 파라미터 (변형에 따라 한 세트만 존재)
    #[serde(default)]
    pub source_dex: Option<Address>,
    #[serde(default)]
    pub target_dex: Option<Address>,
    #[serde(default)]
    pub path: Option<TokenPath>,

    /// 온체인 함수가 강제할 최소 수익 하한
    #[serde(default)]
    pub min_profit: Decimal,
    /// 프로듀서 추정 수익 (advisory)
    #[serde(default)]
    pub expected_profit: Decimal,
    #[serde(default)]
    pub confidence_score: Option<f64>,

    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at_nanos: Option<i64>,

    // 시장 컨텍스트 (피처 벡터 - 금융 결정에 쓰지 않음)
    #[serde(default)]
    pub spread_bps: Option<Decimal>,
    #[serde(default)]
    pub order_book_imbalance: Option<f64>,
    #[serde(default)]
    pub volatility_percent: Option<f64>,
    #[serde(default)]
    pub aoi_score: Option<f64>,
    #[serde(default)]
    pub market_regime: Option<String>,

    // MEV 선호
    #[serde(default)]
    pub use_mev: bool,
    #[serde(default)]
    pub preferred_mev_provider: Option<MevProviderKind>,
    /// SOL 단위 팁 상한 (jito 경로)
    #[serde(default)]
    pub max_mev_tip: Option<Decimal>,
    #[serde(default)]
    pub target_bundle_position: Option<u32>,

    // 리스크 파라미터
    #[serde(default)]
    pub max_slippage_bps: Option<u32>,
    #[serde(default)]
    pub max_gas_price_gwei: Option<Decimal>,
    #[serde(default)]
    pub allow_partial_fill: bool,

    // 소스 추적
    #[serde(default)]
    pub signal_id: Option<String>,
    #[serde(default)]
    pub strategy_name: Option<String>,
    #[serde(default)]
    pub source_exchange: Option<String>,
    #[serde(default)]
    pub target_exchange: Option<String>,
}

impl Opportunity {
    /// 전략별 필수 필드 검증
    pub fn validate(&self) -> ExecutorResult<()> {
        if self.id.is_empty() {
            return Err(ExecutorError::Policy("기회 id가 비어 있습니다".to_string()));
        }
        if self.amount <= Decimal::ZERO {
            return Err(ExecutorError::Policy(format!("유효하지 않은 대출 금액: {}", self.amount)));
        }
        match self.strategy {
            StrategyKind::CrossDex | StrategyKind::MevRouted => {
                if self.source_dex.is_none() || self.target_dex.is_none() {
                    return Err(ExecutorError::Policy(format!(
                        "{} 전략에는 source_dex/target_dex가 필요합니다",
                        self.strategy
                    )));
                }
            }
            StrategyKind::MultiHop => {
                let path = self.resolved_path()?;
                if path.len() < 2 {
                    return Err(ExecutorError::Policy("MultiHop 경로는 2개 이상의 토큰이 필요합니다".to_string()));
                }
            }
            StrategyKind::Triangular => {
                let path = self.resolved_path()?;
                if path.len() < 3 {
                    return Err(ExecutorError::Policy("Triangular 경로는 3개 이상의 토큰이 필요합니다".to_string()));
                }
                if path.first() != path.last() {
                    return Err(ExecutorError::Policy(
                        "Triangular 경로는 시작과 끝 토큰이 같아야 합니다".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn resolved_path(&self) -> ExecutorResult<Vec<Address>> {
        self.path
            .as_ref()
            .ok_or_else(|| ExecutorError::Policy(format!("{} 전략에는 path가 필요합니다", self.strategy)))?
            .resolve()
    }

    /// 데드라인 경과 여부. expires_at_nanos가 있으면 우선한다.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        if let Some(expires) = self.expires_at_nanos {
            return now.timestamp_nanos_opt().unwrap_or(i64::MAX) >= expires;
        }
        if let Some(deadline) = self.deadline {
            return now >= deadline;
        }
        false
    }
}

/// 가스 입찰 오라클 응답
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GasBid {
    pub gas_price_gwei: Decimal,
    pub gas_limit: u64,
    pub estimated_cost_usd: Decimal,
}

impl GasBid {
    pub fn validate(&self) -> ExecutorResult<()> {
        if self.gas_price_gwei <= Decimal::ZERO {
            return Err(ExecutorError::Protocol(format!("가스 가격이 양수가 아닙니다: {}", self.gas_price_gwei)));
        }
        if self.gas_limit == 0 {
            return Err(ExecutorError::Protocol("가스 한도가 0입니다".to_string()));
        }
        if self.estimated_cost_usd <= Decimal::ZERO {
            return Err(ExecutorError::Protocol(format!(
                "가스 비용 추정이 양수가 아닙니다: {}",
                self.estimated_cost_usd
            )));
        }
        Ok(())
    }
}

/// 시뮬레이션 비용 내역
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CostBreakdown {
    pub gas_usd: Decimal,
    pub flash_loan_fee_usd: Decimal,
}

/// 시뮬레이션 결과: 실행 가능 여부와 순수익
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationOutcome {
    pub feasible: bool,
    pub estimated_net_profit_usd: Decimal,
    pub costs: CostBreakdown,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revert_reason: Option<String>,
}

impl SimulationOutcome {
    pub fn infeasible(costs: CostBreakdown, reason: Option<String>) -> Self {
        Self {
            feasible: false,
            estimated_net_profit_usd: Decimal::ZERO,
            costs,
            revert_reason: reason,
        }
    }
}

/// 파이프라인 내부 상태 (기회당 하나의 런, 런 로컬 상태로만 존재)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PipelineState {
    Received,
    Bidding,
    Simulating,
    Rejected,
    Building,
    Submitting,
    Pending,
    BundleSubmitting,
    BundlePending,
    Confirmed,
    Failed,
    TimedOut,
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineState::Received => "Received",
            PipelineState::Bidding => "Bidding",
            PipelineState::Simulating => "Simulating",
            PipelineState::Rejected => "Rejected",
            PipelineState::Building => "Building",
            PipelineState::Submitting => "Submitting",
            PipelineState::Pending => "Pending",
            PipelineState::BundleSubmitting => "BundleSubmitting",
            PipelineState::BundlePending => "BundlePending",
            PipelineState::Confirmed => "Confirmed",
            PipelineState::Failed => "Failed",
            PipelineState::TimedOut => "TimedOut",
        };
        write!(f, "{}", name)
    }
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineState::Rejected | PipelineState::Confirmed | PipelineState::Failed | PipelineState::TimedOut
        )
    }
}

/// 외부로 발행되는 상태 태그 (내부 상태보다 거친 단위)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatusTag {
    Received,
    Simulating,
    Submitting,
    SubmittingMev,
    Pending,
    Confirmed,
    Failed,
}

impl std::fmt::Display for StatusTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            StatusTag::Received => "received",
            StatusTag::Simulating => "simulating",
            StatusTag::Submitting => "submitting",
            StatusTag::SubmittingMev => "submitting_mev",
            StatusTag::Pending => "pending",
            StatusTag::Confirmed => "confirmed",
            StatusTag::Failed => "failed",
        };
        write!(f, "{}", tag)
    }
}

/// 런 진행 상태 알림 (비영속, 저카디널리티)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub opportunity_id: String,
    pub status: StatusTag,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// 런 타이밍 (단조 나노초)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunTiming {
    pub received_nanos: u64,
    #[serde(default)]
    pub sim_started_nanos: Option<u64>,
    #[serde(default)]
    pub sim_completed_nanos: Option<u64>,
    #[serde(default)]
    pub submitted_nanos: Option<u64>,
    #[serde(default)]
    pub confirmed_nanos: Option<u64>,
}

impl RunTiming {
    pub fn total_latency_ms(&self) -> Option<f64> {
        self.confirmed_nanos.map(|end| nanos_to_millis(self.received_nanos, end))
    }

    pub fn simulation_latency_ms(&self) -> Option<f64> {
        match (self.sim_started_nanos, self.sim_completed_nanos) {
            (Some(start), Some(end)) => Some(nanos_to_millis(start, end)),
            _ => None,
        }
    }
}

/// 런 종료 시 버스로 발행되는 최종 결과 레코드
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub opportunity_id: String,
    pub chain_name: String,
    pub strategy: StrategyKind,
    pub success: bool,
    pub final_state: PipelineState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,

    pub expected_profit_usd: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_profit_usd: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price_gwei: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_cost_usd: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flash_loan_fee_usd: Option<Decimal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    // MEV attribution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mev_provider: Option<MevProviderKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tip_lamports: Option<u64>,
    /// 추후 분석용 예약 필드 - 이 코어에서는 계산하지 않음
    #[serde(default)]
    pub was_frontrun: bool,
    #[serde(default)]
    pub was_backrun: bool,

    #[serde(flatten)]
    pub timing: RunTiming,
    pub completed_at: DateTime<Utc>,
}

/// ML 학습 피드용 평탄화 투영
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainingRecord {
    pub opportunity_id: String,
    pub chain_name: String,
    pub strategy: String,
    pub success: bool,
    pub expected_profit_usd: Decimal,
    pub estimated_profit_usd: Option<Decimal>,
    pub gas_cost_usd: Option<Decimal>,
    pub flash_loan_fee_usd: Option<Decimal>,
    pub confidence_score: Option<f64>,
    pub aoi_score: Option<f64>,
    pub spread_bps: Option<Decimal>,
    pub order_book_imbalance: Option<f64>,
    pub volatility_percent: Option<f64>,
    pub market_regime: Option<String>,
    pub used_mev: bool,
    pub mev_provider: Option<String>,
    pub total_latency_ms: Option<f64>,
    pub simulation_latency_ms: Option<f64>,
    pub reason: Option<String>,
}

impl TrainingRecord {
    pub fn from_result(result: &ExecutionResult, opportunity: &Opportunity) -> Self {
        Self {
            opportunity_id: result.opportunity_id.clone(),
            chain_name: result.chain_name.clone(),
            strategy: result.strategy.to_string(),
            success: result.success,
            expected_profit_usd: result.expected_profit_usd,
            estimated_profit_usd: result.estimated_profit_usd,
            gas_cost_usd: result.gas_cost_usd,
            flash_loan_fee_usd: result.flash_loan_fee_usd,
            confidence_score: opportunity.confidence_score,
            aoi_score: opportunity.aoi_score,
            spread_bps: opportunity.spread_bps,
            order_book_imbalance: opportunity.order_book_imbalance,
            volatility_percent: opportunity.volatility_percent,
            market_regime: opportunity.market_regime.clone(),
            used_mev: result.mev_provider.is_some(),
            mev_provider: result.mev_provider.map(|p| p.to_string()),
            total_latency_ms: result.timing.total_latency_ms(),
            simulation_latency_ms: result.timing.simulation_latency_ms(),
            reason: result.reason.clone(),
        }
    }
}

/// 번들 제출 결과 레코드 (mev.bundle.result.{provider})
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BundleOutcome {
    pub provider: MevProviderKind,
    pub opportunity_id: String,
    pub chain_name: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tip_lamports: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tip_account: Option<String>,
    pub submitted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Jito 팁 오라클 추정치 (lamports)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TipEstimate {
    pub min: u64,
    pub median: u64,
    pub p75: u64,
    pub p95: u64,
    pub recommended: u64,
}

impl Default for TipEstimate {
    fn default() -> Self {
        Self {
            min: crate::constants::FALLBACK_TIP_MIN_LAMPORTS,
            median: crate::constants::FALLBACK_TIP_RECOMMENDED_LAMPORTS,
            p75: crate::constants::FALLBACK_TIP_RECOMMENDED_LAMPORTS,
            p95: crate::constants::FALLBACK_TIP_RECOMMENDED_LAMPORTS * 2,
            recommended: crate::constants::FALLBACK_TIP_RECOMMENDED_LAMPORTS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::codec::decode_lenient;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    const WETH: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";
    const UNI_ROUTER: &str = "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D";
    const SUSHI_ROUTER: &str = "0xd9e1cE17f2641f24aE83637ab66a2cca9C378B9F";

    fn cross_dex_opportunity() -> Opportunity {
        Opportunity {
            id: "E1".to_string(),
            chain_name: "ethereum".to_string(),
            asset: WETH.parse().unwrap(),
            amount: dec!(10000),
            strategy: StrategyKind::CrossDex,
            source_dex: Some(UNI_ROUTER.parse().unwrap()),
            target_dex: Some(SUSHI_ROUTER.parse().unwrap()),
            path: None,
            min_profit: dec!(500),
            expected_profit: dec!(600),
            confidence_score: Some(0.9),
            deadline: Some(Utc::now() + Duration::seconds(60)),
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
    fn test_opportunity_decode_camel_case() {
        let payload = format!(
            r#"{{
                "id": "E1",
                "chain": "ethereum",
                "asset": "{WETH}",
                "amount": 10000,
                "strategy": "CrossDex",
                "sourceDex": "{UNI_ROUTER}",
                "targetDex": "{SUSHI_ROUTER}",
                "minProfit": 500,
                "expectedProfit": 600,
                "useMev": false,
                "unknownField": "ignored"
            }}"#
        );
        let opportunity: Opportunity = decode_lenient(payload.as_bytes()).unwrap();
        assert_eq!(opportunity.id, "E1");
        assert_eq!(opportunity.chain_name, "ethereum");
        assert_eq!(opportunity.strategy, StrategyKind::CrossDex);
        assert_eq!(opportunity.amount, dec!(10000));
        assert_eq!(opportunity.expected_profit, dec!(600));
        assert!(!opportunity.use_mev);
        assert!(opportunity.validate().is_ok());
    }

    #[test]
    fn test_strategy_aliases() {
        let payload = format!(
            r#"{{"id":"x","chain":"ethereum","asset":"{WETH}","amount":1,"strategy":"cross_dex",
                "sourceDex":"{UNI_ROUTER}","targetDex":"{SUSHI_ROUTER}"}}"#
        );
        let opportunity: Opportunity = decode_lenient(payload.as_bytes()).unwrap();
        assert_eq!(opportunity.strategy, StrategyKind::CrossDex);
    }

    #[test]
    fn test_path_csv_resolution() {
        let path = TokenPath::Csv(format!("{WETH}, {UNI_ROUTER},{WETH}"));
        let resolved = path.resolve().unwrap();
        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved[0], resolved[2]);
    }

    #[test]
    fn test_triangular_validation() {
        let mut opportunity = cross_dex_opportunity();
        opportunity.strategy = StrategyKind::Triangular;
        opportunity.path = Some(TokenPath::Csv(format!("{WETH},{UNI_ROUTER}")));
        // 3개 미만 → 거부
        assert!(opportunity.validate().is_err());

        opportunity.path = Some(TokenPath::Csv(format!("{WETH},{UNI_ROUTER},{SUSHI_ROUTER}")));
        // 시작 != 끝 → 거부
        assert!(opportunity.validate().is_err());

        opportunity.path = Some(TokenPath::Csv(format!("{WETH},{UNI_ROUTER},{WETH}")));
        assert!(opportunity.validate().is_ok());
    }

    #[test]
    fn test_missing_dex_pair_rejected() {
        let mut opportunity = cross_dex_opportunity();
        opportunity.target_dex = None;
        assert!(opportunity.validate().is_err());
    }

    #[test]
    fn test_expiry_deadline() {
        let mut opportunity = cross_dex_opportunity();
        assert!(!opportunity.is_expired(Utc::now()));

        opportunity.deadline = Some(Utc::now() - Duration::seconds(1));
        assert!(opportunity.is_expired(Utc::now()));
    }

    #[test]
    fn test_expiry_nanos_takes_precedence() {
        let mut opportunity = cross_dex_opportunity();
        opportunity.deadline = Some(Utc::now() + Duration::seconds(3600));
        opportunity.expires_at_nanos = Some(Utc::now().timestamp_nanos_opt().unwrap() - 1);
        assert!(opportunity.is_expired(Utc::now()));
    }

    #[test]
    fn test_gas_bid_validation() {
        let bid = GasBid {
            gas_price_gwei: dec!(50),
            gas_limit: 300_000,
            estimated_cost_usd: dec!(25),
        };
        assert!(bid.validate().is_ok());

        let zero_limit = GasBid { gas_limit: 0, ..bid.clone() };
        assert!(zero_limit.validate().is_err());

        let negative_price = GasBid { gas_price_gwei: dec!(-1), ..bid };
        assert!(negative_price.validate().is_err());
    }

    #[test]
    fn test_status_tag_display() {
        assert_eq!(StatusTag::SubmittingMev.to_string(), "submitting_mev");
        assert_eq!(StatusTag::Confirmed.to_string(), "confirmed");
    }

    #[test]
    fn test_run_timing_latencies() {
        let timing = RunTiming {
            received_nanos: 1_000_000,
            sim_started_nanos: Some(2_000_000),
            sim_completed_nanos: Some(5_000_000),
            submitted_nanos: Some(6_000_000),
            confirmed_nanos: Some(11_000_000),
        };
        assert_eq!(timing.total_latency_ms(), Some(10.0));
        assert_eq!(timing.simulation_latency_ms(), Some(3.0));
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let result = ExecutionResult {
            opportunity_id: "E1".to_string(),
            chain_name: "ethereum".to_string(),
            strategy: StrategyKind::CrossDex,
            success: true,
            final_state: PipelineState::Confirmed,
            transaction_hash: Some("0xabc".to_string()),
            block_number: Some(123),
            expected_profit_usd: dec!(600),
            estimated_profit_usd: Some(dec!(566)),
            gas_price_gwei: Some(dec!(50)),
            gas_cost_usd: Some(dec!(25)),
            flash_loan_fee_usd: Some(dec!(9)),
            reason: None,
            mev_provider: None,
            bundle_id: None,
            tip_lamports: None,
            was_frontrun: false,
            was_backrun: false,
            timing: RunTiming::default(),
            completed_at: Utc::now(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["opportunityId"], "E1");
        assert_eq!(json["estimatedProfitUsd"], serde_json::json!("566"));
        assert!(json.get("transaction_hash").is_none());
    }
}
