use std::sync::Arc;

use chrono::Utc;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{info, warn};

use crate::blockchain::{ChainGateway, ChainHandle};
use crate::config::Config;
use crate::constants::{DEFAULT_TIP_MULTIPLIER, LAMPORTS_PER_SOL};
use crate::errors::ExecutorResult;
use crate::mev::jito::JitoClient;
use crate::mev::suave::SuaveClient;
use crate::types::{BundleOutcome, MevProviderKind, Opportunity, TipEstimate};

/// MEV 코디네이터 (C5): 제공자 선택, 팁 산정, 번들 제출, 포함 대기
pub struct MevCoordinator {
    config: Arc<Config>,
    gateway: Arc<ChainGateway>,
    jito: JitoClient,
    suave: SuaveClient,
}

/// 체인 → 기본 제공자 매핑. 미지의 체인은 suave로 보낸다.
pub fn default_provider_for_chain(chain_name: &str) -> MevProviderKind {
    match chain_name.to_lowercase().as_str() {
        "solana" => MevProviderKind::Jito,
        "ethereum" | "polygon" | "arbitrum" | "base" | "optimism" | "avalanche" | "bsc" => {
            MevProviderKind::Suave
        }
        _ => MevProviderKind::Suave,
    }
}

/// Solana 팁 산정: recommended × (0.5 + 0.5·aoi), [min, max_tip]로 클램프
///
/// max_tip은 max_mev_tip(SOL)이 있으면 그것, 없으면 expected_profit/10.
pub fn compute_tip_lamports(estimate: &TipEstimate, opportunity: &Opportunity) -> u64 {
    let multiplier = opportunity
        .aoi_score
        .map(|aoi| 0.5 + 0.5 * aoi.clamp(0.0, 1.0))
        .unwrap_or(DEFAULT_TIP_MULTIPLIER);
    let multiplier = Decimal::from_f64(multiplier).unwrap_or(dec!(0.75));

    let scaled = (Decimal::from(estimate.recommended) * multiplier)
        .trunc()
        .to_u64()
        .unwrap_or(estimate.recommended);

    let max_tip = max_tip_lamports(opportunity).max(estimate.min);
    scaled.clamp(estimate.min, max_tip)
}

fn max_tip_lamports(opportunity: &Opportunity) -> u64 {
    let sol = match opportunity.max_mev_tip {
        Some(tip) => tip,
        None => opportunity.expected_profit / dec!(10),
    };
    sol_to_lamports(sol)
}

fn sol_to_lamports(sol: Decimal) -> u64 {
    (sol * Decimal::from(LAMPORTS_PER_SOL)).trunc().to_u64().unwrap_or(0)
}

impl MevCoordinator {
    pub fn new(config: Arc<Config>, gateway: Arc<ChainGateway>) -> ExecutorResult<Self> {
        let jito = JitoClient::new(Arc::clone(&config))?;
        let suave = SuaveClient::new(Arc::clone(&config))?;
        Ok(Self { config, gateway, jito, suave })
    }

    /// 제공자 선택: 명시 선호가 있으면 그대로, 없으면 체인 맵
    pub fn select_provider(&self, opportunity: &Opportunity) -> MevProviderKind {
        opportunity
            .preferred_mev_provider
            .unwrap_or_else(|| default_provider_for_chain(&opportunity.chain_name))
    }

    /// 선택될 제공자의 엔드포인트가 설정되어 있는지
    pub fn available_for(&self, opportunity: &Opportunity) -> bool {
        match self.select_provider(opportunity) {
            MevProviderKind::Jito => self.config.jito.block_engine_url.is_some(),
            MevProviderKind::Suave => self.config.suave_builder_url(&opportunity.chain_name).is_some(),
        }
    }

    /// 번들 제출 후 포함 대기까지의 전체 경로
    ///
    /// HTTP/RPC 오류는 실패 결과로 변환되어 돌아온다 - 호출자에게
    /// 오류가 전파되는 경우는 없다 (전송 계층 장애 포함).
    pub async fn submit_and_await(
        &self,
        opportunity: &Opportunity,
        signed_hex: &str,
        chain: &ChainHandle,
    ) -> BundleOutcome {
        let provider = self.select_provider(opportunity);
        let submitted_at = Utc::now();

        match provider {
            MevProviderKind::Jito => self.run_jito(opportunity, signed_hex, submitted_at).await,
            MevProviderKind::Suave => self.run_suave(opportunity, signed_hex, chain, submitted_at).await,
        }
    }

    async fn run_jito(
        &self,
        opportunity: &Opportunity,
        signed_hex: &str,
        submitted_at: chrono::DateTime<Utc>,
    ) -> BundleOutcome {
        // 팁 추정 실패는 보수적 기본값으로 대체 (제출은 계속한다)
        let estimate = match self.jito.fetch_tip_estimate().await {
            Ok(estimate) => estimate,
            Err(e) => {
                warn!("⚠️ 팁 플로어 조회 실패, 기본값 사용: {}", e);
                TipEstimate::default()
            }
        };
        let tip_lamports = compute_tip_lamports(&estimate, opportunity);

        let tip_account = match self.jito.get_tip_accounts().await {
            Ok(accounts) => accounts.into_iter().next(),
            Err(e) => {
                warn!("⚠️ 팁 계정 조회 실패: {}", e);
                None
            }
        };

        info!(
            "💰 {} jito 팁 산정: {} lamports (recommended {}, aoi {:?})",
            opportunity.id, tip_lamports, estimate.recommended, opportunity.aoi_score
        );

        let bundle_id = match self.jito.submit_bundle(signed_hex, tip_lamports).await {
            Ok(id) => id,
            Err(e) => {
                return BundleOutcome {
                    provider: MevProviderKind::Jito,
                    opportunity_id: opportunity.id.clone(),
                    chain_name: opportunity.chain_name.clone(),
                    success: false,
                    bundle_id: None,
                    block_number: None,
                    tip_lamports: Some(tip_lamports),
                    tip_account,
                    submitted_at,
                    reason: Some(e.to_string()),
                };
            }
        };
        info!("📦 {} jito 번들 제출됨: {}", opportunity.id, bundle_id);

        let inclusion = self.jito.await_inclusion(&bundle_id).await;
        BundleOutcome {
            provider: MevProviderKind::Jito,
            opportunity_id: opportunity.id.clone(),
            chain_name: opportunity.chain_name.clone(),
            success: inclusion.landed,
            bundle_id: Some(bundle_id),
            block_number: inclusion.block_number,
            tip_lamports: Some(tip_lamports),
            tip_account,
            submitted_at,
            reason: inclusion.reason,
        }
    }

    async fn run_suave(
        &self,
        opportunity: &Opportunity,
        signed_hex: &str,
        chain: &ChainHandle,
        submitted_at: chrono::DateTime<Utc>,
    ) -> BundleOutcome {
        // 타겟 블록 = 현재 + 1
        let target_block = match self.gateway.get_block_number(chain).await {
            Ok(number) => number + 1,
            Err(e) => {
                return BundleOutcome {
                    provider: MevProviderKind::Suave,
                    opportunity_id: opportunity.id.clone(),
                    chain_name: opportunity.chain_name.clone(),
                    success: false,
                    bundle_id: None,
                    block_number: None,
                    tip_lamports: None,
                    tip_account: None,
                    submitted_at,
                    reason: Some(format!("타겟 블록 조회 실패: {}", e)),
                };
            }
        };

        let bundle_hash = match self
            .suave
            .submit_bundle(&opportunity.chain_name, signed_hex, target_block)
            .await
        {
            Ok(hash) => hash,
            Err(e) => {
                return BundleOutcome {
                    provider: MevProviderKind::Suave,
                    opportunity_id: opportunity.id.clone(),
                    chain_name: opportunity.chain_name.clone(),
                    success: false,
                    bundle_id: None,
                    block_number: None,
                    tip_lamports: None,
                    tip_account: None,
                    submitted_at,
                    reason: Some(e.to_string()),
                };
            }
        };
        info!("📦 {} EVM 번들 제출됨: {} (블록 {})", opportunity.id, bundle_hash, target_block);

        let inclusion = self
            .suave
            .await_inclusion(&opportunity.chain_name, &bundle_hash, target_block)
            .await;
        BundleOutcome {
            provider: MevProviderKind::Suave,
            opportunity_id: opportunity.id.clone(),
            chain_name: opportunity.chain_name.clone(),
            success: inclusion.landed,
            bundle_id: Some(bundle_hash),
            block_number: inclusion.block_number,
            tip_lamports: None,
            tip_account: None,
            submitted_at,
            reason: inclusion.reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{StrategyKind, TokenPath};

    fn solana_opportunity() -> Opportunity {
        Opportunity {
            id: "S1".to_string(),
            chain_name: "solana".to_string(),
            asset: "0x0000000000000000000000000000000000000001".parse().unwrap(),
            amount: dec!(100),
            strategy: StrategyKind::MevRouted,
            source_dex: Some("0x0000000000000000000000000000000000000002".parse().unwrap()),
            target_dex: Some("0x0000000000000000000000000000000000000003".parse().unwrap()),
            path: None::<TokenPath>,
            min_profit: dec!(0.5),
            expected_profit: dec!(2.0),
            confidence_score: Some(0.9),
            deadline: None,
            expires_at_nanos: None,
            spread_bps: None,
            order_book_imbalance: None,
            volatility_percent: None,
            aoi_score: Some(0.8),
            market_regime: None,
            use_mev: true,
            preferred_mev_provider: None,
            max_mev_tip: Some(dec!(0.5)),
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
    fn test_chain_provider_map() {
        assert_eq!(default_provider_for_chain("solana"), MevProviderKind::Jito);
        assert_eq!(default_provider_for_chain("ethereum"), MevProviderKind::Suave);
        assert_eq!(default_provider_for_chain("Polygon"), MevProviderKind::Suave);
        assert_eq!(default_provider_for_chain("bsc"), MevProviderKind::Suave);
        // 미지의 체인은 suave 기본값
        assert_eq!(default_provider_for_chain("sui"), MevProviderKind::Suave);
    }

    #[test]
    fn test_preferred_provider_wins() {
        let config = Arc::new(crate::config::Config::load_test_config());
        let gateway = Arc::new(ChainGateway::from_config(&config.nodes).unwrap());
        let coordinator = MevCoordinator::new(config, gateway).unwrap();

        let mut opportunity = solana_opportunity();
        assert_eq!(coordinator.select_provider(&opportunity), MevProviderKind::Jito);

        opportunity.preferred_mev_provider = Some(MevProviderKind::Suave);
        assert_eq!(coordinator.select_provider(&opportunity), MevProviderKind::Suave);
    }

    #[test]
    fn test_tip_sizing_scenario() {
        // recommended 25000, aoi 0.8 -> 0.9배 -> 22500,
        // clamp [1000, 500_000_000] → 22500
        let estimate = TipEstimate { min: 1_000, median: 20_000, p75: 30_000, p95: 60_000, recommended: 25_000 };
        let opportunity = solana_opportunity();
        assert_eq!(compute_tip_lamports(&estimate, &opportunity), 22_500);
    }

    #[test]
    fn test_tip_clamped_to_min() {
        let estimate = TipEstimate { min: 50_000, median: 50_000, p75: 60_000, p95: 90_000, recommended: 50_000 };
        let mut opportunity = solana_opportunity();
        opportunity.aoi_score = Some(0.0); // 0.5배 → 25000 < min
        assert_eq!(compute_tip_lamports(&estimate, &opportunity), 50_000);
    }

    #[test]
    fn test_tip_clamped_to_max_mev_tip() {
        let estimate =
            TipEstimate { min: 1_000, median: 1_000_000, p75: 2_000_000, p95: 5_000_000, recommended: 2_000_000_000 };
        let mut opportunity = solana_opportunity();
        opportunity.max_mev_tip = Some(dec!(0.001)); // 1_000_000 lamports
        assert_eq!(compute_tip_lamports(&estimate, &opportunity), 1_000_000);
    }

    #[test]
    fn test_tip_max_defaults_to_tenth_of_expected_profit() {
        let estimate =
            TipEstimate { min: 1_000, median: 1_000_000, p75: 2_000_000, p95: 5_000_000, recommended: 2_000_000_000 };
        let mut opportunity = solana_opportunity();
        opportunity.max_mev_tip = None; // expected_profit 2.0 / 10 = 0.2 SOL
        assert_eq!(compute_tip_lamports(&estimate, &opportunity), 200_000_000);
    }

    #[test]
    fn test_tip_multiplier_without_aoi() {
        // AOI 부재 시 0.75배
        let estimate = TipEstimate { min: 1_000, median: 8_000, p75: 12_000, p95: 30_000, recommended: 10_000 };
        let mut opportunity = solana_opportunity();
        opportunity.aoi_score = None;
        assert_eq!(compute_tip_lamports(&estimate, &opportunity), 7_500);
    }

    #[test]
    fn test_availability_requires_configured_endpoint() {
        let mut raw_config = crate::config::Config::load_test_config();
        raw_config.jito.block_engine_url = None;
        let gateway = Arc::new(ChainGateway::from_config(&raw_config.nodes).unwrap());
        let coordinator = MevCoordinator::new(Arc::new(raw_config), gateway).unwrap();

        let opportunity = solana_opportunity();
        assert!(!coordinator.available_for(&opportunity));

        let mut evm = solana_opportunity();
        evm.chain_name = "ethereum".to_string();
        assert!(coordinator.available_for(&evm));
    }
}
