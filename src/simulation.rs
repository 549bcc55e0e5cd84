use std::sync::Arc;

use ethers::types::{H160, U256 as EthersU256};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::blockchain::{encode_strategy_call, ChainGateway, ContractBindings, EncodedCall};
use crate::common::formatting::gwei_to_wei;
use crate::constants::FLASH_LOAN_FEE_RATE;
use crate::errors::{ExecutorError, ExecutorResult};
use crate::types::{CostBreakdown, GasBid, Opportunity, SimulationOutcome};

/// 시뮬레이션 보고서: 결과 + 제출 시 재사용할 인코딩된 호출
///
/// 제출은 시뮬레이션과 동일한 call data와 가스 파라미터를 써야 하므로
/// 인코딩을 여기서 한 번만 하고 파이프라인이 빌더로 넘긴다.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub outcome: SimulationOutcome,
    pub call: EncodedCall,
}

/// 기회가 온체인에서 성공하고 수익이 남는지 판정 (C3)
pub struct Simulator {
    gateway: Arc<ChainGateway>,
    bindings: Arc<ContractBindings>,
    /// eth_call의 from 주소 (실행기 지갑)
    executor_address: Option<H160>,
}

impl Simulator {
    pub fn new(
        gateway: Arc<ChainGateway>,
        bindings: Arc<ContractBindings>,
        executor_address: Option<H160>,
    ) -> Self {
        Self { gateway, bindings, executor_address }
    }

    /// 읽기 전용 체인 시뮬레이션 + 순수익 계산
    ///
    /// 리버트는 실패가 아니라 부정적 판정이다: feasible=false로 돌아온다.
    /// 전송 오류만 Err로 전파된다.
    pub async fn simulate(&self, opportunity: &Opportunity, bid: &GasBid) -> ExecutorResult<SimulationReport> {
        let binding = self.bindings.get(&opportunity.chain_name).ok_or_else(|| {
            ExecutorError::Policy(format!("체인 {}에 컨트랙트 바인딩이 없습니다", opportunity.chain_name))
        })?;

        let call = encode_strategy_call(binding, opportunity)?;
        let costs = self.cost_breakdown(opportunity, bid);

        let chain = self.gateway.chain(&opportunity.chain_name)?;
        let gas_price_wei =
            gwei_to_wei(bid.gas_price_gwei).map_err(|e| ExecutorError::Protocol(e.to_string()))?;

        debug!(
            "🔬 {} 시뮬레이션: {} ({} bytes, gas {} @ {} gwei)",
            opportunity.id,
            call.function_name,
            call.call_data.len(),
            bid.gas_limit,
            bid.gas_price_gwei
        );

        let output = match self
            .gateway
            .simulate_call(
                &chain,
                call.to,
                call.call_data.clone(),
                EthersU256::from(bid.gas_limit),
                gas_price_wei,
                self.executor_address,
            )
            .await
        {
            Ok(output) => output,
            Err(ExecutorError::Revert { reason }) => {
                info!("🚫 {} 시뮬레이션 리버트: {:?}", opportunity.id, reason);
                return Ok(SimulationReport {
                    outcome: SimulationOutcome::infeasible(costs, reason),
                    call,
                });
            }
            Err(other) => return Err(other),
        };

        // eth_call이 성공해도 반환값이 출력 타입으로 파싱되지 않으면
        // 리버트와 동일하게 취급한다
        if let Err(e) = binding.decode_profit(call.function_name, &output) {
            warn!("⚠️ {} 시뮬레이션 반환값 파싱 불가: {}", opportunity.id, e);
            return Ok(SimulationReport {
                outcome: SimulationOutcome::infeasible(costs, Some(e.to_string())),
                call,
            });
        }

        let net = net_profit(opportunity.expected_profit, &costs);
        let outcome = SimulationOutcome {
            feasible: net > Decimal::ZERO,
            estimated_net_profit_usd: net,
            costs,
            revert_reason: None,
        };

        info!(
            "📊 {} 시뮬레이션 완료: net=${} (expected ${} - gas ${} - fee ${})",
            opportunity.id,
            net,
            opportunity.expected_profit,
            outcome.costs.gas_usd,
            outcome.costs.flash_loan_fee_usd
        );
        Ok(SimulationReport { outcome, call })
    }

    fn cost_breakdown(&self, opportunity: &Opportunity, bid: &GasBid) -> CostBreakdown {
        CostBreakdown {
            gas_usd: bid.estimated_cost_usd,
            flash_loan_fee_usd: flash_loan_fee(opportunity.amount),
        }
    }
}

/// 플래시론 수수료: amount × 9bps
pub fn flash_loan_fee(amount: Decimal) -> Decimal {
    amount * FLASH_LOAN_FEE_RATE
}

/// 순수익 = 기대 수익 − 가스 비용 − 플래시론 수수료
pub fn net_profit(expected_profit: Decimal, costs: &CostBreakdown) -> Decimal {
    expected_profit - costs.gas_usd - costs.flash_loan_fee_usd
}
