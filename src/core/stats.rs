use std::time::Instant;

use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::types::{ExecutionResult, PipelineState};

/// 실행 통계 스냅샷 (/metrics 응답 본문)
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionStats {
    pub opportunities_received: u64,
    pub results_published: u64,
    pub confirmed: u64,
    pub rejected: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub total_net_profit_usd: Decimal,
    pub avg_total_latency_ms: f64,
    pub avg_simulation_latency_ms: f64,
}

/// 런 결과를 집계하는 트래커. 파이프라인 전 런이 공유한다.
pub struct ExecutionStatsTracker {
    started_at: Instant,
    inner: RwLock<ExecutionStats>,
}

impl ExecutionStatsTracker {
    pub fn new() -> Self {
        Self { started_at: Instant::now(), inner: RwLock::new(ExecutionStats::default()) }
    }

    pub async fn record_received(&self) {
        self.inner.write().await.opportunities_received += 1;
    }

    pub async fn record_result(&self, result: &ExecutionResult) {
        let mut stats = self.inner.write().await;
        stats.results_published += 1;

        match result.final_state {
            PipelineState::Confirmed => {
                stats.confirmed += 1;
                if let Some(net) = result.estimated_profit_usd {
                    stats.total_net_profit_usd += net;
                }
            }
            PipelineState::Rejected => stats.rejected += 1,
            PipelineState::TimedOut => stats.timed_out += 1,
            _ => stats.failed += 1,
        }

        let count = stats.results_published as f64;
        if let Some(total) = result.timing.total_latency_ms() {
            stats.avg_total_latency_ms = (stats.avg_total_latency_ms * (count - 1.0) + total) / count;
        }
        if let Some(sim) = result.timing.simulation_latency_ms() {
            stats.avg_simulation_latency_ms = (stats.avg_simulation_latency_ms * (count - 1.0) + sim) / count;
        }
    }

    pub async fn snapshot(&self) -> ExecutionStats {
        self.inner.read().await.clone()
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

impl Default for ExecutionStatsTracker {
    fn default() -> Self {
        Self::new()
    }
}
