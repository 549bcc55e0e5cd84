use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tracing::info;

use crate::blockchain::{ChainGateway, ContractBindings};
use crate::builder::TransactionBuilder;
use crate::bus::{self, OpportunitySubscriber, ResultPublisher};
use crate::config::Config;
use crate::core::pipeline::OpportunityPipeline;
use crate::core::stats::ExecutionStatsTracker;
use crate::gas::GasBidder;
use crate::mev::MevCoordinator;
use crate::simulation::Simulator;

/// 실행기 코어: 컴포넌트 조립과 수명 관리
///
/// 모든 공유 상태(체인 레지스트리, 바인딩 테이블, 서명 키, 버스 연결)는
/// 여기서 한 번 만들어지고 이후 읽기 전용으로 런들에 공유된다.
pub struct ExecutorCore {
    subscriber: OpportunitySubscriber,
    stats: Arc<ExecutionStatsTracker>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl ExecutorCore {
    pub async fn new(config: Arc<Config>) -> Result<Self> {
        info!("🔧 ExecutorCore 초기화 중...");

        let client = bus::connect(&config.nats).await?;

        let gateway = Arc::new(ChainGateway::from_config(&config.nodes)?);
        let bindings = Arc::new(ContractBindings::from_config(&config.smart_contracts)?);

        let builder = TransactionBuilder::new(Arc::clone(&gateway), &config.executor_wallet.private_key)?;
        let executor_address = builder.executor_address();

        let gas_bidder = GasBidder::new(Arc::clone(&config))?;
        let simulator = Simulator::new(Arc::clone(&gateway), bindings, Some(executor_address));
        let mev = MevCoordinator::new(Arc::clone(&config), Arc::clone(&gateway))?;

        let publisher = Arc::new(ResultPublisher::new(
            client.clone(),
            config.nats.use_jet_stream,
            config.nats.result_subject.clone(),
        ));
        let stats = Arc::new(ExecutionStatsTracker::new());

        let pipeline = Arc::new(OpportunityPipeline::new(
            Arc::clone(&config),
            gateway,
            gas_bidder,
            simulator,
            builder,
            mev,
            publisher,
            Arc::clone(&stats),
        ));

        let subscriber = OpportunitySubscriber::new(client, Arc::clone(&config), pipeline);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!("✅ ExecutorCore 초기화 완료");
        Ok(Self { subscriber, stats, shutdown_tx, shutdown_rx })
    }

    pub fn stats(&self) -> Arc<ExecutionStatsTracker> {
        Arc::clone(&self.stats)
    }

    /// 종료 신호까지 구독 루프를 돈다
    pub async fn run(&self) -> Result<()> {
        self.subscriber.run(self.shutdown_rx.clone()).await
    }

    /// 프로세스 전역 종료 신호. 인테이크를 멈추고 인플라이트 런은
    /// 끝까지 돌게 둔다.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}
