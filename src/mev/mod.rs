pub mod coordinator;
pub mod jito;
pub mod suave;

pub use coordinator::{compute_tip_lamports, default_provider_for_chain, MevCoordinator};

/// 번들 포함 대기 결과 (제공자 공통)
#[derive(Debug, Clone, PartialEq)]
pub struct InclusionOutcome {
    pub landed: bool,
    pub block_number: Option<u64>,
    pub reason: Option<String>,
}

impl InclusionOutcome {
    pub fn landed(block_number: Option<u64>) -> Self {
        Self { landed: true, block_number, reason: None }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self { landed: false, block_number: None, reason: Some(reason.into()) }
    }

    /// 데드라인까지 포함이 확인되지 않음. 온체인 실패가 아니라 미확인이다.
    pub fn timeout() -> Self {
        Self::failed("Confirmation timeout")
    }
}
