use thiserror::Error;

/// 실행기 오류 분류
///
/// 파이프라인이 구분해야 하는 실패 클래스만 여기에 둔다. 리버트는
/// 전송 오류와 달리 "사업적으로 부정적인 결과"이며 재시도 대상이 아니다.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("설정 오류: {0}")]
    Config(String),

    /// 네트워크 I/O, 타임아웃 등 전송 계층 실패
    #[error("전송 오류: {0}")]
    Transport(String),

    /// 정상 전송되었으나 응답이 규약에 어긋남 (non-2xx, malformed)
    #[error("프로토콜 오류: {0}")]
    Protocol(String),

    /// 온체인 실행 리버트 (시뮬레이션 또는 실제)
    #[error("execution reverted: {}", reason.as_deref().unwrap_or("unknown"))]
    Revert { reason: Option<String> },

    /// 가스 입찰 오라클 실패 - 해당 기회에 대해 치명적
    #[error("가스 입찰 실패: {0}")]
    GasBid(String),

    /// 정책 거부: 수익성 부족, 데드라인 초과, 바인딩 누락 등
    #[error("{0}")]
    Policy(String),

    /// 버스가 끊겨 발행을 보장할 수 없는 상태
    #[error("전달 보장 불가: {0}")]
    Delivery(String),
}

impl ExecutorError {
    pub fn revert(reason: impl Into<Option<String>>) -> Self {
        ExecutorError::Revert { reason: reason.into() }
    }

    /// 정책 거부 여부 (Rejected 터미널로 매핑)
    pub fn is_policy(&self) -> bool {
        matches!(self, ExecutorError::Policy(_))
    }

    pub fn is_revert(&self) -> bool {
        matches!(self, ExecutorError::Revert { .. })
    }
}

pub type ExecutorResult<T> = Result<T, ExecutorError>;
