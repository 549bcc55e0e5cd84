use std::sync::OnceLock;
use std::time::Instant;

use chrono::Utc;

static PROCESS_START: OnceLock<Instant> = OnceLock::new();

/// 프로세스 기준 단조 나노초 타임스탬프
///
/// 파이프라인 타이밍(received/sim_started/...)에 사용한다. 벽시계가 아니라
/// 절대값 자체는 의미 없고 차이만 의미가 있다.
pub fn monotonic_nanos() -> u64 {
    PROCESS_START.get_or_init(Instant::now).elapsed().as_nanos() as u64
}

/// Get current timestamp
pub fn current_timestamp() -> u64 {
    Utc::now().timestamp() as u64
}

/// 나노초 구간을 밀리초로 환산
pub fn nanos_to_millis(start_nanos: u64, end_nanos: u64) -> f64 {
    end_nanos.saturating_sub(start_nanos) as f64 / 1e6
}
