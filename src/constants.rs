use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Aave v3 플래시론 수수료 (9 bps)
pub const FLASH_LOAN_FEE_RATE: Decimal = dec!(0.0009);

/// 영수증 폴링 주기 (초)
pub const RECEIPT_POLL_INTERVAL_SECS: u64 = 2;
/// 영수증 폴링 최대 시도 횟수 (2초 × 60 = 약 2분)
pub const RECEIPT_POLL_MAX_ATTEMPTS: u32 = 60;

/// EVM 번들 상태 폴링 주기 (ms)
pub const EVM_BUNDLE_POLL_INTERVAL_MS: u64 = 1_000;
/// EVM 번들 포함 대기 데드라인 (초)
pub const EVM_BUNDLE_DEADLINE_SECS: u64 = 60;

/// Solana 번들 상태 폴링 주기 (ms)
pub const SOLANA_BUNDLE_POLL_INTERVAL_MS: u64 = 500;
/// Solana 번들 포함 대기 데드라인 (초)
pub const SOLANA_BUNDLE_DEADLINE_SECS: u64 = 30;

/// 외부 HTTP / RPC 호출 타임아웃 (초)
pub const HTTP_TIMEOUT_SECS: u64 = 15;

/// NATS 재연결 대기 시간 (초)
pub const NATS_RECONNECT_DELAY_SECS: u64 = 2;

/// 동시 파이프라인 실행 기본 상한
pub const DEFAULT_MAX_CONCURRENT_RUNS: usize = 64;

/// 결과 발행 서브젝트 프리픽스: flashloan.result.{chain}
pub const RESULT_SUBJECT_PREFIX: &str = "flashloan.result.";
/// 상태 업데이트 서브젝트 프리픽스: flashloan.status.{opportunity_id}
pub const STATUS_SUBJECT_PREFIX: &str = "flashloan.status.";
/// 번들 결과 서브젝트 프리픽스: mev.bundle.result.{provider}
pub const BUNDLE_RESULT_SUBJECT_PREFIX: &str = "mev.bundle.result.";
/// ML 학습 피드 서브젝트
pub const TRAINING_SUBJECT: &str = "mloptimizer.training.flashloan";

/// wei 소수 자릿수 (10^18)
pub const WEI_DECIMALS: u32 = 18;
/// lamports per SOL (10^9)
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// AOI 점수가 없을 때 사용하는 팁 배수 (0.5 + 0.5 * 0.5)
pub const DEFAULT_TIP_MULTIPLIER: f64 = 0.75;

/// 팁 추정치를 가져오지 못했을 때의 보수적 기본값 (lamports)
pub const FALLBACK_TIP_MIN_LAMPORTS: u64 = 1_000;
pub const FALLBACK_TIP_RECOMMENDED_LAMPORTS: u64 = 10_000;
