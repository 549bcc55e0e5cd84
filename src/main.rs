use std::env;
use std::sync::Arc;

use anyhow::Result;
use clap::{Arg, Command};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use magnus_executor::config::Config;
use magnus_executor::core::ExecutorCore;
use magnus_executor::mocks;
use magnus_executor::monitoring::MonitoringManager;

#[tokio::main]
async fn main() -> Result<()> {
    // .env 파일이 없어도 무방 - 시스템 환경 변수 사용
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("Could not load .env file: {}", e);
    }

    let matches = Command::new("magnus-executor")
        .version("0.3.0")
        .author("Magnus Team <team@magnus.trade>")
        .about("플래시론 아비트래지 실행기 - 기회 파이프라인 + MEV 번들 라우팅")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("설정 파일 경로")
                .default_value("config/executor.json"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("로그 레벨 (trace, debug, info, warn, error)")
                .default_value("info"),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("판정까지만 수행하고 트랜잭션/번들을 제출하지 않음")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    // 로깅 초기화
    let log_level = matches.get_one::<String>("log-level").unwrap();
    let log_filter = match log_level.as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    print_banner();

    // 설정 로드
    let config_path = matches.get_one::<String>("config").unwrap();
    info!("📋 설정 파일 로드 중: {}", config_path);
    let mut config = Config::load(config_path).await?;

    if matches.get_flag("dry-run") {
        warn!("🧪 dry run 모드 활성화 - 트랜잭션/번들을 제출하지 않습니다");
        config.runtime.dry_run = true;
    }

    if mocks::is_mock_mode() {
        warn!("🎭 Mock 모드 (API_MODE=mock) - 외부 오라클 대신 고정 응답을 사용합니다");
    }

    // 환경 변수에서 민감한 정보 로드
    load_environment_variables(&mut config);

    // 설정 검증 - 실행기 개인키 누락은 여기서 치명적으로 끝난다
    if let Err(e) = config.validate() {
        error!("설정 검증 실패: {}", e);
        std::process::exit(1);
    }
    info!("설정 로드 완료 ({}개 체인, 구독: {})", config.nodes.len(), config.nats.opportunity_subject);

    let config = Arc::new(config);

    // 코어 초기화
    let core = Arc::new(ExecutorCore::new(Arc::clone(&config)).await?);

    // 메트릭 서버 시작 (백그라운드)
    let monitoring = MonitoringManager::new(Arc::clone(&config), core.stats());
    monitoring.start().await?;

    // 종료 신호 처리
    let shutdown_core = Arc::clone(&core);
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                warn!("종료 신호 수신됨, 안전하게 종료 중...");
                shutdown_core.shutdown();
            }
            Err(err) => {
                error!("신호 처리 오류: {}", err);
                std::process::exit(1);
            }
        }
    });

    // 주기적 상태 로그
    let stats = core.stats();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            let snapshot = stats.snapshot().await;
            info!("실행기 상태:");
            info!("  수신된 기회: {}", snapshot.opportunities_received);
            info!("  발행된 결과: {}", snapshot.results_published);
            info!("  확정: {} / 거부: {} / 실패: {} / 타임아웃: {}",
                  snapshot.confirmed, snapshot.rejected, snapshot.failed, snapshot.timed_out);
            info!("  누적 순수익: ${}", snapshot.total_net_profit_usd);
            info!("  평균 전체 지연: {:.1}ms, 평균 시뮬레이션 지연: {:.1}ms",
                  snapshot.avg_total_latency_ms, snapshot.avg_simulation_latency_ms);
            info!("  ⏱가동 시간: {}초", stats.uptime_seconds());
        }
    });

    info!("🚀 실행기가 성공적으로 시작되었습니다!");
    core.run().await?;

    info!("실행기가 안전하게 종료되었습니다.");
    Ok(())
}

fn print_banner() {
    println!(
        r#"
    ╔══════════════════════════════════════════════════════════════╗
    ║                                                              ║
    ║  Magnus Flash-Loan Executor v0.3.0                           ║
    ║                                                              ║
    ║  기회 파이프라인:                                            ║
    ║     수신 → 가스 입찰 → 시뮬레이션 → 판정                     ║
    ║     → (표준 제출 | MEV 번들) → 포함 대기 → 결과 발행         ║
    ║                                                              ║
    ║  안전 장치:                                                  ║
    ║     • 시뮬레이션 게이트 (수익 없이는 제출 없음)              ║
    ║     • 데드라인 강제                                          ║
    ║     • dry run 모드                                           ║
    ║                                                              ║
    ╚══════════════════════════════════════════════════════════════╝
    "#
    );
}

fn load_environment_variables(config: &mut Config) {
    if let Ok(private_key) = env::var("EXECUTOR_PRIVATE_KEY") {
        config.executor_wallet.private_key = private_key;
        info!("🔑 실행기 개인키를 환경 변수에서 로드했습니다");
    }

    if let Ok(nats_url) = env::var("NATS_URL") {
        config.nats.url = nats_url;
        info!("🚌 NATS URL을 환경 변수에서 로드했습니다");
    }

    if let Ok(oracle_url) = env::var("ML_OPTIMIZER_URL") {
        config.ml_optimizer.base_url = oracle_url;
        info!("⛽ 가스 오라클 URL을 환경 변수에서 로드했습니다");
    }

    if let Ok(jito_url) = env::var("JITO_BLOCK_ENGINE_URL") {
        config.jito.block_engine_url = Some(jito_url);
        info!("⚡ Jito 블록 엔진 URL을 환경 변수에서 로드했습니다");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_display() {
        // 배너 출력이 패닉 없이 실행되는지 확인
        print_banner();
    }

    #[test]
    fn test_cli_argument_parsing() {
        let args = vec![
            "magnus-executor",
            "--config",
            "test_config.json",
            "--log-level",
            "debug",
            "--dry-run",
        ];

        let matches = Command::new("magnus-executor")
            .arg(Arg::new("config").long("config").value_name("FILE").default_value("config/executor.json"))
            .arg(Arg::new("log-level").long("log-level").value_name("LEVEL").default_value("info"))
            .arg(Arg::new("dry-run").long("dry-run").action(clap::ArgAction::SetTrue))
            .try_get_matches_from(args)
            .unwrap();

        assert_eq!(matches.get_one::<String>("config").unwrap(), "test_config.json");
        assert_eq!(matches.get_one::<String>("log-level").unwrap(), "debug");
        assert!(matches.get_flag("dry-run"));
    }

    #[test]
    fn test_env_override_private_key() {
        let mut config = Config::load_test_config();
        config.executor_wallet.private_key = String::new();

        env::set_var("EXECUTOR_PRIVATE_KEY", "0x00000000000000000000000000000000000000000000000000000000000000aa");
        load_environment_variables(&mut config);
        env::remove_var("EXECUTOR_PRIVATE_KEY");

        assert!(config.executor_wallet.private_key.ends_with("aa"));
        assert!(config.validate().is_ok());
    }
}
