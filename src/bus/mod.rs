use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::NatsConfig;
use crate::constants::NATS_RECONNECT_DELAY_SECS;

pub mod publisher;
pub mod subscriber;

pub use publisher::ResultPublisher;
pub use subscriber::OpportunitySubscriber;

/// 장수명 NATS 연결 생성
///
/// 연결은 프로세스당 하나이며 끊기면 2초 간격으로 영원히 재연결한다.
/// 재연결 동안의 발행은 publisher 쪽에서 드롭-로그 처리된다.
pub async fn connect(config: &NatsConfig) -> Result<async_nats::Client> {
    let mut options = async_nats::ConnectOptions::new()
        .retry_on_initial_connect()
        .reconnect_delay_callback(|_attempts| Duration::from_secs(NATS_RECONNECT_DELAY_SECS));

    if let (Some(user), Some(password)) = (&config.user, &config.password) {
        options = options.user_and_password(user.clone(), password.clone());
    }
    if config.use_tls {
        options = options.require_tls(true);
    }

    let client = options
        .connect(&config.url)
        .await
        .with_context(|| format!("NATS 연결 실패: {}", config.url))?;
    info!("🚌 NATS 연결됨: {}", config.url);
    Ok(client)
}
