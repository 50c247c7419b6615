use anyhow::Result;
use keybucket_server::config::Config;
use keybucket_server::limiter::Limiter;
use keybucket_server::transport::http::{AppState, HttpTransport};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse configuration from environment variables and CLI arguments
    let config = Config::from_env_and_args()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("keybucket={}", config.log_level).parse()?)
                .add_directive(format!("keybucket_server={}", config.log_level).parse()?),
        )
        .init();

    let limiter = Limiter::from_config(&config.limiter)?;

    tracing::info!(
        "keybucket server started with backend: {:?}",
        limiter.backend()
    );
    tracing::info!(
        "Bucket capacity: {}, refill interval: {:?}, eviction interval: {}s",
        limiter.capacity(),
        limiter.refill_interval(),
        config.limiter.eviction_interval
    );

    let state = Arc::new(AppState::new(limiter, config.max_key_len));
    let transport = HttpTransport::new(&config.http.host, config.http.port)?;
    transport.start(state).await
}
