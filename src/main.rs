use std::sync::Arc;

use anyhow::Result;
use trendbot::bot::Controller;
use trendbot::broker::BridgeClient;
use trendbot::config::Config;
use trendbot::server;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let config = Config::from_env()?;

    tracing::info!("🚀 Trend bot starting");
    tracing::info!("📊 Configuration:");
    tracing::info!("  Symbol: {}", config.symbol);
    tracing::info!("  Lot size: {}", config.lot);
    tracing::info!("  Poll interval: {:?}", config.poll_interval);
    tracing::info!("  Cooldown: {:?}", config.cooldown);
    tracing::info!("  Bridge: {}", config.bridge_url);

    let broker = BridgeClient::new(config.bridge_url.clone());
    let controller = Arc::new(Controller::new(broker, config.clone()));

    let app = server::router(controller);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("API server listening on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trendbot=info".into()),
        )
        .init();
}
