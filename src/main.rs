use anyhow::Context;
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cinema_booking::{
    config::{Config, LogFormat},
    router, AppState,
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("invalid configuration")?;

    let registry = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.app.rust_log));
    match config.app.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    info!(environment = %config.app.environment, "Starting Cinema Booking API");

    let state = AppState::connect(&config).await?;
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.app.host, config.app.port)
        .parse()
        .context("HOST/PORT do not form a socket address")?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {:?}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
