use memory_relay::api::{build_router, AppState};
use memory_relay::logging::init_tracing;
use memory_relay::{Config, RelayService};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config_path =
        std::env::var("RELAY_CONFIG").unwrap_or_else(|_| "config/relay.toml".to_string());
    let config = Config::load(&config_path)?;
    init_tracing(&config.logging)?;

    let relay = RelayService::from_config(&config)?;
    let app = build_router(
        AppState {
            relay: Arc::new(relay),
        },
        &config.server,
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("memory-relay listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("memory-relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
