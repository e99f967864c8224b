use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use severity_relay::config::RelayConfig;
use severity_relay::gateway::PredictionGateway;
use severity_relay::server::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = RelayConfig::from_env()?;
    let gateway = PredictionGateway::new(&cfg)?;
    tracing::info!(
        "forwarding predictions to {} (timeout {} ms)",
        gateway.url(),
        cfg.timeout_ms
    );

    let state = AppState {
        gateway: Arc::new(gateway),
    };
    let app = router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], cfg.listen_port));
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
