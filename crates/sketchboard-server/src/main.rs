use sketchboard_server::{AppState, RelayConfig, RelayError, router};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), RelayError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sketchboard_server=info,tower_http=info".into()),
        )
        .init();

    let config = RelayConfig::from_env()?;
    let state = Arc::new(AppState::new(&config));

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!("Sketchboard relay server listening on {}", listener.local_addr()?);
    info!("WebSocket endpoint: ws://{}/ws", config.addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}
