use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::{info, warn};

use streamtts_server::{build_router, AppState, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let _ = dotenv::dotenv();

    async_main().await
}

async fn async_main() -> anyhow::Result<()> {
    info!("Starting streaming TTS server...");

    let config = ServerConfig::from_env();
    let state = AppState::from_config(config.clone())?;
    info!(
        "Server configuration loaded: port={}, rate_limit={}/min, chunk_words={}..{}",
        config.port, config.rate_limit_per_minute, config.min_words, config.max_words
    );

    // Warm the default model so the first request doesn't pay for loading it
    let registry = state.registry.clone();
    let default_model = config.default_model.clone();
    let warmed = tokio::task::spawn_blocking(move || registry.warm(&default_model)).await?;
    if warmed {
        info!("Default model '{}' ready", config.default_model);
    } else {
        warn!("Default model '{}' could not be loaded; local requests for it will fail", config.default_model);
    }

    let app = build_router(state)?;

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!("Failed to bind {addr}: {e}. Try a different PORT.")
    })?;

    info!("Server listening on http://{addr} (websocket at /ws)");
    axum::serve(listener, app).await?;
    Ok(())
}
