use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::info;
use tts_core::{HttpModelLoader, StyleConfig, VoiceEngine};

use server::config::ServerConfig;
use server::{build_router, cors_layer, spawn_preload, AppState};

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
    info!("Starting voice-design TTS server...");

    let config = ServerConfig::from_env();
    info!(
        "Server configuration loaded: port={}, cache_dir={}, backend={}, model={}",
        config.port,
        config.cache_dir.display(),
        config.backend_url,
        config.model.model_id
    );

    let style = StyleConfig::default();
    info!("Voice style {} ({})", style.cache_tag(), style.language);

    let loader = HttpModelLoader::new(config.backend_url.clone(), config.model.clone())
        .with_load_timeout(config.model_load_timeout());
    let engine = VoiceEngine::new(Box::new(loader), style);
    let state = AppState::new(engine, config.cache_dir.clone(), &config.model_display_name);

    if config.preload_model {
        let _ = spawn_preload(state.engine.clone());
    }

    let app = build_router(state, cors_layer(&config));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!("Failed to bind {addr}: {e}. Try a different PORT.")
    })?;

    info!("Server listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
