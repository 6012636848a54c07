use std::sync::Arc;
use std::time::Instant;

use tokio::signal;
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod error;
mod janitor;
mod store;
mod tts;

use api::routes::{create_router, AppState};
use config::Config;
use janitor::{Janitor, FILE_TTL};
use store::AudioStore;
use tts::TtsService;

#[tokio::main]
async fn main() {
    let started_at = Instant::now();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().expect("Invalid configuration");
    let addr = config.listen_addr().expect("Invalid address");

    tracing::info!("ElevenLabs Proxy v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Starting server on http://{}", addr);
    tracing::info!("Public base URL: {}", config.public_base_url);
    tracing::info!("Audio directory: {}", config.audio_dir.display());

    // File store and its janitor
    let store = AudioStore::open(&config.audio_dir)
        .await
        .expect("Failed to create audio directory");
    let janitor = Janitor::new(store.dir(), FILE_TTL).spawn();

    let tts = TtsService::new(&config, store.clone()).expect("Failed to create TTS service");

    let state = Arc::new(AppState {
        tts,
        store,
        started_at,
    });

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Endpoints:");
    tracing::info!("  POST {}/v1/text-to-speech/:voice_id", config.public_base_url);
    tracing::info!("  GET  {}/v1/voices", config.public_base_url);
    tracing::info!("  GET  {}/health", config.public_base_url);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    janitor.abort();
    tracing::info!("Server stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
