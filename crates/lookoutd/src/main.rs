use anyhow::Result;
use lookout_core::OnnxAnalyzer;
use lookout_store::{FaceCache, FaceStore};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod config;
mod engine;
mod http;
mod recognition;
mod registry;

use config::Config;
use http::AppState;
use recognition::FrameRecognizer;
use registry::RegistrationService;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("lookoutd starting");

    let config = Config::from_env();

    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = FaceStore::new(&config.db_path);
    store.initialize()?;

    let cache = Arc::new(FaceCache::new());
    let count = cache.reload(&store)?;
    tracing::info!(count, db = %config.db_path.display(), "watch list loaded");

    // Fail fast if either model is missing or malformed.
    let analyzer = OnnxAnalyzer::load(
        &config.detector_model_path(),
        &config.encoder_model_path(),
    )?;
    let engine = engine::spawn_engine(analyzer);

    let registry = RegistrationService::new(
        store.clone(),
        cache.clone(),
        engine.clone(),
        config.max_registered,
    );
    let recognizer = FrameRecognizer::new(
        cache.clone(),
        engine,
        config.tolerance,
        config.frame_scale,
        Duration::from_millis(config.frame_timeout_ms),
    );

    let state = Arc::new(AppState {
        store,
        cache,
        registry,
        recognizer,
    });

    let app = http::router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "lookoutd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("lookoutd shutting down");
}
