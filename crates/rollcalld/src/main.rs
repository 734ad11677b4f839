//! rollcalld: face-recognition attendance daemon.
//!
//! Serves the recognition, checkout, and live-location HTTP API backed
//! by an ONNX face encoder and a SQLite document store.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod config;
mod directory;
mod error;
mod geocode;
mod http;
mod pipeline;
mod scan;
mod store;

use config::Config;
use geocode::PlaceResolver;
use rollcall_core::encoder::{FaceEncoder, OnnxFaceEncoder};
use scan::ScanRegistry;
use store::DocumentStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();
    tracing::info!(
        bind_addr = %config.bind_addr,
        db_path = %config.db_path.display(),
        model = %config.encoder_model_path,
        "rollcalld starting"
    );

    let store = DocumentStore::open(&config.db_path)
        .await
        .context("opening document store")?;

    let encoder: Arc<dyn FaceEncoder> = Arc::new(
        OnnxFaceEncoder::load(&config.encoder_model_path).context("loading face encoder model")?,
    );

    let places = PlaceResolver::new(
        config.geocode_base_url.clone(),
        Duration::from_secs(config.geocode_timeout_secs),
    )
    .context("building geocode client")?;

    let scans = Arc::new(ScanRegistry::new(
        config.scan_command.clone(),
        Duration::from_secs(config.scan_ttl_secs),
    ));

    let bind_addr = config.bind_addr;
    let state = Arc::new(http::AppState {
        config,
        store,
        encoder,
        places,
        scans,
    });
    let app = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    tracing::info!("rollcalld ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("rollcalld shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install ctrl-c handler");
    }
}
