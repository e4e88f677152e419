//! sello HTTP server: embed and detect audio watermarks over multipart
//! uploads.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

mod api;
mod artifacts;
mod audio;
mod error;
mod models;
mod settings;

use sello_core::{InferenceSession, WeightArtifact};

pub struct AppState {
    pub session: InferenceSession,
    pub settings: settings::Settings,
    pub store: artifacts::ArtifactStore,
    pub decoder: audio::SymphoniaDecoder,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = settings::Settings::load().context("loading settings")?;

    // Model weights are fatal at startup: no session, no requests
    let artifact =
        WeightArtifact::load(&settings.weights).context("loading watermark weights")?;
    anyhow::ensure!(
        artifact.sample_rate == settings.sample_rate,
        "weight artifact sample rate {} does not match configured rate {}",
        artifact.sample_rate,
        settings.sample_rate
    );
    let session = InferenceSession::from_artifact(&artifact);
    tracing::info!(
        weights = %settings.weights.display(),
        sample_rate = session.sample_rate(),
        message_bits = session.message_bits(),
        "inference session ready"
    );

    let store = artifacts::ArtifactStore::new(Duration::from_secs(settings.retention_secs))
        .context("creating artifact store")?;
    store.spawn_sweeper();

    let decoder = audio::SymphoniaDecoder::new(session.sample_rate());
    let bind_addr = settings.bind_addr.clone();
    let state = Arc::new(AppState {
        session,
        settings,
        store,
        decoder,
    });

    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "sello server listening");
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
