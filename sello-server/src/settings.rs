//! Process configuration, read once at startup.
//!
//! An optional TOML file (path from `SELLO_CONFIG`, default `sello.toml`)
//! provides the base values; individual environment variables override it.

use std::env;
use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    /// Weight artifact for the watermark capability.
    pub weights: PathBuf,
    /// Canonical processing sample rate; must match the weight artifact.
    pub sample_rate: u32,
    /// Default message width for embedding.
    pub message_bits: u32,
    /// Default detection threshold.
    pub threshold: f32,
    /// How long produced artifacts stay downloadable, in seconds.
    pub retention_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".into(),
            weights: PathBuf::from("weights/sello.wm"),
            sample_rate: 16_000,
            message_bits: 16,
            threshold: 0.5,
            retention_secs: 600,
        }
    }
}

impl Settings {
    pub fn load() -> anyhow::Result<Self> {
        let path = env::var_os("SELLO_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("sello.toml"));

        let mut settings = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        } else {
            Settings::default()
        };

        if let Ok(v) = env::var("SELLO_BIND") {
            settings.bind_addr = v;
        }
        if let Ok(v) = env::var("SELLO_WEIGHTS") {
            settings.weights = PathBuf::from(v);
        }
        if let Ok(v) = env::var("SELLO_MESSAGE_BITS") {
            settings.message_bits = v.parse().context("SELLO_MESSAGE_BITS")?;
        }
        if let Ok(v) = env::var("SELLO_THRESHOLD") {
            settings.threshold = v.parse().context("SELLO_THRESHOLD")?;
        }
        if let Ok(v) = env::var("SELLO_RETENTION_SECS") {
            settings.retention_secs = v.parse().context("SELLO_RETENTION_SECS")?;
        }

        Ok(settings)
    }
}
