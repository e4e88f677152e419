//! JSON response bodies.

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct EmbedResponse {
    pub download_url: String,
    /// Watermark RMS amplitude.
    pub rms: f32,
    /// Scale-invariant SNR in dB.
    pub si_snr: f32,
}

#[derive(Debug, Serialize)]
pub struct DetectResponse {
    pub probability: f32,
    pub is_watermarked: bool,
}

#[derive(Debug, Serialize)]
pub struct EmbedItem {
    pub filename: String,
    pub download_url: String,
    pub rms: f32,
    pub si_snr: f32,
}

#[derive(Debug, Serialize)]
pub struct BatchEmbedResponse {
    pub results: Vec<EmbedItem>,
    /// One archive bundling every successfully watermarked file.
    pub zip_download_url: String,
}

#[derive(Debug, Serialize)]
pub struct DetectItem {
    pub filename: String,
    pub probability: f32,
    pub is_watermarked: bool,
}

#[derive(Debug, Serialize)]
pub struct BatchDetectResponse {
    pub results: Vec<DetectItem>,
}
