//! Clip-level watermark detection.

use crate::error::Result;
use crate::model::InferenceSession;
use crate::segment;

/// Clip-level detection result.
#[derive(Debug, Clone, Copy)]
pub struct Detection {
    /// Mean of the per-window presence probabilities, in `[0, 1]`.
    pub probability: f32,
    pub is_watermarked: bool,
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Score a mono waveform for watermark presence.
///
/// The clip is split into one-second windows; each window's presence logit
/// passes through a logistic transform and the probabilities are averaged
/// with equal weight, padded windows included. An empty clip evaluates one
/// fully padded window and still yields a valid probability.
pub fn detect(session: &InferenceSession, wave: &[f32], threshold: f32) -> Result<Detection> {
    let (segments, _pad) = segment::split(wave, session.window_len());

    let mut sum = 0.0f64;
    for seg in &segments {
        let scores = session.score(seg)?;
        sum += f64::from(sigmoid(scores.presence_logit));
    }
    let probability = (sum / segments.len() as f64) as f32;

    Ok(Detection {
        probability,
        is_watermarked: probability >= threshold,
    })
}
