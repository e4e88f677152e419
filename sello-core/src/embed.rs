//! Watermark embedding across an arbitrary-length waveform.

use crate::error::{Error, Result};
use crate::message::MessageSampler;
use crate::model::InferenceSession;
use crate::segment;

/// A watermarked waveform and the perturbation that produced it.
///
/// Both have exactly the length of the input waveform. The delta is kept so
/// callers can compute quality metrics; it carries no further state.
#[derive(Debug)]
pub struct EmbedOutcome {
    pub watermarked: Vec<f32>,
    pub delta: Vec<f32>,
}

/// Embed a watermark into a mono waveform at the session sample rate.
///
/// The waveform is split into one-second windows (the last one
/// zero-padded), each window receives an independently sampled message and
/// its own perturbation, and the windows are rejoined with the padding
/// trimmed. Windows are processed independently in time order; boundary
/// discontinuities between windows are an accepted property of the scheme,
/// not smoothed over.
pub fn embed(
    session: &InferenceSession,
    wave: &[f32],
    message_bits: u32,
    sampler: &mut MessageSampler,
) -> Result<EmbedOutcome> {
    if message_bits > session.message_bits() {
        return Err(Error::InvalidMessageBits {
            got: message_bits,
            max: session.message_bits(),
        });
    }

    let (segments, pad) = segment::split(wave, session.window_len());
    let messages = sampler.sample(segments.len(), message_bits)?;

    let mut marked_segments = Vec::with_capacity(segments.len());
    let mut delta_segments = Vec::with_capacity(segments.len());
    for (seg, message) in segments.iter().zip(messages) {
        let delta = session.perturb(seg, message)?;
        let marked: Vec<f32> = seg.iter().zip(&delta).map(|(s, d)| s + d).collect();
        marked_segments.push(marked);
        delta_segments.push(delta);
    }

    Ok(EmbedOutcome {
        watermarked: segment::join(&marked_segments, pad),
        delta: segment::join(&delta_segments, pad),
    })
}
