pub mod batch;
pub mod carrier;
pub mod detect;
pub mod embed;
pub mod error;
pub mod key;
pub mod message;
pub mod metrics;
pub mod model;
pub mod segment;
pub mod spectrum;
pub mod weights;

#[cfg(feature = "parallel")]
pub mod parallel;

// Re-export primary API types
pub use detect::Detection;
pub use embed::EmbedOutcome;
pub use error::Error;
pub use message::{Message, MessageSampler};
pub use model::{Detector, Generator, InferenceSession, SegmentScores};
pub use weights::WeightArtifact;

#[cfg(feature = "parallel")]
pub use parallel::{detect_batch_parallel, embed_batch_parallel};

/// Embed a watermark into a mono waveform at the session sample rate.
///
/// One independently sampled message per one-second window; the output has
/// exactly the input length. This is the one-shot API for single clips —
/// for many clips, see [`batch`].
pub fn embed(
    session: &InferenceSession,
    wave: &[f32],
    message_bits: u32,
    sampler: &mut MessageSampler,
) -> error::Result<EmbedOutcome> {
    embed::embed(session, wave, message_bits, sampler)
}

/// Score a mono waveform for watermark presence against a caller-supplied
/// threshold.
pub fn detect(
    session: &InferenceSession,
    wave: &[f32],
    threshold: f32,
) -> error::Result<Detection> {
    detect::detect(session, wave, threshold)
}
