//! Injected watermark capabilities and the process-wide inference session.
//!
//! The pipeline treats the generator and detector as black boxes with a
//! fixed per-window contract. A [`InferenceSession`] is constructed once at
//! startup, is immutable afterwards, and is passed by reference into every
//! embed and detect call.

use std::path::Path;

use crate::carrier::{CarrierDetector, CarrierGenerator};
use crate::error::{Error, Result};
use crate::message::Message;
use crate::weights::WeightArtifact;

/// Per-window detector output.
///
/// `bit_logits` is empty when the capability carries no payload channels
/// (`message_bits == 0`).
#[derive(Debug, Clone)]
pub struct SegmentScores {
    pub presence_logit: f32,
    pub bit_logits: Vec<f32>,
}

/// Computes the additive perturbation that embeds a message into one window.
///
/// Fixed-length in, same-length out; deterministic given frozen weights and
/// the message. Implementations hold no per-call state.
pub trait Generator: Send + Sync {
    fn perturb(&self, segment: &[f32], message: Message) -> Result<Vec<f32>>;
}

/// Scores one window for watermark presence (and payload bits, if any).
pub trait Detector: Send + Sync {
    fn score(&self, segment: &[f32]) -> Result<SegmentScores>;
}

/// Immutable handle over a loaded generator/detector pair.
pub struct InferenceSession {
    generator: Box<dyn Generator>,
    detector: Box<dyn Detector>,
    sample_rate: u32,
    window_len: usize,
    message_bits: u32,
}

impl InferenceSession {
    /// Wrap already-constructed capabilities.
    ///
    /// Windows are one second of audio at `sample_rate`.
    pub fn new(
        generator: Box<dyn Generator>,
        detector: Box<dyn Detector>,
        sample_rate: u32,
        message_bits: u32,
    ) -> Self {
        Self {
            generator,
            detector,
            sample_rate,
            window_len: sample_rate as usize,
            message_bits,
        }
    }

    /// Build a session around the bundled carrier capability from a weight
    /// artifact on disk. Fails fatally when the artifact is missing or
    /// incompatible; no session means no requests are served.
    pub fn from_weights(path: &Path) -> Result<Self> {
        let artifact = WeightArtifact::load(path)?;
        Ok(Self::from_artifact(&artifact))
    }

    /// Build a session around the bundled carrier capability from an
    /// in-memory artifact.
    pub fn from_artifact(artifact: &WeightArtifact) -> Self {
        Self::new(
            Box::new(CarrierGenerator::new(artifact)),
            Box::new(CarrierDetector::new(artifact)),
            artifact.sample_rate,
            u32::from(artifact.message_bits),
        )
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Window length in samples (one second of audio).
    pub fn window_len(&self) -> usize {
        self.window_len
    }

    /// Widest message the loaded capability can carry.
    pub fn message_bits(&self) -> u32 {
        self.message_bits
    }

    /// Invoke the generator, enforcing the same-length output contract.
    pub(crate) fn perturb(&self, segment: &[f32], message: Message) -> Result<Vec<f32>> {
        let delta = self.generator.perturb(segment, message)?;
        if delta.len() != segment.len() {
            return Err(Error::SegmentLength {
                expected: segment.len(),
                got: delta.len(),
            });
        }
        Ok(delta)
    }

    pub(crate) fn score(&self, segment: &[f32]) -> Result<SegmentScores> {
        self.detector.score(segment)
    }
}
