//! Batch orchestration: decode-and-map over many uploaded clips.
//!
//! Every item is handled independently; an unreadable or non-audio item is
//! skipped and the batch carries on. Skipping is expressed as an explicit
//! per-item outcome so the control flow is a plain mapping, not exception
//! suppression. The public result lists contain processed items only, each
//! tagged with its originating identifier — a shorter-than-submitted list
//! is itself the signal that items were dropped.

use tracing::debug;

use crate::detect;
use crate::embed;
use crate::error::{Error, Result};
use crate::message::MessageSampler;
use crate::metrics;
use crate::model::InferenceSession;

/// A raw uploaded item before decoding.
pub struct BatchInput {
    /// Originating identifier, typically the uploaded filename.
    pub name: String,
    /// Declared content type; only `audio*` items are considered.
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Decode contract the orchestrator requires from the audio collaborator.
///
/// Implementations produce canonical mono PCM at the session sample rate
/// and return [`Error::InputFormat`] for unreadable content. An empty
/// waveform is a valid decode result, not a failure.
pub trait AudioDecoder: Send + Sync {
    fn decode(&self, input: &BatchInput) -> Result<Vec<f32>>;
}

/// Why an item was left out of a batch result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NotAudio,
    Undecodable(String),
}

/// Per-item outcome of a batch step.
pub enum ItemOutcome<T> {
    Processed(T),
    Skipped { name: String, reason: SkipReason },
}

/// A successfully watermarked batch item.
#[derive(Debug)]
pub struct EmbeddedItem {
    pub name: String,
    pub watermarked: Vec<f32>,
    pub rms: f32,
    pub si_snr: f32,
}

/// A successfully scored batch item.
pub struct DetectedItem {
    pub name: String,
    pub probability: f32,
    pub is_watermarked: bool,
}

fn decode_item<D: AudioDecoder>(
    decoder: &D,
    item: &BatchInput,
) -> std::result::Result<Vec<f32>, SkipReason> {
    if !item.content_type.starts_with("audio") {
        return Err(SkipReason::NotAudio);
    }
    decoder
        .decode(item)
        .map_err(|e| SkipReason::Undecodable(e.to_string()))
}

/// Embed one batch item. Decode failures become a skip outcome; structural
/// failures (an invalid message width, a capability contract violation)
/// propagate as errors.
pub fn embed_one<D: AudioDecoder>(
    decoder: &D,
    session: &InferenceSession,
    item: &BatchInput,
    message_bits: u32,
    sampler: &mut MessageSampler,
) -> Result<ItemOutcome<EmbeddedItem>> {
    let wave = match decode_item(decoder, item) {
        Ok(wave) => wave,
        Err(reason) => {
            return Ok(ItemOutcome::Skipped {
                name: item.name.clone(),
                reason,
            });
        }
    };

    let outcome = embed::embed(session, &wave, message_bits, sampler)?;
    let rms = metrics::injected_rms(&outcome.delta);
    let si_snr = metrics::si_snr(&wave, &outcome.watermarked);
    Ok(ItemOutcome::Processed(EmbeddedItem {
        name: item.name.clone(),
        watermarked: outcome.watermarked,
        rms,
        si_snr,
    }))
}

/// Score one batch item for watermark presence.
pub fn detect_one<D: AudioDecoder>(
    decoder: &D,
    session: &InferenceSession,
    item: &BatchInput,
    threshold: f32,
) -> Result<ItemOutcome<DetectedItem>> {
    let wave = match decode_item(decoder, item) {
        Ok(wave) => wave,
        Err(reason) => {
            return Ok(ItemOutcome::Skipped {
                name: item.name.clone(),
                reason,
            });
        }
    };

    let detection = detect::detect(session, &wave, threshold)?;
    Ok(ItemOutcome::Processed(DetectedItem {
        name: item.name.clone(),
        probability: detection.probability,
        is_watermarked: detection.is_watermarked,
    }))
}

/// Embed a watermark into every decodable item of a batch.
///
/// The request shape is validated once up front; after that no single item
/// can abort the batch.
pub fn embed_batch<D: AudioDecoder>(
    decoder: &D,
    session: &InferenceSession,
    items: &[BatchInput],
    message_bits: u32,
    sampler: &mut MessageSampler,
) -> Result<Vec<EmbeddedItem>> {
    if message_bits > session.message_bits() {
        return Err(Error::InvalidMessageBits {
            got: message_bits,
            max: session.message_bits(),
        });
    }

    let mut results = Vec::with_capacity(items.len());
    for item in items {
        match embed_one(decoder, session, item, message_bits, sampler)? {
            ItemOutcome::Processed(done) => results.push(done),
            ItemOutcome::Skipped { name, reason } => {
                debug!(item = %name, ?reason, "skipping batch item");
            }
        }
    }
    Ok(results)
}

/// Score every decodable item of a batch.
pub fn detect_batch<D: AudioDecoder>(
    decoder: &D,
    session: &InferenceSession,
    items: &[BatchInput],
    threshold: f32,
) -> Result<Vec<DetectedItem>> {
    let mut results = Vec::with_capacity(items.len());
    for item in items {
        match detect_one(decoder, session, item, threshold)? {
            ItemOutcome::Processed(done) => results.push(done),
            ItemOutcome::Skipped { name, reason } => {
                debug!(item = %name, ?reason, "skipping batch item");
            }
        }
    }
    Ok(results)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{Detector, Generator, InferenceSession, SegmentScores};

    /// Decoder stub: bytes are little-endian f32 samples; the literal bytes
    /// `CORRUPT` fail to decode.
    pub(crate) struct RawF32Decoder;

    impl AudioDecoder for RawF32Decoder {
        fn decode(&self, input: &BatchInput) -> Result<Vec<f32>> {
            if input.bytes == b"CORRUPT" {
                return Err(Error::InputFormat("stub decode failure".into()));
            }
            if input.bytes.len() % 4 != 0 {
                return Err(Error::InputFormat("stub: not f32-aligned".into()));
            }
            Ok(input
                .bytes
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect())
        }
    }

    pub(crate) fn encode_raw(samples: &[f32]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    struct HalfScaleGenerator;

    impl Generator for HalfScaleGenerator {
        fn perturb(&self, segment: &[f32], _message: u64) -> Result<Vec<f32>> {
            Ok(segment.iter().map(|s| s * 0.01).collect())
        }
    }

    struct EnergyDetector;

    impl Detector for EnergyDetector {
        fn score(&self, segment: &[f32]) -> Result<SegmentScores> {
            let energy: f32 = segment.iter().map(|s| s * s).sum();
            Ok(SegmentScores {
                presence_logit: if energy > 0.0 { 4.0 } else { -4.0 },
                bit_logits: Vec::new(),
            })
        }
    }

    pub(crate) fn stub_session() -> InferenceSession {
        InferenceSession::new(Box::new(HalfScaleGenerator), Box::new(EnergyDetector), 1_000, 16)
    }

    fn valid_item(name: &str, len: usize) -> BatchInput {
        BatchInput {
            name: name.into(),
            content_type: "audio/wav".into(),
            bytes: encode_raw(&vec![0.3f32; len]),
        }
    }

    #[test]
    fn corrupt_items_are_skipped_not_fatal() {
        let session = stub_session();
        let items = vec![
            valid_item("a.wav", 1_500),
            BatchInput {
                name: "broken.wav".into(),
                content_type: "audio/wav".into(),
                bytes: b"CORRUPT".to_vec(),
            },
            valid_item("b.wav", 900),
            BatchInput {
                name: "notes.txt".into(),
                content_type: "text/plain".into(),
                bytes: b"hello".to_vec(),
            },
            valid_item("c.wav", 2_000),
        ];

        let mut sampler = MessageSampler::seeded(1);
        let embedded = embed_batch(&RawF32Decoder, &session, &items, 16, &mut sampler).unwrap();
        assert_eq!(embedded.len(), 3);
        let names: Vec<&str> = embedded.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["a.wav", "b.wav", "c.wav"]);

        let detected = detect_batch(&RawF32Decoder, &session, &items, 0.5).unwrap();
        assert_eq!(detected.len(), 3);
    }

    #[test]
    fn embedded_items_preserve_input_length() {
        let session = stub_session();
        let items = vec![valid_item("a.wav", 2_500)];
        let mut sampler = MessageSampler::seeded(2);
        let embedded = embed_batch(&RawF32Decoder, &session, &items, 16, &mut sampler).unwrap();
        assert_eq!(embedded[0].watermarked.len(), 2_500);
        assert!(embedded[0].rms > 0.0);
        assert!(embedded[0].si_snr.is_finite());
    }

    #[test]
    fn invalid_message_width_escalates_before_any_item_runs() {
        let session = stub_session();
        let items = vec![valid_item("a.wav", 100)];
        let mut sampler = MessageSampler::seeded(3);
        let err = embed_batch(&RawF32Decoder, &session, &items, 20, &mut sampler).unwrap_err();
        assert!(matches!(err, Error::InvalidMessageBits { got: 20, max: 16 }));
    }

    #[test]
    fn all_skipped_yields_empty_result_not_error() {
        let session = stub_session();
        let items = vec![BatchInput {
            name: "broken.wav".into(),
            content_type: "audio/wav".into(),
            bytes: b"CORRUPT".to_vec(),
        }];
        let mut sampler = MessageSampler::seeded(4);
        let embedded = embed_batch(&RawF32Decoder, &session, &items, 16, &mut sampler).unwrap();
        assert!(embedded.is_empty());
    }

    #[test]
    fn zero_length_item_is_processed_not_skipped() {
        let session = stub_session();
        let items = vec![valid_item("empty.wav", 0)];
        let detected = detect_batch(&RawF32Decoder, &session, &items, 0.5).unwrap();
        assert_eq!(detected.len(), 1);
        assert!((0.0..=1.0).contains(&detected[0].probability));
    }
}
