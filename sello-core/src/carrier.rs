//! Bundled spectral-patchwork capability behind the model traits.
//!
//! Each one-second window is processed in non-overlapping analysis frames.
//! Channel 0 carries watermark presence and is embedded in every frame;
//! when the capability has payload channels, frame `f` additionally carries
//! message bit `f % message_bits` on its own channel. Embedding scales
//! keyed bin-pair magnitudes by `(1 ± strength)`; detection recovers the
//! normalized patchwork statistic per channel and maps the frame-averaged
//! statistic to a logit through the artifact's gain and bias.
//!
//! The samples past the last whole analysis frame of a window are left
//! untouched (zero perturbation, no contribution to scores).

use realfft::num_complex::Complex32;

use crate::error::Result;
use crate::key::CarrierKey;
use crate::message::Message;
use crate::model::{Detector, Generator, SegmentScores};
use crate::spectrum::SpectrumProcessor;
use crate::weights::WeightArtifact;

/// Analysis frame length in samples.
pub const FRAME_LEN: usize = 512;
/// Bin pairs adjusted per channel per frame.
pub const PAIRS_PER_CHANNEL: usize = 96;
/// Lowest usable bin (skips DC and near-DC).
pub const MIN_BIN: usize = 8;
/// Highest usable bin, exclusive (stays below Nyquist).
pub const MAX_BIN: usize = 250;

const PRESENCE_CHANNEL: u32 = 0;

fn bit_channel(bit: u32) -> u32 {
    1 + bit
}

/// Scale the magnitudes of each bin pair by `(1 ± strength)`.
///
/// `up` selects the orientation; pairs with near-zero energy are skipped
/// since there is nothing to modulate.
fn scale_pairs(bins: &mut [Complex32], pairs: &[(usize, usize)], up: bool, strength: f32) {
    for &(a, b) in pairs {
        if a >= bins.len() || b >= bins.len() {
            continue;
        }
        if bins[a].norm() < 1e-10 || bins[b].norm() < 1e-10 {
            continue;
        }
        let (scale_a, scale_b) = if up {
            (1.0 + strength, 1.0 - strength)
        } else {
            (1.0 - strength, 1.0 + strength)
        };
        bins[a] *= scale_a;
        bins[b] *= scale_b;
    }
}

/// Normalized patchwork statistic: `sum(|a| - |b|) / sum(|a| + |b|)`.
///
/// Embedding shifts the statistic by approximately `± strength`; unmarked
/// audio sits near zero.
fn pair_statistic(bins: &[Complex32], pairs: &[(usize, usize)]) -> f32 {
    let mut diff = 0.0f32;
    let mut total = 0.0f32;
    for &(a, b) in pairs {
        if a >= bins.len() || b >= bins.len() {
            continue;
        }
        let mag_a = bins[a].norm();
        let mag_b = bins[b].norm();
        diff += mag_a - mag_b;
        total += mag_a + mag_b;
    }
    if total < 1e-10 { 0.0 } else { diff / total }
}

pub struct CarrierGenerator {
    key: CarrierKey,
    strength: f32,
    message_bits: u32,
}

impl CarrierGenerator {
    pub fn new(artifact: &WeightArtifact) -> Self {
        Self {
            key: CarrierKey::new(artifact.key),
            strength: artifact.strength,
            message_bits: u32::from(artifact.message_bits),
        }
    }
}

impl Generator for CarrierGenerator {
    fn perturb(&self, segment: &[f32], message: Message) -> Result<Vec<f32>> {
        let mut fft = SpectrumProcessor::new(FRAME_LEN);
        let mut delta = vec![0.0f32; segment.len()];
        let num_frames = segment.len() / FRAME_LEN;

        for frame_idx in 0..num_frames {
            let start = frame_idx * FRAME_LEN;
            let frame = &segment[start..start + FRAME_LEN];
            let mut buf = frame.to_vec();

            let bins = fft.analyze(&mut buf)?;
            let pairs = self.key.bin_pairs(
                frame_idx as u32,
                PRESENCE_CHANNEL,
                PAIRS_PER_CHANNEL,
                MIN_BIN,
                MAX_BIN,
            );
            scale_pairs(bins, &pairs, true, self.strength);

            if self.message_bits > 0 {
                let bit = frame_idx as u32 % self.message_bits;
                let pairs = self.key.bin_pairs(
                    frame_idx as u32,
                    bit_channel(bit),
                    PAIRS_PER_CHANNEL,
                    MIN_BIN,
                    MAX_BIN,
                );
                let up = (message >> bit) & 1 == 1;
                scale_pairs(bins, &pairs, up, self.strength);
            }

            fft.synthesize(&mut buf)?;
            for ((d, &marked), &original) in
                delta[start..start + FRAME_LEN].iter_mut().zip(&buf).zip(frame)
            {
                *d = marked - original;
            }
        }

        Ok(delta)
    }
}

pub struct CarrierDetector {
    key: CarrierKey,
    message_bits: u32,
    logit_gain: f32,
    logit_bias: f32,
}

impl CarrierDetector {
    pub fn new(artifact: &WeightArtifact) -> Self {
        Self {
            key: CarrierKey::new(artifact.key),
            message_bits: u32::from(artifact.message_bits),
            logit_gain: artifact.logit_gain,
            logit_bias: artifact.logit_bias,
        }
    }
}

impl Detector for CarrierDetector {
    fn score(&self, segment: &[f32]) -> Result<SegmentScores> {
        let bits = self.message_bits as usize;
        let num_frames = segment.len() / FRAME_LEN;
        if num_frames == 0 {
            return Ok(SegmentScores {
                presence_logit: -self.logit_bias * self.logit_gain,
                bit_logits: vec![0.0; bits],
            });
        }

        let mut fft = SpectrumProcessor::new(FRAME_LEN);
        let mut presence_sum = 0.0f32;
        let mut bit_sums = vec![0.0f32; bits];
        let mut bit_counts = vec![0u32; bits];

        for frame_idx in 0..num_frames {
            let start = frame_idx * FRAME_LEN;
            let mut buf = segment[start..start + FRAME_LEN].to_vec();
            let bins: &[Complex32] = fft.analyze(&mut buf)?;

            let pairs = self.key.bin_pairs(
                frame_idx as u32,
                PRESENCE_CHANNEL,
                PAIRS_PER_CHANNEL,
                MIN_BIN,
                MAX_BIN,
            );
            presence_sum += pair_statistic(bins, &pairs);

            if bits > 0 {
                let bit = frame_idx as u32 % self.message_bits;
                let pairs = self.key.bin_pairs(
                    frame_idx as u32,
                    bit_channel(bit),
                    PAIRS_PER_CHANNEL,
                    MIN_BIN,
                    MAX_BIN,
                );
                bit_sums[bit as usize] += pair_statistic(bins, &pairs);
                bit_counts[bit as usize] += 1;
            }
        }

        let presence_mean = presence_sum / num_frames as f32;
        let bit_logits = bit_sums
            .iter()
            .zip(&bit_counts)
            .map(|(&sum, &count)| {
                if count == 0 {
                    0.0
                } else {
                    sum / count as f32 * self.logit_gain
                }
            })
            .collect();

        Ok(SegmentScores {
            presence_logit: (presence_mean - self.logit_bias) * self.logit_gain,
            bit_logits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Broadband test audio with energy across many frequencies.
    fn make_test_audio(num_samples: usize, sample_rate: u32) -> Vec<f32> {
        let mut samples = vec![0.0f32; num_samples];
        for (i, sample) in samples.iter_mut().enumerate() {
            let t = i as f32 / sample_rate as f32;
            for k in 1u32..60 {
                let freq = k as f32 * 60.0;
                let amp = 1.0 / (k as f32).sqrt();
                *sample += amp * (2.0 * std::f32::consts::PI * freq * t + k as f32).sin();
            }
        }
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
        if peak > 0.0 {
            for s in samples.iter_mut() {
                *s *= 0.5 / peak;
            }
        }
        samples
    }

    fn test_artifact(message_bits: u16, strength: f32) -> WeightArtifact {
        WeightArtifact {
            message_bits,
            sample_rate: 16_000,
            key: [42u8; 16],
            strength,
            logit_gain: 8.0 / strength,
            logit_bias: strength / 2.0,
        }
    }

    #[test]
    fn delta_has_segment_length_and_silent_tail() {
        let artifact = test_artifact(16, 0.05);
        let generator = CarrierGenerator::new(&artifact);
        let segment = make_test_audio(16_000, 16_000);

        let delta = generator.perturb(&segment, 0xBEEF).unwrap();
        assert_eq!(delta.len(), segment.len());

        // 16000 = 31 * 512 + 128: the trailing partial frame is untouched
        let tail_start = (segment.len() / FRAME_LEN) * FRAME_LEN;
        assert!(delta[tail_start..].iter().all(|&d| d == 0.0));
        assert!(delta[..tail_start].iter().any(|&d| d != 0.0));
    }

    #[test]
    fn silence_yields_zero_delta() {
        let artifact = test_artifact(16, 0.05);
        let generator = CarrierGenerator::new(&artifact);
        let delta = generator.perturb(&vec![0.0; 16_000], 7).unwrap();
        assert!(delta.iter().all(|&d| d == 0.0));
    }

    #[test]
    fn embedding_raises_presence_logit() {
        // Presence-only capability: the patchwork statistic strictly
        // increases for every frame with spectral energy.
        let artifact = test_artifact(0, 0.05);
        let generator = CarrierGenerator::new(&artifact);
        let detector = CarrierDetector::new(&artifact);

        let segment = make_test_audio(16_000, 16_000);
        let clean = detector.score(&segment).unwrap();

        let delta = generator.perturb(&segment, 0).unwrap();
        let marked: Vec<f32> = segment.iter().zip(&delta).map(|(s, d)| s + d).collect();
        let scored = detector.score(&marked).unwrap();

        assert!(
            scored.presence_logit > clean.presence_logit,
            "expected marked logit {} above clean logit {}",
            scored.presence_logit,
            clean.presence_logit
        );
    }

    #[test]
    fn perturbation_is_small() {
        let artifact = test_artifact(16, 0.05);
        let generator = CarrierGenerator::new(&artifact);
        let segment = make_test_audio(16_000, 16_000);
        let delta = generator.perturb(&segment, 0x1234).unwrap();

        let max_delta = delta.iter().map(|d| d.abs()).fold(0.0f32, f32::max);
        assert!(max_delta < 0.1, "perturbation too large: {max_delta}");
    }

    #[test]
    fn generator_is_deterministic() {
        let artifact = test_artifact(16, 0.05);
        let generator = CarrierGenerator::new(&artifact);
        let segment = make_test_audio(16_000, 16_000);
        let a = generator.perturb(&segment, 0xABCD).unwrap();
        let b = generator.perturb(&segment, 0xABCD).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn payload_bits_are_recoverable() {
        // Few bits means each bit is measured on many frames, so sign
        // recovery has a wide margin.
        let artifact = test_artifact(4, 0.15);
        let generator = CarrierGenerator::new(&artifact);
        let detector = CarrierDetector::new(&artifact);

        let segment = make_test_audio(16_000, 16_000);
        let message: Message = 0b1010;

        let delta = generator.perturb(&segment, message).unwrap();
        let marked: Vec<f32> = segment.iter().zip(&delta).map(|(s, d)| s + d).collect();
        let scores = detector.score(&marked).unwrap();

        assert_eq!(scores.bit_logits.len(), 4);
        for (bit, &logit) in scores.bit_logits.iter().enumerate() {
            let expected = (message >> bit) & 1 == 1;
            assert_eq!(
                logit > 0.0,
                expected,
                "bit {bit} logit {logit} disagrees with message {message:#06b}"
            );
        }
    }

    #[test]
    fn sub_frame_segment_scores_as_unmarked() {
        let artifact = test_artifact(16, 0.05);
        let detector = CarrierDetector::new(&artifact);
        let scores = detector.score(&vec![0.1; FRAME_LEN / 2]).unwrap();
        assert!(scores.presence_logit < 0.0);
        assert_eq!(scores.bit_logits.len(), 16);
    }
}
