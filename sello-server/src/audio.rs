//! Audio decode/resample/downmix collaborator and WAV encoding.
//!
//! Decoding produces canonical mono PCM at the configured sample rate from
//! any container/codec symphonia recognizes. Unreadable bytes surface as
//! `Error::InputFormat` so the batch orchestrator can skip the item; a
//! well-formed stream with no audio frames decodes to an empty waveform,
//! which the pipeline treats as a valid zero-length clip.

use std::io::Cursor;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use sello_core::Error as CoreError;
use sello_core::batch::{AudioDecoder, BatchInput};

pub struct SymphoniaDecoder {
    target_rate: u32,
}

impl SymphoniaDecoder {
    pub fn new(target_rate: u32) -> Self {
        Self { target_rate }
    }

    /// Decode encoded bytes to mono samples at the target rate.
    pub fn decode_bytes(
        &self,
        bytes: Vec<u8>,
        ext_hint: Option<&str>,
    ) -> Result<Vec<f32>, CoreError> {
        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
        let mut hint = Hint::new();
        if let Some(ext) = ext_hint {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| CoreError::InputFormat(format!("probe failed: {e}")))?;
        let mut reader = probed.format;

        let track = reader
            .default_track()
            .ok_or_else(|| CoreError::InputFormat("no audio track".into()))?;
        let track_id = track.id;
        let src_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| CoreError::InputFormat("unknown sample rate".into()))?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| CoreError::InputFormat(format!("unsupported codec: {e}")))?;

        let mut mono: Vec<f32> = Vec::new();
        loop {
            let packet = match reader.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(CoreError::InputFormat(format!("read failed: {e}"))),
            };
            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                // Recoverable corruption inside one packet
                Err(SymphoniaError::DecodeError(_)) => continue,
                Err(e) => return Err(CoreError::InputFormat(format!("decode failed: {e}"))),
            };

            let spec = *decoded.spec();
            let channels = spec.channels.count().max(1);
            let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            buf.copy_interleaved_ref(decoded);

            // Downmix by channel mean
            for frame in buf.samples().chunks_exact(channels) {
                mono.push(frame.iter().sum::<f32>() / channels as f32);
            }
        }

        Ok(resample_linear(&mono, src_rate, self.target_rate))
    }
}

impl AudioDecoder for SymphoniaDecoder {
    fn decode(&self, input: &BatchInput) -> sello_core::error::Result<Vec<f32>> {
        self.decode_bytes(input.bytes.clone(), extension_of(&input.name))
    }
}

fn extension_of(name: &str) -> Option<&str> {
    Path::new(name).extension().and_then(|e| e.to_str())
}

/// Linear-interpolation resampler.
///
/// Adequate for the watermark band; the carrier statistic is robust to the
/// mild high-frequency rolloff this introduces.
pub fn resample_linear(samples: &[f32], src_rate: u32, dst_rate: u32) -> Vec<f32> {
    if samples.is_empty() || src_rate == dst_rate {
        return samples.to_vec();
    }

    let ratio = f64::from(dst_rate) / f64::from(src_rate);
    let out_len = (samples.len() as f64 * ratio).round() as usize;
    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let pos = i as f64 / ratio;
        let base = pos.floor() as usize;
        let frac = (pos - base as f64) as f32;
        let a = samples[base.min(samples.len() - 1)];
        let b = samples[(base + 1).min(samples.len() - 1)];
        out.push(a + (b - a) * frac);
    }
    out
}

/// Encode mono samples as a 16-bit PCM WAV blob.
pub fn encode_wav_16bit(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
    for &s in samples {
        writer.write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;
    Ok(cursor.into_inner())
}
