use clap::{Parser, Subcommand};
use std::path::PathBuf;

use sello_core::{InferenceSession, MessageSampler, WeightArtifact, metrics};

#[derive(Parser)]
#[command(name = "sello", about = "Audio watermarking tool", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Embed a watermark into a WAV file
    Embed {
        /// Input WAV file
        #[arg(short, long)]
        input: PathBuf,

        /// Output WAV file (16-bit PCM)
        #[arg(short, long)]
        output: PathBuf,

        /// Weight artifact
        #[arg(short, long)]
        weights: PathBuf,

        /// Message width in bits; defaults to the artifact width
        #[arg(long)]
        message_bits: Option<u32>,

        /// Seed for reproducible payload sampling
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Detect a watermark in a WAV file
    Detect {
        /// Input WAV file
        #[arg(short, long)]
        input: PathBuf,

        /// Weight artifact
        #[arg(short, long)]
        weights: PathBuf,

        /// Decision threshold on the clip probability
        #[arg(short, long, default_value = "0.5")]
        threshold: f32,
    },
    /// Generate a weight artifact from a passphrase
    GenWeights {
        /// Output artifact path
        #[arg(short, long)]
        output: PathBuf,

        /// Key passphrase
        #[arg(short, long)]
        passphrase: String,

        /// Message width in bits
        #[arg(long, default_value = "16")]
        message_bits: u16,

        /// Canonical sample rate in Hz
        #[arg(long, default_value = "16000")]
        sample_rate: u32,

        /// Embedding strength
        #[arg(long, default_value = "0.05")]
        strength: f32,
    },
}

/// Read a WAV file as mono f32 samples at the session rate.
fn read_wav_mono(path: &PathBuf, target_rate: u32) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let mut samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<f32>, _>>()?,
        hound::SampleFormat::Int => {
            let bits = spec.bits_per_sample;
            let max = (1i32 << (bits - 1)) as f32;
            reader
                .into_samples::<i32>()
                .collect::<Result<Vec<i32>, _>>()?
                .into_iter()
                .map(|s| s as f32 / max)
                .collect()
        }
    };

    if spec.channels > 1 {
        samples = samples
            .chunks(spec.channels as usize)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect();
    }

    if spec.sample_rate != target_rate {
        eprintln!(
            "Resampling {} Hz input to the model rate of {} Hz.",
            spec.sample_rate, target_rate
        );
        samples = resample_linear(&samples, spec.sample_rate, target_rate);
    }

    Ok(samples)
}

fn resample_linear(samples: &[f32], src_rate: u32, dst_rate: u32) -> Vec<f32> {
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

fn write_wav_16bit(
    path: &PathBuf,
    samples: &[f32],
    sample_rate: u32,
) -> Result<(), hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &s in samples {
        writer.write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
    }
    writer.finalize()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Embed {
            input,
            output,
            weights,
            message_bits,
            seed,
        } => {
            let session = InferenceSession::from_weights(&weights)?;
            let message_bits = message_bits.unwrap_or_else(|| session.message_bits());
            let samples = read_wav_mono(&input, session.sample_rate())?;

            eprintln!(
                "Embedding a {message_bits}-bit watermark into {} ({} samples, {} Hz)...",
                input.display(),
                samples.len(),
                session.sample_rate()
            );

            let mut sampler = match seed {
                Some(seed) => MessageSampler::seeded(seed),
                None => MessageSampler::from_entropy(),
            };
            let outcome = sello_core::embed(&session, &samples, message_bits, &mut sampler)?;

            write_wav_16bit(&output, &outcome.watermarked, session.sample_rate())?;

            eprintln!("Watermarked audio written to {}", output.display());
            println!("RMS:    {:.6}", metrics::injected_rms(&outcome.delta));
            println!("SI-SNR: {:.2} dB", metrics::si_snr(&samples, &outcome.watermarked));
        }
        Command::Detect {
            input,
            weights,
            threshold,
        } => {
            let session = InferenceSession::from_weights(&weights)?;
            let samples = read_wav_mono(&input, session.sample_rate())?;

            eprintln!(
                "Scoring {} ({} samples, {} Hz)...",
                input.display(),
                samples.len(),
                session.sample_rate()
            );

            let detection = sello_core::detect(&session, &samples, threshold)?;
            println!("Probability: {:.4}", detection.probability);
            println!(
                "Watermarked: {}",
                if detection.is_watermarked { "yes" } else { "no" }
            );
            if !detection.is_watermarked {
                std::process::exit(1);
            }
        }
        Command::GenWeights {
            output,
            passphrase,
            message_bits,
            sample_rate,
            strength,
        } => {
            if !(0.001..=0.2).contains(&strength) {
                return Err(format!("strength out of range (0.001 - 0.2): {strength}").into());
            }
            let artifact =
                WeightArtifact::from_passphrase(&passphrase, message_bits, sample_rate, strength);
            artifact.write(&output)?;
            eprintln!(
                "Weight artifact written to {} ({message_bits} bits, {sample_rate} Hz).",
                output.display()
            );
        }
    }

    Ok(())
}
