use sello_core::{InferenceSession, MessageSampler, WeightArtifact, metrics};

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

fn test_session(strength: f32) -> InferenceSession {
    let artifact = WeightArtifact {
        message_bits: 16,
        sample_rate: 16_000,
        key: [42u8; 16],
        strength,
        logit_gain: 8.0 / strength,
        logit_bias: strength / 2.0,
    };
    InferenceSession::from_artifact(&artifact)
}

#[test]
fn embed_then_detect_round_trip() {
    let session = test_session(0.12);
    let audio = make_test_audio(16_000 * 3, 16_000);

    let clean = sello_core::detect(&session, &audio, 0.5).unwrap();
    assert!(
        !clean.is_watermarked,
        "unmarked audio scored {}",
        clean.probability
    );

    let mut sampler = MessageSampler::seeded(99);
    let outcome = sello_core::embed(&session, &audio, 16, &mut sampler).unwrap();
    assert_eq!(outcome.watermarked.len(), audio.len());

    let marked = sello_core::detect(&session, &outcome.watermarked, 0.5).unwrap();
    assert!(
        marked.is_watermarked,
        "watermarked audio scored {}",
        marked.probability
    );
    assert!(marked.probability > clean.probability);
}

#[test]
fn embed_reports_sane_quality_metrics() {
    let session = test_session(0.12);
    let audio = make_test_audio(16_000 * 2, 16_000);

    let mut sampler = MessageSampler::seeded(7);
    let outcome = sello_core::embed(&session, &audio, 16, &mut sampler).unwrap();

    let rms = metrics::injected_rms(&outcome.delta);
    assert!(rms > 0.0, "watermark had no effect");
    assert!(rms < 0.1, "watermark too loud: rms {rms}");

    let si_snr = metrics::si_snr(&audio, &outcome.watermarked);
    assert!(si_snr.is_finite());
    assert!(si_snr > 5.0, "watermark destroys the signal: {si_snr} dB");
}

#[test]
fn seeded_embedding_is_reproducible() {
    let session = test_session(0.12);
    let audio = make_test_audio(16_000 + 4_000, 16_000);

    let a = sello_core::embed(&session, &audio, 16, &mut MessageSampler::seeded(5)).unwrap();
    let b = sello_core::embed(&session, &audio, 16, &mut MessageSampler::seeded(5)).unwrap();
    assert_eq!(a.watermarked, b.watermarked);
    assert_eq!(a.delta, b.delta);
}

#[test]
fn detection_survives_16bit_wav_round_trip() {
    let session = test_session(0.12);
    let audio = make_test_audio(16_000 * 3, 16_000);

    let mut sampler = MessageSampler::seeded(13);
    let outcome = sello_core::embed(&session, &audio, 16, &mut sampler).unwrap();

    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("marked.wav");

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).expect("failed to create WAV writer");
    for &s in &outcome.watermarked {
        let val = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer.write_sample(val).expect("failed to write sample");
    }
    writer.finalize().expect("failed to finalize WAV");

    let reader = hound::WavReader::open(&path).expect("failed to open WAV");
    let restored: Vec<f32> = reader
        .into_samples::<i16>()
        .map(|s| s.expect("failed to read sample") as f32 / i16::MAX as f32)
        .collect();
    assert_eq!(restored.len(), outcome.watermarked.len());

    let detection = sello_core::detect(&session, &restored, 0.5).unwrap();
    assert!(
        detection.is_watermarked,
        "watermark lost after quantization: {}",
        detection.probability
    );
}

#[test]
fn no_payload_mode_still_marks_presence() {
    let artifact = WeightArtifact {
        message_bits: 0,
        sample_rate: 16_000,
        key: [42u8; 16],
        strength: 0.12,
        logit_gain: 8.0 / 0.12,
        logit_bias: 0.06,
    };
    let session = InferenceSession::from_artifact(&artifact);
    let audio = make_test_audio(16_000 * 2, 16_000);

    let mut sampler = MessageSampler::seeded(3);
    let outcome = sello_core::embed(&session, &audio, 0, &mut sampler).unwrap();
    let detection = sello_core::detect(&session, &outcome.watermarked, 0.5).unwrap();
    assert!(detection.is_watermarked, "scored {}", detection.probability);
}
