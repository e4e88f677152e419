//! Quality metrics for injected watermarks.
//!
//! Both metrics must stay finite for every input, including silent clips;
//! degenerate signals resolve through the epsilon terms, never through an
//! error path.

/// Stabilizer for the SI-SNR ratio. Keeps silent and identical signals on
/// the finite ends of the scale instead of producing NaN or infinities.
const EPS: f64 = 1e-8;

/// Root-mean-square amplitude of the injected perturbation.
pub fn injected_rms(delta: &[f32]) -> f32 {
    if delta.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = delta.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    (sum_sq / delta.len() as f64).sqrt() as f32
}

/// Scale-invariant signal-to-noise ratio between a clean signal and its
/// watermarked counterpart, in dB.
///
/// Both signals are zero-meaned, the watermarked signal is projected onto
/// the direction of the clean signal, and the ratio of projection energy to
/// residual energy is reported. Insensitive to amplitude scaling of the
/// watermarked signal.
pub fn si_snr(clean: &[f32], watermarked: &[f32]) -> f32 {
    debug_assert_eq!(clean.len(), watermarked.len());
    let n = clean.len();
    if n == 0 {
        return (10.0 * EPS.log10()) as f32;
    }

    let mean_c: f64 = clean.iter().map(|&s| f64::from(s)).sum::<f64>() / n as f64;
    let mean_w: f64 = watermarked.iter().map(|&s| f64::from(s)).sum::<f64>() / n as f64;

    let mut dot = 0.0f64;
    let mut clean_energy = 0.0f64;
    for (&c, &w) in clean.iter().zip(watermarked) {
        let s = f64::from(c) - mean_c;
        let s_hat = f64::from(w) - mean_w;
        dot += s * s_hat;
        clean_energy += s * s;
    }

    let alpha = dot / (clean_energy + EPS);
    let mut target_energy = 0.0f64;
    let mut noise_energy = 0.0f64;
    for (&c, &w) in clean.iter().zip(watermarked) {
        let s = f64::from(c) - mean_c;
        let s_hat = f64::from(w) - mean_w;
        let target = alpha * s;
        let noise = s_hat - target;
        target_energy += target * target;
        noise_energy += noise * noise;
    }

    (10.0 * (target_energy / (noise_energy + EPS) + EPS).log10()) as f32
}
