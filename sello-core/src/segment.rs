//! Fixed-window segmentation of arbitrary-length waveforms.
//!
//! The watermark capabilities operate on windows of exactly one second of
//! audio. `split` partitions a clip into such windows, zero-padding the tail;
//! `join` is its exact left inverse on the unpadded region.

/// Split a waveform into consecutive non-overlapping windows of `window_len`
/// samples, zero-padding the final window.
///
/// Returns the windows in original time order together with the number of
/// padding samples appended. The pad always satisfies `0 <= pad < window_len`
/// except for an empty input, which yields one fully padded window with
/// `pad == window_len`.
pub fn split(wave: &[f32], window_len: usize) -> (Vec<Vec<f32>>, usize) {
    assert!(window_len > 0, "window_len must be positive");

    if wave.is_empty() {
        return (vec![vec![0.0; window_len]], window_len);
    }

    let pad = (window_len - wave.len() % window_len) % window_len;
    let mut segments = Vec::with_capacity(wave.len().div_ceil(window_len));
    for chunk in wave.chunks(window_len) {
        let mut seg = chunk.to_vec();
        seg.resize(window_len, 0.0);
        segments.push(seg);
    }
    (segments, pad)
}

/// Concatenate windows back into a waveform, dropping exactly `pad` samples
/// from the tail.
pub fn join(segments: &[Vec<f32>], pad: usize) -> Vec<f32> {
    let mut wave: Vec<f32> = segments.iter().flatten().copied().collect();
    wave.truncate(wave.len().saturating_sub(pad));
    wave
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_join_inverse() {
        for len in [0usize, 1, 7, 99, 100, 101, 250, 300] {
            let wave: Vec<f32> = (0..len).map(|i| (i as f32 * 0.01).sin()).collect();
            let (segments, pad) = split(&wave, 100);
            let rejoined = join(&segments, pad);
            assert_eq!(rejoined, wave, "round trip failed for length {len}");
        }
    }

    #[test]
    fn padding_bound() {
        for len in 1..=25 {
            let wave = vec![0.5f32; len];
            let (_, pad) = split(&wave, 8);
            assert!(pad < 8, "pad {pad} out of range for length {len}");
        }
    }

    #[test]
    fn empty_wave_yields_one_padded_segment() {
        let (segments, pad) = split(&[], 16);
        assert_eq!(segments.len(), 1);
        assert_eq!(pad, 16);
        assert!(segments[0].iter().all(|&s| s == 0.0));
        assert!(join(&segments, pad).is_empty());
    }

    #[test]
    fn exact_multiple_has_no_padding() {
        let wave = vec![1.0f32; 300];
        let (segments, pad) = split(&wave, 100);
        assert_eq!(segments.len(), 3);
        assert_eq!(pad, 0);
    }

    #[test]
    fn segments_are_window_sized_and_ordered() {
        let wave: Vec<f32> = (0..250).map(|i| i as f32).collect();
        let (segments, pad) = split(&wave, 100);
        assert_eq!(segments.len(), 3);
        assert_eq!(pad, 50);
        for seg in &segments {
            assert_eq!(seg.len(), 100);
        }
        assert_eq!(segments[0][0], 0.0);
        assert_eq!(segments[1][0], 100.0);
        assert_eq!(segments[2][0], 200.0);
        // Padded tail is silence
        assert!(segments[2][50..].iter().all(|&s| s == 0.0));
    }
}
