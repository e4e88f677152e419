//! Real-FFT analysis and synthesis for fixed-size carrier frames.

use std::sync::Arc;

use realfft::num_complex::Complex32;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};

use crate::error::{Error, Result};

/// Pre-planned FFT pair with reusable scratch buffers for one frame length.
pub struct SpectrumProcessor {
    frame_len: usize,
    forward: Arc<dyn RealToComplex<f32>>,
    inverse: Arc<dyn ComplexToReal<f32>>,
    bins: Vec<Complex32>,
    scratch_fwd: Vec<Complex32>,
    scratch_inv: Vec<Complex32>,
}

impl SpectrumProcessor {
    pub fn new(frame_len: usize) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(frame_len);
        let inverse = planner.plan_fft_inverse(frame_len);
        let bins = forward.make_output_vec();
        let scratch_fwd = forward.make_scratch_vec();
        let scratch_inv = inverse.make_scratch_vec();
        Self {
            frame_len,
            forward,
            inverse,
            bins,
            scratch_fwd,
            scratch_inv,
        }
    }

    /// Number of complex bins (`frame_len / 2 + 1`).
    pub fn num_bins(&self) -> usize {
        self.frame_len / 2 + 1
    }

    /// Transform a time-domain frame into the internal bin buffer.
    ///
    /// `frame` must hold exactly the planned frame length and is clobbered.
    pub fn analyze(&mut self, frame: &mut [f32]) -> Result<&mut [Complex32]> {
        if frame.len() != self.frame_len {
            return Err(Error::Fft(format!(
                "expected {} samples, got {}",
                self.frame_len,
                frame.len()
            )));
        }
        self.forward
            .process_with_scratch(frame, &mut self.bins, &mut self.scratch_fwd)
            .map_err(|e| Error::Fft(e.to_string()))?;
        Ok(&mut self.bins)
    }

    /// Transform the internal bin buffer back into `frame`, unit-scaled.
    pub fn synthesize(&mut self, frame: &mut [f32]) -> Result<()> {
        if frame.len() != self.frame_len {
            return Err(Error::Fft(format!(
                "expected {} samples, got {}",
                self.frame_len,
                frame.len()
            )));
        }
        self.inverse
            .process_with_scratch(&mut self.bins, frame, &mut self.scratch_inv)
            .map_err(|e| Error::Fft(e.to_string()))?;
        // realfft's inverse scales by frame_len
        let scale = 1.0 / self.frame_len as f32;
        for s in frame.iter_mut() {
            *s *= scale;
        }
        Ok(())
    }
}
