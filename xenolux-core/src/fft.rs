//! # Fast Fourier Transform (FFT) Module
//!
//! Magnitude spectra for refining pitch estimates. The FFT plan and the
//! Hann window are built once when the pitch model loads and reused for
//! every frame.
//!
//! ## Features
//! - High-performance FFT using RustFFT
//! - Hann windowing for reduced spectral leakage
//! - DC offset removal for accurate analysis

use rustfft::{Fft, FftPlanner, num_complex::Complex};
use std::sync::Arc;

/// A planned forward FFT of a fixed size.
pub struct Spectrum {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    scratch: Vec<Complex<f32>>,
}

impl Spectrum {
    /// Plans an FFT of `size` points.
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        Self {
            fft,
            window: hann_window(size),
            scratch: vec![Complex { re: 0.0, im: 0.0 }; size],
        }
    }

    pub fn size(&self) -> usize {
        self.window.len()
    }

    /// Returns the magnitudes of the first half of the spectrum
    /// (up to Nyquist), or `None` if `signal` is not exactly `size()` long.
    ///
    /// The signal is DC-corrected and windowed before the transform.
    pub fn magnitudes(&mut self, signal: &[f32]) -> Option<Vec<f32>> {
        if signal.len() != self.size() {
            return None;
        }

        let mean = signal.iter().sum::<f32>() / signal.len() as f32;
        for ((slot, &sample), &w) in self.scratch.iter_mut().zip(signal).zip(&self.window) {
            *slot = Complex { re: (sample - mean) * w, im: 0.0 };
        }

        self.fft.process(&mut self.scratch);

        Some(
            self.scratch
                .iter()
                .take(self.size() / 2)
                .map(|c| c.norm()) // .norm() is sqrt(re^2 + im^2)
                .collect(),
        )
    }
}

/// Hann window coefficients of length `n`.
fn hann_window(n: usize) -> Vec<f32> {
    if n < 2 {
        return vec![1.0; n];
    }
    let n_minus_1 = (n - 1) as f32;
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / n_minus_1).cos()))
        .collect()
}
