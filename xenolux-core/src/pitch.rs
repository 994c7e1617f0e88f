//! # Pitch Detection Module
//!
//! Monophonic fundamental-frequency estimation for the tuner. Implements the
//! YIN algorithm with a noise gate and a clarity check, plus an optional
//! refinement step that re-centres the estimate on the spectral peak.
//!
//! ## Features
//! - YIN pitch detection with octave error prevention
//! - Noise rejection using an RMS gate and clarity checking
//! - Parabolic interpolation for sub-sample accuracy
//! - Spectrum refinement for improved precision

use crate::config::DetectorConfig;
use crate::meter::rms;

/// Estimates below this are treated as detector noise.
const MIN_DETECTABLE_FREQUENCY: f32 = 20.0;

/// YIN detector with a reusable difference buffer.
///
/// This version is tuned for a live microphone:
/// - Amplitude gating to skip silence before doing any work
/// - First-dip search relative to the global minimum to avoid octave errors
/// - Clarity threshold to reject noisy frames
#[derive(Debug, Clone)]
pub struct YinDetector {
    amplitude_threshold: f32,
    clarity_threshold: f32,
    dip_margin: f32,
    yin_buffer: Vec<f32>,
}

impl YinDetector {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            amplitude_threshold: config.amplitude_threshold,
            clarity_threshold: config.clarity_threshold,
            dip_margin: config.dip_margin,
            yin_buffer: Vec::new(),
        }
    }

    /// Detects the fundamental frequency of `signal`.
    ///
    /// # Returns
    /// * `Some(frequency)` - Detected frequency in Hz
    /// * `None` - No pitch detected (silence, noise, or a frame too short)
    pub fn detect(&mut self, signal: &[f32], sample_rate: u32) -> Option<f32> {
        let half = signal.len() / 2;
        if half < 4 || sample_rate == 0 {
            return None;
        }

        // --- Noise gate ---
        if rms(signal) < self.amplitude_threshold {
            return None;
        }

        self.yin_buffer.clear();
        self.yin_buffer.resize(half, 0.0);
        let yin = &mut self.yin_buffer;

        // --- Difference function ---
        for tau in 1..half {
            let mut diff = 0.0;
            for i in 0..half {
                let delta = signal[i] - signal[i + tau];
                diff += delta * delta;
            }
            yin[tau] = diff;
        }

        // --- Cumulative mean normalized difference ---
        let mut running_sum = 0.0;
        yin[0] = 1.0;
        for tau in 1..half {
            running_sum += yin[tau];
            if running_sum != 0.0 {
                yin[tau] *= tau as f32 / running_sum;
            } else {
                yin[tau] = 1.0;
            }
        }

        // --- First significant dip, then walk down to its local minimum ---
        let min_val = yin.iter().skip(1).cloned().fold(f32::INFINITY, f32::min);
        let threshold = min_val + self.dip_margin;

        let mut period = (2..half).find(|&tau| yin[tau] < threshold && yin[tau] < yin[tau - 1])?;
        while period + 1 < half && yin[period + 1] < yin[period] {
            period += 1;
        }

        // --- Clarity check ---
        if yin[period] > self.clarity_threshold || period + 1 >= half {
            return None;
        }

        // --- Parabolic interpolation ---
        let y1 = yin[period - 1];
        let y2 = yin[period];
        let y3 = yin[period + 1];
        let curvature = y1 - 2.0 * y2 + y3;
        let period_float = if curvature != 0.0 {
            period as f32 + (y1 - y3) / (2.0 * curvature)
        } else {
            period as f32
        };

        let frequency = sample_rate as f32 / period_float;
        if frequency.is_finite() && frequency > MIN_DETECTABLE_FREQUENCY {
            Some(frequency)
        } else {
            None
        }
    }
}

/// Refines a frequency estimate using a pre-computed magnitude spectrum.
///
/// Searches two bins either side of the estimate for the strongest peak and
/// interpolates it on a log scale. Falls back to `rough_freq` whenever the
/// spectrum does not support a better answer.
///
/// # Arguments
/// * `spectrum_magnitudes` - First half of the magnitude spectrum
/// * `rough_freq` - Initial frequency estimate in Hz
/// * `sample_rate` - Sample rate in Hz
pub fn refine_from_spectrum(spectrum_magnitudes: &[f32], rough_freq: f32, sample_rate: u32) -> f32 {
    let len = spectrum_magnitudes.len();
    if rough_freq <= 0.0 || len < 3 || sample_rate == 0 {
        return rough_freq;
    }
    let buffer_size = len * 2;
    let target_bin = (rough_freq * buffer_size as f32) / sample_rate as f32;
    let search_radius = 2.0;
    let start_bin = (target_bin - search_radius).max(0.0) as usize;
    let end_bin = (target_bin + search_radius).min((len - 1) as f32) as usize;
    if start_bin >= end_bin {
        return rough_freq;
    }

    let peak_bin = spectrum_magnitudes[start_bin..=end_bin]
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(offset, _)| start_bin + offset);

    let peak_bin = match peak_bin {
        Some(bin) if bin > 0 && bin < len - 1 => bin,
        _ => return rough_freq,
    };

    let y1 = spectrum_magnitudes[peak_bin - 1].ln();
    let y2 = spectrum_magnitudes[peak_bin].ln();
    let y3 = spectrum_magnitudes[peak_bin + 1].ln();
    if !y1.is_finite() || !y2.is_finite() || !y3.is_finite() {
        return rough_freq;
    }

    let denominator = 2.0 * y2 - y1 - y3;
    if denominator.abs() < 1e-6 {
        return rough_freq;
    }

    let peak_shift = (y3 - y1) / (2.0 * denominator);
    let final_freq = ((peak_bin as f32 + peak_shift) * sample_rate as f32) / buffer_size as f32;

    // A refinement that jumps a whole bin away disagrees with YIN; keep YIN.
    let bin_width = sample_rate as f32 / buffer_size as f32;
    if final_freq.is_finite() && final_freq > 0.0 && (final_freq - rough_freq).abs() <= bin_width {
        final_freq
    } else {
        rough_freq
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fft::Spectrum;

    const SAMPLE_RATE: u32 = 44100;

    fn sine(frequency: f32, amplitude: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * frequency * i as f32 / SAMPLE_RATE as f32).sin())
            .collect()
    }

    #[test]
    fn detects_concert_a() {
        let mut yin = YinDetector::new(&DetectorConfig::default());
        let frequency = yin.detect(&sine(440.0, 0.5, 2048), SAMPLE_RATE).unwrap();
        assert!((frequency - 440.0).abs() < 3.0, "got {}", frequency);
    }

    #[test]
    fn detects_low_e_string() {
        let mut yin = YinDetector::new(&DetectorConfig::default());
        let frequency = yin.detect(&sine(82.41, 0.5, 2048), SAMPLE_RATE).unwrap();
        assert!((frequency - 82.41).abs() < 2.0, "got {}", frequency);
    }

    #[test]
    fn silence_is_gated() {
        let mut yin = YinDetector::new(&DetectorConfig::default());
        assert!(yin.detect(&vec![0.0; 2048], SAMPLE_RATE).is_none());
        assert!(yin.detect(&sine(440.0, 0.001, 2048), SAMPLE_RATE).is_none());
    }

    #[test]
    fn tiny_frames_are_ignored() {
        let mut yin = YinDetector::new(&DetectorConfig::default());
        assert!(yin.detect(&[0.5, -0.5, 0.5], SAMPLE_RATE).is_none());
    }

    #[test]
    fn refinement_stays_close_to_the_tone() {
        let signal = sine(440.0, 0.5, 2048);
        let mut spectrum = Spectrum::new(2048);
        let magnitudes = spectrum.magnitudes(&signal).unwrap();

        let refined = refine_from_spectrum(&magnitudes, 437.0, SAMPLE_RATE);
        assert!((refined - 440.0).abs() < 2.0, "got {}", refined);
    }

    #[test]
    fn refinement_without_spectrum_keeps_estimate() {
        assert_eq!(refine_from_spectrum(&[], 440.0, SAMPLE_RATE), 440.0);
        assert_eq!(refine_from_spectrum(&[1.0; 1024], 0.0, SAMPLE_RATE), 0.0);
    }
}
