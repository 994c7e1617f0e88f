//! # Level Meter
//!
//! Turns blocks of input samples into a single loudness value in [0, 1].
//! The value is only ever used as a gate, so the meter keeps no history
//! beyond the optional exponential smoothing.

/// RMS loudness meter with optional exponential smoothing.
#[derive(Debug, Clone)]
pub struct LevelMeter {
    smoothing: f32,
    level: f32,
}

impl LevelMeter {
    /// # Arguments
    /// * `smoothing` - Weight of the previous level, 0.0 disables smoothing
    pub fn new(smoothing: f32) -> Self {
        Self {
            smoothing: smoothing.clamp(0.0, 0.999),
            level: 0.0,
        }
    }

    /// Feeds one block of mono samples and returns the updated level.
    ///
    /// An empty block leaves the level unchanged.
    pub fn process(&mut self, samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return self.level;
        }
        let rms = rms(samples).min(1.0);
        self.level = self.smoothing * self.level + (1.0 - self.smoothing) * rms;
        self.level
    }

    pub fn level(&self) -> f32 {
        self.level
    }
}

/// Root mean square of a block of samples.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|&s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}
