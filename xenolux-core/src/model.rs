//! # Pitch Model Module
//!
//! The contract between the pitch stream and whatever estimates pitch, plus
//! the default YIN-based model fed by the audio capture thread.
//!
//! A model is loaded once, then asked for estimates over and over. Each
//! request blocks until the model has something to say (a frequency, or
//! nothing), which lets the stream re-arm immediately without polling.

use crate::audio::AudioFrame;
use crate::config::DetectorConfig;
use crate::fft::Spectrum;
use crate::pitch::{YinDetector, refine_from_spectrum};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model failed to load: {0}")]
    Load(String),

    #[error("Model used before it was loaded")]
    NotLoaded,

    #[error("Audio source closed")]
    SourceClosed,

    #[error("Frame of {actual} samples, expected {expected}")]
    FrameSize { expected: usize, actual: usize },

    #[error("Inference error: {0}")]
    Inference(String),
}

/// A pitch estimator driven by the pitch stream.
pub trait PitchModel: Send + 'static {
    /// Prepares the model. Called exactly once before any inference.
    fn load(&mut self) -> Result<(), ModelError>;

    /// Produces the next estimate.
    ///
    /// # Returns
    /// * `Ok(Some(hz))` - A pitch was detected
    /// * `Ok(None)` - Nothing pitched this cycle
    /// * `Err(e)` - This cycle failed; the caller will simply ask again
    fn infer_next(&mut self) -> Result<Option<f32>, ModelError>;
}

/// State that only exists once the model has loaded.
struct LoadedYin {
    detector: YinDetector,
    spectrum: Option<Spectrum>,
}

/// YIN pitch model reading frames from the capture thread.
pub struct YinModel {
    frames: Receiver<AudioFrame>,
    config: DetectorConfig,
    frame_size: usize,
    idle_timeout: Duration,
    loaded: Option<LoadedYin>,
}

impl YinModel {
    /// # Arguments
    /// * `frames` - Audio frames from the capture callback
    /// * `frame_size` - Samples per frame the capture side produces
    /// * `config` - Detector thresholds
    pub fn new(frames: Receiver<AudioFrame>, frame_size: usize, config: DetectorConfig) -> Self {
        let idle_timeout = Duration::from_millis(config.idle_timeout_ms);
        Self {
            frames,
            config,
            frame_size,
            idle_timeout,
            loaded: None,
        }
    }

    /// Waits for a frame and skips ahead to the newest one queued.
    fn next_frame(&self) -> Result<Option<AudioFrame>, ModelError> {
        let mut frame = match self.frames.recv_timeout(self.idle_timeout) {
            Ok(frame) => frame,
            Err(RecvTimeoutError::Timeout) => return Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                // The stream re-arms at once, so pace a dead source here.
                std::thread::sleep(self.idle_timeout);
                return Err(ModelError::SourceClosed);
            }
        };
        while let Ok(newer) = self.frames.try_recv() {
            frame = newer;
        }
        Ok(Some(frame))
    }
}

impl PitchModel for YinModel {
    fn load(&mut self) -> Result<(), ModelError> {
        if self.frame_size < 8 || !self.frame_size.is_power_of_two() {
            return Err(ModelError::Load(format!(
                "frame size {} is not a power of two",
                self.frame_size
            )));
        }
        if !(self.config.clarity_threshold > 0.0 && self.config.clarity_threshold < 1.0) {
            return Err(ModelError::Load(format!(
                "clarity threshold {} outside (0, 1)",
                self.config.clarity_threshold
            )));
        }

        let spectrum = self
            .config
            .refine_with_spectrum
            .then(|| Spectrum::new(self.frame_size));
        self.loaded = Some(LoadedYin {
            detector: YinDetector::new(&self.config),
            spectrum,
        });
        log::debug!("YIN model ready for {}-sample frames", self.frame_size);
        Ok(())
    }

    fn infer_next(&mut self) -> Result<Option<f32>, ModelError> {
        if self.loaded.is_none() {
            return Err(ModelError::NotLoaded);
        }
        let Some(frame) = self.next_frame()? else {
            return Ok(None);
        };
        if frame.samples.len() != self.frame_size {
            return Err(ModelError::FrameSize {
                expected: self.frame_size,
                actual: frame.samples.len(),
            });
        }

        let loaded = self.loaded.as_mut().ok_or(ModelError::NotLoaded)?;
        let Some(rough) = loaded.detector.detect(&frame.samples, frame.sample_rate) else {
            return Ok(None);
        };

        let refined = match loaded.spectrum.as_mut() {
            Some(spectrum) => match spectrum.magnitudes(&frame.samples) {
                Some(magnitudes) => refine_from_spectrum(&magnitudes, rough, frame.sample_rate),
                None => rough,
            },
            None => rough,
        };
        Ok(Some(refined))
    }
}
