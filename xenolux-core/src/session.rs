//! # Session Module
//!
//! One tuning session: the pitch stream, the loudness cell and the gated
//! audio input, wired together at start-up and read once per frame.

use crate::audio::{AudioFrame, AudioInput, AudioStatus};
use crate::classify::{TuningState, classify};
use crate::config::TunerConfig;
use crate::model::{PitchModel, YinModel};
use crate::pitch_stream::{ModelStatus, PitchStream};
use crate::tuning::TuningResult;
use anyhow::{Context, Result};
use atomic_float::AtomicF32;
use std::sync::Arc;
use std::sync::atomic::Ordering;

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub state: TuningState,
    pub result: Option<TuningResult>,
    /// Frequency after the loudness gate, in Hz
    pub frequency: f32,
    /// Current input loudness in [0, 1]
    pub loudness: f32,
}

/// A running tuner: created at start-up, read every frame, torn down on drop.
pub struct Session {
    config: TunerConfig,
    stream: PitchStream,
    level: Arc<AtomicF32>,
    audio: AudioInput,
}

impl Session {
    /// Starts the default YIN model and prepares (but does not open) the
    /// microphone.
    pub fn start(config: TunerConfig) -> Result<Self> {
        config.validate().context("invalid configuration")?;
        let (frames_tx, frames_rx) = crossbeam_channel::bounded::<AudioFrame>(config.audio.frame_queue);
        let model = YinModel::new(frames_rx, config.audio.buffer_size, config.detector.clone());
        Self::with_model(config, model, frames_tx)
    }

    /// Starts a session around any pitch model.
    ///
    /// `frames` is where the audio input delivers captured frames; the model
    /// is expected to hold the matching receiver if it consumes audio.
    pub fn with_model<M: PitchModel>(
        config: TunerConfig,
        model: M,
        frames: crossbeam_channel::Sender<AudioFrame>,
    ) -> Result<Self> {
        let stream = PitchStream::spawn(model).context("failed to spawn pitch stream")?;
        let level = Arc::new(AtomicF32::default());
        let audio = AudioInput::new(frames, Arc::clone(&level), config.audio.clone());
        log::info!("Session started");
        Ok(Self {
            config,
            stream,
            level,
            audio,
        })
    }

    pub fn config(&self) -> &TunerConfig {
        &self.config
    }

    /// The user-gesture gate. Starts capture on first call.
    pub fn unlock_audio(&mut self) -> &AudioStatus {
        self.audio.unlock()
    }

    pub fn audio_status(&self) -> &AudioStatus {
        self.audio.status()
    }

    pub fn model_status(&self) -> ModelStatus {
        self.stream.status()
    }

    /// Classifies the current published values.
    pub fn frame(&self) -> FrameReport {
        let loudness = self.level.load(Ordering::Relaxed);
        let classification = classify(
            &self.stream.status(),
            self.audio.status(),
            self.stream.current_frequency(),
            loudness,
        );
        FrameReport {
            state: classification.state,
            result: classification.result,
            frequency: classification.frequency,
            loudness,
        }
    }
}
