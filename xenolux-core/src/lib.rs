// xenolux-core/src/lib.rs

//! The core logic for the Xenolux tuner.
//! This crate is responsible for audio capture, pitch inference, tuning
//! analysis and the mapping from tuning state to visuals. It is completely
//! headless and contains no GUI code.

pub mod audio;
pub mod classify;
pub mod config;
pub mod fft;
pub mod meter;
pub mod model;
pub mod pitch;
pub mod pitch_stream;
pub mod session;
pub mod tuning;
pub mod visual;

pub use audio::{AudioFrame, AudioStatus};
pub use classify::{Classification, TuningState, classify};
pub use config::TunerConfig;
pub use pitch_stream::{ModelStatus, PitchStream};
pub use session::{FrameReport, Session};
pub use tuning::{TuningResult, analyze};
