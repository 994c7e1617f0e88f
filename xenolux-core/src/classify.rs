//! # Classification Module
//!
//! Per-frame signal gating and tuning-state classification. Every frame is
//! classified from scratch; nothing here remembers the previous frame.

use crate::audio::AudioStatus;
use crate::pitch_stream::ModelStatus;
use crate::tuning::{self, MIN_FREQUENCY, TuningResult};

/// Loudness at or below which any detected pitch is ignored.
pub const LOUDNESS_GATE: f32 = 0.02;

/// Deviations strictly smaller than this many cents count as in tune.
pub const IN_TUNE_CENTS: f32 = 6.0;

/// What the display should convey this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuningState {
    /// The pitch model is still loading
    Loading,
    /// The pitch model failed to load; terminal
    LoadFailed,
    /// Audio has not been unlocked, or could not be started
    AwaitingSignal,
    /// Audio is running but there is no confident pitch
    Silent,
    /// Within the lock-in band of the nearest note
    InTune,
    /// Below the nearest note
    Flat,
    /// Above the nearest note
    Sharp,
}

impl TuningState {
    /// Whether a note is being shown this frame.
    pub fn has_pitch(self) -> bool {
        matches!(self, TuningState::InTune | TuningState::Flat | TuningState::Sharp)
    }
}

/// The outcome of classifying one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub state: TuningState,
    /// Set only for `InTune`, `Flat` and `Sharp`
    pub result: Option<TuningResult>,
    /// Frequency after the loudness gate, in Hz
    pub frequency: f32,
}

/// Applies the loudness gate: quiet input counts as no pitch at all.
pub fn effective_frequency(frequency: f32, loudness: f32) -> f32 {
    if loudness > LOUDNESS_GATE { frequency } else { 0.0 }
}

/// Classifies a frame from the current model status, audio status,
/// published frequency and loudness.
///
/// Checks run in a fixed order: model loading, model failure, audio gate,
/// signal presence, then the tuning band.
pub fn classify(model: &ModelStatus, audio: &AudioStatus, frequency: f32, loudness: f32) -> Classification {
    let idle = |state| Classification {
        state,
        result: None,
        frequency: 0.0,
    };

    match model {
        ModelStatus::Loading => return idle(TuningState::Loading),
        ModelStatus::Failed(_) => return idle(TuningState::LoadFailed),
        ModelStatus::Ready => {}
    }
    if !audio.is_running() {
        return idle(TuningState::AwaitingSignal);
    }

    let frequency = effective_frequency(frequency, loudness);
    let result = if frequency > MIN_FREQUENCY {
        tuning::analyze(frequency)
    } else {
        None
    };

    let Some(result) = result else {
        return Classification {
            state: TuningState::Silent,
            result: None,
            frequency,
        };
    };

    let state = if result.cents.abs() < IN_TUNE_CENTS {
        TuningState::InTune
    } else if result.cents < 0.0 {
        TuningState::Flat
    } else {
        TuningState::Sharp
    };
    Classification {
        state,
        result: Some(result),
        frequency,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RUNNING: AudioStatus = AudioStatus::Running { sample_rate: 44100 };

    fn ready(frequency: f32, loudness: f32) -> Classification {
        classify(&ModelStatus::Ready, &RUNNING, frequency, loudness)
    }

    #[test]
    fn concert_a_is_in_tune() {
        let c = ready(440.0, 0.5);
        assert_eq!(c.state, TuningState::InTune);
        let result = c.result.unwrap();
        assert_eq!(result.label(), "A4");
        assert!(result.cents.abs() < 1e-3);
        assert_eq!(c.frequency, 440.0);
    }

    #[test]
    fn sharp_and_flat() {
        let sharp = ready(445.0, 0.5);
        assert_eq!(sharp.state, TuningState::Sharp);
        assert!(sharp.result.unwrap().cents > 0.0);

        let flat = ready(438.0, 0.5);
        // 438 Hz is about -7.9 cents, just outside the band.
        assert_eq!(flat.state, TuningState::Flat);
        assert!(flat.result.unwrap().cents < 0.0);
    }

    #[test]
    fn in_tune_band_edges() {
        // +5 cents is inside, +7 cents is outside.
        let five = 440.0 * 2.0_f32.powf(5.0 / 1200.0);
        let seven = 440.0 * 2.0_f32.powf(7.0 / 1200.0);
        let minus_seven = 440.0 * 2.0_f32.powf(-7.0 / 1200.0);
        assert_eq!(ready(five, 0.5).state, TuningState::InTune);
        assert_eq!(ready(seven, 0.5).state, TuningState::Sharp);
        assert_eq!(ready(minus_seven, 0.5).state, TuningState::Flat);
    }

    #[test]
    fn quiet_input_is_silent() {
        let c = ready(440.0, 0.01);
        assert_eq!(c.state, TuningState::Silent);
        assert!(c.result.is_none());
        assert_eq!(c.frequency, 0.0);

        assert_eq!(ready(440.0, LOUDNESS_GATE).state, TuningState::Silent);
        assert_eq!(ready(440.0, 0.021).state, TuningState::InTune);
    }

    #[test]
    fn no_pitch_or_out_of_band_is_silent() {
        assert_eq!(ready(0.0, 0.5).state, TuningState::Silent);
        assert_eq!(ready(50.0, 0.5).state, TuningState::Silent);
        assert_eq!(ready(6000.0, 0.5).state, TuningState::Silent);
        assert_eq!(ready(6000.0, 0.5).frequency, 6000.0);
    }

    #[test]
    fn loading_wins_over_everything() {
        for &(frequency, loudness) in &[(440.0, 0.5), (0.0, 0.0), (445.0, 1.0), (20.0, 0.9)] {
            for audio in [AudioStatus::Locked, RUNNING, AudioStatus::Failed("x".into())] {
                let c = classify(&ModelStatus::Loading, &audio, frequency, loudness);
                assert_eq!(c.state, TuningState::Loading);
                assert!(c.result.is_none());
            }
        }
    }

    #[test]
    fn load_failure_is_distinct_from_loading() {
        let c = classify(&ModelStatus::Failed("boom".into()), &RUNNING, 440.0, 0.5);
        assert_eq!(c.state, TuningState::LoadFailed);
    }

    #[test]
    fn locked_audio_waits_for_signal() {
        let c = classify(&ModelStatus::Ready, &AudioStatus::Locked, 440.0, 0.5);
        assert_eq!(c.state, TuningState::AwaitingSignal);
        assert!(c.result.is_none());

        let failed = AudioStatus::Failed("no device".into());
        assert_eq!(classify(&ModelStatus::Ready, &failed, 440.0, 0.5).state, TuningState::AwaitingSignal);
    }

    #[test]
    fn gate_passes_loud_input_through() {
        assert_eq!(effective_frequency(440.0, 0.5), 440.0);
        assert_eq!(effective_frequency(440.0, 0.02), 0.0);
        assert_eq!(effective_frequency(440.0, 0.0), 0.0);
    }

    #[test]
    fn only_pitched_states_carry_a_note() {
        assert!(TuningState::InTune.has_pitch());
        assert!(TuningState::Flat.has_pitch());
        assert!(!TuningState::Silent.has_pitch());
        assert!(!TuningState::Loading.has_pitch());
    }
}
