//! # Main Display Module
//!
//! Picks which screen to show (start-up error, loading, load failure or the
//! live tuner) and wraps it in the click target that unlocks audio.

use iced::widget::{canvas, mouse_area};
use iced::{Element, Length};
use xenolux_core::{AudioStatus, TuningState};

use super::tuner_canvas::{Screen, TunerCanvas};

/// Creates the complete main application view.
pub fn create_main_view(data: &crate::AppDisplayData) -> Element<'static, crate::Message> {
    let screen = select_screen(data);

    let canvas = canvas::Canvas::new(TunerCanvas::new(screen))
        .width(Length::Fill)
        .height(Length::Fill);

    mouse_area(canvas)
        .on_press(crate::Message::ActivateAudio)
        .into()
}

/// Chooses the screen for the current display data.
fn select_screen(data: &crate::AppDisplayData) -> Screen {
    if let Some(error) = &data.startup_error {
        return Screen::Failed {
            title: "Tuner failed to start",
            detail: error.clone(),
        };
    }

    let Some(frame) = data.frame else {
        return Screen::Loading;
    };

    match frame.state {
        TuningState::Loading => Screen::Loading,
        TuningState::LoadFailed => Screen::Failed {
            title: "Pitch model failed to load",
            detail: data.load_failure.clone().unwrap_or_default(),
        },
        _ => Screen::Tuner {
            frame,
            ring: data.ring,
            diagnostics: audio_diagnostic(&data.audio_status),
            prompt: !data.audio_status.is_running(),
        },
    }
}

/// Status line describing the audio input.
fn audio_diagnostic(status: &AudioStatus) -> String {
    match status {
        AudioStatus::Locked => "Audio input: locked".to_string(),
        AudioStatus::Running { sample_rate } => format!("Audio input: running at {} Hz", sample_rate),
        AudioStatus::Failed(message) => format!("Audio input: unavailable ({})", message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xenolux_core::FrameReport;

    fn data(state: TuningState, load_failure: Option<&str>) -> crate::AppDisplayData {
        crate::AppDisplayData {
            startup_error: None,
            load_failure: load_failure.map(str::to_string),
            audio_status: AudioStatus::Locked,
            frame: Some(FrameReport {
                state,
                result: None,
                frequency: 0.0,
                loudness: 0.0,
            }),
            ring: None,
        }
    }

    #[test]
    fn loading_model_shows_loading_screen() {
        assert!(matches!(select_screen(&data(TuningState::Loading, None)), Screen::Loading));
    }

    #[test]
    fn no_frame_yet_shows_loading_screen() {
        let mut data = data(TuningState::AwaitingSignal, None);
        data.frame = None;
        assert!(matches!(select_screen(&data), Screen::Loading));
    }

    #[test]
    fn failed_model_shows_reason() {
        match select_screen(&data(TuningState::LoadFailed, Some("bad frame size"))) {
            Screen::Failed { detail, .. } => assert_eq!(detail, "bad frame size"),
            _ => panic!("expected failure screen"),
        }
    }

    #[test]
    fn screen_follows_the_frame_state() {
        // The failure message may already be known while the frame still
        // says Loading; the frame decides.
        let data = data(TuningState::Loading, Some("bad frame size"));
        assert!(matches!(select_screen(&data), Screen::Loading));
    }

    #[test]
    fn locked_audio_prompts_for_a_click() {
        match select_screen(&data(TuningState::AwaitingSignal, None)) {
            Screen::Tuner { prompt, diagnostics, .. } => {
                assert!(prompt);
                assert_eq!(diagnostics, "Audio input: locked");
            }
            _ => panic!("expected tuner screen"),
        }
    }

    #[test]
    fn startup_error_wins() {
        let mut data = data(TuningState::Loading, None);
        data.startup_error = Some("invalid configuration".into());
        match select_screen(&data) {
            Screen::Failed { title, detail } => {
                assert_eq!(title, "Tuner failed to start");
                assert_eq!(detail, "invalid configuration");
            }
            _ => panic!("expected failure screen"),
        }
    }

    #[test]
    fn diagnostics_name_the_sample_rate() {
        assert_eq!(
            audio_diagnostic(&AudioStatus::Running { sample_rate: 48000 }),
            "Audio input: running at 48000 Hz"
        );
    }
}
