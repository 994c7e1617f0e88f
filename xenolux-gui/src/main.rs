//! # Xenolux - Real-Time Tuner GUI
//!
//! The Iced front end for the Xenolux tuner. Shows how close the sung or
//! played pitch is to the nearest equal-tempered note.
//!
//! ## Architecture
//! - **Main Thread**: Iced application, one `Tick` per frame (~60 FPS)
//! - **Pitch Thread**: Perpetual inference chain owned by the core `Session`
//! - **Audio Thread**: CPAL capture, started only after the first click

mod ui;

use iced::{Element, Subscription, Theme};
use std::time::Duration;
use ui::main_display::create_main_view;
use xenolux_core::visual::{self, Animator, RingPose, RingStyle};
use xenolux_core::{AudioStatus, FrameReport, ModelStatus, Session, TunerConfig, TuningState};

/// Main entry point for the Xenolux application.
pub fn main() -> iced::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Starting Xenolux...");

    let result = iced::application("Xenolux", TunerApp::update, TunerApp::view)
        .subscription(TunerApp::subscription)
        .theme(TunerApp::theme)
        .run();
    log::info!("Application finished with result: {:?}", result);
    result
}

/// Application message types.
#[derive(Debug, Clone)]
pub enum Message {
    /// Timer tick for real-time updates
    Tick,
    /// The user clicked the window; unlocks audio capture
    ActivateAudio,
}

/// UI-specific data needed for rendering one frame.
#[derive(Debug, Clone)]
pub struct AppDisplayData {
    /// Set when the session itself could not be started
    pub startup_error: Option<String>,
    /// Reason the pitch model failed to load, once it has
    pub load_failure: Option<String>,
    pub audio_status: AudioStatus,
    pub frame: Option<FrameReport>,
    /// Pitch ring style and animated pose, when a note is shown
    pub ring: Option<(RingStyle, RingPose)>,
}

/// Main application state.
struct TunerApp {
    session: Option<Session>,
    animator: Animator,
    frame_interval: Duration,
    last_state: Option<TuningState>,
    display_data: AppDisplayData,
}

impl Default for TunerApp {
    /// Loads the config and starts the session. Audio stays locked until
    /// the first click.
    fn default() -> Self {
        let config_path = TunerConfig::default_path();
        let config = TunerConfig::load_or_default(&config_path);
        if !config_path.exists() {
            match config.save(&config_path) {
                Ok(()) => log::info!("Wrote default config to {}", config_path.display()),
                Err(e) => log::warn!("Could not write default config: {}", e),
            }
        }

        let (session, startup_error) = match Session::start(config) {
            Ok(session) => (Some(session), None),
            Err(e) => {
                log::error!("Could not start tuning session: {:#}", e);
                (None, Some(format!("{:#}", e)))
            }
        };

        // Only a validated config drives the display.
        let display = session
            .as_ref()
            .map(|session| session.config().display.clone())
            .unwrap_or_default();
        let animator = Animator::new(display.rotation_step, display.ring_smoothing);
        let frame_interval = Duration::from_millis(display.frame_interval_ms);

        Self {
            session,
            animator,
            frame_interval,
            last_state: None,
            display_data: AppDisplayData {
                startup_error,
                load_failure: None,
                audio_status: AudioStatus::Locked,
                frame: None,
                ring: None,
            },
        }
    }
}

impl TunerApp {
    fn update(&mut self, message: Message) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        match message {
            Message::ActivateAudio => {
                if !session.audio_status().is_running() {
                    let status = session.unlock_audio().clone();
                    self.display_data.audio_status = status;
                }
            }
            Message::Tick => {
                let frame = session.frame();
                if self.last_state != Some(frame.state) {
                    log::debug!("Tuning state: {:?}", frame.state);
                    self.last_state = Some(frame.state);
                }

                let ring = visual::pitch_ring(&frame);
                let pose = self.animator.advance(ring.as_ref());

                if frame.state == TuningState::LoadFailed && self.display_data.load_failure.is_none() {
                    if let ModelStatus::Failed(message) = session.model_status() {
                        self.display_data.load_failure = Some(message);
                    }
                }
                self.display_data.audio_status = session.audio_status().clone();
                self.display_data.ring = ring.zip(pose);
                self.display_data.frame = Some(frame);
            }
        }
    }

    fn view(&self) -> Element<'_, Message> {
        create_main_view(&self.display_data)
    }

    /// Fires every `frame_interval` to drive the render loop.
    fn subscription(&self) -> Subscription<Message> {
        iced::time::every(self.frame_interval).map(|_| Message::Tick)
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }
}
