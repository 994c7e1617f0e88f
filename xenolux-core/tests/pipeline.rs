//! End-to-end: synthetic audio frames → YIN model → pitch stream → classifier.

use std::time::{Duration, Instant};
use xenolux_core::config::DetectorConfig;
use xenolux_core::model::YinModel;
use xenolux_core::visual;
use xenolux_core::{AudioFrame, AudioStatus, ModelStatus, PitchStream, TuningState, classify};

const SAMPLE_RATE: u32 = 44100;
const FRAME: usize = 2048;
const RUNNING: AudioStatus = AudioStatus::Running { sample_rate: SAMPLE_RATE };

fn tone(frequency: f32) -> AudioFrame {
    AudioFrame {
        samples: (0..FRAME)
            .map(|i| 0.4 * (2.0 * std::f32::consts::PI * frequency * i as f32 / SAMPLE_RATE as f32).sin())
            .collect(),
        sample_rate: SAMPLE_RATE,
    }
}

/// Feeds `frequency` until the stream publishes something close to it.
fn drive(
    stream: &PitchStream,
    frames: &crossbeam_channel::Sender<AudioFrame>,
    frequency: f32,
) -> f32 {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        let _ = frames.try_send(tone(frequency));
        let published = stream.current_frequency();
        if (published - frequency).abs() < 1.0 {
            return published;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    panic!("stream never published {} Hz", frequency);
}

fn start() -> (PitchStream, crossbeam_channel::Sender<AudioFrame>) {
    let (tx, rx) = crossbeam_channel::bounded(4);
    let config = DetectorConfig {
        idle_timeout_ms: 10,
        refine_with_spectrum: false,
        ..DetectorConfig::default()
    };
    let stream = PitchStream::spawn(YinModel::new(rx, FRAME, config)).unwrap();
    (stream, tx)
}

#[test]
fn sung_a_locks_in() {
    let (stream, frames) = start();
    let published = drive(&stream, &frames, 440.0);

    let frame = classify(&stream.status(), &RUNNING, published, 0.5);
    assert_eq!(frame.state, TuningState::InTune);
    assert_eq!(frame.result.unwrap().label(), "A4");
}

#[test]
fn quarter_tone_sharp_reads_sharp() {
    let (stream, frames) = start();
    // 25 cents above G3.
    let target = 196.0 * 2.0_f32.powf(25.0 / 1200.0);
    let published = drive(&stream, &frames, target);

    let frame = classify(&stream.status(), &RUNNING, published, 0.5);
    assert_eq!(frame.state, TuningState::Sharp);
    assert_eq!(frame.result.unwrap().label(), "G3");
    assert_eq!(visual::headline(frame.state).unwrap().0, "SHARP");
}

#[test]
fn silence_after_a_note_drops_to_zero() {
    let (stream, frames) = start();
    drive(&stream, &frames, 330.0);

    // Stop feeding audio: idle cycles report no pitch.
    let deadline = Instant::now() + Duration::from_secs(5);
    while stream.current_frequency() != 0.0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(stream.current_frequency(), 0.0);
    assert_eq!(stream.status(), ModelStatus::Ready);

    let frame = classify(&stream.status(), &RUNNING, stream.current_frequency(), 0.5);
    assert_eq!(frame.state, TuningState::Silent);
}

#[test]
fn loud_pitch_under_the_gate_is_ignored() {
    let (stream, frames) = start();
    let published = drive(&stream, &frames, 440.0);

    let frame = classify(&stream.status(), &RUNNING, published, 0.01);
    assert_eq!(frame.state, TuningState::Silent);
    assert!(visual::pitch_ring(&xenolux_core::FrameReport {
        state: frame.state,
        result: frame.result,
        frequency: frame.frequency,
        loudness: 0.01,
    })
    .is_none());
}
