//! # Audio Capture Module
//!
//! This module handles real-time audio capture using CPAL (Cross-Platform Audio Library).
//! Capture does not start on its own: `AudioInput::unlock` is the explicit
//! user-gesture gate, and nothing is recorded before it is called.
//!
//! ## Features
//! - Automatic audio device selection
//! - Mono downmix of f32, i16 and u16 input
//! - Fixed-size analysis frames streamed to the pitch model
//! - Loudness metering on every callback

use crate::config::AudioConfig;
use crate::meter::LevelMeter;
use anyhow::{Result, anyhow};
use atomic_float::AtomicF32;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SupportedStreamConfigRange};
use crossbeam_channel::{RecvTimeoutError, Sender};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// One block of mono samples handed to the pitch model.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Where the audio input is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioStatus {
    /// Waiting for the user gesture that unlocks audio
    Locked,
    /// Capturing at the given sample rate
    Running { sample_rate: u32 },
    /// The device could not be opened
    Failed(String),
}

impl AudioStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, AudioStatus::Running { .. })
    }
}

/// Audio thread management structure.
///
/// The capture thread owns the `cpal::Stream` and parks on the shutdown
/// channel until the input is dropped.
#[derive(Debug)]
struct AudioWorker {
    shutdown_tx: Sender<()>,
    _thread_handle: JoinHandle<()>,
}

/// Microphone input gated behind an explicit unlock.
#[derive(Debug)]
pub struct AudioInput {
    frames: Sender<AudioFrame>,
    level: Arc<AtomicF32>,
    config: AudioConfig,
    status: AudioStatus,
    worker: Option<AudioWorker>,
}

impl AudioInput {
    /// # Arguments
    /// * `frames` - Where complete analysis frames are sent
    /// * `level` - Cell that receives the current loudness
    /// * `config` - Frame size and device preferences
    pub fn new(frames: Sender<AudioFrame>, level: Arc<AtomicF32>, config: AudioConfig) -> Self {
        Self {
            frames,
            level,
            config,
            status: AudioStatus::Locked,
            worker: None,
        }
    }

    pub fn status(&self) -> &AudioStatus {
        &self.status
    }

    /// Opens the audio gate and starts capture.
    ///
    /// Does nothing while capture is already running. After a failure,
    /// calling it again retries. Waits at most `start_timeout_ms` for the
    /// device; a device that never answers is reported as failed.
    pub fn unlock(&mut self) -> &AudioStatus {
        self.unlock_with(start_audio_capture)
    }

    /// `unlock` with the capture start-up supplied by the caller. Whatever
    /// `start` returns stays alive on the capture thread until shutdown.
    fn unlock_with<S, F>(&mut self, start: F) -> &AudioStatus
    where
        F: FnOnce(Sender<AudioFrame>, Arc<AtomicF32>, &AudioConfig) -> Result<(S, u32)> + Send + 'static,
    {
        if self.status.is_running() {
            return &self.status;
        }

        log::info!("Audio unlocked, starting capture...");
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<u32, String>>(1);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
        let frames = self.frames.clone();
        let level = Arc::clone(&self.level);
        let config = self.config.clone();

        let spawned = thread::Builder::new().name("audio-capture".to_string()).spawn(move || {
            let (capture, sample_rate) = match start(frames, level, &config) {
                Ok(tuple) => tuple,
                Err(e) => {
                    let _ = ready_tx.send(Err(e.to_string()));
                    return;
                }
            };
            if ready_tx.send(Ok(sample_rate)).is_err() {
                log::warn!("Audio device started after the unlock gave up; releasing it");
                return;
            }

            // Park until the input is dropped.
            let _ = shutdown_rx.recv();

            log::debug!("Stopping audio stream");
            drop(capture);
        });

        let thread_handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.status = AudioStatus::Failed(format!("could not spawn audio thread: {}", e));
                return &self.status;
            }
        };

        let timeout = Duration::from_millis(self.config.start_timeout_ms);
        self.status = match ready_rx.recv_timeout(timeout) {
            Ok(Ok(sample_rate)) => {
                self.worker = Some(AudioWorker {
                    shutdown_tx,
                    _thread_handle: thread_handle,
                });
                log::info!("Audio capture running at {} Hz", sample_rate);
                AudioStatus::Running { sample_rate }
            }
            Ok(Err(message)) => {
                log::error!("Could not start audio: {}", message);
                AudioStatus::Failed(message)
            }
            Err(RecvTimeoutError::Timeout) => {
                log::error!("Audio device did not start within {:?}", timeout);
                AudioStatus::Failed(format!("audio device timed out after {} ms", timeout.as_millis()))
            }
            Err(RecvTimeoutError::Disconnected) => {
                AudioStatus::Failed("audio thread exited unexpectedly".to_string())
            }
        };
        &self.status
    }
}

impl Drop for AudioInput {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.shutdown_tx.try_send(());
        }
    }
}

/// The playing cpal stream, paused before it is released.
struct CaptureStream(cpal::Stream);

impl Drop for CaptureStream {
    fn drop(&mut self) {
        if let Err(e) = self.0.pause() {
            log::warn!("Error pausing stream: {}", e);
        }
    }
}

/// Chops a mono sample stream into fixed-size frames and meters loudness.
struct FrameAssembler {
    frames: Sender<AudioFrame>,
    level: Arc<AtomicF32>,
    meter: LevelMeter,
    buffer: Vec<f32>,
    frame_size: usize,
    sample_rate: u32,
}

impl FrameAssembler {
    fn push(&mut self, mono: &[f32]) {
        self.level.store(self.meter.process(mono), Ordering::Relaxed);
        self.buffer.extend_from_slice(mono);

        while self.buffer.len() >= self.frame_size {
            let samples = self.buffer[..self.frame_size].to_vec();
            // Send the frame, dropping it if the model is behind.
            let _ = self.frames.try_send(AudioFrame {
                samples,
                sample_rate: self.sample_rate,
            });
            self.buffer.drain(..self.frame_size);
        }
    }
}

/// Averages interleaved channels into a mono buffer.
fn downmix(data: &[f32], channels: usize, out: &mut Vec<f32>) {
    out.clear();
    if channels <= 1 {
        out.extend_from_slice(data);
        return;
    }
    out.extend(
        data.chunks_exact(channels)
            .map(|chunk| chunk.iter().sum::<f32>() / channels as f32),
    );
}

/// Starts audio capture from the default input device.
///
/// # Returns
/// * `Ok((stream, sample_rate))` - Playing stream handle and its sample rate
/// * `Err(e)` - No device, no usable format, or the stream failed to start
fn start_audio_capture(
    frames: Sender<AudioFrame>,
    level: Arc<AtomicF32>,
    config: &AudioConfig,
) -> Result<(CaptureStream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    log::info!("Using audio input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = match find_supported_config(configs, config.target_sample_rate) {
        Some(range) => {
            let rate = config
                .target_sample_rate
                .clamp(range.min_sample_rate().0, range.max_sample_rate().0);
            range.with_sample_rate(cpal::SampleRate(rate))
        }
        None => device.default_input_config()?,
    };

    let sample_format = supported_config.sample_format();
    let stream_config: cpal::StreamConfig = supported_config.into();
    let sample_rate = stream_config.sample_rate.0;
    let channels = stream_config.channels as usize;

    log::info!(
        "Audio config: {:?} @ {} Hz, {} channel(s)",
        sample_format,
        sample_rate,
        channels
    );

    let mut assembler = FrameAssembler {
        frames,
        level,
        meter: LevelMeter::new(config.level_smoothing),
        buffer: Vec::with_capacity(config.buffer_size * 2),
        frame_size: config.buffer_size,
        sample_rate,
    };
    let mut mono = Vec::new();
    let mut converted = Vec::new();

    let err_fn = |err| log::error!("An error occurred on the audio stream: {}", err);

    let stream = match sample_format {
        SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                downmix(data, channels, &mut mono);
                assembler.push(&mono);
            },
            err_fn,
            None,
        )?,
        SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                converted.clear();
                converted.extend(data.iter().map(|&s| s as f32 / 32768.0));
                downmix(&converted, channels, &mut mono);
                assembler.push(&mono);
            },
            err_fn,
            None,
        )?,
        SampleFormat::U16 => device.build_input_stream(
            &stream_config,
            move |data: &[u16], _: &cpal::InputCallbackInfo| {
                converted.clear();
                converted.extend(data.iter().map(|&s| (s as f32 - 32768.0) / 32768.0));
                downmix(&converted, channels, &mut mono);
                assembler.push(&mono);
            },
            err_fn,
            None,
        )?,
        other => return Err(anyhow!("Unsupported audio sample format: {:?}", other)),
    };

    stream.play()?;

    Ok((CaptureStream(stream), sample_rate))
}

/// Finds the best supported configuration for the target sample rate.
///
/// Prefers mono 32-bit float input whose range is closest to `target_rate`.
/// Returns `None` when the device offers no such format, in which case the
/// device default is used and downmixed.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.channels() == 1 && c.sample_format() == SampleFormat::F32)
        .min_by_key(|c| {
            let min_diff = (c.min_sample_rate().0 as i64 - target_rate as i64).abs();
            let max_diff = (c.max_sample_rate().0 as i64 - target_rate as i64).abs();
            min_diff.min(max_diff)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn assembler(frame_size: usize) -> (FrameAssembler, crossbeam_channel::Receiver<AudioFrame>, Arc<AtomicF32>) {
        let (tx, rx) = crossbeam_channel::bounded(2);
        let level = Arc::new(AtomicF32::default());
        let assembler = FrameAssembler {
            frames: tx,
            level: Arc::clone(&level),
            meter: LevelMeter::new(0.0),
            buffer: Vec::new(),
            frame_size,
            sample_rate: 48000,
        };
        (assembler, rx, level)
    }

    #[test]
    fn emits_whole_frames_only() {
        let (mut assembler, rx, _) = assembler(4);
        assembler.push(&[0.1, 0.2, 0.3]);
        assert!(rx.try_recv().is_err());

        assembler.push(&[0.4, 0.5, 0.6]);
        let frame = rx.try_recv().unwrap();
        assert_eq!(frame.samples, vec![0.1, 0.2, 0.3, 0.4]);
        assert_eq!(frame.sample_rate, 48000);
        assert_eq!(assembler.buffer, vec![0.5, 0.6]);
    }

    #[test]
    fn full_queue_drops_frames_without_blocking() {
        let (mut assembler, rx, _) = assembler(2);
        assembler.push(&[0.0; 10]);
        assert_eq!(rx.len(), 2);
        assert!(assembler.buffer.is_empty());
    }

    #[test]
    fn level_tracks_each_callback() {
        let (mut assembler, _rx, level) = assembler(1024);
        assembler.push(&[0.5; 64]);
        assert!((level.load(Ordering::Relaxed) - 0.5).abs() < 1e-6);
        assembler.push(&[0.0; 64]);
        assert_eq!(level.load(Ordering::Relaxed), 0.0);
    }

    fn input(start_timeout_ms: u64) -> AudioInput {
        let (tx, _rx) = crossbeam_channel::bounded(2);
        let config = AudioConfig {
            start_timeout_ms,
            ..AudioConfig::default()
        };
        AudioInput::new(tx, Arc::new(AtomicF32::default()), config)
    }

    #[test]
    fn hung_device_times_out_and_can_be_retried() {
        let mut input = input(50);
        let started = Instant::now();
        let status = input
            .unlock_with(|_, _, _| {
                thread::sleep(Duration::from_secs(2));
                Ok(((), 48000))
            })
            .clone();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(matches!(&status, AudioStatus::Failed(msg) if msg.contains("timed out")), "{:?}", status);

        let status = input.unlock_with(|_, _, _| Ok(((), 48000))).clone();
        assert_eq!(status, AudioStatus::Running { sample_rate: 48000 });
    }

    #[test]
    fn device_error_is_reported() {
        let mut input = input(1000);
        let status = input
            .unlock_with(|_, _, _| Err::<((), u32), _>(anyhow!("No input device available")))
            .clone();
        assert_eq!(status, AudioStatus::Failed("No input device available".to_string()));
    }

    #[test]
    fn running_input_ignores_further_unlocks() {
        let mut input = input(1000);
        input.unlock_with(|_, _, _| Ok(((), 44100)));
        let status = input
            .unlock_with(|_, _, _| Err::<((), u32), _>(anyhow!("should not be started again")))
            .clone();
        assert_eq!(status, AudioStatus::Running { sample_rate: 44100 });
    }

    #[test]
    fn stereo_is_averaged() {
        let mut out = Vec::new();
        downmix(&[1.0, 0.0, 0.5, 0.5, -1.0, 1.0], 2, &mut out);
        assert_eq!(out, vec![0.5, 0.5, 0.0]);

        downmix(&[0.25, 0.75], 1, &mut out);
        assert_eq!(out, vec![0.25, 0.75]);
    }
}
