//! # Pitch Stream Module
//!
//! Runs a pitch model on a dedicated worker thread as a never-ending chain
//! of requests. Every completed inference, successful or not, is published
//! to a shared cell and immediately followed by the next request. The
//! render loop reads the cell whenever it likes.
//!
//! ## Lifecycle
//! 1. `spawn` starts the worker, which loads the model exactly once
//! 2. On success the status flips to `Ready` and the chain begins
//! 3. On failure the status becomes `Failed` and the worker exits
//! 4. Dropping the stream ends the chain after the current request

use crate::model::{ModelError, PitchModel};
use atomic_float::AtomicF32;
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};

const STATUS_LOADING: u8 = 0;
const STATUS_READY: u8 = 1;
const STATUS_FAILED: u8 = 2;

/// Load state of the pitch model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelStatus {
    /// Model assets are still loading; no estimates yet
    Loading,
    /// The inference chain is running
    Ready,
    /// Loading failed; terminal for the session
    Failed(String),
}

/// Values written by the worker and read by the render loop.
#[derive(Debug, Default)]
struct StreamShared {
    frequency: AtomicF32,
    status: AtomicU8,
    failure: OnceLock<String>,
    cycles: AtomicU64,
}

/// Handle to the perpetual inference chain.
#[derive(Debug)]
pub struct PitchStream {
    shared: Arc<StreamShared>,
    // Never sent on: dropping it disconnects the worker's receiver.
    _shutdown_tx: Sender<()>,
    _thread_handle: JoinHandle<()>,
}

impl PitchStream {
    /// Starts the worker thread for `model`.
    ///
    /// Returns as soon as the thread is running; loading happens on the
    /// worker so the caller can keep rendering the loading state.
    pub fn spawn<M: PitchModel>(model: M) -> std::io::Result<Self> {
        let shared = Arc::new(StreamShared::default());
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);

        let worker_shared = Arc::clone(&shared);
        let thread_handle = thread::Builder::new()
            .name("pitch-stream".to_string())
            .spawn(move || run_chain(model, &worker_shared, &shutdown_rx))?;

        Ok(Self {
            shared,
            _shutdown_tx: shutdown_tx,
            _thread_handle: thread_handle,
        })
    }

    pub fn status(&self) -> ModelStatus {
        match self.shared.status.load(Ordering::Acquire) {
            STATUS_READY => ModelStatus::Ready,
            STATUS_FAILED => ModelStatus::Failed(
                self.shared
                    .failure
                    .get()
                    .cloned()
                    .unwrap_or_else(|| "unknown error".to_string()),
            ),
            _ => ModelStatus::Loading,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.shared.status.load(Ordering::Acquire) == STATUS_READY
    }

    /// Latest published estimate in Hz, 0.0 when nothing is pitched.
    pub fn current_frequency(&self) -> f32 {
        self.shared.frequency.load(Ordering::Relaxed)
    }

    /// Number of inference requests completed so far.
    pub fn cycles(&self) -> u64 {
        self.shared.cycles.load(Ordering::Relaxed)
    }
}

/// Worker body: load once, then request estimates until shut down.
fn run_chain<M: PitchModel>(mut model: M, shared: &StreamShared, shutdown_rx: &Receiver<()>) {
    log::info!("Loading pitch model...");
    match guarded(|| model.load()) {
        Ok(()) => {
            shared.status.store(STATUS_READY, Ordering::Release);
            log::info!("Pitch model loaded");
        }
        Err(e) => {
            let _ = shared.failure.set(e.to_string());
            shared.status.store(STATUS_FAILED, Ordering::Release);
            log::error!("{}", e);
            return;
        }
    }

    loop {
        match shutdown_rx.try_recv() {
            Err(TryRecvError::Empty) => {}
            Ok(()) | Err(TryRecvError::Disconnected) => break,
        }

        let estimate = match guarded(|| model.infer_next()) {
            Ok(Some(frequency)) if frequency.is_finite() && frequency > 0.0 => frequency,
            Ok(_) => 0.0,
            Err(e) => {
                log::debug!("Inference cycle failed: {}", e);
                0.0
            }
        };
        shared.frequency.store(estimate, Ordering::Relaxed);
        shared.cycles.fetch_add(1, Ordering::Relaxed);
    }
    log::debug!("Pitch stream stopped");
}

/// Runs a model call, turning a panic into an ordinary failed cycle.
fn guarded<T>(call: impl FnOnce() -> Result<T, ModelError>) -> Result<T, ModelError> {
    panic::catch_unwind(AssertUnwindSafe(call))
        .unwrap_or_else(|_| Err(ModelError::Inference("model panicked".to_string())))
}
