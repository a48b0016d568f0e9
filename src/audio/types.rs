//! Audio types and error definitions

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{info, warn};

/// Audio chunk ready to be streamed to the live session
///
/// PCM 16-bit mono at the realtime sample rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioChunk {
    pub fn duration_ms(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64 * 1000.0
    }
}

/// Owner of the microphone capture thread
///
/// Dropping the handle stops capture and joins the thread.
pub struct AudioCaptureHandle {
    pub(crate) running: Arc<AtomicBool>,
    pub(crate) worker: Option<JoinHandle<()>>,
}

impl AudioCaptureHandle {
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        let Some(worker) = self.worker.take() else {
            return;
        };
        if worker.join().is_err() {
            warn!("Audio capture thread panicked");
        }
        info!("Microphone released");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for AudioCaptureHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Microphone capture failures
#[derive(Debug, thiserror::Error)]
pub enum AudioCaptureError {
    #[error("No microphone available")]
    NoInputDevice,

    #[error("Microphone offers no usable input configuration")]
    NoSupportedConfig,

    #[error("Could not query microphone: {0}")]
    Device(String),

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("Could not open input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Could not start input stream: {0}")]
    Play(#[from] cpal::PlayStreamError),
}
