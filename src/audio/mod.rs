//! Microphone capture for live sessions
//!
//! Captures the default input device over cpal on a dedicated thread and
//! delivers mono PCM16 chunks at the realtime sample rate, resampling when
//! the device cannot run at that rate natively.

mod resampler;
mod types;

pub use types::{AudioCaptureError, AudioCaptureHandle, AudioChunk};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use resampler::{ChunkAssembler, SharedAssembler};
use rubato::{SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Sample rate expected by the Realtime API (24kHz PCM16)
pub const REALTIME_SAMPLE_RATE: u32 = 24000;

/// Chunk size in samples (0.1 seconds at 24kHz)
pub const CHUNK_SIZE: usize = 2400;

/// Chunks buffered between the capture thread and the session (one minute)
const CHUNK_QUEUE: usize = 600;

/// Start microphone capture
///
/// Device problems are reported from the capture thread through the log;
/// the chunk receiver then closes and the session carries on text-only.
pub fn start_capture(
) -> Result<(AudioCaptureHandle, mpsc::Receiver<AudioChunk>), AudioCaptureError> {
    let running = Arc::new(AtomicBool::new(true));
    let (chunk_tx, chunk_rx) = mpsc::channel(CHUNK_QUEUE);

    let flag = running.clone();
    let worker = thread::Builder::new()
        .name("lexvox-audio".into())
        .spawn(move || {
            if let Err(e) = capture_loop(&flag, chunk_tx) {
                error!("Microphone capture failed: {}", e);
            }
            flag.store(false, Ordering::SeqCst);
        })
        .map_err(|e| AudioCaptureError::Device(e.to_string()))?;

    Ok((
        AudioCaptureHandle {
            running,
            worker: Some(worker),
        },
        chunk_rx,
    ))
}

/// Pick an input config, preferring one that runs at `target_rate`
fn choose_config(
    device: &cpal::Device,
    target_rate: u32,
) -> Result<cpal::SupportedStreamConfig, AudioCaptureError> {
    let ranges: Vec<_> = device
        .supported_input_configs()
        .map_err(|e| AudioCaptureError::Device(e.to_string()))?
        .filter(|c| c.channels() > 0)
        .collect();

    let exact = ranges.iter().find(|c| {
        c.min_sample_rate().0 <= target_rate && c.max_sample_rate().0 >= target_rate
    });
    match exact {
        Some(range) => Ok(range.clone().with_sample_rate(cpal::SampleRate(target_rate))),
        None => ranges
            .into_iter()
            .next()
            .map(|range| range.with_max_sample_rate())
            .ok_or(AudioCaptureError::NoSupportedConfig),
    }
}

/// Resampler producing `CHUNK_SIZE` frames per call, with its input frame count
fn build_resampler(source_rate: u32, target_rate: u32) -> Option<(SincFixedIn<f32>, usize)> {
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let frames = (CHUNK_SIZE as f64 * source_rate as f64 / target_rate as f64).ceil() as usize;
    let ratio = target_rate as f64 / source_rate as f64;
    match SincFixedIn::<f32>::new(ratio, 2.0, params, frames, 1) {
        Ok(resampler) => Some((resampler, frames)),
        Err(e) => {
            error!("Failed to create resampler, sending audio unresampled: {}", e);
            None
        }
    }
}

/// Open an input stream for sample type `T`, converting to i16 in the callback
fn open_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    running: &Arc<AtomicBool>,
    assembler: &SharedAssembler,
) -> Result<cpal::Stream, AudioCaptureError>
where
    T: SizedSample,
    i16: FromSample<T>,
{
    let channels = config.channels as usize;
    let running = running.clone();
    let assembler = assembler.clone();
    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            if !running.load(Ordering::SeqCst) {
                return;
            }
            let samples: Vec<i16> = data.iter().map(|&s| s.to_sample::<i16>()).collect();
            if let Ok(mut assembler) = assembler.lock() {
                assembler.push(&samples, channels);
            }
        },
        |err| error!("Microphone stream error: {}", err),
        None,
    )?;
    Ok(stream)
}

/// Blocking capture on the current thread until `running` is cleared
fn capture_loop(
    running: &Arc<AtomicBool>,
    chunk_tx: mpsc::Sender<AudioChunk>,
) -> Result<(), AudioCaptureError> {
    let device = cpal::default_host()
        .default_input_device()
        .ok_or(AudioCaptureError::NoInputDevice)?;
    let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

    let supported = choose_config(&device, REALTIME_SAMPLE_RATE)?;
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();
    let device_rate = config.sample_rate.0;

    info!(
        device = %device_name,
        channels = config.channels,
        sample_rate = device_rate,
        format = ?sample_format,
        "Opening microphone"
    );

    let resampler = if device_rate == REALTIME_SAMPLE_RATE {
        None
    } else {
        warn!(
            "{}Hz not supported, capturing at {}Hz and resampling",
            REALTIME_SAMPLE_RATE, device_rate
        );
        build_resampler(device_rate, REALTIME_SAMPLE_RATE)
    };
    let assembler: SharedAssembler = Arc::new(Mutex::new(ChunkAssembler::new(
        REALTIME_SAMPLE_RATE,
        CHUNK_SIZE,
        resampler,
        chunk_tx,
    )));

    let stream = match sample_format {
        SampleFormat::I16 => open_stream::<i16>(&device, &config, running, &assembler)?,
        SampleFormat::U16 => open_stream::<u16>(&device, &config, running, &assembler)?,
        SampleFormat::F32 => open_stream::<f32>(&device, &config, running, &assembler)?,
        other => return Err(AudioCaptureError::UnsupportedFormat(format!("{:?}", other))),
    };
    stream.play()?;
    info!("Microphone capture started");

    while running.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(100));
    }
    drop(stream);
    Ok(())
}
