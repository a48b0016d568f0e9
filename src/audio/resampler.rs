//! Audio resampling and sample processing

use super::types::AudioChunk;
use rubato::{Resampler, SincFixedIn};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{error, warn};

/// Buffers captured samples and emits fixed-size chunks at the target rate
pub(crate) struct ChunkAssembler {
    target_sample_rate: u32,
    chunk_size: usize,
    input_chunk_size: usize,
    input_buffer: Vec<i16>,
    output_buffer: Vec<i16>,
    resampler: Option<SincFixedIn<f32>>,
    sender: mpsc::Sender<AudioChunk>,
}

impl ChunkAssembler {
    pub(crate) fn new(
        target_sample_rate: u32,
        chunk_size: usize,
        resampler: Option<(SincFixedIn<f32>, usize)>,
        sender: mpsc::Sender<AudioChunk>,
    ) -> Self {
        let (resampler, input_chunk_size) = match resampler {
            Some((resampler, frames)) => (Some(resampler), frames),
            None => (None, chunk_size),
        };
        Self {
            target_sample_rate,
            chunk_size,
            input_chunk_size,
            input_buffer: Vec::with_capacity(input_chunk_size * 2),
            output_buffer: Vec::with_capacity(chunk_size * 2),
            resampler,
            sender,
        }
    }

    /// Process interleaved samples: downmix, resample if configured, send chunks
    pub(crate) fn push(&mut self, data: &[i16], channels: usize) {
        let mono = downmix(data, channels);
        if self.resampler.is_some() {
            self.input_buffer.extend(mono);
            self.resample_buffered();
        } else {
            self.output_buffer.extend(mono);
        }
        self.send_chunks();
    }

    fn resample_buffered(&mut self) {
        let Some(resampler) = self.resampler.as_mut() else {
            return;
        };
        while self.input_buffer.len() >= self.input_chunk_size {
            let input_f32: Vec<f32> = self
                .input_buffer
                .drain(..self.input_chunk_size)
                .map(|s| s as f32 / 32768.0)
                .collect();

            match resampler.process(&[input_f32], None) {
                Ok(resampled) => {
                    self.output_buffer.extend(
                        resampled[0]
                            .iter()
                            .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16),
                    );
                }
                Err(e) => {
                    error!("Resampling error: {}", e);
                }
            }
        }
    }

    fn send_chunks(&mut self) {
        while self.output_buffer.len() >= self.chunk_size {
            let chunk = AudioChunk {
                samples: self.output_buffer.drain(..self.chunk_size).collect(),
                sample_rate: self.target_sample_rate,
            };
            // Use try_send to avoid blocking the audio callback
            if let Err(e) = self.sender.try_send(chunk) {
                warn!("Audio buffer overflow - chunk dropped: {}", e);
                return;
            }
        }
    }
}

/// Convert interleaved frames to mono by averaging channels
pub(crate) fn downmix(data: &[i16], channels: usize) -> Vec<i16> {
    if channels > 1 {
        data.chunks(channels)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                (sum / frame.len() as i32) as i16
            })
            .collect()
    } else {
        data.to_vec()
    }
}

/// Shared assembler for use from the cpal callback
pub(crate) type SharedAssembler = Arc<Mutex<ChunkAssembler>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downmix_averages_channels() {
        assert_eq!(downmix(&[100, 300, -50, 50], 2), vec![200, 0]);
        assert_eq!(downmix(&[1, 2, 3], 1), vec![1, 2, 3]);
    }

    #[test]
    fn test_downmix_partial_frame() {
        assert_eq!(downmix(&[10, 20, 30, 40, 50], 2), vec![15, 35, 50]);
    }

    #[test]
    fn test_direct_chunks_carry_target_rate() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut assembler = ChunkAssembler::new(24000, 4, None, tx);

        assembler.push(&[1, 2, 3], 1);
        assert!(rx.try_recv().is_err());

        assembler.push(&[4, 5, 6, 7, 8, 9], 1);
        let first = rx.try_recv().unwrap();
        assert_eq!(first.samples, vec![1, 2, 3, 4]);
        assert_eq!(first.sample_rate, 24000);
        assert_eq!(rx.try_recv().unwrap().samples, vec![5, 6, 7, 8]);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_overflow_drops_chunks_without_blocking() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut assembler = ChunkAssembler::new(24000, 2, None, tx);
        assembler.push(&[1, 2, 3, 4, 5, 6], 1);
        assert_eq!(rx.try_recv().unwrap().samples, vec![1, 2]);
        assert!(rx.try_recv().is_err());
    }
}
