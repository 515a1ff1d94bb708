//! Assembly and persistence of synthesized audio.
//!
//! The engine yields its output lazily, one chunk at a time; [`assemble`] is
//! a fold over that sequence into a single buffer, and [`AudioSink`] writes
//! the buffer out as a uniquely named 16-bit PCM WAV.

use std::path::PathBuf;

use tracing::debug;
use uuid::Uuid;

use super::engine::{AudioChunk, SpeechStream};
use crate::config::ensure_dir;

pub type AudioResult<T> = Result<T, AudioError>;

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("no audio returned from model")]
    EmptyOutput,

    #[error("chunk channel layout changed mid-stream: {0} then {1}")]
    ChannelMismatch(u16, u16),

    #[error("engine stream failed: {0}")]
    Stream(#[from] super::engine::EngineError),

    #[error("failed to encode audio: {0}")]
    Encode(#[from] hound::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Fully assembled audio, interleaved along the time axis
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl AudioBuffer {
    /// Number of frames (samples per channel)
    pub fn num_frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }
}

/// Drain the chunk sequence completely, concatenating along the time axis in
/// yield order and preserving channel layout.
///
/// A sequence that produces zero chunks is always an error.
pub fn assemble(stream: SpeechStream) -> AudioResult<AudioBuffer> {
    let mut channels: Option<u16> = None;
    let mut samples: Vec<f32> = Vec::new();

    for chunk in stream {
        let AudioChunk {
            channels: chunk_channels,
            samples: chunk_samples,
        } = chunk?;
        match channels {
            None => channels = Some(chunk_channels),
            Some(expected) if expected != chunk_channels => {
                return Err(AudioError::ChannelMismatch(expected, chunk_channels));
            }
            Some(_) => {}
        }
        samples.extend(chunk_samples);
    }

    match channels {
        Some(channels) => Ok(AudioBuffer { channels, samples }),
        None => Err(AudioError::EmptyOutput),
    }
}

/// Writer for the managed output directory
#[derive(Debug, Clone)]
pub struct AudioSink {
    output_dir: PathBuf,
}

impl AudioSink {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    /// Persist a buffer as `{uuid}.wav` in the output directory.
    ///
    /// Returns the absolute path and the bare filename; the latter is what
    /// retrieval URLs are built from.
    pub fn persist(&self, buffer: &AudioBuffer, sample_rate: u32) -> AudioResult<(PathBuf, String)> {
        ensure_dir(&self.output_dir)?;
        let filename = format!("{}.wav", Uuid::new_v4().simple());
        let path = std::path::absolute(self.output_dir.join(&filename))?;

        let spec = hound::WavSpec {
            channels: buffer.channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec)?;
        for &sample in &buffer.samples {
            writer.write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
        }
        writer.finalize()?;

        debug!(
            path = %path.display(),
            frames = buffer.num_frames(),
            sample_rate,
            "persisted synthesized audio"
        );
        Ok((path, filename))
    }
}
