//! Seam to the external synthesis engine.
//!
//! The neural model (weights, tokenizer, decoder) lives outside this crate;
//! everything here is the boundary: the [`SynthesisEngine`] trait with the
//! three inference operations, the [`AudioChunk`] unit of its lazily produced
//! output, and the out-of-process worker backend in [`worker`].
//!
//! Each inference call runs in non-streaming mode: the method blocks until
//! the full chunk sequence is available and then hands it back as an
//! iterator. The iterator is finite and non-restartable. Safety of invoking
//! the engine from multiple requests at once is the engine's own guarantee;
//! callers take no lock around inference.

pub mod worker;

use std::path::Path;
use std::sync::Arc;

pub use worker::WorkerEngine;

use crate::config::ServiceConfig;

pub type EngineResult<T> = Result<T, EngineError>;

/// Shared, process-wide engine handle
pub type EngineHandle = Arc<dyn SynthesisEngine>;

/// Lazily produced chunk sequence from one inference call
pub type SpeechStream = Box<dyn Iterator<Item = EngineResult<AudioChunk>> + Send>;

/// Errors surfaced by an engine backend
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("model directory not found: {0}")]
    ModelDirMissing(String),

    #[error("failed to start engine worker: {0}")]
    WorkerSpawn(String),

    #[error("engine worker protocol error: {0}")]
    Protocol(String),

    #[error("inference failed: {0}")]
    Inference(String),
}

/// One unit of the engine's output: interleaved f32 samples at the engine's
/// fixed sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    /// Number of channels the samples are interleaved over
    pub channels: u16,
    /// Interleaved samples; length is a multiple of `channels`
    pub samples: Vec<f32>,
}

impl AudioChunk {
    /// Single-channel chunk from raw samples
    pub fn mono(samples: Vec<f32>) -> Self {
        Self {
            channels: 1,
            samples,
        }
    }

    /// Number of frames (samples per channel) in this chunk
    pub fn num_frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }
}

/// The external neural TTS component.
///
/// Implementations are constructed once per process and shared read-mostly
/// across requests.
pub trait SynthesisEngine: Send + Sync {
    /// Fixed output sample rate in Hz
    fn sample_rate(&self) -> u32;

    /// Clone the prompt voice and speak `text`; `prompt_text` transcribes the
    /// prompt audio and must carry the end-of-prompt marker.
    fn zero_shot(
        &self,
        text: &str,
        prompt_text: &str,
        prompt_wav: &Path,
        speed: f32,
    ) -> EngineResult<SpeechStream>;

    /// Clone the prompt voice across languages; no control text involved.
    fn cross_lingual(&self, text: &str, prompt_wav: &Path, speed: f32)
        -> EngineResult<SpeechStream>;

    /// Clone the prompt voice following a natural-language instruction;
    /// `instruct_text` must carry the end-of-prompt marker.
    fn instruct(
        &self,
        text: &str,
        instruct_text: &str,
        prompt_wav: &Path,
        speed: f32,
    ) -> EngineResult<SpeechStream>;
}

/// Construct the process-wide engine from the configured model directory.
pub fn load(config: &ServiceConfig) -> EngineResult<EngineHandle> {
    let engine = WorkerEngine::load(config)?;
    Ok(Arc::new(engine))
}
