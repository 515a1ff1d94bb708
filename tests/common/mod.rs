//! Shared fixtures: a scripted engine and a state builder over temp dirs.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::TempDir;

use cosyvoice_gateway::core::engine::{
    AudioChunk, EngineHandle, EngineResult, SpeechStream, SynthesisEngine,
};
use cosyvoice_gateway::{AppState, ServiceConfig};

/// Scripted engine: yields fixed-size chunks and records every invocation.
pub struct MockEngine {
    pub sample_rate: u32,
    pub chunk_frames: Vec<usize>,
    pub calls: Mutex<Vec<String>>,
}

impl MockEngine {
    pub fn new(sample_rate: u32, chunk_frames: Vec<usize>) -> Arc<Self> {
        Arc::new(Self {
            sample_rate,
            chunk_frames,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn stream(&self) -> EngineResult<SpeechStream> {
        let chunks: Vec<EngineResult<AudioChunk>> = self
            .chunk_frames
            .iter()
            .map(|&frames| Ok(AudioChunk::mono(vec![0.25; frames])))
            .collect();
        Ok(Box::new(chunks.into_iter()))
    }
}

impl SynthesisEngine for MockEngine {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn zero_shot(
        &self,
        text: &str,
        prompt_text: &str,
        _prompt_wav: &Path,
        speed: f32,
    ) -> EngineResult<SpeechStream> {
        self.calls
            .lock()
            .push(format!("zero_shot|{text}|{prompt_text}|{speed}"));
        self.stream()
    }

    fn cross_lingual(
        &self,
        text: &str,
        _prompt_wav: &Path,
        speed: f32,
    ) -> EngineResult<SpeechStream> {
        self.calls.lock().push(format!("cross_lingual|{text}|{speed}"));
        self.stream()
    }

    fn instruct(
        &self,
        text: &str,
        instruct_text: &str,
        _prompt_wav: &Path,
        speed: f32,
    ) -> EngineResult<SpeechStream> {
        self.calls
            .lock()
            .push(format!("instruct|{text}|{instruct_text}|{speed}"));
        self.stream()
    }
}

pub fn test_state(tmp: &TempDir, engine: Option<EngineHandle>) -> Arc<AppState> {
    AppState::new(
        ServiceConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            model_dir: tmp.path().join("model"),
            audio_in_dir: tmp.path().join("audio_file"),
            audio_out_dir: tmp.path().join("audio_file_gen"),
            python_cmd: "python3".to_string(),
            worker_script: tmp.path().join("worker.py"),
        },
        engine,
    )
}

pub fn dir_is_empty(dir: &Path) -> bool {
    !dir.exists() || std::fs::read_dir(dir).unwrap().next().is_none()
}
