//! Out-of-process engine backend.
//!
//! The neural runtime is a Python process (the model's native environment).
//! `WorkerEngine` spawns it once, performs a `load` handshake that reports
//! the fixed sample rate, and then exchanges one newline-delimited JSON
//! request/response pair per inference call over the worker's stdin/stdout.
//! Audio comes back as base64-encoded little-endian f32 chunk payloads, one
//! per chunk of the engine's lazy output sequence.
//!
//! The mutex below serializes access to the pipe pair only; whether the
//! worker parallelizes inference internally is its own business.

use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{AudioChunk, EngineError, EngineResult, SpeechStream, SynthesisEngine};
use crate::config::ServiceConfig;

#[derive(Debug, Serialize)]
struct WorkerRequest<'a> {
    op: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt_text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    instruct_text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt_wav: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speed: Option<f32>,
}

impl<'a> WorkerRequest<'a> {
    fn op(op: &'a str) -> Self {
        Self {
            op,
            text: None,
            prompt_text: None,
            instruct_text: None,
            prompt_wav: None,
            speed: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WorkerResponse {
    status: String,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    sample_rate: Option<u32>,
    #[serde(default)]
    channels: Option<u16>,
    #[serde(default)]
    chunks: Vec<String>,
}

struct WorkerIo {
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl WorkerIo {
    fn round_trip(&mut self, request: &WorkerRequest<'_>) -> EngineResult<WorkerResponse> {
        let line = serde_json::to_string(request)
            .map_err(|e| EngineError::Protocol(format!("failed to serialize request: {e}")))?;
        self.stdin
            .write_all(line.as_bytes())
            .and_then(|_| self.stdin.write_all(b"\n"))
            .and_then(|_| self.stdin.flush())
            .map_err(|e| EngineError::Protocol(format!("failed to write to worker: {e}")))?;

        let mut response = String::new();
        let n = self
            .stdout
            .read_line(&mut response)
            .map_err(|e| EngineError::Protocol(format!("failed to read from worker: {e}")))?;
        if n == 0 {
            return Err(EngineError::Protocol("worker closed its stdout".into()));
        }
        serde_json::from_str(&response).map_err(|e| {
            EngineError::Protocol(format!("malformed worker response: {e} - {}", response.trim()))
        })
    }
}

/// Synthesis engine backed by a persistent Python worker process
pub struct WorkerEngine {
    sample_rate: u32,
    io: Mutex<WorkerIo>,
    child: Mutex<Child>,
}

impl WorkerEngine {
    /// Spawn the worker, load the model, and report readiness.
    pub fn load(config: &ServiceConfig) -> EngineResult<Self> {
        if !config.model_dir.exists() {
            return Err(EngineError::ModelDirMissing(
                config.model_dir.display().to_string(),
            ));
        }

        info!(
            model_dir = %config.model_dir.display(),
            worker = %config.worker_script.display(),
            "starting synthesis engine worker"
        );

        let mut child = Command::new(&config.python_cmd)
            .arg(&config.worker_script)
            .arg("--model-dir")
            .arg(&config.model_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| EngineError::WorkerSpawn(e.to_string()))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::WorkerSpawn("worker stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::WorkerSpawn("worker stdout unavailable".into()))?;

        let mut io = WorkerIo {
            stdin,
            stdout: BufReader::new(stdout),
        };

        let ready = io.round_trip(&WorkerRequest::op("load"))?;
        if ready.status != "ready" {
            let detail = ready.error.unwrap_or_else(|| ready.status.clone());
            return Err(EngineError::WorkerSpawn(format!(
                "worker failed to load model: {detail}"
            )));
        }
        let sample_rate = ready
            .sample_rate
            .ok_or_else(|| EngineError::Protocol("worker reported no sample rate".into()))?;

        info!(sample_rate, "synthesis engine ready");

        Ok(Self {
            sample_rate,
            io: Mutex::new(io),
            child: Mutex::new(child),
        })
    }

    fn invoke(&self, request: WorkerRequest<'_>) -> EngineResult<SpeechStream> {
        let response = self.io.lock().round_trip(&request)?;
        if response.status != "success" {
            let detail = response.error.unwrap_or_else(|| response.status.clone());
            return Err(EngineError::Inference(detail));
        }

        let channels = response.channels.unwrap_or(1);
        let mut chunks = Vec::with_capacity(response.chunks.len());
        for payload in &response.chunks {
            chunks.push(decode_chunk(payload, channels)?);
        }
        debug!(chunks = chunks.len(), "worker returned audio");

        Ok(Box::new(chunks.into_iter().map(Ok)))
    }
}

impl SynthesisEngine for WorkerEngine {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn zero_shot(
        &self,
        text: &str,
        prompt_text: &str,
        prompt_wav: &Path,
        speed: f32,
    ) -> EngineResult<SpeechStream> {
        let wav = prompt_wav.to_string_lossy();
        self.invoke(WorkerRequest {
            text: Some(text),
            prompt_text: Some(prompt_text),
            prompt_wav: Some(wav.as_ref()),
            speed: Some(speed),
            ..WorkerRequest::op("zero_shot")
        })
    }

    fn cross_lingual(
        &self,
        text: &str,
        prompt_wav: &Path,
        speed: f32,
    ) -> EngineResult<SpeechStream> {
        let wav = prompt_wav.to_string_lossy();
        self.invoke(WorkerRequest {
            text: Some(text),
            prompt_wav: Some(wav.as_ref()),
            speed: Some(speed),
            ..WorkerRequest::op("cross_lingual")
        })
    }

    fn instruct(
        &self,
        text: &str,
        instruct_text: &str,
        prompt_wav: &Path,
        speed: f32,
    ) -> EngineResult<SpeechStream> {
        let wav = prompt_wav.to_string_lossy();
        self.invoke(WorkerRequest {
            text: Some(text),
            instruct_text: Some(instruct_text),
            prompt_wav: Some(wav.as_ref()),
            speed: Some(speed),
            ..WorkerRequest::op("instruct")
        })
    }
}

impl Drop for WorkerEngine {
    fn drop(&mut self) {
        let mut child = self.child.lock();
        if let Err(e) = child.kill() {
            warn!("failed to stop engine worker: {e}");
        }
        let _ = child.wait();
    }
}

/// Decode one base64 little-endian f32 payload into an [`AudioChunk`].
fn decode_chunk(payload: &str, channels: u16) -> EngineResult<AudioChunk> {
    let bytes = BASE64
        .decode(payload)
        .map_err(|e| EngineError::Protocol(format!("invalid chunk encoding: {e}")))?;
    if bytes.len() % 4 != 0 {
        return Err(EngineError::Protocol(format!(
            "chunk payload of {} bytes is not f32-aligned",
            bytes.len()
        )));
    }
    let samples = bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    Ok(AudioChunk { channels, samples })
}
