//! Configuration module for the CosyVoice3 gateway
//!
//! Configuration is environment-driven with sensible defaults, mirroring how
//! the service is deployed: a `.env` file (loaded by the binaries) or plain
//! environment variables. There is no configuration file format beyond that.
//!
//! # Example
//! ```rust,no_run
//! use cosyvoice_gateway::config::ServiceConfig;
//!
//! let config = ServiceConfig::from_env();
//! println!("Server listening on {}", config.address());
//! ```

use std::io;
use std::path::{Path, PathBuf};

/// Default model directory when `COSYVOICE3_MODEL_DIR` is unset
pub const DEFAULT_MODEL_DIR: &str = "pretrained_models/Fun-CosyVoice3-0.5B";
/// Default directory for resolved prompt audio (`AUDIO_FILE_DIR`)
pub const DEFAULT_AUDIO_IN_DIR: &str = "audio_file";
/// Default directory for generated audio (`AUDIO_FILE_GEN_DIR`)
pub const DEFAULT_AUDIO_OUT_DIR: &str = "audio_file_gen";
/// Default worker script driving the neural runtime
pub const DEFAULT_WORKER_SCRIPT: &str = "scripts/cosyvoice_worker.py";

/// Service configuration
///
/// Contains everything needed to run either adapter binary:
/// - Server settings (host, port) for the HTTP adapter
/// - Model directory handed to the synthesis engine
/// - Managed input/output audio directories
/// - Engine worker command (python interpreter + worker script)
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,

    /// Path or model id for the synthesis engine weights
    pub model_dir: PathBuf,
    /// Directory where resolved prompt audio is persisted
    pub audio_in_dir: PathBuf,
    /// Directory where synthesized audio is persisted
    pub audio_out_dir: PathBuf,

    /// Python interpreter used to spawn the engine worker
    pub python_cmd: String,
    /// Worker script implementing the engine side of the bridge protocol
    pub worker_script: PathBuf,
}

impl ServiceConfig {
    /// Load configuration from environment variables, falling back to the
    /// documented defaults for anything unset.
    pub fn from_env() -> Self {
        Self {
            host: env_or("HOST", "127.0.0.1"),
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8891),
            model_dir: PathBuf::from(env_or("COSYVOICE3_MODEL_DIR", DEFAULT_MODEL_DIR)),
            audio_in_dir: PathBuf::from(env_or("AUDIO_FILE_DIR", DEFAULT_AUDIO_IN_DIR)),
            audio_out_dir: PathBuf::from(env_or("AUDIO_FILE_GEN_DIR", DEFAULT_AUDIO_OUT_DIR)),
            python_cmd: env_or("COSYVOICE3_PYTHON", "python3"),
            worker_script: PathBuf::from(env_or("COSYVOICE3_WORKER", DEFAULT_WORKER_SCRIPT)),
        }
    }

    /// Socket address string for the HTTP adapter
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Create the managed audio directories if they do not exist yet.
    ///
    /// Idempotent and safe to call on every request; resolver and sink call
    /// it redundantly so no startup ordering is required.
    pub fn ensure_audio_dirs(&self) -> io::Result<()> {
        ensure_dir(&self.audio_in_dir)?;
        ensure_dir(&self.audio_out_dir)
    }
}

pub(crate) fn ensure_dir(dir: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dir)
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}
