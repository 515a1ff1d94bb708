//! Per-process application context.
//!
//! `AppState` is the explicit owned context handed to every request handler:
//! the service configuration plus the optional synthesis engine handle. The
//! HTTP adapter may run with `engine: None` (requests answer 503 until the
//! model is available); the MCP adapter always constructs the engine before
//! serving.

use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::core::audio::AudioSink;
use crate::core::engine::EngineHandle;
use crate::core::prompt::PromptStore;

pub struct AppState {
    pub config: ServiceConfig,
    /// Shared engine handle; `None` while the model is unavailable
    pub engine: Option<EngineHandle>,
    prompt_store: PromptStore,
    audio_sink: AudioSink,
}

impl AppState {
    pub fn new(config: ServiceConfig, engine: Option<EngineHandle>) -> Arc<Self> {
        let prompt_store = PromptStore::new(config.audio_in_dir.clone());
        let audio_sink = AudioSink::new(config.audio_out_dir.clone());
        Arc::new(Self {
            config,
            engine,
            prompt_store,
            audio_sink,
        })
    }

    /// Resolver for the managed input directory
    pub fn prompt_store(&self) -> &PromptStore {
        &self.prompt_store
    }

    /// Writer for the managed output directory
    pub fn audio_sink(&self) -> AudioSink {
        self.audio_sink.clone()
    }
}
