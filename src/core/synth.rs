//! The request orchestrator.
//!
//! All three synthesis modes share one sequencing: check the engine is
//! present, validate fields, resolve the prompt audio, normalize whichever
//! control text the mode requires, invoke the engine in non-streaming mode,
//! then assemble and persist the output. The modes differ only in which
//! engine operation runs and which text field is normalized.

use std::path::PathBuf;

use tracing::info;

use super::audio::{assemble, AudioSink};
use super::prompt::PromptSource;
use super::text::normalize_prompt_text;
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

/// Which engine operation a request drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisMode {
    ZeroShot,
    CrossLingual,
    Instruct,
}

impl SynthesisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SynthesisMode::ZeroShot => "zero_shot",
            SynthesisMode::CrossLingual => "cross_lingual",
            SynthesisMode::Instruct => "instruct",
        }
    }
}

/// One fully parsed synthesis request, mode-independent
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    /// Text to speak
    pub text: String,
    /// Reference voice recording
    pub prompt: PromptSource,
    /// Transcription of the prompt audio (zero-shot mode)
    pub prompt_text: Option<String>,
    /// Natural-language style instruction (instruct mode)
    pub instruct_text: Option<String>,
    /// Speed multiplier, 1.0 = natural pace
    pub speed: f32,
}

/// Result of one synthesis request
#[derive(Debug, Clone)]
pub struct SynthesisOutput {
    /// Absolute path of the persisted output WAV
    pub audio_path: PathBuf,
    /// Bare generated filename, used to build retrieval URLs
    pub audio_filename: String,
    /// Absolute path of the resolved prompt audio, for traceability
    pub prompt_audio_path: PathBuf,
    /// The engine's fixed output sample rate
    pub sample_rate: u32,
}

/// Drive one request end to end.
///
/// The engine invocation plus assembly and persistence run on a blocking
/// worker thread; inference is compute-bound and does not interleave with
/// other work for the duration of the call.
pub async fn synthesize(
    state: &AppState,
    mode: SynthesisMode,
    request: SynthesisRequest,
) -> AppResult<SynthesisOutput> {
    // Readiness first: an absent engine must not leave files behind.
    let engine = state
        .engine
        .clone()
        .ok_or_else(|| AppError::ServiceUnavailable("model not loaded".to_string()))?;

    let SynthesisRequest {
        text,
        prompt,
        prompt_text,
        instruct_text,
        speed,
    } = request;

    if text.trim().is_empty() {
        return Err(AppError::InvalidRequest("text is required".to_string()));
    }
    let prompt_text = match mode {
        SynthesisMode::ZeroShot => Some(require_text(prompt_text, "prompt_text")?),
        _ => None,
    };
    let instruct_text = match mode {
        SynthesisMode::Instruct => Some(require_text(instruct_text, "instruct_text")?),
        _ => None,
    };

    let prompt_path = state.prompt_store().resolve(prompt).await?;
    let prompt_path = std::path::absolute(&prompt_path)
        .map_err(|e| AppError::Internal(format!("failed to resolve prompt path: {e}")))?;

    info!(
        mode = mode.as_str(),
        prompt = %prompt_path.display(),
        speed,
        "starting synthesis"
    );

    let sink = state.audio_sink();
    let sample_rate = engine.sample_rate();
    let worker_prompt = prompt_path.clone();
    let (audio_path, audio_filename) = tokio::task::spawn_blocking(move || {
        let stream = match mode {
            SynthesisMode::ZeroShot => engine.zero_shot(
                &text,
                prompt_text.as_deref().unwrap_or_default(),
                &worker_prompt,
                speed,
            )?,
            SynthesisMode::CrossLingual => engine.cross_lingual(&text, &worker_prompt, speed)?,
            SynthesisMode::Instruct => engine.instruct(
                &text,
                instruct_text.as_deref().unwrap_or_default(),
                &worker_prompt,
                speed,
            )?,
        };
        let buffer = assemble(stream)?;
        let persisted = sink.persist(&buffer, sample_rate)?;
        Ok::<_, AppError>(persisted)
    })
    .await
    .map_err(|e| AppError::Internal(format!("synthesis task failed: {e}")))??;

    info!(
        mode = mode.as_str(),
        audio = %audio_path.display(),
        "synthesis complete"
    );

    Ok(SynthesisOutput {
        audio_path,
        audio_filename,
        prompt_audio_path: prompt_path,
        sample_rate,
    })
}

/// Validate and normalize a required control-text field.
fn require_text(value: Option<String>, field: &str) -> AppResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(normalize_prompt_text(&v)),
        _ => Err(AppError::InvalidRequest(format!("{field} is required"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_text_normalizes() {
        let text = require_text(Some("A".to_string()), "prompt_text").unwrap();
        assert_eq!(text, "A<|endofprompt|>");
    }

    #[test]
    fn require_text_rejects_missing_and_blank() {
        assert!(require_text(None, "prompt_text").is_err());
        assert!(require_text(Some("   ".to_string()), "prompt_text").is_err());
    }

    #[test]
    fn mode_names_match_endpoints() {
        assert_eq!(SynthesisMode::ZeroShot.as_str(), "zero_shot");
        assert_eq!(SynthesisMode::CrossLingual.as_str(), "cross_lingual");
        assert_eq!(SynthesisMode::Instruct.as_str(), "instruct");
    }
}
