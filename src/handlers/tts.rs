//! Synthesis endpoints.
//!
//! The three POST endpoints accept multipart/form-data with the prompt audio
//! either attached as the `prompt_wav` file field or referenced through the
//! `prompt_wav_path` string field. `GET /audio/{filename}` serves previously
//! generated output back to the caller.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::info;

use crate::core::prompt::PromptSource;
use crate::core::synth::{synthesize, SynthesisMode, SynthesisOutput, SynthesisRequest};
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

const AUDIO_CONTENT_TYPE: &str = "audio/wav";

/// Success payload shared by all three synthesis endpoints
#[derive(Debug, Serialize)]
pub struct TtsResponse {
    pub status: &'static str,
    pub audio_filename: String,
    pub audio_path: String,
    pub sample_rate: u32,
}

impl From<SynthesisOutput> for TtsResponse {
    fn from(output: SynthesisOutput) -> Self {
        Self {
            status: "success",
            audio_filename: output.audio_filename,
            audio_path: output.audio_path.display().to_string(),
            sample_rate: output.sample_rate,
        }
    }
}

/// Form fields accepted by the synthesis endpoints
#[derive(Debug, Default)]
struct TtsForm {
    text: Option<String>,
    prompt_text: Option<String>,
    instruct_text: Option<String>,
    prompt_wav: Option<(bytes::Bytes, Option<String>)>,
    prompt_wav_path: Option<String>,
    speed: Option<String>,
}

impl TtsForm {
    async fn parse(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = TtsForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::InvalidRequest(format!("malformed multipart body: {e}")))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match name.as_str() {
                "prompt_wav" => {
                    let filename = field.file_name().map(str::to_string);
                    let data = field.bytes().await.map_err(|e| {
                        AppError::InvalidRequest(format!("failed to read prompt_wav: {e}"))
                    })?;
                    form.prompt_wav = Some((data, filename));
                }
                "text" => form.text = Some(read_text(field, "text").await?),
                "prompt_text" => form.prompt_text = Some(read_text(field, "prompt_text").await?),
                "instruct_text" => {
                    form.instruct_text = Some(read_text(field, "instruct_text").await?)
                }
                "prompt_wav_path" => {
                    form.prompt_wav_path = Some(read_text(field, "prompt_wav_path").await?)
                }
                "speed" => form.speed = Some(read_text(field, "speed").await?),
                // Unknown fields are ignored, matching lenient form handling.
                _ => {}
            }
        }
        Ok(form)
    }

    /// Exactly one prompt source must be supplied; the uploaded file wins
    /// when both are present, as the original service behaved.
    fn prompt_source(&mut self) -> AppResult<PromptSource> {
        if let Some((data, filename)) = self.prompt_wav.take() {
            return Ok(PromptSource::Upload { data, filename });
        }
        match self.prompt_wav_path.take() {
            Some(path) if !path.trim().is_empty() => Ok(PromptSource::LocalPath(path)),
            _ => Err(AppError::InvalidRequest(
                "prompt_wav or prompt_wav_path required".to_string(),
            )),
        }
    }

    fn speed(&self) -> AppResult<f32> {
        match self.speed.as_deref() {
            None | Some("") => Ok(1.0),
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| AppError::InvalidRequest(format!("invalid speed: {raw}"))),
        }
    }

    /// Mode-specific text validation happens in the orchestrator; this only
    /// settles the prompt source and speed.
    fn into_request(mut self) -> AppResult<SynthesisRequest> {
        let speed = self.speed()?;
        let prompt = self.prompt_source()?;
        Ok(SynthesisRequest {
            text: self.text.unwrap_or_default(),
            prompt,
            prompt_text: self.prompt_text,
            instruct_text: self.instruct_text,
            speed,
        })
    }
}

async fn read_text(field: axum::extract::multipart::Field<'_>, name: &str) -> AppResult<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::InvalidRequest(format!("failed to read {name}: {e}")))
}

/// `POST /tts/zero_shot`
pub async fn tts_zero_shot(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> AppResult<Json<TtsResponse>> {
    run(state, SynthesisMode::ZeroShot, multipart).await
}

/// `POST /tts/cross_lingual`
pub async fn tts_cross_lingual(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> AppResult<Json<TtsResponse>> {
    run(state, SynthesisMode::CrossLingual, multipart).await
}

/// `POST /tts/instruct`
pub async fn tts_instruct(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> AppResult<Json<TtsResponse>> {
    run(state, SynthesisMode::Instruct, multipart).await
}

async fn run(
    state: Arc<AppState>,
    mode: SynthesisMode,
    multipart: Multipart,
) -> AppResult<Json<TtsResponse>> {
    // Readiness check precedes form handling so an unavailable engine never
    // leaves resolved prompt files behind.
    if state.engine.is_none() {
        return Err(AppError::ServiceUnavailable("model not loaded".to_string()));
    }
    let request = TtsForm::parse(multipart).await?.into_request()?;
    let output = synthesize(&state, mode, request).await?;
    Ok(Json(output.into()))
}

fn is_valid_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.contains("..")
        && !filename.contains('/')
        && !filename.contains('\\')
}

/// `GET /audio/{filename}` - serve a generated file from the output directory
pub async fn get_audio(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> AppResult<Response> {
    if !is_valid_filename(&filename) {
        return Err(AppError::InvalidRequest(format!(
            "invalid filename: {filename}"
        )));
    }

    let path = state.config.audio_out_dir.join(&filename);
    let body = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound(format!("audio not found: {filename}")));
        }
        Err(e) => {
            return Err(AppError::Internal(format!(
                "failed to read {}: {e}",
                path.display()
            )));
        }
    };

    info!(filename, bytes = body.len(), "serving generated audio");

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(AUDIO_CONTENT_TYPE),
    );
    if let Ok(disposition) =
        HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
    {
        headers.insert(header::CONTENT_DISPOSITION, disposition);
    }
    Ok((StatusCode::OK, headers, body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_validation_blocks_traversal() {
        assert!(!is_valid_filename(""));
        assert!(!is_valid_filename("../secret.wav"));
        assert!(!is_valid_filename("a/b.wav"));
        assert!(!is_valid_filename("a\\b.wav"));
        assert!(is_valid_filename(
            "0f47ac10b58cc4372a5670e02b2c3d479.wav"
        ));
    }

    #[test]
    fn speed_defaults_and_parses() {
        let mut form = TtsForm::default();
        assert_eq!(form.speed().unwrap(), 1.0);

        form.speed = Some("1.5".to_string());
        assert_eq!(form.speed().unwrap(), 1.5);

        form.speed = Some("fast".to_string());
        assert!(form.speed().is_err());
    }

    #[test]
    fn upload_wins_over_path() {
        let mut form = TtsForm {
            prompt_wav: Some((bytes::Bytes::from_static(b"pcm"), None)),
            prompt_wav_path: Some("/tmp/voice.wav".to_string()),
            ..TtsForm::default()
        };
        assert!(matches!(
            form.prompt_source().unwrap(),
            PromptSource::Upload { .. }
        ));
    }

    #[test]
    fn missing_prompt_source_is_invalid() {
        let mut form = TtsForm::default();
        assert!(matches!(
            form.prompt_source().unwrap_err(),
            AppError::InvalidRequest(_)
        ));
    }
}
