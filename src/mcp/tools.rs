//! The three synthesis tools and their dispatch.
//!
//! Arguments mirror the HTTP form fields, except the prompt recording is
//! always referenced by `prompt_wav_path` (a local path or http(s) URL);
//! there is no upload channel over MCP.

use serde_json::{json, Value};

use crate::core::prompt::PromptSource;
use crate::core::synth::{synthesize, SynthesisMode, SynthesisRequest};
use crate::errors::AppError;
use crate::state::AppState;

pub const TOOL_ZERO_SHOT: &str = "cosyvoice3_zero_shot";
pub const TOOL_CROSS_LINGUAL: &str = "cosyvoice3_cross_lingual";
pub const TOOL_INSTRUCT: &str = "cosyvoice3_instruct";

/// Why a `tools/call` did not produce a success result
#[derive(Debug)]
pub enum ToolCallError {
    /// Name matched no tool; surfaced as a protocol error
    UnknownTool(String),
    /// The tool ran and failed; surfaced as an `isError` tool result
    Failed(AppError),
}

impl From<AppError> for ToolCallError {
    fn from(err: AppError) -> Self {
        ToolCallError::Failed(err)
    }
}

/// Descriptors returned by `tools/list`
pub fn descriptors() -> Vec<Value> {
    let prompt_wav_schema = json!({
        "type": "string",
        "description": "Local path or http(s) URL of the prompt recording",
    });
    vec![
        json!({
            "name": TOOL_ZERO_SHOT,
            "description": "Clone the prompt speaker's voice and read the given text in it.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "text": { "type": "string", "description": "Text to synthesize" },
                    "prompt_text": {
                        "type": "string",
                        "description": "Transcript of the prompt recording",
                    },
                    "prompt_wav_path": prompt_wav_schema.clone(),
                    "speed": { "type": "number", "description": "Playback speed factor", "default": 1.0 },
                },
                "required": ["text", "prompt_text", "prompt_wav_path"],
            },
        }),
        json!({
            "name": TOOL_CROSS_LINGUAL,
            "description": "Clone the prompt speaker's voice for text in another language; no prompt transcript needed.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "text": { "type": "string", "description": "Text to synthesize" },
                    "prompt_wav_path": prompt_wav_schema.clone(),
                    "speed": { "type": "number", "description": "Playback speed factor", "default": 1.0 },
                },
                "required": ["text", "prompt_wav_path"],
            },
        }),
        json!({
            "name": TOOL_INSTRUCT,
            "description": "Synthesize text in the prompt speaker's voice, steered by a natural-language instruction.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "text": { "type": "string", "description": "Text to synthesize" },
                    "instruct_text": {
                        "type": "string",
                        "description": "Natural-language delivery instruction",
                    },
                    "prompt_wav_path": prompt_wav_schema,
                    "speed": { "type": "number", "description": "Playback speed factor", "default": 1.0 },
                },
                "required": ["text", "instruct_text", "prompt_wav_path"],
            },
        }),
    ]
}

/// Run one tool; the success value is the JSON body placed in the text
/// content block.
pub async fn call(
    state: &AppState,
    name: &str,
    arguments: &Value,
) -> Result<Value, ToolCallError> {
    let mode = match name {
        TOOL_ZERO_SHOT => SynthesisMode::ZeroShot,
        TOOL_CROSS_LINGUAL => SynthesisMode::CrossLingual,
        TOOL_INSTRUCT => SynthesisMode::Instruct,
        other => return Err(ToolCallError::UnknownTool(other.to_string())),
    };

    let request = parse_request(arguments)?;
    let output = synthesize(state, mode, request).await?;
    Ok(json!({
        "status": "success",
        "audio_path": output.audio_path.display().to_string(),
        "prompt_audio_path": output.prompt_audio_path.display().to_string(),
        "sample_rate": output.sample_rate,
    }))
}

fn parse_request(arguments: &Value) -> Result<SynthesisRequest, ToolCallError> {
    let prompt_wav_path = string_arg(arguments, "prompt_wav_path")?.ok_or_else(|| {
        AppError::InvalidRequest("prompt_wav_path required".to_string())
    })?;

    Ok(SynthesisRequest {
        text: string_arg(arguments, "text")?.unwrap_or_default(),
        prompt: PromptSource::from_path_or_url(&prompt_wav_path),
        prompt_text: string_arg(arguments, "prompt_text")?,
        instruct_text: string_arg(arguments, "instruct_text")?,
        speed: speed_arg(arguments)?,
    })
}

fn string_arg(arguments: &Value, name: &str) -> Result<Option<String>, ToolCallError> {
    match arguments.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ToolCallError::Failed(AppError::InvalidRequest(format!(
            "{name} must be a string, got {other}"
        )))),
    }
}

/// `speed` is accepted as a JSON number or a numeric string.
fn speed_arg(arguments: &Value) -> Result<f32, ToolCallError> {
    match arguments.get("speed") {
        None | Some(Value::Null) => Ok(1.0),
        Some(Value::Number(n)) => Ok(n.as_f64().unwrap_or(1.0) as f32),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(1.0),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| AppError::InvalidRequest(format!("invalid speed: {s}")).into()),
        Some(other) => Err(ToolCallError::Failed(AppError::InvalidRequest(format!(
            "speed must be a number, got {other}"
        )))),
    }
}
