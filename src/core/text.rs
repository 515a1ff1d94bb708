//! Control-text normalization for the synthesis engine.
//!
//! The engine requires prompt text (zero-shot) and instruct text (instruct
//! mode) to end with a literal end-of-prompt token. Callers may or may not
//! supply it themselves; normalization here makes the outcome uniform.
//! Cross-lingual synthesis takes no such text and skips this entirely.

/// Sentinel token the engine expects at the end of prompt/instruct text
pub const END_OF_PROMPT: &str = "<|endofprompt|>";

/// Append the end-of-prompt marker iff the text does not already contain it.
///
/// Idempotent: normalizing an already-normalized string is a no-op, so the
/// marker reaches the engine exactly once no matter what the caller sent.
pub fn normalize_prompt_text(text: &str) -> String {
    if text.contains(END_OF_PROMPT) {
        text.to_string()
    } else {
        format!("{text}{END_OF_PROMPT}")
    }
}
