//! Core request-orchestration components.
//!
//! Leaves first: `engine` is the seam to the external neural model, `text`
//! normalizes control text, `prompt` resolves reference audio into the
//! managed input directory, `audio` assembles and persists engine output,
//! and `synth` sequences all of the above for one request.

pub mod audio;
pub mod engine;
pub mod prompt;
pub mod synth;
pub mod text;
