//! HTTP request handlers
//!
//! - `api` - Health check endpoint
//! - `tts` - Synthesis endpoints and generated-audio retrieval

pub mod api;
pub mod tts;
