use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, tts};
use crate::state::AppState;
use std::sync::Arc;

/// Prompt uploads are whole recordings; the axum default of 2 MiB is too
/// small for them.
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Create the API router with all service routes
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(api::health_check))
        .route("/audio/{filename}", get(tts::get_audio))
        .route("/tts/zero_shot", post(tts::tts_zero_shot))
        .route("/tts/cross_lingual", post(tts::tts_cross_lingual))
        .route("/tts/instruct", post(tts::tts_instruct))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
}
