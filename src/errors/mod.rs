//! Request-level error taxonomy and HTTP response mapping

pub mod app_error;

pub use app_error::{AppError, AppResult};
