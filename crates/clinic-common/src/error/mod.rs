//! Error types shared across the workspace

mod app_error;

pub use app_error::{AppError, AppResult, ErrorResponse};
