//! Custom error types for the portal service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::repositories::StoreError;

/// Errors that end a request
///
/// Validation failures and expected store outcomes never get here; the
/// handlers turn them into form messages or a different page.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or mismatched CSRF token
    #[error("invalid CSRF token")]
    Csrf,

    /// Template rendering failed
    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    /// Unexpected user store failure
    #[error("user store error: {0}")]
    Store(#[from] StoreError),

    /// Internal server error
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Csrf => (StatusCode::BAD_REQUEST, "invalid CSRF token").into_response(),
            fatal => {
                error!("{:?}", anyhow::Error::new(fatal));
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}

/// Type alias for handler results
pub type AppResult<T> = Result<T, AppError>;
