use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

/// Errors returned by handlers. Every variant renders as `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required field is missing.
    #[error("{0}")]
    Validation(String),

    /// A unique field is already taken.
    #[error("{0}")]
    Conflict(String),

    /// Missing or invalid credentials or session.
    #[error("{0}")]
    Unauthorized(String),

    /// Request body could not be decoded as JSON.
    #[error(transparent)]
    MalformedBody(#[from] JsonRejection),

    #[error("session store error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Conflict(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::MalformedBody(rejection) => rejection.status(),
            AppError::Session(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        // Conflicts carry domain meaning and are mapped by the caller.
        AppError::Internal(anyhow::Error::new(e))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Validation(msg) | AppError::Conflict(msg) | AppError::Unauthorized(msg) => {
                msg.clone()
            }
            AppError::MalformedBody(rejection) => rejection.body_text(),
            AppError::Session(_) | AppError::Internal(_) => {
                error!(error = ?self, "request failed");
                "Internal server error".to_string()
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
