use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tts_core::TtsError;

/// API Error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Model initialization failed: {0}")]
    ModelUnavailable(String),

    #[error("{0}")]
    Synthesis(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl From<TtsError> for ApiError {
    fn from(e: TtsError) -> Self {
        match e {
            TtsError::ModelUnavailable(msg) => ApiError::ModelUnavailable(msg),
            TtsError::Synthesis(msg) => ApiError::Synthesis(msg),
            other @ (TtsError::Encoding(_) | TtsError::Cache(_)) => {
                ApiError::Synthesis(other.to_string())
            }
        }
    }
}

/// Error response structure
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: u16,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::ModelUnavailable(_) | ApiError::Synthesis(_) | ApiError::InternalError(_) => {
                tracing::error!("{}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: status.as_u16(),
        });

        (status, body).into_response()
    }
}
