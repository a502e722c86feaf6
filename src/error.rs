//! HTTP error responses.
//!
//! Client errors render as `{"error": message}`. Internal errors render a
//! fixed message, plus a `detail` field only when running in development.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::config::AppEnv;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("{message}")]
    Internal { message: String, detail: Option<String> },
}

impl ApiError {
    /// Internal failure; `detail` is kept only in development.
    pub fn internal(message: impl Into<String>, detail: impl std::fmt::Display, env: AppEnv) -> Self {
        let detail = env.is_development().then(|| detail.to_string());
        Self::Internal { message: message.into(), detail }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::BadRequest(message) | Self::PayloadTooLarge(message) => json!({ "error": message }),
            Self::Internal { message, detail: Some(detail) } => json!({ "error": message, "detail": detail }),
            Self::Internal { message, detail: None } => json!({ "error": message }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
