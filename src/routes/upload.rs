//! Menu image upload route.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Serialize;

use crate::config::AppEnv;
use crate::error::ApiError;
use crate::services::upload::{StoredUpload, UPLOAD_FIELD, UploadError};
use crate::state::AppState;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[must_use]
pub fn body_limit(max_file_bytes: usize) -> usize {
    max_file_bytes.saturating_add(MULTIPART_OVERHEAD)
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    pub filename: String,
    pub path: String,
    pub size: usize,
    pub mimetype: String,
}

impl From<StoredUpload> for UploadResponse {
    fn from(stored: StoredUpload) -> Self {
        Self {
            message: "Menu image uploaded successfully",
            path: stored.path.display().to_string(),
            filename: stored.filename,
            size: stored.size,
            mimetype: stored.mimetype,
        }
    }
}

pub(crate) fn upload_error_to_api(err: UploadError, env: AppEnv) -> ApiError {
    match err {
        UploadError::Missing | UploadError::UnsupportedType => ApiError::BadRequest(err.to_string()),
        UploadError::TooLarge { .. } => ApiError::PayloadTooLarge(err.to_string()),
        UploadError::Storage(ref source) => {
            tracing::error!(error = %source, "menu image storage failed");
            ApiError::internal(err.to_string(), source, env)
        }
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

/// `POST /api/upload/menu` — multipart with the image in `menuImage`.
/// Other fields are ignored; a request without that field is a 400.
pub async fn upload_menu(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let env = state.config.app_env;
    let Ok(mut multipart) = multipart else {
        return Err(upload_error_to_api(UploadError::Missing, env));
    };

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_owned();
        let content_type = field.content_type().unwrap_or_default().to_owned();
        state.uploads.check_type(&file_name, &content_type).map_err(|e| upload_error_to_api(e, env))?;

        let bytes = field.bytes().await.map_err(multipart_error)?;
        let stored = state
            .uploads
            .save(&file_name, &content_type, &bytes)
            .await
            .map_err(|e| upload_error_to_api(e, env))?;
        return Ok(Json(stored.into()));
    }

    Err(upload_error_to_api(UploadError::Missing, env))
}

#[cfg(test)]
#[path = "upload_test.rs"]
mod tests;
