use axum::body::Bytes;
use axum::response::Json;
use time::OffsetDateTime;

use crate::error::ApiError;
use crate::services::analysis::{self, AnalyzeRequest, MenuAnalysis};

/// `POST /api/analyze/menu` — `{ "imagePath"?: string }`; an empty body is
/// accepted.
pub async fn analyze_menu(body: Bytes) -> Result<Json<MenuAnalysis>, ApiError> {
    let request: AnalyzeRequest = if body.iter().all(u8::is_ascii_whitespace) {
        AnalyzeRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {e}")))?
    };
    Ok(Json(analysis::analyze_menu(&request, OffsetDateTime::now_utc())))
}

#[cfg(test)]
#[path = "analyze_test.rs"]
mod tests;
