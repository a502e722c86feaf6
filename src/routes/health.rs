use axum::response::Json;
use serde::Serialize;
use time::OffsetDateTime;

use crate::services::iso_timestamp;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub message: &'static str,
    pub description: &'static str,
    pub timestamp: String,
}

/// `GET /api/health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        message: "MenuMaven API is running!",
        description: "Your smart guide to restaurant nutrition",
        timestamp: iso_timestamp(OffsetDateTime::now_utc()),
    })
}

#[cfg(test)]
#[path = "health_test.rs"]
mod tests;
