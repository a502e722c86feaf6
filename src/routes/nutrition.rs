use axum::body::Bytes;
use axum::http::{HeaderMap, header};
use axum::response::Json;
use time::OffsetDateTime;

use crate::error::ApiError;
use crate::services::nutrition::{self, Food, Meal, NewMeal};

/// `GET /api/nutrition/foods`
pub async fn list_foods() -> Json<Vec<Food>> {
    Json(nutrition::sample_foods())
}

/// `POST /api/nutrition/meals` — echo the meal with an id and timestamp.
/// Bodies that are empty or not declared as JSON echo only `id`/`createdAt`.
pub async fn create_meal(headers: HeaderMap, body: Bytes) -> Result<Json<Meal>, ApiError> {
    let meal: NewMeal = if !is_json(&headers) || body.iter().all(u8::is_ascii_whitespace) {
        NewMeal::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {e}")))?
    };
    Ok(Json(nutrition::record_meal(meal, OffsetDateTime::now_utc())))
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
}

#[cfg(test)]
#[path = "nutrition_test.rs"]
mod tests;
