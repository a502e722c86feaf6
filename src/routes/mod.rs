//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every API endpoint lives under `/api`. Unknown paths get a JSON 404, or
//! the built single-page client when `STATIC_DIR` is configured (unknown
//! `/api` paths still get the JSON 404). All responses pass through request
//! tracing, the CORS policy for the client origin, and a fixed set of
//! security headers.

pub mod analyze;
pub mod health;
pub mod nutrition;
pub mod upload;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Json};
use axum::routing::{any, get, post};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::state::AppState;

const SECURITY_HEADERS: &[(&str, &str)] = &[
    (
        "content-security-policy",
        "default-src 'self';base-uri 'self';font-src 'self' https: data:;form-action 'self';frame-ancestors 'self';img-src 'self' data:;object-src 'none';script-src 'self';script-src-attr 'none';style-src 'self' https: 'unsafe-inline'",
    ),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
    ("referrer-policy", "no-referrer"),
    ("strict-transport-security", "max-age=15552000; includeSubDomains"),
    ("x-content-type-options", "nosniff"),
    ("x-dns-prefetch-control", "off"),
    ("x-frame-options", "SAMEORIGIN"),
];

pub fn app(state: AppState) -> Router {
    let config = state.config.clone();
    let upload_limit = upload::body_limit(state.uploads.max_bytes());

    let api = Router::new()
        .route("/api/health", get(health::health))
        .route("/api/nutrition/foods", get(nutrition::list_foods))
        .route("/api/nutrition/meals", post(nutrition::create_meal))
        .route(
            "/api/upload/menu",
            post(upload::upload_menu).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/analyze/menu", post(analyze::analyze_menu));

    let router = match &config.static_dir {
        Some(dir) => api.route("/api/{*rest}", any(not_found)).fallback_service(
            ServeDir::new(dir)
                .append_index_html_on_directories(true)
                .fallback(ServeFile::new(dir.join("index.html"))),
        ),
        None => api.fallback(not_found),
    };

    with_security_headers(router)
        .layer(cors(&config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors(config: &ServerConfig) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(config.client_origin.clone())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
}

fn with_security_headers(router: Router<AppState>) -> Router<AppState> {
    SECURITY_HEADERS.iter().fold(router, |router, &(name, value)| {
        router.layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ))
    })
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "message": "Route not found" })))
}


#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
