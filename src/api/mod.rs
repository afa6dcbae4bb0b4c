//! API layer - HTTP handlers and routing
//!
//! All endpoints are JSON and live under `/api`:
//! - Articles, categories and tags
//! - Templates (edit, upload, ZIP import, reset)
//! - Images (upload and serve)
//! - Export settings and the export trigger
//!
//! `/health` sits at the root.

pub mod articles;
pub mod categories;
pub mod export;
pub mod health;
pub mod images;
pub mod middleware;
pub mod settings;
pub mod tags;
pub mod templates;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, AppState};

/// Build the `/api` router
pub fn build_api_router(state: &AppState) -> Router<AppState> {
    // Room for the image itself plus multipart framing
    let image_limit = usize::try_from(state.upload_config.max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(64 * 1024);

    Router::new()
        .nest("/articles", articles::router())
        .nest("/categories", categories::router())
        .nest("/tags", tags::router())
        .nest("/templates", templates::router())
        .nest("/images", images::router().layer(DefaultBodyLimit::max(image_limit)))
        .nest("/settings", settings::router())
        .nest("/export", export::router())
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let cors = match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new().allow_origin(origin),
        Err(_) => {
            tracing::warn!("Invalid CORS origin '{}', cross-origin requests disabled", cors_origin);
            CorsLayer::new()
        }
    }
    .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
    .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .nest("/api", build_api_router(&state))
        .merge(health::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
