//! Settings API endpoints
//!
//! - GET /api/settings - Current export settings
//! - POST /api/settings - Validate and store export settings

use axum::{extract::State, routing::get, Json, Router};

use crate::api::middleware::{ApiError, AppState};
use crate::services::ExportSettings;

/// Build the settings router
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_settings).post(update_settings))
}

async fn get_settings(State(state): State<AppState>) -> Result<Json<ExportSettings>, ApiError> {
    Ok(Json(state.settings_service.get().await?))
}

async fn update_settings(
    State(state): State<AppState>,
    Json(settings): Json<ExportSettings>,
) -> Result<Json<ExportSettings>, ApiError> {
    Ok(Json(state.settings_service.update(&settings).await?))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::test_server;
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_settings_roundtrip() {
        let (server, dir) = test_server().await;
        let export_dir = dir.path().join("public");

        let saved: Value = server
            .post("/api/settings")
            .json(&json!({
                "export_dir": export_dir.to_string_lossy(),
                "site_title": "Field Notes"
            }))
            .await
            .json();
        assert_eq!(saved["site_title"], "Field Notes");
        assert!(export_dir.is_dir());

        let current: Value = server.get("/api/settings").await.json();
        assert_eq!(current, saved);
    }

    #[tokio::test]
    async fn test_empty_export_dir_is_bad_request() {
        let (server, _dir) = test_server().await;
        server
            .post("/api/settings")
            .json(&json!({"export_dir": "", "site_title": "x"}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}
