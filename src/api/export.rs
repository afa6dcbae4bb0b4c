//! Export API endpoint
//!
//! - POST /api/export - Generate the static site
//!
//! The optional JSON body `{output_dir, upload_dir, site_title}` overrides the
//! stored settings for this run only.

use axum::{extract::State, routing::post, Json, Router};

use crate::api::middleware::{ApiError, AppState};
use crate::services::{ExportReport, ExportRequest};

/// Build the export router
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(run_export))
}

async fn run_export(
    State(state): State<AppState>,
    request: Option<Json<ExportRequest>>,
) -> Result<Json<ExportReport>, ApiError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let settings = state.settings_service.get().await?;
    let config = request.resolve(
        &settings,
        &state.upload_config.path,
        &state.export_defaults.image_base_url,
    );

    let report = state.export_service.export(&config).await?;
    Ok(Json(report))
}
