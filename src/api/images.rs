//! Image API endpoints
//!
//! - POST /api/images - Upload an image (multipart field "image")
//! - GET /api/images/{filename} - Serve an uploaded image
//!
//! Uploaded images live flat in the upload directory; the export copies
//! them to `images/` next to the generated pages.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::path::Path as FsPath;
use tokio::fs;
use uuid::Uuid;

use crate::api::middleware::{ApiError, AppState};

/// Response for a successful upload
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub filename: String,
    pub url: String,
}

/// Build the images router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(upload_image))
        .route("/{filename}", get(get_image))
}

/// POST /api/images
async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let config = &state.upload_config;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation_error(format!("Failed to read multipart: {}", e)))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let original = field.file_name().unwrap_or_default().to_string();
        let ext = FsPath::new(&original)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        if !config.is_extension_allowed(&ext) {
            return Err(ApiError::validation_error(format!(
                "Invalid file type '{}'. Allowed: {}",
                ext,
                config.allowed_extensions.join(", ")
            )));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::validation_error(format!("Failed to read file: {}", e)))?;
        if data.len() as u64 > config.max_file_size {
            return Err(ApiError::validation_error(format!(
                "File too large. Maximum size: {} bytes ({} MB)",
                config.max_file_size,
                config.max_file_size / 1024 / 1024
            )));
        }

        fs::create_dir_all(&config.path)
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to create upload directory: {}", e)))?;

        let filename = format!("{}.{}", Uuid::new_v4().simple(), ext);
        fs::write(config.path.join(&filename), &data)
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to save file: {}", e)))?;

        tracing::info!("Stored image {} ({} bytes)", filename, data.len());
        return Ok((
            StatusCode::CREATED,
            Json(UploadResponse {
                url: format!("/api/images/{}", filename),
                filename,
            }),
        ));
    }

    Err(ApiError::validation_error("No image provided"))
}

/// GET /api/images/{filename}
async fn get_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    if !is_safe_filename(&filename) {
        return Err(ApiError::validation_error("Invalid file name"));
    }

    let path = state.upload_config.path.join(&filename);
    let data = match fs::read(&path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::not_found(format!("Image not found: {}", filename)))
        }
        Err(e) => return Err(ApiError::internal_error(format!("Failed to read image: {}", e))),
    };

    Ok(([(header::CONTENT_TYPE, content_type_for(&filename))], data).into_response())
}

/// A single path component with no traversal
fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && !name.contains("..")
        && !name.contains('/')
        && !name.contains('\\')
        && !name.starts_with('.')
}

fn content_type_for(filename: &str) -> &'static str {
    let ext = FsPath::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
