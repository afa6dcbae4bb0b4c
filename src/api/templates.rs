//! Template API endpoints
//!
//! - GET /api/templates - List the five templates
//! - GET /api/templates/{name} - Get one template
//! - PUT /api/templates/{name} - Replace content (`{"content": "..."}`)
//! - POST /api/templates/{name}/upload - Replace content from an uploaded file
//! - POST /api/templates/import - Import `<name>.html` entries from a ZIP archive
//! - POST /api/templates/reset - Restore the built-in defaults

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read};
use zip::ZipArchive;

use crate::api::middleware::{ApiError, AppState};
use crate::models::{Template, TemplateName};

/// Maximum size of a single uploaded template
pub const MAX_TEMPLATE_SIZE: usize = 1024 * 1024;

/// Maximum size of a template archive
pub const MAX_ARCHIVE_SIZE: usize = 5 * 1024 * 1024;

/// Slack for multipart framing around the file itself
const MULTIPART_OVERHEAD: usize = 16 * 1024;

#[derive(Debug, Deserialize)]
pub struct UpdateTemplateRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct TemplateListResponse {
    pub templates: Vec<Template>,
}

/// One archive entry that could not be imported
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ImportFailure {
    pub file: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct ImportTemplatesResponse {
    pub imported: Vec<TemplateName>,
    pub failed: Vec<ImportFailure>,
    /// Entries whose names are not template names
    pub skipped: Vec<String>,
}

/// Build the templates router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_templates))
        .route("/import", post(import_templates))
        .route("/reset", post(reset_templates))
        .route("/{name}", get(get_template).put(update_template))
        .route(
            "/{name}/upload",
            post(upload_template).layer(DefaultBodyLimit::max(MAX_TEMPLATE_SIZE + MULTIPART_OVERHEAD)),
        )
        .layer(DefaultBodyLimit::max(MAX_ARCHIVE_SIZE + MULTIPART_OVERHEAD))
}

async fn list_templates(State(state): State<AppState>) -> Result<Json<TemplateListResponse>, ApiError> {
    let templates = state.template_service.get_all().await?;
    Ok(Json(TemplateListResponse { templates }))
}

async fn get_template(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Template>, ApiError> {
    Ok(Json(state.template_service.get_by_name(&name).await?))
}

async fn update_template(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<UpdateTemplateRequest>,
) -> Result<Json<Template>, ApiError> {
    Ok(Json(
        state
            .template_service
            .update(&name, &request.content)
            .await?,
    ))
}

/// POST /api/templates/{name}/upload
///
/// Accepts multipart/form-data with a single field named "file".
async fn upload_template(
    State(state): State<AppState>,
    Path(name): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<Template>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation_error(format!("Failed to read multipart: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::validation_error(format!("Failed to read file: {}", e)))?;
        if data.len() > MAX_TEMPLATE_SIZE {
            return Err(ApiError::validation_error(format!(
                "Template too large. Maximum size: {} bytes",
                MAX_TEMPLATE_SIZE
            )));
        }

        let content = String::from_utf8(data.to_vec())
            .map_err(|_| ApiError::validation_error("Template must be UTF-8 text"))?;
        return Ok(Json(state.template_service.update(&name, &content).await?));
    }

    Err(ApiError::validation_error("No file provided"))
}

/// POST /api/templates/import
///
/// Entries named `<template>.html` (at any depth) replace the stored template.
/// Bad entries are collected rather than aborting the import.
async fn import_templates(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ImportTemplatesResponse>, ApiError> {
    let mut archive = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation_error(format!("Failed to read multipart: {}", e)))?
    {
        if field.name() == Some("file") {
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::validation_error(format!("Failed to read archive: {}", e)))?;
            archive = Some(data);
            break;
        }
    }
    let data = archive.ok_or_else(|| ApiError::validation_error("No file provided"))?;
    if data.len() > MAX_ARCHIVE_SIZE {
        return Err(ApiError::validation_error(format!(
            "Archive too large. Maximum size: {} bytes",
            MAX_ARCHIVE_SIZE
        )));
    }

    let (entries, skipped, mut failed) = read_archive(&data)?;

    let mut imported = Vec::new();
    for entry in entries {
        match state
            .template_service
            .update(entry.name.as_str(), &entry.content)
            .await
        {
            Ok(_) => imported.push(entry.name),
            Err(e) => failed.push(ImportFailure {
                file: entry.file,
                error: e.to_string(),
            }),
        }
    }

    if imported.is_empty() {
        return Err(ApiError::with_details(
            "VALIDATION_ERROR",
            "No templates were imported",
            serde_json::json!({ "failed": failed, "skipped": skipped }),
        ));
    }

    tracing::info!(
        "Imported {} templates from archive ({} failed, {} skipped)",
        imported.len(),
        failed.len(),
        skipped.len()
    );
    Ok(Json(ImportTemplatesResponse {
        imported,
        failed,
        skipped,
    }))
}

async fn reset_templates(State(state): State<AppState>) -> Result<Json<TemplateListResponse>, ApiError> {
    let templates = state.template_service.reset_to_defaults().await?;
    Ok(Json(TemplateListResponse { templates }))
}

/// A template read out of an archive
#[derive(Debug)]
struct ArchiveTemplate {
    file: String,
    name: TemplateName,
    content: String,
}

/// Split an archive into template entries, skipped entry names and
/// per-entry read failures.
fn read_archive(
    data: &[u8],
) -> Result<(Vec<ArchiveTemplate>, Vec<String>, Vec<ImportFailure>), ApiError> {
    let mut archive = ZipArchive::new(Cursor::new(data))
        .map_err(|e| ApiError::validation_error(format!("Invalid ZIP: {}", e)))?;

    let mut entries = Vec::new();
    let mut skipped = Vec::new();
    let mut failed = Vec::new();

    for i in 0..archive.len() {
        let mut file = match archive.by_index(i) {
            Ok(file) => file,
            Err(e) => {
                failed.push(ImportFailure {
                    file: format!("#{}", i),
                    error: e.to_string(),
                });
                continue;
            }
        };
        if file.is_dir() {
            continue;
        }

        let path = file.name().to_string();
        let base = path.rsplit('/').next().unwrap_or(path.as_str());
        let Some(name) = base
            .strip_suffix(".html")
            .and_then(TemplateName::parse)
        else {
            skipped.push(path);
            continue;
        };

        let mut content = String::new();
        let read = (&mut file)
            .take(MAX_TEMPLATE_SIZE as u64 + 1)
            .read_to_string(&mut content);
        match read {
            Ok(n) if n > MAX_TEMPLATE_SIZE => failed.push(ImportFailure {
                file: path,
                error: format!("exceeds {} bytes", MAX_TEMPLATE_SIZE),
            }),
            Ok(_) => entries.push(ArchiveTemplate {
                file: path,
                name,
                content,
            }),
            Err(e) => failed.push(ImportFailure {
                file: path,
                error: e.to_string(),
            }),
        }
    }

    Ok((entries, skipped, failed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::test_server;
    use axum::http::StatusCode;
    use axum_test::multipart::{MultipartForm, Part};
    use serde_json::{json, Value};
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn zip_of(files: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in files {
            writer
                .start_file(name.to_string(), SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn archive_form(data: Vec<u8>) -> MultipartForm {
        MultipartForm::new().add_part(
            "file",
            Part::bytes(data)
                .file_name("templates.zip")
                .mime_type("application/zip"),
        )
    }

    #[test]
    fn test_read_archive_sorts_entries() {
        let data = zip_of(&[
            ("theme/index.html", "<ul></ul>"),
            ("theme/footer.html", "x"),
            ("README.md", "hi"),
        ]);
        let (entries, skipped, failed) = read_archive(&data).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, TemplateName::Index);
        assert_eq!(skipped, vec!["theme/footer.html", "README.md"]);
        assert!(failed.is_empty());
    }

    #[test]
    fn test_read_archive_rejects_garbage() {
        assert!(read_archive(b"not a zip").is_err());
    }

    #[tokio::test]
    async fn test_get_and_update_template() {
        let (server, _dir) = test_server().await;

        let list: Value = server.get("/api/templates").await.json();
        assert_eq!(list["templates"].as_array().unwrap().len(), 5);

        let updated: Value = server
            .put("/api/templates/index")
            .json(&json!({"content": "<ol>{% for a in articles %}<li>{{ a.title }}</li>{% endfor %}</ol>"}))
            .await
            .json();
        assert_eq!(updated["name"], "index");

        let fetched: Value = server.get("/api/templates/index").await.json();
        assert!(fetched["content"].as_str().unwrap().starts_with("<ol>"));
    }

    #[tokio::test]
    async fn test_unknown_template_is_bad_request() {
        let (server, _dir) = test_server().await;
        server
            .get("/api/templates/footer")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        server
            .put("/api/templates/footer")
            .json(&json!({"content": "x"}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_single_template() {
        let (server, _dir) = test_server().await;
        let form = MultipartForm::new().add_part(
            "file",
            Part::bytes(b"<p>{{ tag.name }}</p>".to_vec()).file_name("tag.html"),
        );

        let response = server.post("/api/templates/tag/upload").multipart(form).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["content"], "<p>{{ tag.name }}</p>");
    }

    #[tokio::test]
    async fn test_import_accumulates_failures() {
        let (server, _dir) = test_server().await;
        let data = zip_of(&[
            ("index.html", "<ul></ul>"),
            ("tag.html", "{% if %}"),
            ("notes.txt", "x"),
        ]);

        let response = server
            .post("/api/templates/import")
            .multipart(archive_form(data))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["imported"], json!(["index"]));
        assert_eq!(body["failed"][0]["file"], "tag.html");
        assert_eq!(body["skipped"], json!(["notes.txt"]));
    }

    #[tokio::test]
    async fn test_import_with_nothing_usable_is_bad_request() {
        let (server, _dir) = test_server().await;
        let data = zip_of(&[("footer.html", "x")]);

        let response = server
            .post("/api/templates/import")
            .multipart(archive_form(data))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"]["details"]["skipped"], json!(["footer.html"]));
    }

    #[tokio::test]
    async fn test_reset_restores_defaults() {
        let (server, _dir) = test_server().await;
        server
            .put("/api/templates/base")
            .json(&json!({"content": "{{ content }}"}))
            .await
            .assert_status_ok();

        server.post("/api/templates/reset").await.assert_status_ok();

        let base: Value = server.get("/api/templates/base").await.json();
        assert_eq!(
            base["content"],
            crate::theme::default_template(TemplateName::Base)
        );
    }
}
