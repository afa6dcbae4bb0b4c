//! Shared API plumbing
//!
//! Contains:
//! - `AppState`, the pool and services shared by every handler
//! - `ApiError`, the JSON error body and its HTTP status mapping
//! - Conversions from service errors into `ApiError`

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{Config, ExportDefaults, UploadConfig};
use crate::db::repositories::{
    SqlxArticleRepository, SqlxCategoryRepository, SqlxSettingsRepository, SqlxTagRepository,
    SqlxTemplateRepository,
};
use crate::db::DynDatabasePool;
use crate::services::{
    ArticleService, ArticleServiceError, CategoryService, CategoryServiceError, ExportError,
    ExportService, SettingsService, SettingsServiceError, TagService, TagServiceError,
    TemplateService, TemplateServiceError,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub article_service: Arc<ArticleService>,
    pub category_service: Arc<CategoryService>,
    pub tag_service: Arc<TagService>,
    pub template_service: Arc<TemplateService>,
    pub settings_service: Arc<SettingsService>,
    pub export_service: Arc<ExportService>,
    pub upload_config: Arc<UploadConfig>,
    pub export_defaults: Arc<ExportDefaults>,
}

impl AppState {
    /// Wire every service over one database pool
    pub fn new(pool: DynDatabasePool, config: &Config) -> Self {
        let category_repo = SqlxCategoryRepository::boxed(pool.clone());
        let tag_repo = SqlxTagRepository::boxed(pool.clone());

        let article_service = Arc::new(ArticleService::new(
            SqlxArticleRepository::boxed(pool.clone()),
            category_repo.clone(),
            tag_repo.clone(),
        ));
        let category_service = Arc::new(CategoryService::new(category_repo));
        let tag_service = Arc::new(TagService::new(tag_repo));
        let template_service = Arc::new(TemplateService::new(SqlxTemplateRepository::boxed(pool.clone())));
        let settings_service = Arc::new(SettingsService::new(
            SqlxSettingsRepository::boxed(pool.clone()),
            config.export.clone(),
        ));
        let export_service = Arc::new(ExportService::new(
            article_service.clone(),
            category_service.clone(),
            tag_service.clone(),
            template_service.clone(),
        ));

        Self {
            pool,
            article_service,
            category_service,
            tag_service,
            template_service,
            settings_service,
            export_service,
            upload_config: Arc::new(config.upload.clone()),
            export_defaults: Arc::new(config.export.clone()),
        }
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!("Internal error: {}", message);
        Self::new("INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

impl From<ArticleServiceError> for ApiError {
    fn from(e: ArticleServiceError) -> Self {
        match e {
            ArticleServiceError::NotFound(msg) => ApiError::not_found(msg),
            ArticleServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            ArticleServiceError::DuplicateSlug(slug) => {
                ApiError::conflict(format!("Slug already exists: {}", slug))
            }
            ArticleServiceError::InternalError(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<CategoryServiceError> for ApiError {
    fn from(e: CategoryServiceError) -> Self {
        match e {
            CategoryServiceError::NotFound(msg) => ApiError::not_found(msg),
            CategoryServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            CategoryServiceError::DuplicateSlug(slug) => {
                ApiError::conflict(format!("Category slug already exists: {}", slug))
            }
            CategoryServiceError::InternalError(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<TagServiceError> for ApiError {
    fn from(e: TagServiceError) -> Self {
        match e {
            TagServiceError::NotFound(msg) => ApiError::not_found(msg),
            TagServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            TagServiceError::Duplicate(what) => {
                ApiError::conflict(format!("Tag already exists: {}", what))
            }
            TagServiceError::InternalError(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<TemplateServiceError> for ApiError {
    fn from(e: TemplateServiceError) -> Self {
        match e {
            TemplateServiceError::NotFound(name) => {
                ApiError::not_found(format!("Template not found: {}", name))
            }
            TemplateServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            other => ApiError::internal_error(other.to_string()),
        }
    }
}

impl From<SettingsServiceError> for ApiError {
    fn from(e: SettingsServiceError) -> Self {
        match e {
            SettingsServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            SettingsServiceError::InternalError(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

impl From<ExportError> for ApiError {
    fn from(e: ExportError) -> Self {
        ApiError::internal_error(format!("Export failed: {}", e))
    }
}
