//! Settings service
//!
//! Persisted export settings. Values not yet stored fall back to the
//! `export` section of the configuration file.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::config::ExportDefaults;
use crate::db::repositories::SettingsRepository;

/// Known setting keys
pub mod keys {
    pub const EXPORT_DIR: &str = "export_dir";
    pub const SITE_TITLE: &str = "site_title";
}

/// Name of the probe file written while validating an export directory
const WRITE_PROBE: &str = ".inkpress-write-test";

/// Export settings as exposed to the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSettings {
    pub export_dir: String,
    pub site_title: String,
}

/// Settings service errors
#[derive(Debug, Error)]
pub enum SettingsServiceError {
    #[error("Invalid setting value: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Settings service
pub struct SettingsService {
    repo: Arc<dyn SettingsRepository>,
    defaults: ExportDefaults,
}

impl SettingsService {
    /// Create a new settings service with configured fallbacks
    pub fn new(repo: Arc<dyn SettingsRepository>, defaults: ExportDefaults) -> Self {
        Self { repo, defaults }
    }

    /// Current export settings, stored values first
    pub async fn get(&self) -> Result<ExportSettings, SettingsServiceError> {
        let stored = self
            .repo
            .get_many(&[keys::EXPORT_DIR, keys::SITE_TITLE])
            .await
            .context("Failed to load settings")?;

        Ok(ExportSettings {
            export_dir: stored
                .get(keys::EXPORT_DIR)
                .cloned()
                .unwrap_or_else(|| self.defaults.output_dir.to_string_lossy().into_owned()),
            site_title: stored
                .get(keys::SITE_TITLE)
                .cloned()
                .unwrap_or_else(|| self.defaults.site_title.clone()),
        })
    }

    /// Validate and persist export settings.
    ///
    /// The export directory is created if needed and must accept writes.
    /// An empty site title falls back to the configured default.
    pub async fn update(&self, settings: &ExportSettings) -> Result<ExportSettings, SettingsServiceError> {
        let export_dir = settings.export_dir.trim();
        if export_dir.is_empty() {
            return Err(SettingsServiceError::ValidationError(
                "export_dir is required".to_string(),
            ));
        }
        ensure_writable(Path::new(export_dir)).await?;

        let site_title = match settings.site_title.trim() {
            "" => self.defaults.site_title.as_str(),
            title => title,
        };

        self.repo
            .set_many(&[(keys::EXPORT_DIR, export_dir), (keys::SITE_TITLE, site_title)])
            .await
            .context("Failed to save settings")?;

        tracing::info!("Export settings updated: dir={}, title={}", export_dir, site_title);
        Ok(ExportSettings {
            export_dir: export_dir.to_string(),
            site_title: site_title.to_string(),
        })
    }
}

/// Create `dir` and prove it is writable with a probe file
async fn ensure_writable(dir: &Path) -> Result<(), SettingsServiceError> {
    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        SettingsServiceError::ValidationError(format!(
            "Cannot create export directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    let probe = dir.join(WRITE_PROBE);
    tokio::fs::write(&probe, b"ok").await.map_err(|e| {
        SettingsServiceError::ValidationError(format!(
            "Export directory {} is not writable: {}",
            dir.display(),
            e
        ))
    })?;

    if let Err(e) = tokio::fs::remove_file(&probe).await {
        tracing::warn!("Failed to remove {}: {}", probe.display(), e);
    }
    Ok(())
}
