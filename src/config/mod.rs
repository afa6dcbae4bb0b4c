//! Configuration management
//!
//! This module handles loading and parsing configuration for inkpress.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Image upload configuration
    #[serde(default)]
    pub upload: UploadConfig,
    /// Static export defaults
    #[serde(default)]
    pub export: ExportDefaults,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (the admin frontend)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:5173".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path or `sqlite:` URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "inkpress.db".to_string()
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Upload directory path
    #[serde(default = "default_upload_path")]
    pub path: PathBuf,
    /// Maximum file size in bytes (default: 10MB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Allowed image file extensions, lowercase, without the dot
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            path: default_upload_path(),
            max_file_size: default_max_file_size(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

fn default_upload_path() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024 // 10MB
}

fn default_allowed_extensions() -> Vec<String> {
    ["jpg", "jpeg", "png", "gif", "webp"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl UploadConfig {
    /// Check if a file extension is allowed (case-insensitive, with or without the dot)
    pub fn is_extension_allowed(&self, ext: &str) -> bool {
        let ext = ext.trim_start_matches('.').to_lowercase();
        self.allowed_extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext))
    }
}

/// Defaults for static export, used when neither the request nor the
/// stored settings provide a value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportDefaults {
    /// Output directory
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Site title shown in the base layout
    #[serde(default = "default_site_title")]
    pub site_title: String,
    /// URL prefix under which images are served by the API; rewritten to
    /// `../images/` inside exported pages
    #[serde(default = "default_image_base_url")]
    pub image_base_url: String,
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            site_title: default_site_title(),
            image_base_url: default_image_base_url(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./dist")
}

fn default_site_title() -> String {
    "My Blog".to_string()
}

fn default_image_base_url() -> String {
    "http://localhost:8080/api/images/".to_string()
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - INKPRESS_SERVER_HOST
    /// - INKPRESS_SERVER_PORT
    /// - INKPRESS_SERVER_CORS_ORIGIN
    /// - INKPRESS_DATABASE_URL
    /// - INKPRESS_UPLOAD_PATH
    /// - INKPRESS_EXPORT_OUTPUT_DIR
    /// - INKPRESS_EXPORT_SITE_TITLE
    /// - INKPRESS_EXPORT_IMAGE_BASE_URL
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("INKPRESS_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("INKPRESS_SERVER_PORT") {
            // Invalid values are ignored
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("INKPRESS_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(url) = std::env::var("INKPRESS_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(path) = std::env::var("INKPRESS_UPLOAD_PATH") {
            self.upload.path = PathBuf::from(path);
        }

        if let Ok(dir) = std::env::var("INKPRESS_EXPORT_OUTPUT_DIR") {
            self.export.output_dir = PathBuf::from(dir);
        }
        if let Ok(title) = std::env::var("INKPRESS_EXPORT_SITE_TITLE") {
            self.export.site_title = title;
        }
        if let Ok(url) = std::env::var("INKPRESS_EXPORT_IMAGE_BASE_URL") {
            self.export.image_base_url = url;
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared by every test that touches INKPRESS_* variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
