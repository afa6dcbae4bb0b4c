//! Services layer - Business logic
//!
//! Services sit between the HTTP/CLI surfaces and the repositories. They are
//! responsible for:
//! - Validation and slug resolution
//! - Publication state transitions
//! - Importing Markdown documents and exporting the static site

pub mod article;
pub mod category;
pub mod export;
pub mod importer;
pub mod markdown;
pub mod settings;
pub mod slug;
pub mod tag;
pub mod template;

pub use article::{ArticleService, ArticleServiceError};
pub use category::{CategoryService, CategoryServiceError};
pub use export::{ExportConfig, ExportError, ExportReport, ExportRequest, ExportService};
pub use importer::{ImportError, ImportService};
pub use markdown::MarkdownRenderer;
pub use settings::{ExportSettings, SettingsService, SettingsServiceError};
pub use slug::generate_slug;
pub use tag::{TagService, TagServiceError};
pub use template::{TemplateService, TemplateServiceError};
