//! Template compositor error types

use thiserror::Error;

use crate::models::TemplateName;

/// Template loading and rendering errors
#[derive(Debug, Error)]
pub enum ThemeError {
    /// One of the five templates is absent from the set
    #[error("Template not found: {0}")]
    MissingTemplate(TemplateName),

    /// Template parse or render failure
    #[error("Template error: {0}")]
    TemplateError(String),
}
