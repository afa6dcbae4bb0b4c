//! Template service
//!
//! Manages the five stored page templates: seeding, editing, resetting to
//! the built-in defaults and loading them as a [`TemplateSet`] for rendering.

use anyhow::Context;
use std::sync::Arc;

use crate::db::repositories::TemplateRepository;
use crate::models::{Template, TemplateName};
use crate::theme::{
    default_template, BasePage, TemplateCompositor, TemplateSet, ThemeError, TrustedHtml,
};

/// Error types for template service operations
#[derive(Debug, thiserror::Error)]
pub enum TemplateServiceError {
    #[error("Template not found: {0}")]
    NotFound(String),

    /// Unknown template name, or content that does not compile
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Template error: {0}")]
    Theme(#[from] ThemeError),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Template service
pub struct TemplateService {
    repo: Arc<dyn TemplateRepository>,
}

impl TemplateService {
    pub fn new(repo: Arc<dyn TemplateRepository>) -> Self {
        Self { repo }
    }

    /// Seed the default templates when the store is empty.
    ///
    /// Returns `true` if templates were written.
    pub async fn initialize_defaults(&self) -> Result<bool, TemplateServiceError> {
        let count = self
            .repo
            .count()
            .await
            .context("Failed to count templates")?;
        if count > 0 {
            return Ok(false);
        }

        for name in TemplateName::ALL {
            self.repo
                .upsert(name, default_template(name))
                .await
                .with_context(|| format!("Failed to seed template {}", name))?;
        }
        tracing::info!("Seeded {} default templates", TemplateName::ALL.len());
        Ok(true)
    }

    /// All stored templates
    pub async fn get_all(&self) -> Result<Vec<Template>, TemplateServiceError> {
        self.repo
            .list()
            .await
            .context("Failed to list templates")
            .map_err(Into::into)
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Template, TemplateServiceError> {
        let name = parse_name(name)?;
        self.repo
            .get(name)
            .await
            .context("Failed to get template")?
            .ok_or_else(|| TemplateServiceError::NotFound(name.to_string()))
    }

    /// Replace a template's content.
    ///
    /// The content must compile together with the other stored templates,
    /// so a broken edit never reaches the store.
    pub async fn update(&self, name: &str, content: &str) -> Result<Template, TemplateServiceError> {
        let name = parse_name(name)?;
        self.check_compiles(name, content).await?;

        let template = self
            .repo
            .upsert(name, content)
            .await
            .context("Failed to save template")?;
        tracing::info!("Updated template {}", name);
        Ok(template)
    }

    /// Overwrite all five templates with the built-in defaults
    pub async fn reset_to_defaults(&self) -> Result<Vec<Template>, TemplateServiceError> {
        for name in TemplateName::ALL {
            self.repo
                .upsert(name, default_template(name))
                .await
                .with_context(|| format!("Failed to reset template {}", name))?;
        }
        tracing::info!("Templates reset to defaults");
        self.get_all().await
    }

    /// Load the stored templates as a complete set.
    ///
    /// # Errors
    /// `Theme(MissingTemplate)` if any of the five is absent.
    pub async fn load_template_set(&self) -> Result<TemplateSet, TemplateServiceError> {
        let templates = self.get_all().await?;
        let set = TemplateSet::from_sources(templates.into_iter().map(|t| (t.name, t.content)))?;
        Ok(set)
    }

    async fn check_compiles(&self, name: TemplateName, content: &str) -> Result<(), TemplateServiceError> {
        let stored = self.get_all().await?;
        let mut sources: Vec<(TemplateName, String)> = TemplateName::ALL
            .into_iter()
            .map(|n| {
                let source = stored
                    .iter()
                    .find(|t| t.name == n)
                    .map(|t| t.content.clone())
                    .unwrap_or_else(|| default_template(n).to_string());
                (n, source)
            })
            .collect();
        if let Some(entry) = sources.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = content.to_string();
        }

        let set = TemplateSet::from_sources(sources)?;
        let compositor = TemplateCompositor::new(&set).map_err(into_validation)?;

        // The layout takes no page data, so it can be tried out here
        if name == TemplateName::Base {
            compositor
                .compose(
                    TrustedHtml::new("<p></p>"),
                    &BasePage {
                        title: "Preview",
                        site_title: "Preview",
                        root: "",
                    },
                )
                .map_err(into_validation)?;
        }
        Ok(())
    }
}

fn into_validation(err: ThemeError) -> TemplateServiceError {
    match err {
        ThemeError::TemplateError(msg) => TemplateServiceError::ValidationError(msg),
        other => other.into(),
    }
}

fn parse_name(name: &str) -> Result<TemplateName, TemplateServiceError> {
    TemplateName::parse(name).ok_or_else(|| {
        TemplateServiceError::ValidationError(format!(
            "Unknown template '{}', expected one of: base, article, index, category, tag",
            name
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxTemplateRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> TemplateService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        TemplateService::new(SqlxTemplateRepository::boxed(pool))
    }

    #[tokio::test]
    async fn test_initialize_defaults_only_once() {
        let service = setup().await;
        assert!(service.initialize_defaults().await.unwrap());

        service.update("index", "<ul></ul>").await.unwrap();
        assert!(!service.initialize_defaults().await.unwrap());

        // The edit survives a second initialization
        let index = service.get_by_name("index").await.unwrap();
        assert_eq!(index.content, "<ul></ul>");
    }

    #[tokio::test]
    async fn test_unknown_name_is_rejected() {
        let service = setup().await;
        service.initialize_defaults().await.unwrap();
        assert!(matches!(
            service.get_by_name("footer").await,
            Err(TemplateServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service.update("footer", "x").await,
            Err(TemplateServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_unseeded_template_is_not_found() {
        let service = setup().await;
        assert!(matches!(
            service.get_by_name("base").await,
            Err(TemplateServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_broken_template_rejected() {
        let service = setup().await;
        service.initialize_defaults().await.unwrap();

        let result = service.update("tag", "{% if %}").await;
        assert!(matches!(result, Err(TemplateServiceError::ValidationError(_))));

        let tag = service.get_by_name("tag").await.unwrap();
        assert_eq!(tag.content, default_template(TemplateName::Tag));
    }

    #[tokio::test]
    async fn test_filtered_layout_content_rejected() {
        let service = setup().await;
        service.initialize_defaults().await.unwrap();

        let result = service.update("base", "<x>{{ content | upper }}</x>").await;
        assert!(matches!(result, Err(TemplateServiceError::ValidationError(_))));

        service
            .update("base", "<x>{{ title | upper }}</x>{{ content | safe }}")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_reset_restores_defaults() {
        let service = setup().await;
        service.initialize_defaults().await.unwrap();
        service.update("base", "{{ content }}").await.unwrap();

        let templates = service.reset_to_defaults().await.unwrap();
        assert_eq!(templates.len(), 5);
        let base = service.get_by_name("base").await.unwrap();
        assert_eq!(base.content, default_template(TemplateName::Base));
    }

    #[tokio::test]
    async fn test_load_template_set_requires_all() {
        let service = setup().await;
        assert!(matches!(
            service.load_template_set().await,
            Err(TemplateServiceError::Theme(ThemeError::MissingTemplate(_)))
        ));

        service.initialize_defaults().await.unwrap();
        let set = service.load_template_set().await.unwrap();
        assert!(set.get(TemplateName::Article).is_some());
    }
}
