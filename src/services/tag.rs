//! Tag service
//!
//! Business logic for tag management:
//! - CRUD with slug derivation and uniqueness checks
//! - Find-or-create by exact name, used by the importer

use crate::db::repositories::TagRepository;
use crate::models::{Tag, TagInput};
use crate::services::slug::generate_slug;
use anyhow::Context;
use std::sync::Arc;

/// Error types for tag service operations
#[derive(Debug, thiserror::Error)]
pub enum TagServiceError {
    /// Tag not found
    #[error("Tag not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Name or slug already used by another tag
    #[error("Tag already exists: {0}")]
    Duplicate(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Tag service for managing tags
pub struct TagService {
    repo: Arc<dyn TagRepository>,
}

impl TagService {
    /// Create a new tag service
    ///
    /// # Arguments
    /// * `repo` - Tag repository for database operations
    pub fn new(repo: Arc<dyn TagRepository>) -> Self {
        Self { repo }
    }

    /// List all tags ordered by name
    pub async fn list(&self) -> Result<Vec<Tag>, TagServiceError> {
        self.repo
            .list()
            .await
            .context("Failed to list tags")
            .map_err(Into::into)
    }

    /// Get tag by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Tag, TagServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get tag by ID")?
            .ok_or_else(|| TagServiceError::NotFound(format!("Tag with ID {} not found", id)))
    }

    /// Create a tag
    ///
    /// # Errors
    /// - `ValidationError` if the name is empty or yields an empty slug
    /// - `Duplicate` if the name or slug is taken
    pub async fn create(&self, input: &TagInput) -> Result<Tag, TagServiceError> {
        let (name, slug) = validate_input(input)?;
        self.ensure_unique(&name, &slug, None).await?;

        let created = self
            .repo
            .create(&Tag::new(name, slug))
            .await
            .context("Failed to create tag")?;

        tracing::info!("Created tag {} ({})", created.name, created.slug);
        Ok(created)
    }

    /// Update a tag's name and slug
    pub async fn update(&self, id: i64, input: &TagInput) -> Result<Tag, TagServiceError> {
        let mut tag = self.get_by_id(id).await?;
        let (name, slug) = validate_input(input)?;
        self.ensure_unique(&name, &slug, Some(id)).await?;

        tag.name = name;
        tag.slug = slug;
        self.repo
            .update(&tag)
            .await
            .context("Failed to update tag")
            .map_err(Into::into)
    }

    /// Delete a tag
    ///
    /// Article associations are removed via CASCADE.
    pub async fn delete(&self, id: i64) -> Result<(), TagServiceError> {
        let tag = self.get_by_id(id).await?;
        self.repo
            .delete(tag.id)
            .await
            .context("Failed to delete tag")?;
        Ok(())
    }

    /// Return the tag with exactly this name, creating it when absent.
    ///
    /// Not atomic under concurrent callers. On a uniqueness conflict the row
    /// is looked up again by name before giving up.
    pub async fn find_or_create(&self, name: &str) -> Result<Tag, TagServiceError> {
        if name.trim().is_empty() {
            return Err(TagServiceError::ValidationError(
                "Tag name cannot be empty".to_string(),
            ));
        }

        if let Some(existing) = self
            .repo
            .get_by_name(name)
            .await
            .context("Failed to check existing tag")?
        {
            return Ok(existing);
        }

        let input = TagInput {
            name: name.to_string(),
            slug: String::new(),
        };
        match self.create(&input).await {
            Ok(created) => Ok(created),
            // A concurrent creator of the same name may have won the insert
            Err(err) => self
                .repo
                .get_by_name(name)
                .await
                .context("Failed to check existing tag")?
                .ok_or(err),
        }
    }

    async fn ensure_unique(
        &self,
        name: &str,
        slug: &str,
        current_id: Option<i64>,
    ) -> Result<(), TagServiceError> {
        let by_name = self
            .repo
            .get_by_name(name)
            .await
            .context("Failed to check tag name")?;
        if by_name.is_some_and(|t| Some(t.id) != current_id) {
            return Err(TagServiceError::Duplicate(format!("name '{}'", name)));
        }

        let by_slug = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to check tag slug")?;
        if by_slug.is_some_and(|t| Some(t.id) != current_id) {
            return Err(TagServiceError::Duplicate(format!("slug '{}'", slug)));
        }

        Ok(())
    }
}

fn validate_input(input: &TagInput) -> Result<(String, String), TagServiceError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(TagServiceError::ValidationError(
            "Tag name cannot be empty".to_string(),
        ));
    }

    let source = if input.slug.trim().is_empty() {
        name
    } else {
        input.slug.trim()
    };
    let slug = generate_slug(source);
    if slug.is_empty() {
        return Err(TagServiceError::ValidationError(format!(
            "Cannot derive a slug from '{}'",
            source
        )));
    }

    Ok((name.to_string(), slug))
}
