//! Category service
//!
//! Business logic for category management, including the find-or-create
//! lookup used by the importer.

use crate::db::repositories::CategoryRepository;
use crate::models::{Category, CategoryInput};
use crate::services::slug::generate_slug;
use anyhow::Context;
use std::sync::Arc;

/// Error types for category service operations
#[derive(Debug, thiserror::Error)]
pub enum CategoryServiceError {
    /// Category not found
    #[error("Category not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Slug already used by another category
    #[error("Category slug already exists: {0}")]
    DuplicateSlug(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Category service
pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoryRepository>) -> Self {
        Self { repo }
    }

    /// List all categories ordered by name
    pub async fn list(&self) -> Result<Vec<Category>, CategoryServiceError> {
        self.repo
            .list()
            .await
            .context("Failed to list categories")
            .map_err(Into::into)
    }

    /// Get a category by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Category, CategoryServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get category")?
            .ok_or_else(|| CategoryServiceError::NotFound(format!("Category with ID {} not found", id)))
    }

    /// Create a category. An empty slug is derived from the name.
    pub async fn create(&self, input: &CategoryInput) -> Result<Category, CategoryServiceError> {
        let (name, slug) = validate_input(input)?;

        if self
            .repo
            .get_by_slug(&slug)
            .await
            .context("Failed to check slug uniqueness")?
            .is_some()
        {
            return Err(CategoryServiceError::DuplicateSlug(slug));
        }

        let created = self
            .repo
            .create(&Category::new(name, slug))
            .await
            .context("Failed to create category")?;

        tracing::info!("Created category {} ({})", created.name, created.slug);
        Ok(created)
    }

    /// Rename a category and/or change its slug
    pub async fn update(&self, id: i64, input: &CategoryInput) -> Result<Category, CategoryServiceError> {
        let mut category = self.get_by_id(id).await?;
        let (name, slug) = validate_input(input)?;

        if let Some(other) = self
            .repo
            .get_by_slug(&slug)
            .await
            .context("Failed to check slug uniqueness")?
        {
            if other.id != id {
                return Err(CategoryServiceError::DuplicateSlug(slug));
            }
        }

        category.name = name;
        category.slug = slug;
        self.repo
            .update(&category)
            .await
            .context("Failed to update category")
            .map_err(Into::into)
    }

    /// Delete a category. Its articles remain, uncategorized.
    pub async fn delete(&self, id: i64) -> Result<(), CategoryServiceError> {
        let category = self.get_by_id(id).await?;
        self.repo
            .delete(category.id)
            .await
            .context("Failed to delete category")?;
        Ok(())
    }

    /// Return the category with exactly this name, creating it (with a slug
    /// derived from the name) when none exists.
    ///
    /// Lookup and insert are not atomic. A caller that loses a creation race
    /// re-fetches the winner's row; a different name that collides on the
    /// derived slug is still a `DuplicateSlug` error.
    pub async fn find_or_create(&self, name: &str) -> Result<Category, CategoryServiceError> {
        if name.trim().is_empty() {
            return Err(CategoryServiceError::ValidationError(
                "Category name cannot be empty".to_string(),
            ));
        }

        if let Some(existing) = self
            .repo
            .get_by_name(name)
            .await
            .context("Failed to look up category by name")?
        {
            return Ok(existing);
        }

        let input = CategoryInput {
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
                .context("Failed to look up category by name")?
                .ok_or(err),
        }
    }
}

fn validate_input(input: &CategoryInput) -> Result<(String, String), CategoryServiceError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(CategoryServiceError::ValidationError(
            "Category name cannot be empty".to_string(),
        ));
    }

    let slug = if input.slug.trim().is_empty() {
        generate_slug(name)
    } else {
        generate_slug(input.slug.trim())
    };
    if slug.is_empty() {
        return Err(CategoryServiceError::ValidationError(format!(
            "Cannot derive a slug from '{}'",
            name
        )));
    }

    Ok((name.to_string(), slug))
}
