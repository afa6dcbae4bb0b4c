//! Category repository
//!
//! This module provides:
//! - `CategoryRepository` trait defining the interface for category data access
//! - `SqlxCategoryRepository` implementing the trait for SQLite

use crate::db::DynDatabasePool;
use crate::models::Category;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Create a new category
    async fn create(&self, category: &Category) -> Result<Category>;

    /// Get category by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    /// Get category by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>>;

    /// Get category by exact name
    async fn get_by_name(&self, name: &str) -> Result<Option<Category>>;

    /// List all categories ordered by name
    async fn list(&self) -> Result<Vec<Category>>;

    /// Update name and slug
    async fn update(&self, category: &Category) -> Result<Category>;

    /// Delete a category; articles keep existing with no category
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based category repository implementation
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, category: &Category) -> Result<Category> {
        create_category_sqlite(self.pool.as_sqlite(), category).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        get_category_by_id_sqlite(self.pool.as_sqlite(), id).await
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        get_category_by_slug_sqlite(self.pool.as_sqlite(), slug).await
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Category>> {
        get_category_by_name_sqlite(self.pool.as_sqlite(), name).await
    }

    async fn list(&self) -> Result<Vec<Category>> {
        list_categories_sqlite(self.pool.as_sqlite()).await
    }

    async fn update(&self, category: &Category) -> Result<Category> {
        update_category_sqlite(self.pool.as_sqlite(), category).await
    }

    async fn delete(&self, id: i64) -> Result<()> {
        delete_category_sqlite(self.pool.as_sqlite(), id).await
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_category_sqlite(pool: &SqlitePool, category: &Category) -> Result<Category> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO categories (name, slug, created_at)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(&category.name)
    .bind(&category.slug)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(Category {
        id: result.last_insert_rowid(),
        name: category.name.clone(),
        slug: category.slug.clone(),
        created_at: now,
    })
}

async fn get_category_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Category>> {
    let row = sqlx::query("SELECT id, name, slug, created_at FROM categories WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by ID")?;

    row.as_ref().map(row_to_category_sqlite).transpose()
}

async fn get_category_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Category>> {
    let row = sqlx::query("SELECT id, name, slug, created_at FROM categories WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by slug")?;

    row.as_ref().map(row_to_category_sqlite).transpose()
}

async fn get_category_by_name_sqlite(pool: &SqlitePool, name: &str) -> Result<Option<Category>> {
    let row = sqlx::query(
        "SELECT id, name, slug, created_at FROM categories WHERE name = ? ORDER BY id LIMIT 1",
    )
    .bind(name)
    .fetch_optional(pool)
    .await
    .context("Failed to get category by name")?;

    row.as_ref().map(row_to_category_sqlite).transpose()
}

async fn list_categories_sqlite(pool: &SqlitePool) -> Result<Vec<Category>> {
    let rows = sqlx::query("SELECT id, name, slug, created_at FROM categories ORDER BY name, id")
        .fetch_all(pool)
        .await
        .context("Failed to list categories")?;

    rows.iter().map(row_to_category_sqlite).collect()
}

async fn update_category_sqlite(pool: &SqlitePool, category: &Category) -> Result<Category> {
    sqlx::query("UPDATE categories SET name = ?, slug = ? WHERE id = ?")
        .bind(&category.name)
        .bind(&category.slug)
        .bind(category.id)
        .execute(pool)
        .await
        .context("Failed to update category")?;

    get_category_by_id_sqlite(pool, category.id)
        .await?
        .context("Category not found after update")
}

async fn delete_category_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete category")?;
    Ok(())
}

fn row_to_category_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Category> {
    Ok(Category {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        created_at: row.try_get("created_at")?,
    })
}
