//! Tag repository
//!
//! This module provides:
//! - `TagRepository` trait defining the interface for tag data access
//! - `SqlxTagRepository` implementing the trait for SQLite

use crate::db::DynDatabasePool;
use crate::models::Tag;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Create a new tag
    async fn create(&self, tag: &Tag) -> Result<Tag>;

    /// Get tag by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>>;

    /// Get tag by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>>;

    /// Get tag by exact name
    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>>;

    /// List all tags ordered by name
    async fn list(&self) -> Result<Vec<Tag>>;

    /// Update name and slug
    async fn update(&self, tag: &Tag) -> Result<Tag>;

    /// Delete a tag and its article associations
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based tag repository implementation
pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn create(&self, tag: &Tag) -> Result<Tag> {
        create_tag_sqlite(self.pool.as_sqlite(), tag).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>> {
        get_tag_where_sqlite(self.pool.as_sqlite(), "id = ?", TagKey::Id(id)).await
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>> {
        get_tag_where_sqlite(self.pool.as_sqlite(), "slug = ?", TagKey::Text(slug)).await
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Tag>> {
        get_tag_where_sqlite(self.pool.as_sqlite(), "name = ?", TagKey::Text(name)).await
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        list_tags_sqlite(self.pool.as_sqlite()).await
    }

    async fn update(&self, tag: &Tag) -> Result<Tag> {
        update_tag_sqlite(self.pool.as_sqlite(), tag).await
    }

    async fn delete(&self, id: i64) -> Result<()> {
        delete_tag_sqlite(self.pool.as_sqlite(), id).await
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

enum TagKey<'a> {
    Id(i64),
    Text(&'a str),
}

async fn create_tag_sqlite(pool: &SqlitePool, tag: &Tag) -> Result<Tag> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO tags (name, slug, created_at)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(&tag.name)
    .bind(&tag.slug)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create tag")?;

    Ok(Tag {
        id: result.last_insert_rowid(),
        name: tag.name.clone(),
        slug: tag.slug.clone(),
        created_at: now,
    })
}

async fn get_tag_where_sqlite(
    pool: &SqlitePool,
    condition: &str,
    key: TagKey<'_>,
) -> Result<Option<Tag>> {
    let sql = format!("SELECT id, name, slug, created_at FROM tags WHERE {}", condition);
    let query = sqlx::query(&sql);
    let query = match key {
        TagKey::Id(id) => query.bind(id),
        TagKey::Text(text) => query.bind(text),
    };

    let row = query
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get tag where {}", condition))?;

    row.as_ref().map(row_to_tag_sqlite).transpose()
}

async fn list_tags_sqlite(pool: &SqlitePool) -> Result<Vec<Tag>> {
    let rows = sqlx::query("SELECT id, name, slug, created_at FROM tags ORDER BY name, id")
        .fetch_all(pool)
        .await
        .context("Failed to list tags")?;

    rows.iter().map(row_to_tag_sqlite).collect()
}

async fn update_tag_sqlite(pool: &SqlitePool, tag: &Tag) -> Result<Tag> {
    sqlx::query("UPDATE tags SET name = ?, slug = ? WHERE id = ?")
        .bind(&tag.name)
        .bind(&tag.slug)
        .bind(tag.id)
        .execute(pool)
        .await
        .context("Failed to update tag")?;

    get_tag_where_sqlite(pool, "id = ?", TagKey::Id(tag.id))
        .await?
        .context("Tag not found after update")
}

async fn delete_tag_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM tags WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete tag")?;
    Ok(())
}

fn row_to_tag_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Tag> {
    Ok(Tag {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> SqlxTagRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxTagRepository::new(pool)
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let repo = setup().await;

        let created = repo
            .create(&Tag::new("Rust".to_string(), "rust".to_string()))
            .await
            .unwrap();

        assert_eq!(repo.get_by_id(created.id).await.unwrap().unwrap().slug, "rust");
        assert_eq!(repo.get_by_slug("rust").await.unwrap().unwrap().id, created.id);
        assert_eq!(repo.get_by_name("Rust").await.unwrap().unwrap().id, created.id);
        assert!(repo.get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_name_fails() {
        let repo = setup().await;

        repo.create(&Tag::new("Rust".to_string(), "rust".to_string()))
            .await
            .unwrap();
        let dup = repo
            .create(&Tag::new("Rust".to_string(), "rust-2".to_string()))
            .await;
        assert!(dup.is_err());
    }

    #[tokio::test]
    async fn test_update_list_delete() {
        let repo = setup().await;

        let mut tag = repo
            .create(&Tag::new("web".to_string(), "web".to_string()))
            .await
            .unwrap();
        repo.create(&Tag::new("async".to_string(), "async".to_string()))
            .await
            .unwrap();

        tag.name = "www".to_string();
        let updated = repo.update(&tag).await.unwrap();
        assert_eq!(updated.name, "www");

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["async", "www"]);

        repo.delete(tag.id).await.unwrap();
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }
}
