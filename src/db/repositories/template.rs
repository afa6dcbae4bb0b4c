//! Template repository
//!
//! Templates are keyed by name and only ever upserted, never deleted.

use crate::db::DynDatabasePool;
use crate::models::{Template, TemplateName};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

/// Template repository trait
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    /// All stored templates, ordered by name
    async fn list(&self) -> Result<Vec<Template>>;

    /// Get a template by name
    async fn get(&self, name: TemplateName) -> Result<Option<Template>>;

    /// Insert or replace the content of a template
    async fn upsert(&self, name: TemplateName, content: &str) -> Result<Template>;

    /// Number of stored templates
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based template repository implementation
pub struct SqlxTemplateRepository {
    pool: DynDatabasePool,
}

impl SqlxTemplateRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TemplateRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TemplateRepository for SqlxTemplateRepository {
    async fn list(&self) -> Result<Vec<Template>> {
        list_templates_sqlite(self.pool.as_sqlite()).await
    }

    async fn get(&self, name: TemplateName) -> Result<Option<Template>> {
        get_template_sqlite(self.pool.as_sqlite(), name).await
    }

    async fn upsert(&self, name: TemplateName, content: &str) -> Result<Template> {
        upsert_template_sqlite(self.pool.as_sqlite(), name, content).await
    }

    async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM templates")
            .fetch_one(self.pool.as_sqlite())
            .await
            .context("Failed to count templates")?;
        Ok(row.try_get("count")?)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn list_templates_sqlite(pool: &SqlitePool) -> Result<Vec<Template>> {
    let rows = sqlx::query(
        "SELECT id, name, content, created_at, updated_at FROM templates ORDER BY name",
    )
    .fetch_all(pool)
    .await
    .context("Failed to list templates")?;

    rows.iter().map(row_to_template_sqlite).collect()
}

async fn get_template_sqlite(pool: &SqlitePool, name: TemplateName) -> Result<Option<Template>> {
    let row = sqlx::query(
        "SELECT id, name, content, created_at, updated_at FROM templates WHERE name = ?",
    )
    .bind(name.as_str())
    .fetch_optional(pool)
    .await
    .with_context(|| format!("Failed to get template {}", name))?;

    row.as_ref().map(row_to_template_sqlite).transpose()
}

async fn upsert_template_sqlite(
    pool: &SqlitePool,
    name: TemplateName,
    content: &str,
) -> Result<Template> {
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO templates (name, content, created_at, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(name) DO UPDATE SET content = excluded.content, updated_at = excluded.updated_at
        "#,
    )
    .bind(name.as_str())
    .bind(content)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .with_context(|| format!("Failed to upsert template {}", name))?;

    get_template_sqlite(pool, name)
        .await?
        .with_context(|| format!("Template {} not found after upsert", name))
}

fn row_to_template_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Template> {
    let name: String = row.try_get("name")?;
    let name = TemplateName::parse(&name)
        .ok_or_else(|| anyhow!("Unknown template name in database: {}", name))?;

    Ok(Template {
        id: row.try_get("id")?,
        name,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> SqlxTemplateRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxTemplateRepository::new(pool)
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_replaces() {
        let repo = setup().await;
        assert_eq!(repo.count().await.unwrap(), 0);

        let first = repo.upsert(TemplateName::Base, "one").await.unwrap();
        assert_eq!(first.content, "one");

        let second = repo.upsert(TemplateName::Base, "two").await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.content, "two");
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let repo = setup().await;
        assert!(repo.get(TemplateName::Tag).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_is_sorted_by_name() {
        let repo = setup().await;
        repo.upsert(TemplateName::Tag, "t").await.unwrap();
        repo.upsert(TemplateName::Article, "a").await.unwrap();

        let names: Vec<TemplateName> = repo.list().await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec![TemplateName::Article, TemplateName::Tag]);
    }
}
