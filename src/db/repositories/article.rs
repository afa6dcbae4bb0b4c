//! Article repository
//!
//! This module provides:
//! - `ArticleRepository` trait defining the interface for article data access
//! - `SqlxArticleRepository` implementing the trait for SQLite
//!
//! Every read returns articles with their category and tags attached. The
//! relations are resolved in one query: articles are joined against their
//! category and tag rows, then folded back together keyed by article ID,
//! keeping the query's article order and each article's tag association
//! order.

use crate::db::DynDatabasePool;
use crate::models::{Article, ArticleRecord, ArticleStatus, Category, Tag};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use std::collections::HashMap;
use std::sync::Arc;

/// Article repository trait
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// Insert an article and its tag associations
    async fn create(&self, record: &ArticleRecord, tag_ids: &[i64]) -> Result<Article>;

    /// Get article by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Article>>;

    /// Get article by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Article>>;

    /// List all articles, newest first
    async fn list(&self) -> Result<Vec<Article>>;

    /// List published articles, most recently published first
    async fn list_published(&self) -> Result<Vec<Article>>;

    /// List published articles in a category
    async fn list_published_by_category(&self, category_id: i64) -> Result<Vec<Article>>;

    /// List published articles carrying a tag
    async fn list_published_by_tag(&self, tag_id: i64) -> Result<Vec<Article>>;

    /// Replace an article's fields and its tag association set
    async fn update(&self, id: i64, record: &ArticleRecord, tag_ids: &[i64]) -> Result<Article>;

    /// Change status and publication timestamp together
    async fn set_status(
        &self,
        id: i64,
        status: ArticleStatus,
        published_at: Option<DateTime<Utc>>,
    ) -> Result<Article>;

    /// Delete an article (tag associations cascade)
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based article repository implementation
pub struct SqlxArticleRepository {
    pool: DynDatabasePool,
}

impl SqlxArticleRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ArticleRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ArticleRepository for SqlxArticleRepository {
    async fn create(&self, record: &ArticleRecord, tag_ids: &[i64]) -> Result<Article> {
        create_article_sqlite(self.pool.as_sqlite(), record, tag_ids).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Article>> {
        get_article_by_id_sqlite(self.pool.as_sqlite(), id).await
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Article>> {
        let articles = query_articles_sqlite(
            self.pool.as_sqlite(),
            "a.slug = ?",
            ORDER_NEWEST,
            Filter::Text(slug),
        )
        .await?;
        Ok(articles.into_iter().next())
    }

    async fn list(&self) -> Result<Vec<Article>> {
        query_articles_sqlite(self.pool.as_sqlite(), "1 = 1", ORDER_NEWEST, Filter::None).await
    }

    async fn list_published(&self) -> Result<Vec<Article>> {
        query_articles_sqlite(
            self.pool.as_sqlite(),
            "a.status = 'published'",
            ORDER_PUBLISHED,
            Filter::None,
        )
        .await
    }

    async fn list_published_by_category(&self, category_id: i64) -> Result<Vec<Article>> {
        query_articles_sqlite(
            self.pool.as_sqlite(),
            "a.status = 'published' AND a.category_id = ?",
            ORDER_PUBLISHED,
            Filter::Id(category_id),
        )
        .await
    }

    async fn list_published_by_tag(&self, tag_id: i64) -> Result<Vec<Article>> {
        // Filter through a subquery so the article still carries all of its tags
        query_articles_sqlite(
            self.pool.as_sqlite(),
            "a.status = 'published' AND a.id IN (SELECT article_id FROM article_tags WHERE tag_id = ?)",
            ORDER_PUBLISHED,
            Filter::Id(tag_id),
        )
        .await
    }

    async fn update(&self, id: i64, record: &ArticleRecord, tag_ids: &[i64]) -> Result<Article> {
        update_article_sqlite(self.pool.as_sqlite(), id, record, tag_ids).await
    }

    async fn set_status(
        &self,
        id: i64,
        status: ArticleStatus,
        published_at: Option<DateTime<Utc>>,
    ) -> Result<Article> {
        set_article_status_sqlite(self.pool.as_sqlite(), id, status, published_at).await
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(id)
            .execute(self.pool.as_sqlite())
            .await
            .context("Failed to delete article")?;
        Ok(())
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

const SELECT_WITH_RELATIONS: &str = r#"
    SELECT a.id, a.title, a.slug, a.content, a.status, a.author_id, a.category_id,
           a.published_at, a.created_at, a.updated_at,
           c.id AS c_id, c.name AS c_name, c.slug AS c_slug, c.created_at AS c_created_at,
           t.id AS t_id, t.name AS t_name, t.slug AS t_slug, t.created_at AS t_created_at
    FROM articles a
    LEFT JOIN categories c ON c.id = a.category_id
    LEFT JOIN article_tags atg ON atg.article_id = a.id
    LEFT JOIN tags t ON t.id = atg.tag_id
"#;

const ORDER_NEWEST: &str = "a.created_at DESC, a.id DESC, atg.rowid ASC";
const ORDER_PUBLISHED: &str = "a.published_at DESC, a.id DESC, atg.rowid ASC";

enum Filter<'a> {
    None,
    Id(i64),
    Text(&'a str),
}

async fn query_articles_sqlite(
    pool: &SqlitePool,
    condition: &str,
    order: &str,
    filter: Filter<'_>,
) -> Result<Vec<Article>> {
    let sql = format!("{} WHERE {} ORDER BY {}", SELECT_WITH_RELATIONS, condition, order);
    let query = sqlx::query(&sql);
    let query = match filter {
        Filter::None => query,
        Filter::Id(id) => query.bind(id),
        Filter::Text(text) => query.bind(text),
    };

    let rows = query
        .fetch_all(pool)
        .await
        .with_context(|| format!("Failed to query articles where {}", condition))?;

    fold_article_rows(&rows)
}

/// Fold joined rows (one per article/tag pair) into articles.
fn fold_article_rows(rows: &[SqliteRow]) -> Result<Vec<Article>> {
    let mut articles: Vec<Article> = Vec::new();
    let mut index_by_id: HashMap<i64, usize> = HashMap::new();

    for row in rows {
        let id: i64 = row.try_get("id")?;

        let idx = match index_by_id.get(&id) {
            Some(&idx) => idx,
            None => {
                articles.push(row_to_article_sqlite(row)?);
                index_by_id.insert(id, articles.len() - 1);
                articles.len() - 1
            }
        };

        let tag_id: Option<i64> = row.try_get("t_id")?;
        if let Some(tag_id) = tag_id {
            articles[idx].tags.push(Tag {
                id: tag_id,
                name: row.try_get("t_name")?,
                slug: row.try_get("t_slug")?,
                created_at: row.try_get("t_created_at")?,
            });
        }
    }

    Ok(articles)
}

fn row_to_article_sqlite(row: &SqliteRow) -> Result<Article> {
    let status_str: String = row.try_get("status")?;
    let status = ArticleStatus::parse(&status_str)
        .ok_or_else(|| anyhow!("Unknown article status in database: {}", status_str))?;

    let category_id: Option<i64> = row.try_get("c_id")?;
    let category = match category_id {
        Some(id) => Some(Category {
            id,
            name: row.try_get("c_name")?,
            slug: row.try_get("c_slug")?,
            created_at: row.try_get("c_created_at")?,
        }),
        None => None,
    };

    Ok(Article {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        content: row.try_get("content")?,
        status,
        author_id: row.try_get("author_id")?,
        category_id: row.try_get("category_id")?,
        published_at: row.try_get("published_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        category,
        tags: Vec::new(),
    })
}

async fn get_article_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Article>> {
    let articles = query_articles_sqlite(pool, "a.id = ?", ORDER_NEWEST, Filter::Id(id)).await?;
    Ok(articles.into_iter().next())
}

async fn create_article_sqlite(
    pool: &SqlitePool,
    record: &ArticleRecord,
    tag_ids: &[i64],
) -> Result<Article> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(
        r#"
        INSERT INTO articles (title, slug, content, status, author_id, category_id,
                              published_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.title)
    .bind(&record.slug)
    .bind(&record.content)
    .bind(record.status.as_str())
    .bind(record.author_id)
    .bind(record.category_id)
    .bind(record.published_at)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create article")?;

    let id = result.last_insert_rowid();
    replace_article_tags(&mut tx, id, tag_ids).await?;
    tx.commit().await.context("Failed to commit article")?;

    get_article_by_id_sqlite(pool, id)
        .await?
        .context("Article not found after create")
}

async fn update_article_sqlite(
    pool: &SqlitePool,
    id: i64,
    record: &ArticleRecord,
    tag_ids: &[i64],
) -> Result<Article> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    sqlx::query(
        r#"
        UPDATE articles
        SET title = ?, slug = ?, content = ?, status = ?, category_id = ?,
            published_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&record.title)
    .bind(&record.slug)
    .bind(&record.content)
    .bind(record.status.as_str())
    .bind(record.category_id)
    .bind(record.published_at)
    .bind(Utc::now())
    .bind(id)
    .execute(&mut *tx)
    .await
    .context("Failed to update article")?;

    replace_article_tags(&mut tx, id, tag_ids).await?;
    tx.commit().await.context("Failed to commit article update")?;

    get_article_by_id_sqlite(pool, id)
        .await?
        .context("Article not found after update")
}

async fn set_article_status_sqlite(
    pool: &SqlitePool,
    id: i64,
    status: ArticleStatus,
    published_at: Option<DateTime<Utc>>,
) -> Result<Article> {
    sqlx::query("UPDATE articles SET status = ?, published_at = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(published_at)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to change article status")?;

    get_article_by_id_sqlite(pool, id)
        .await?
        .context("Article not found after status change")
}

async fn replace_article_tags(
    tx: &mut Transaction<'_, Sqlite>,
    article_id: i64,
    tag_ids: &[i64],
) -> Result<()> {
    sqlx::query("DELETE FROM article_tags WHERE article_id = ?")
        .bind(article_id)
        .execute(&mut **tx)
        .await
        .context("Failed to clear article tags")?;

    for tag_id in tag_ids {
        sqlx::query("INSERT OR IGNORE INTO article_tags (article_id, tag_id) VALUES (?, ?)")
            .bind(article_id)
            .bind(tag_id)
            .execute(&mut **tx)
            .await
            .with_context(|| format!("Failed to attach tag {} to article", tag_id))?;
    }

    Ok(())
}
