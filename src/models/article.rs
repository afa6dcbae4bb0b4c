//! Article model
//!
//! This module provides:
//! - `Article` entity with its resolved category and tags
//! - `ArticleStatus` enum for publication states
//! - Input types for creating and updating articles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Category, Tag};

/// Article entity
///
/// `published_at` is set exactly when `status` is `Published`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Article {
    /// Unique identifier
    pub id: i64,
    /// Article title
    pub title: String,
    /// URL-friendly slug, globally unique
    pub slug: String,
    /// Markdown content
    pub content: String,
    /// Publication status
    pub status: ArticleStatus,
    /// Author reference (no user store; kept for API compatibility)
    pub author_id: Option<i64>,
    /// Category reference
    pub category_id: Option<i64>,
    /// Publication timestamp
    pub published_at: Option<DateTime<Utc>>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
    /// Resolved category, when loaded with relations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    /// Attached tags in association order
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Article {
    pub fn is_published(&self) -> bool {
        self.status == ArticleStatus::Published
    }
}

/// Article publication status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    /// Draft, excluded from export
    #[default]
    Draft,
    /// Published, included in export
    Published,
}

impl ArticleStatus {
    /// Convert status to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleStatus::Draft => "draft",
            ArticleStatus::Published => "published",
        }
    }

    /// Parse status from its string representation (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Some(ArticleStatus::Draft),
            "published" => Some(ArticleStatus::Published),
            _ => None,
        }
    }
}

impl std::fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input for creating a new article
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateArticleInput {
    pub title: String,
    /// Empty means "derive from title"
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub status: ArticleStatus,
    #[serde(default)]
    pub author_id: Option<i64>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
}

impl CreateArticleInput {
    pub fn new(title: impl Into<String>, slug: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            slug: slug.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: ArticleStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_category_id(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_tag_ids(mut self, tag_ids: Vec<i64>) -> Self {
        self.tag_ids = tag_ids;
        self
    }
}

/// Input for replacing an article's editable fields.
///
/// `status: None` keeps the current status. `tag_ids` replaces the whole
/// association set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateArticleInput {
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub status: Option<ArticleStatus>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
}

/// Fields written to the articles table, after the service has resolved
/// the slug and the publication timestamp
#[derive(Debug, Clone)]
pub struct ArticleRecord {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub status: ArticleStatus,
    pub author_id: Option<i64>,
    pub category_id: Option<i64>,
    pub published_at: Option<DateTime<Utc>>,
}
