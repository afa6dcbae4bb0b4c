//! Page template model
//!
//! Exactly five templates exist. `TemplateName` enumerates them so that
//! every consumer matches the full set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of one of the five page templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateName {
    /// Shared layout wrapping every page
    Base,
    /// A single article page
    Article,
    /// The site index listing all published articles
    Index,
    /// Articles in one category
    Category,
    /// Articles carrying one tag
    Tag,
}

impl TemplateName {
    /// All template names, in seeding order
    pub const ALL: [TemplateName; 5] = [
        TemplateName::Base,
        TemplateName::Article,
        TemplateName::Index,
        TemplateName::Category,
        TemplateName::Tag,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateName::Base => "base",
            TemplateName::Article => "article",
            TemplateName::Index => "index",
            TemplateName::Category => "category",
            TemplateName::Tag => "tag",
        }
    }

    /// Name used when registering the template with the engine and when
    /// importing from an archive
    pub fn file_name(&self) -> &'static str {
        match self {
            TemplateName::Base => "base.html",
            TemplateName::Article => "article.html",
            TemplateName::Index => "index.html",
            TemplateName::Category => "category.html",
            TemplateName::Tag => "tag.html",
        }
    }

    /// Parse an exact template name (`"base"`, `"article"`, ...)
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|name| name.as_str() == s)
    }
}

impl std::fmt::Display for TemplateName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored template
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Template {
    pub id: i64,
    pub name: TemplateName,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
