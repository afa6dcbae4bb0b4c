//! Markdown importer
//!
//! Turns a Markdown document with a YAML front-matter header into an
//! article, resolving its category and tags by name (creating any that do
//! not yet exist).
//!
//! ```text
//! ---
//! title: Hello
//! slug: hello
//! category: Rust
//! tags: [async, web]
//! status: published
//! ---
//! Body in **Markdown**.
//! ```

use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::models::{Article, ArticleStatus, CreateArticleInput};
use crate::services::article::{ArticleService, ArticleServiceError};
use crate::services::category::{CategoryService, CategoryServiceError};
use crate::services::slug::generate_slug;
use crate::services::tag::{TagService, TagServiceError};

const DELIMITER: &str = "---";

/// Errors from importing a document
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Malformed front-matter block or YAML
    #[error("Invalid front matter: {0}")]
    Parse(String),

    /// Front matter parsed but its values are unusable
    #[error("Invalid article metadata: {0}")]
    Validation(String),

    #[error("Failed to resolve category: {0}")]
    Category(#[from] CategoryServiceError),

    #[error("Failed to resolve tag: {0}")]
    Tag(#[from] TagServiceError),

    #[error("Failed to save article: {0}")]
    Persist(#[from] ArticleServiceError),
}

/// Raw front-matter fields
#[derive(Debug, Default, Deserialize)]
struct FrontMatter {
    title: Option<String>,
    slug: Option<String>,
    category: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    status: Option<String>,
}

/// Front matter after defaults have been applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleMeta {
    pub title: String,
    pub slug: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub status: ArticleStatus,
}

/// A parsed document: metadata plus trimmed Markdown body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    pub meta: ArticleMeta,
    pub body: String,
}

/// Split a document into front matter and body and validate the metadata.
///
/// The first line must be `---`; the block ends at the next line that is
/// `---`. Surrounding whitespace on delimiter lines is ignored.
pub fn parse_document(input: &str) -> Result<ParsedDocument, ImportError> {
    let (yaml, body) = split_front_matter(input)?;

    let raw: FrontMatter = if yaml.trim().is_empty() {
        FrontMatter::default()
    } else {
        serde_yaml::from_str(&yaml).map_err(|e| ImportError::Parse(e.to_string()))?
    };

    Ok(ParsedDocument {
        meta: validate(raw)?,
        body,
    })
}

fn split_front_matter(input: &str) -> Result<(String, String), ImportError> {
    let mut lines = input.lines();

    match lines.next() {
        Some(line) if line.trim() == DELIMITER => {}
        _ => {
            return Err(ImportError::Parse(
                "document must start with a '---' front-matter block".to_string(),
            ))
        }
    }

    let mut yaml = Vec::new();
    let mut closed = false;
    for line in lines.by_ref() {
        if line.trim() == DELIMITER {
            closed = true;
            break;
        }
        yaml.push(line);
    }
    if !closed {
        return Err(ImportError::Parse(
            "front-matter block is not closed with '---'".to_string(),
        ));
    }

    let body = lines.collect::<Vec<_>>().join("\n").trim().to_string();
    Ok((yaml.join("\n"), body))
}

fn validate(raw: FrontMatter) -> Result<ArticleMeta, ImportError> {
    let title = raw
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ImportError::Validation("title is required".to_string()))?;

    let slug = match raw.slug.as_deref().map(str::trim) {
        Some(slug) if !slug.is_empty() => generate_slug(slug),
        _ => generate_slug(&title),
    };
    if slug.is_empty() {
        return Err(ImportError::Validation(format!(
            "cannot derive a slug for '{}'",
            title
        )));
    }

    let status = match raw.status.as_deref() {
        None => ArticleStatus::Draft,
        Some(s) => ArticleStatus::parse(s)
            .ok_or_else(|| ImportError::Validation(format!("unknown status '{}'", s)))?,
    };

    let category = raw
        .category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    let mut tags: Vec<String> = Vec::new();
    for tag in raw.tags {
        let tag = tag.trim();
        if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }

    Ok(ArticleMeta {
        title,
        slug,
        category,
        tags,
        status,
    })
}

/// Imports Markdown documents as articles
pub struct ImportService {
    articles: Arc<ArticleService>,
    categories: Arc<CategoryService>,
    tags: Arc<TagService>,
}

impl ImportService {
    pub fn new(
        articles: Arc<ArticleService>,
        categories: Arc<CategoryService>,
        tags: Arc<TagService>,
    ) -> Self {
        Self {
            articles,
            categories,
            tags,
        }
    }

    /// Import one document held in memory
    pub async fn import_str(&self, input: &str) -> Result<Article, ImportError> {
        let ParsedDocument { meta, body } = parse_document(input)?;

        let category_id = match &meta.category {
            Some(name) => Some(self.categories.find_or_create(name).await?.id),
            None => None,
        };

        let mut tag_ids = Vec::with_capacity(meta.tags.len());
        for name in &meta.tags {
            tag_ids.push(self.tags.find_or_create(name).await?.id);
        }

        let mut input = CreateArticleInput::new(meta.title, meta.slug, body).with_tag_ids(tag_ids);
        if let Some(category_id) = category_id {
            input = input.with_category_id(category_id);
        }

        let article = self.articles.create(&input).await?;
        let article = if meta.status == ArticleStatus::Published {
            self.articles.publish(article.id).await?
        } else {
            article
        };

        tracing::info!("Imported article {} ({})", article.slug, article.status);
        Ok(article)
    }

    /// Import one file from disk
    pub async fn import_file(&self, path: &Path) -> Result<Article, ImportError> {
        let input = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ImportError::Read {
                path: path.display().to_string(),
                source,
            })?;
        self.import_str(&input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxArticleRepository, SqlxCategoryRepository, SqlxTagRepository};
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> (ImportService, Arc<ArticleService>) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let category_repo = SqlxCategoryRepository::boxed(pool.clone());
        let tag_repo = SqlxTagRepository::boxed(pool.clone());
        let articles = Arc::new(ArticleService::new(
            SqlxArticleRepository::boxed(pool),
            category_repo.clone(),
            tag_repo.clone(),
        ));
        let importer = ImportService::new(
            articles.clone(),
            Arc::new(CategoryService::new(category_repo)),
            Arc::new(TagService::new(tag_repo)),
        );
        (importer, articles)
    }

    #[test]
    fn test_parse_full_front_matter() {
        let doc = "---\ntitle: Hello World\nslug: hi\ncategory: Rust\ntags: [async, web, async]\nstatus: Published\n---\n\n# Body\n\n";
        let parsed = parse_document(doc).unwrap();

        assert_eq!(parsed.meta.title, "Hello World");
        assert_eq!(parsed.meta.slug, "hi");
        assert_eq!(parsed.meta.category.as_deref(), Some("Rust"));
        assert_eq!(parsed.meta.tags, vec!["async", "web"]);
        assert_eq!(parsed.meta.status, ArticleStatus::Published);
        assert_eq!(parsed.body, "# Body");
    }

    #[test]
    fn test_defaults_applied() {
        let parsed = parse_document("---\ntitle: Just A Title\n---\nbody").unwrap();
        assert_eq!(parsed.meta.slug, "just-a-title");
        assert_eq!(parsed.meta.status, ArticleStatus::Draft);
        assert!(parsed.meta.category.is_none());
        assert!(parsed.meta.tags.is_empty());
    }

    #[test]
    fn test_delimiters_tolerate_whitespace() {
        let parsed = parse_document("  ---  \ntitle: T\n --- \nbody --- here").unwrap();
        assert_eq!(parsed.body, "body --- here");
    }

    #[test]
    fn test_missing_front_matter_rejected() {
        assert!(matches!(
            parse_document("# Just markdown"),
            Err(ImportError::Parse(_))
        ));
        assert!(matches!(
            parse_document("\n---\ntitle: T\n---\n"),
            Err(ImportError::Parse(_))
        ));
        assert!(matches!(
            parse_document("---\ntitle: T\nno end"),
            Err(ImportError::Parse(_))
        ));
    }

    #[test]
    fn test_invalid_metadata_rejected() {
        assert!(matches!(
            parse_document("---\nslug: x\n---\n"),
            Err(ImportError::Validation(_))
        ));
        assert!(matches!(
            parse_document("---\ntitle: T\nstatus: archived\n---\n"),
            Err(ImportError::Validation(_))
        ));
        assert!(matches!(
            parse_document("---\ntitle: [unclosed\n---\n"),
            Err(ImportError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_import_creates_relations_and_publishes() {
        let (importer, articles) = setup().await;
        let doc = "---\ntitle: First\ncategory: Rust\ntags: [web]\nstatus: published\n---\nHello";

        let article = importer.import_str(doc).await.unwrap();
        assert_eq!(article.status, ArticleStatus::Published);
        assert!(article.published_at.is_some());
        assert_eq!(article.category.as_ref().unwrap().name, "Rust");
        assert_eq!(article.tags.len(), 1);
        assert_eq!(article.content, "Hello");

        // Second import reuses the category and tag
        let second = importer
            .import_str("---\ntitle: Second\ncategory: Rust\ntags: [web]\n---\n")
            .await
            .unwrap();
        assert_eq!(second.category_id, article.category_id);
        assert_eq!(second.tags[0].id, article.tags[0].id);
        assert_eq!(second.status, ArticleStatus::Draft);

        assert_eq!(articles.list_published().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_import_duplicate_slug_fails() {
        let (importer, _) = setup().await;
        importer.import_str("---\ntitle: Same\n---\n").await.unwrap();
        let result = importer.import_str("---\ntitle: Same\n---\n").await;
        assert!(matches!(
            result,
            Err(ImportError::Persist(ArticleServiceError::DuplicateSlug(_)))
        ));
    }

    #[tokio::test]
    async fn test_import_file_missing() {
        let (importer, _) = setup().await;
        let result = importer.import_file(Path::new("/nonexistent/post.md")).await;
        assert!(matches!(result, Err(ImportError::Read { .. })));
    }
}
