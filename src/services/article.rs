//! Article service
//!
//! Business logic for articles:
//! - CRUD with slug derivation and uniqueness checks
//! - Publication transitions (`published_at` is set exactly when published)
//! - Read access to published content for the static export

use crate::db::repositories::{ArticleRepository, CategoryRepository, TagRepository};
use crate::models::{Article, ArticleRecord, ArticleStatus, CreateArticleInput, UpdateArticleInput};
use crate::services::slug::generate_slug;
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Error types for article service operations
#[derive(Debug, thiserror::Error)]
pub enum ArticleServiceError {
    /// Article not found
    #[error("Article not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Slug already used by another article
    #[error("Slug already exists: {0}")]
    DuplicateSlug(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Publication timestamp after a status change.
///
/// Entering `Published` stamps `now`; staying published keeps the original
/// stamp; `Draft` always clears it.
pub fn resolve_published_at(
    previous: Option<(ArticleStatus, Option<DateTime<Utc>>)>,
    next: ArticleStatus,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match (previous, next) {
        (_, ArticleStatus::Draft) => None,
        (Some((ArticleStatus::Published, Some(stamp))), ArticleStatus::Published) => Some(stamp),
        (_, ArticleStatus::Published) => Some(now),
    }
}

/// Article service
pub struct ArticleService {
    repo: Arc<dyn ArticleRepository>,
    category_repo: Arc<dyn CategoryRepository>,
    tag_repo: Arc<dyn TagRepository>,
}

impl ArticleService {
    pub fn new(
        repo: Arc<dyn ArticleRepository>,
        category_repo: Arc<dyn CategoryRepository>,
        tag_repo: Arc<dyn TagRepository>,
    ) -> Self {
        Self {
            repo,
            category_repo,
            tag_repo,
        }
    }

    /// List every article, newest first
    pub async fn list(&self) -> Result<Vec<Article>, ArticleServiceError> {
        self.repo
            .list()
            .await
            .context("Failed to list articles")
            .map_err(Into::into)
    }

    /// Get article by ID with its category and tags
    pub async fn get_by_id(&self, id: i64) -> Result<Article, ArticleServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get article")?
            .ok_or_else(|| ArticleServiceError::NotFound(format!("Article with ID {} not found", id)))
    }

    /// Create an article
    ///
    /// # Errors
    /// - `ValidationError` for an empty title, an unusable slug or unknown
    ///   category/tag references
    /// - `DuplicateSlug` if the slug is taken
    pub async fn create(&self, input: &CreateArticleInput) -> Result<Article, ArticleServiceError> {
        let title = validate_title(&input.title)?;
        let slug = resolve_slug(&input.slug, &title)?;
        self.ensure_slug_free(&slug, None).await?;
        self.ensure_references(input.category_id, &input.tag_ids).await?;

        let record = ArticleRecord {
            title,
            slug,
            content: input.content.clone(),
            status: input.status,
            author_id: input.author_id,
            category_id: input.category_id,
            published_at: resolve_published_at(None, input.status, Utc::now()),
        };

        let article = self
            .repo
            .create(&record, &input.tag_ids)
            .await
            .context("Failed to create article")?;

        tracing::info!("Created article {} ({}, {})", article.id, article.slug, article.status);
        Ok(article)
    }

    /// Replace an article's editable fields
    pub async fn update(
        &self,
        id: i64,
        input: &UpdateArticleInput,
    ) -> Result<Article, ArticleServiceError> {
        let current = self.get_by_id(id).await?;

        let title = validate_title(&input.title)?;
        let slug = resolve_slug(&input.slug, &title)?;
        self.ensure_slug_free(&slug, Some(id)).await?;
        self.ensure_references(input.category_id, &input.tag_ids).await?;

        let status = input.status.unwrap_or(current.status);
        let record = ArticleRecord {
            title,
            slug,
            content: input.content.clone(),
            status,
            author_id: current.author_id,
            category_id: input.category_id,
            published_at: resolve_published_at(
                Some((current.status, current.published_at)),
                status,
                Utc::now(),
            ),
        };

        let article = self
            .repo
            .update(id, &record, &input.tag_ids)
            .await
            .context("Failed to update article")?;

        tracing::info!("Updated article {} ({})", article.id, article.slug);
        Ok(article)
    }

    /// Transition an article to published. Already-published articles keep
    /// their original timestamp.
    pub async fn publish(&self, id: i64) -> Result<Article, ArticleServiceError> {
        self.set_status(id, ArticleStatus::Published).await
    }

    /// Transition an article back to draft, clearing its timestamp.
    pub async fn unpublish(&self, id: i64) -> Result<Article, ArticleServiceError> {
        self.set_status(id, ArticleStatus::Draft).await
    }

    async fn set_status(&self, id: i64, status: ArticleStatus) -> Result<Article, ArticleServiceError> {
        let current = self.get_by_id(id).await?;
        let published_at = resolve_published_at(
            Some((current.status, current.published_at)),
            status,
            Utc::now(),
        );

        let article = self
            .repo
            .set_status(id, status, published_at)
            .await
            .context("Failed to change article status")?;

        tracing::info!("Article {} is now {}", article.id, article.status);
        Ok(article)
    }

    /// Delete an article
    pub async fn delete(&self, id: i64) -> Result<(), ArticleServiceError> {
        let article = self.get_by_id(id).await?;
        self.repo
            .delete(article.id)
            .await
            .context("Failed to delete article")?;
        tracing::info!("Deleted article {} ({})", article.id, article.slug);
        Ok(())
    }

    /// Published articles with relations, most recently published first
    pub async fn list_published(&self) -> Result<Vec<Article>, ArticleServiceError> {
        self.repo
            .list_published()
            .await
            .context("Failed to list published articles")
            .map_err(Into::into)
    }

    /// Published articles in a category
    pub async fn list_published_by_category(
        &self,
        category_id: i64,
    ) -> Result<Vec<Article>, ArticleServiceError> {
        self.repo
            .list_published_by_category(category_id)
            .await
            .context("Failed to list articles by category")
            .map_err(Into::into)
    }

    /// Published articles carrying a tag
    pub async fn list_published_by_tag(&self, tag_id: i64) -> Result<Vec<Article>, ArticleServiceError> {
        self.repo
            .list_published_by_tag(tag_id)
            .await
            .context("Failed to list articles by tag")
            .map_err(Into::into)
    }

    async fn ensure_slug_free(&self, slug: &str, current_id: Option<i64>) -> Result<(), ArticleServiceError> {
        let existing = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to check slug uniqueness")?;

        match existing {
            Some(other) if Some(other.id) != current_id => {
                Err(ArticleServiceError::DuplicateSlug(slug.to_string()))
            }
            _ => Ok(()),
        }
    }

    async fn ensure_references(
        &self,
        category_id: Option<i64>,
        tag_ids: &[i64],
    ) -> Result<(), ArticleServiceError> {
        if let Some(category_id) = category_id {
            if self
                .category_repo
                .get_by_id(category_id)
                .await
                .context("Failed to check category")?
                .is_none()
            {
                return Err(ArticleServiceError::ValidationError(format!(
                    "Category {} does not exist",
                    category_id
                )));
            }
        }

        for &tag_id in tag_ids {
            if self
                .tag_repo
                .get_by_id(tag_id)
                .await
                .context("Failed to check tag")?
                .is_none()
            {
                return Err(ArticleServiceError::ValidationError(format!(
                    "Tag {} does not exist",
                    tag_id
                )));
            }
        }

        Ok(())
    }
}

fn validate_title(title: &str) -> Result<String, ArticleServiceError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ArticleServiceError::ValidationError(
            "Title is required".to_string(),
        ));
    }
    Ok(title.to_string())
}

/// Normalize an explicit slug, or derive one from the title when empty
fn resolve_slug(slug: &str, title: &str) -> Result<String, ArticleServiceError> {
    let source = if slug.trim().is_empty() { title } else { slug };
    let slug = generate_slug(source);
    if slug.is_empty() {
        return Err(ArticleServiceError::ValidationError(format!(
            "Cannot derive a slug from '{}'",
            source
        )));
    }
    Ok(slug)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxArticleRepository, SqlxCategoryRepository, SqlxTagRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Category, Tag};
    use proptest::prelude::*;

    struct Fixture {
        service: ArticleService,
        categories: Arc<dyn CategoryRepository>,
        tags: Arc<dyn TagRepository>,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let categories = SqlxCategoryRepository::boxed(pool.clone());
        let tags = SqlxTagRepository::boxed(pool.clone());
        Fixture {
            service: ArticleService::new(
                SqlxArticleRepository::boxed(pool),
                categories.clone(),
                tags.clone(),
            ),
            categories,
            tags,
        }
    }

    fn update_input(title: &str, slug: &str, status: Option<ArticleStatus>) -> UpdateArticleInput {
        UpdateArticleInput {
            title: title.to_string(),
            slug: slug.to_string(),
            content: "body".to_string(),
            status,
            category_id: None,
            tag_ids: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_create_draft_has_no_published_at() {
        let f = setup().await;
        let article = f
            .service
            .create(&CreateArticleInput::new("Hello", "", "Hi"))
            .await
            .unwrap();

        assert_eq!(article.slug, "hello");
        assert_eq!(article.status, ArticleStatus::Draft);
        assert!(article.published_at.is_none());
    }

    #[tokio::test]
    async fn test_create_published_sets_published_at() {
        let f = setup().await;
        let article = f
            .service
            .create(&CreateArticleInput::new("Live", "live", "").with_status(ArticleStatus::Published))
            .await
            .unwrap();
        assert!(article.published_at.is_some());
    }

    #[tokio::test]
    async fn test_explicit_slug_is_normalized() {
        let f = setup().await;
        let article = f
            .service
            .create(&CreateArticleInput::new("T", "My Post/../x", ""))
            .await
            .unwrap();
        assert_eq!(article.slug, "my-postx");
    }

    #[tokio::test]
    async fn test_create_requires_title() {
        let f = setup().await;
        let result = f.service.create(&CreateArticleInput::new("  ", "s", "")).await;
        assert!(matches!(result, Err(ArticleServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let f = setup().await;
        f.service
            .create(&CreateArticleInput::new("A", "same", ""))
            .await
            .unwrap();
        let result = f.service.create(&CreateArticleInput::new("B", "same", "")).await;
        assert!(matches!(result, Err(ArticleServiceError::DuplicateSlug(_))));
    }

    #[tokio::test]
    async fn test_unknown_references_rejected() {
        let f = setup().await;
        let result = f
            .service
            .create(&CreateArticleInput::new("A", "a", "").with_category_id(99))
            .await;
        assert!(matches!(result, Err(ArticleServiceError::ValidationError(_))));

        let result = f
            .service
            .create(&CreateArticleInput::new("A", "a", "").with_tag_ids(vec![5]))
            .await;
        assert!(matches!(result, Err(ArticleServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_create_with_relations() {
        let f = setup().await;
        let category = f
            .categories
            .create(&Category::new("Go".to_string(), "go".to_string()))
            .await
            .unwrap();
        let tag = f
            .tags
            .create(&Tag::new("web".to_string(), "web".to_string()))
            .await
            .unwrap();

        let article = f
            .service
            .create(
                &CreateArticleInput::new("A", "a", "")
                    .with_category_id(category.id)
                    .with_tag_ids(vec![tag.id]),
            )
            .await
            .unwrap();

        assert_eq!(article.category.unwrap().id, category.id);
        let tag_ids: Vec<i64> = article.tags.iter().map(|t| t.id).collect();
        assert_eq!(tag_ids, vec![tag.id]);
    }

    #[tokio::test]
    async fn test_publish_keeps_first_timestamp() {
        let f = setup().await;
        let article = f
            .service
            .create(&CreateArticleInput::new("A", "a", ""))
            .await
            .unwrap();

        let first = f.service.publish(article.id).await.unwrap();
        let stamp = first.published_at.expect("published_at set");

        let again = f.service.publish(article.id).await.unwrap();
        assert_eq!(again.published_at, Some(stamp));
    }

    #[tokio::test]
    async fn test_update_status_transitions() {
        let f = setup().await;
        let article = f
            .service
            .create(&CreateArticleInput::new("A", "a", ""))
            .await
            .unwrap();

        let published = f
            .service
            .update(article.id, &update_input("A", "a", Some(ArticleStatus::Published)))
            .await
            .unwrap();
        assert!(published.published_at.is_some());

        // status omitted keeps published and its stamp
        let kept = f
            .service
            .update(article.id, &update_input("A2", "a", None))
            .await
            .unwrap();
        assert_eq!(kept.status, ArticleStatus::Published);
        assert_eq!(kept.published_at, published.published_at);

        let drafted = f
            .service
            .update(article.id, &update_input("A2", "a", Some(ArticleStatus::Draft)))
            .await
            .unwrap();
        assert!(drafted.published_at.is_none());
    }

    #[tokio::test]
    async fn test_unpublish_clears_timestamp() {
        let f = setup().await;
        let article = f
            .service
            .create(&CreateArticleInput::new("A", "a", "").with_status(ArticleStatus::Published))
            .await
            .unwrap();

        let draft = f.service.unpublish(article.id).await.unwrap();
        assert_eq!(draft.status, ArticleStatus::Draft);
        assert!(draft.published_at.is_none());
        assert!(f.service.list_published().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_article_is_not_found() {
        let f = setup().await;
        assert!(matches!(
            f.service.publish(7).await,
            Err(ArticleServiceError::NotFound(_))
        ));
        assert!(matches!(
            f.service.delete(7).await,
            Err(ArticleServiceError::NotFound(_))
        ));
    }

    fn status_strategy() -> impl Strategy<Value = ArticleStatus> {
        prop_oneof![Just(ArticleStatus::Draft), Just(ArticleStatus::Published)]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        /// Any sequence of create/update/publish keeps published_at in step
        /// with the status.
        #[test]
        fn prop_published_at_matches_status(
            initial in status_strategy(),
            steps in proptest::collection::vec(proptest::option::of(status_strategy()), 1..6),
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let f = setup().await;
                let article = f
                    .service
                    .create(&CreateArticleInput::new("P", "p", "").with_status(initial))
                    .await
                    .unwrap();
                assert_eq!(article.published_at.is_some(), article.is_published());

                for step in steps {
                    let article = match step {
                        Some(status) => f
                            .service
                            .update(article.id, &update_input("P", "p", Some(status)))
                            .await
                            .unwrap(),
                        None => f.service.publish(article.id).await.unwrap(),
                    };
                    assert_eq!(article.published_at.is_some(), article.is_published());
                }
            });
        }
    }

    #[test]
    fn test_resolve_published_at_table() {
        let now = Utc::now();
        let earlier = now - chrono::Duration::days(3);

        assert_eq!(resolve_published_at(None, ArticleStatus::Draft, now), None);
        assert_eq!(resolve_published_at(None, ArticleStatus::Published, now), Some(now));
        assert_eq!(
            resolve_published_at(
                Some((ArticleStatus::Published, Some(earlier))),
                ArticleStatus::Published,
                now
            ),
            Some(earlier)
        );
        assert_eq!(
            resolve_published_at(Some((ArticleStatus::Draft, None)), ArticleStatus::Published, now),
            Some(now)
        );
        assert_eq!(
            resolve_published_at(
                Some((ArticleStatus::Published, Some(earlier))),
                ArticleStatus::Draft,
                now
            ),
            None
        );
    }
}
