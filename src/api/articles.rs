//! Article API endpoints
//!
//! Handles HTTP requests for article management:
//! - GET /api/articles - List all articles, newest first
//! - GET /api/articles/{id} - Get article by ID
//! - POST /api/articles - Create new article
//! - PUT /api/articles/{id} - Update article
//! - POST /api/articles/{id}/publish - Publish article
//! - POST /api/articles/{id}/unpublish - Move article back to draft
//! - DELETE /api/articles/{id} - Delete article

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState};
use crate::models::{Article, CreateArticleInput, UpdateArticleInput};

/// Response for article list
#[derive(Debug, Serialize)]
pub struct ArticleListResponse {
    pub articles: Vec<Article>,
    pub total: usize,
}

/// Build the articles router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_articles).post(create_article))
        .route(
            "/{id}",
            get(get_article).put(update_article).delete(delete_article),
        )
        .route("/{id}/publish", post(publish_article))
        .route("/{id}/unpublish", post(unpublish_article))
}

/// GET /api/articles
async fn list_articles(State(state): State<AppState>) -> Result<Json<ArticleListResponse>, ApiError> {
    let articles = state.article_service.list().await?;
    Ok(Json(ArticleListResponse {
        total: articles.len(),
        articles,
    }))
}

/// GET /api/articles/{id}
async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Article>, ApiError> {
    Ok(Json(state.article_service.get_by_id(id).await?))
}

/// POST /api/articles
async fn create_article(
    State(state): State<AppState>,
    Json(input): Json<CreateArticleInput>,
) -> Result<(StatusCode, Json<Article>), ApiError> {
    let article = state.article_service.create(&input).await?;
    Ok((StatusCode::CREATED, Json(article)))
}

/// PUT /api/articles/{id}
async fn update_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateArticleInput>,
) -> Result<Json<Article>, ApiError> {
    Ok(Json(state.article_service.update(id, &input).await?))
}

/// POST /api/articles/{id}/publish
async fn publish_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Article>, ApiError> {
    Ok(Json(state.article_service.publish(id).await?))
}

/// POST /api/articles/{id}/unpublish
async fn unpublish_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Article>, ApiError> {
    Ok(Json(state.article_service.unpublish(id).await?))
}

/// DELETE /api/articles/{id}
async fn delete_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.article_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::test_server;
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_create_and_get_article() {
        let (server, _dir) = test_server().await;

        let response = server
            .post("/api/articles")
            .json(&json!({"title": "Hello World", "content": "# Hi"}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let created: Value = response.json();
        assert_eq!(created["slug"], "hello-world");
        assert_eq!(created["status"], "draft");
        assert!(created["published_at"].is_null());

        let id = created["id"].as_i64().unwrap();
        let fetched: Value = server.get(&format!("/api/articles/{}", id)).await.json();
        assert_eq!(fetched["title"], "Hello World");
    }

    #[tokio::test]
    async fn test_missing_title_is_bad_request() {
        let (server, _dir) = test_server().await;
        let response = server
            .post("/api/articles")
            .json(&json!({"title": "", "content": "x"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_conflict() {
        let (server, _dir) = test_server().await;
        server
            .post("/api/articles")
            .json(&json!({"title": "A", "slug": "same"}))
            .await
            .assert_status(StatusCode::CREATED);

        server
            .post("/api/articles")
            .json(&json!({"title": "B", "slug": "same"}))
            .await
            .assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_publish_update_and_delete() {
        let (server, _dir) = test_server().await;
        let created: Value = server
            .post("/api/articles")
            .json(&json!({"title": "Post"}))
            .await
            .json();
        let id = created["id"].as_i64().unwrap();

        let published: Value = server
            .post(&format!("/api/articles/{}/publish", id))
            .await
            .json();
        assert_eq!(published["status"], "published");
        assert!(published["published_at"].is_string());

        let updated: Value = server
            .put(&format!("/api/articles/{}", id))
            .json(&json!({"title": "Post", "slug": "post", "content": "new", "status": "draft"}))
            .await
            .json();
        assert_eq!(updated["status"], "draft");
        assert!(updated["published_at"].is_null());

        server
            .delete(&format!("/api/articles/{}", id))
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server
            .get(&format!("/api/articles/{}", id))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_articles() {
        let (server, _dir) = test_server().await;
        for title in ["One", "Two"] {
            server
                .post("/api/articles")
                .json(&json!({"title": title}))
                .await
                .assert_status(StatusCode::CREATED);
        }

        let body: Value = server.get("/api/articles").await.json();
        assert_eq!(body["total"], 2);
        assert_eq!(body["articles"].as_array().unwrap().len(), 2);
    }
}
