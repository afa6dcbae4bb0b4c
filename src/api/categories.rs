//! Category API endpoints
//!
//! - GET /api/categories - List categories
//! - GET /api/categories/{id} - Get category
//! - POST /api/categories - Create category
//! - PUT /api/categories/{id} - Rename category
//! - DELETE /api/categories/{id} - Delete category (articles become uncategorized)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState};
use crate::models::{Category, CategoryInput};

/// Response for category list
#[derive(Debug, Serialize)]
pub struct CategoryListResponse {
    pub categories: Vec<Category>,
}

/// Build the categories router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route(
            "/{id}",
            get(get_category).put(update_category).delete(delete_category),
        )
}

async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<CategoryListResponse>, ApiError> {
    let categories = state.category_service.list().await?;
    Ok(Json(CategoryListResponse { categories }))
}

async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.category_service.get_by_id(id).await?))
}

async fn create_category(
    State(state): State<AppState>,
    Json(input): Json<CategoryInput>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let category = state.category_service.create(&input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<CategoryInput>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.category_service.update(id, &input).await?))
}

async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.category_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::test_server;
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_category_crud() {
        let (server, _dir) = test_server().await;

        let created: Value = server
            .post("/api/categories")
            .json(&json!({"name": "Web Development"}))
            .await
            .json();
        assert_eq!(created["slug"], "web-development");
        let id = created["id"].as_i64().unwrap();

        let updated: Value = server
            .put(&format!("/api/categories/{}", id))
            .json(&json!({"name": "Web", "slug": "web"}))
            .await
            .json();
        assert_eq!(updated["name"], "Web");

        let list: Value = server.get("/api/categories").await.json();
        assert_eq!(list["categories"].as_array().unwrap().len(), 1);

        server
            .delete(&format!("/api/categories/{}", id))
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server
            .get(&format!("/api/categories/{}", id))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_deleting_category_keeps_articles() {
        let (server, _dir) = test_server().await;
        let category: Value = server
            .post("/api/categories")
            .json(&json!({"name": "Rust"}))
            .await
            .json();
        let article: Value = server
            .post("/api/articles")
            .json(&json!({"title": "A", "category_id": category["id"]}))
            .await
            .json();

        server
            .delete(&format!("/api/categories/{}", category["id"]))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let fetched: Value = server
            .get(&format!("/api/articles/{}", article["id"]))
            .await
            .json();
        assert!(fetched["category_id"].is_null());
    }

    #[tokio::test]
    async fn test_duplicate_category_slug_is_conflict() {
        let (server, _dir) = test_server().await;
        server
            .post("/api/categories")
            .json(&json!({"name": "Go"}))
            .await
            .assert_status(StatusCode::CREATED);
        server
            .post("/api/categories")
            .json(&json!({"name": "Golang", "slug": "go"}))
            .await
            .assert_status(StatusCode::CONFLICT);
    }
}
