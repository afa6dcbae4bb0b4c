//! Liveness check
//!
//! Reports `ok` while the database answers, `503` otherwise.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::api::middleware::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.pool.ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(e) => {
            tracing::warn!("Health check failed: {:#}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::api::{build_router, test_support::test_server, AppState};
    use crate::config::Config;
    use crate::db::{create_test_pool, migrations};
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_health() {
        let (server, _dir) = test_server().await;
        let body: Value = server.get("/health").await.json();
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_health_reports_closed_database() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let config = Config::default();
        let state = AppState::new(pool.clone(), &config);
        let server = TestServer::new(build_router(state, &config.server.cors_origin)).unwrap();

        pool.close().await;

        let response = server.get("/health").await;
        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        let body: Value = response.json();
        assert_eq!(body["status"], "unavailable");
    }
}
