//! Settings repository
//!
//! Key/value storage for site settings such as the export directory.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;

use crate::db::DynDatabasePool;

/// Repository trait for settings operations
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Get multiple settings by keys; missing keys are omitted
    async fn get_many(&self, keys: &[&str]) -> Result<HashMap<String, String>>;

    /// Set multiple settings in one transaction
    async fn set_many(&self, settings: &[(&str, &str)]) -> Result<()>;
}

/// SQLx-based settings repository
pub struct SqlxSettingsRepository {
    pool: DynDatabasePool,
}

impl SqlxSettingsRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SettingsRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SettingsRepository for SqlxSettingsRepository {
    async fn get_many(&self, keys: &[&str]) -> Result<HashMap<String, String>> {
        get_many_sqlite(self.pool.as_sqlite(), keys).await
    }

    async fn set_many(&self, settings: &[(&str, &str)]) -> Result<()> {
        let mut tx = self.pool.as_sqlite().begin().await?;
        for &(key, value) in settings {
            sqlx::query(UPSERT_SQL)
                .bind(key)
                .bind(value)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to set setting {}", key))?;
        }
        tx.commit().await.context("Failed to commit settings")?;
        Ok(())
    }
}

const UPSERT_SQL: &str = "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?)
     ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at";

async fn get_many_sqlite(pool: &SqlitePool, keys: &[&str]) -> Result<HashMap<String, String>> {
    let mut result = HashMap::new();
    for key in keys {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(*key)
            .fetch_optional(pool)
            .await
            .with_context(|| format!("Failed to get setting {}", key))?;
        if let Some(value) = value {
            result.insert((*key).to_string(), value);
        }
    }
    Ok(result)
}
