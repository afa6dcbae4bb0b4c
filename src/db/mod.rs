//! Database layer
//!
//! SQLite storage for articles, categories, tags, templates and settings.
//!
//! # Usage
//!
//! ```ignore
//! use inkpress::config::DatabaseConfig;
//! use inkpress::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, DatabasePool, DynDatabasePool, SqliteDatabase};
