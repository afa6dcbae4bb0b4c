//! inkpress - a Markdown CMS backend with static site export
//!
//! Articles, categories and tags are stored in SQLite and edited over a JSON
//! API. Published content is rendered through five editable Tera templates
//! into a self-contained static site.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod theme;
