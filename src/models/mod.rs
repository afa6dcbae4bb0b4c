//! Data models
//!
//! Database entities (Article, Category, Tag, Template) and the input types
//! accepted by the services.

mod article;
mod category;
mod tag;
mod template;

pub use article::{Article, ArticleRecord, ArticleStatus, CreateArticleInput, UpdateArticleInput};
pub use category::{Category, CategoryInput};
pub use tag::{Tag, TagInput};
pub use template::{Template, TemplateName};
