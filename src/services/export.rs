//! Static site export
//!
//! Renders every published article, the index and the non-empty category
//! and tag listings into a directory tree:
//!
//! ```text
//! <root>/index.html
//! <root>/posts/<slug>.html
//! <root>/categories/<slug>.html
//! <root>/tags/<slug>.html
//! <root>/images/<filename>
//! ```
//!
//! After writing, stale `*.html` files in `posts/`, `categories/` and `tags/`
//! whose names no longer match published content are deleted. Nothing else
//! in the output directory is touched. The first failure aborts the run.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::models::{Article, TemplateName};
use crate::services::article::ArticleService;
use crate::services::category::CategoryService;
use crate::services::markdown::MarkdownRenderer;
use crate::services::settings::ExportSettings;
use crate::services::tag::TagService;
use crate::services::template::{TemplateService, TemplateServiceError};
use crate::theme::{BasePage, PageContext, TemplateCompositor, ThemeError, TrustedHtml};

const POSTS_DIR: &str = "posts";
const CATEGORIES_DIR: &str = "categories";
const TAGS_DIR: &str = "tags";
const IMAGES_DIR: &str = "images";

/// Relative image prefix inside exported article pages
const EXPORTED_IMAGE_PREFIX: &str = "../images/";

/// Export errors
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to load templates: {0}")]
    Template(#[from] TemplateServiceError),

    #[error("Failed to read content: {0}")]
    Store(#[source] anyhow::Error),

    #[error("Failed to render page: {0}")]
    Render(#[from] ThemeError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn store_error<E>(e: E) -> ExportError
where
    E: std::error::Error + Send + Sync + 'static,
{
    ExportError::Store(e.into())
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ExportError + '_ {
    move |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Resolved parameters for one export run
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
    /// Source directory of uploaded images; skipped when absent
    pub upload_dir: Option<PathBuf>,
    pub site_title: String,
    /// Image URL prefix used in stored articles
    pub image_base_url: String,
}

/// Optional overrides for an export run, from the API or the command line
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportRequest {
    pub output_dir: Option<String>,
    pub upload_dir: Option<String>,
    pub site_title: Option<String>,
}

impl ExportRequest {
    /// Fill unset values from stored settings, then from configuration.
    pub fn resolve(
        self,
        settings: &ExportSettings,
        upload_dir: &Path,
        image_base_url: &str,
    ) -> ExportConfig {
        fn non_empty(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.trim().is_empty())
        }

        ExportConfig {
            output_dir: PathBuf::from(
                non_empty(self.output_dir).unwrap_or_else(|| settings.export_dir.clone()),
            ),
            upload_dir: Some(
                non_empty(self.upload_dir)
                    .map(PathBuf::from)
                    .unwrap_or_else(|| upload_dir.to_path_buf()),
            ),
            site_title: non_empty(self.site_title).unwrap_or_else(|| settings.site_title.clone()),
            image_base_url: image_base_url.to_string(),
        }
    }
}

/// Summary of a completed export
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportReport {
    pub output_dir: PathBuf,
    pub articles: usize,
    pub categories: usize,
    pub tags: usize,
    /// Stale pages deleted during reconciliation
    pub removed: Vec<PathBuf>,
    pub images_copied: usize,
}

/// Names of the pages written in one run, per subdirectory
#[derive(Default)]
struct WrittenPages {
    posts: HashSet<String>,
    categories: HashSet<String>,
    tags: HashSet<String>,
}

/// Static export service
pub struct ExportService {
    articles: Arc<ArticleService>,
    categories: Arc<CategoryService>,
    tags: Arc<TagService>,
    templates: Arc<TemplateService>,
    markdown: MarkdownRenderer,
}

impl ExportService {
    pub fn new(
        articles: Arc<ArticleService>,
        categories: Arc<CategoryService>,
        tags: Arc<TagService>,
        templates: Arc<TemplateService>,
    ) -> Self {
        Self {
            articles,
            categories,
            tags,
            templates,
            markdown: MarkdownRenderer::new(),
        }
    }

    /// Run a full export into `config.output_dir`.
    pub async fn export(&self, config: &ExportConfig) -> Result<ExportReport, ExportError> {
        tracing::info!("Exporting site to {}", config.output_dir.display());

        let set = self.templates.load_template_set().await?;
        let compositor = TemplateCompositor::new(&set)?;

        let root = config.output_dir.as_path();
        for dir in [root.to_path_buf(), root.join(POSTS_DIR), root.join(CATEGORIES_DIR), root.join(TAGS_DIR)] {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(io_error(&dir))?;
        }

        let published = self.articles.list_published().await.map_err(store_error)?;
        let mut written = WrittenPages::default();

        for article in &published {
            let html = self.render_article(&compositor, article, config)?;
            write_page(&root.join(POSTS_DIR).join(format!("{}.html", article.slug)), &html).await?;
            written.posts.insert(article.slug.clone());
        }

        let mut context = PageContext::new();
        context.insert("articles", &published);
        context.insert("root", "");
        let html = compositor.render_page(
            TemplateName::Index,
            &context,
            &BasePage {
                title: &config.site_title,
                site_title: &config.site_title,
                root: "",
            },
        )?;
        write_page(&root.join("index.html"), &html).await?;

        for category in self.categories.list().await.map_err(store_error)? {
            let articles = self
                .articles
                .list_published_by_category(category.id)
                .await
                .map_err(store_error)?;
            if articles.is_empty() {
                continue;
            }

            let mut context = PageContext::new();
            context.insert("category", &category);
            context.insert("articles", &articles);
            context.insert("root", "../");
            let title = format!("Category: {}", category.name);
            let html = compositor.render_page(
                TemplateName::Category,
                &context,
                &BasePage {
                    title: &title,
                    site_title: &config.site_title,
                    root: "../",
                },
            )?;
            write_page(&root.join(CATEGORIES_DIR).join(format!("{}.html", category.slug)), &html).await?;
            written.categories.insert(category.slug);
        }

        for tag in self.tags.list().await.map_err(store_error)? {
            let articles = self
                .articles
                .list_published_by_tag(tag.id)
                .await
                .map_err(store_error)?;
            if articles.is_empty() {
                continue;
            }

            let mut context = PageContext::new();
            context.insert("tag", &tag);
            context.insert("articles", &articles);
            context.insert("root", "../");
            let title = format!("Tag: {}", tag.name);
            let html = compositor.render_page(
                TemplateName::Tag,
                &context,
                &BasePage {
                    title: &title,
                    site_title: &config.site_title,
                    root: "../",
                },
            )?;
            write_page(&root.join(TAGS_DIR).join(format!("{}.html", tag.slug)), &html).await?;
            written.tags.insert(tag.slug);
        }

        let mut removed = Vec::new();
        removed.extend(remove_stale_pages(&root.join(POSTS_DIR), &written.posts).await?);
        removed.extend(remove_stale_pages(&root.join(CATEGORIES_DIR), &written.categories).await?);
        removed.extend(remove_stale_pages(&root.join(TAGS_DIR), &written.tags).await?);

        let images_copied = match &config.upload_dir {
            Some(source) => copy_images(source, &root.join(IMAGES_DIR)).await?,
            None => 0,
        };

        let report = ExportReport {
            output_dir: config.output_dir.clone(),
            articles: written.posts.len(),
            categories: written.categories.len(),
            tags: written.tags.len(),
            removed,
            images_copied,
        };
        tracing::info!(
            "Export finished: {} articles, {} categories, {} tags, {} stale pages removed, {} images",
            report.articles,
            report.categories,
            report.tags,
            report.removed.len(),
            report.images_copied
        );
        Ok(report)
    }

    fn render_article(
        &self,
        compositor: &TemplateCompositor,
        article: &Article,
        config: &ExportConfig,
    ) -> Result<String, ExportError> {
        let markdown = rewrite_image_urls(&article.content, &config.image_base_url);
        let body = self.markdown.render(&markdown);

        let mut context = PageContext::new();
        context.insert("article", article);
        context.insert("root", "../");
        context.insert_html("content", TrustedHtml::new(body));

        compositor
            .render_page(
                TemplateName::Article,
                &context,
                &BasePage {
                    title: &article.title,
                    site_title: &config.site_title,
                    root: "../",
                },
            )
            .map_err(Into::into)
    }
}

/// Point served image URLs at the exported `images/` directory
fn rewrite_image_urls(content: &str, image_base_url: &str) -> String {
    if image_base_url.is_empty() {
        return content.to_string();
    }
    content.replace(image_base_url, EXPORTED_IMAGE_PREFIX)
}

async fn write_page(path: &Path, html: &str) -> Result<(), ExportError> {
    tokio::fs::write(path, html).await.map_err(io_error(path))?;
    tracing::debug!("Wrote {}", path.display());
    Ok(())
}

/// Delete `*.html` files in `dir` whose stem is not in `keep`
async fn remove_stale_pages(dir: &Path, keep: &HashSet<String>) -> Result<Vec<PathBuf>, ExportError> {
    let mut removed = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await.map_err(io_error(dir))?;

    while let Some(entry) = entries.next_entry().await.map_err(io_error(dir))? {
        let path = entry.path();
        let is_html = path.extension().is_some_and(|ext| ext == "html");
        if !is_html {
            continue;
        }
        let file_type = entry.file_type().await.map_err(io_error(&path))?;
        if !file_type.is_file() {
            continue;
        }

        let stale = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map_or(true, |stem| !keep.contains(stem));
        if stale {
            tokio::fs::remove_file(&path).await.map_err(io_error(&path))?;
            tracing::info!("Removed stale page {}", path.display());
            removed.push(path);
        }
    }

    removed.sort();
    Ok(removed)
}

/// Copy regular files from the upload directory into the export tree
async fn copy_images(source: &Path, target: &Path) -> Result<usize, ExportError> {
    if !tokio::fs::try_exists(source).await.map_err(io_error(source))? {
        tracing::debug!("No upload directory at {}, skipping images", source.display());
        return Ok(0);
    }

    tokio::fs::create_dir_all(target).await.map_err(io_error(target))?;

    let mut copied = 0;
    let mut entries = tokio::fs::read_dir(source).await.map_err(io_error(source))?;
    while let Some(entry) = entries.next_entry().await.map_err(io_error(source))? {
        let path = entry.path();
        if !entry.file_type().await.map_err(io_error(&path))?.is_file() {
            continue;
        }
        let destination = target.join(entry.file_name());
        tokio::fs::copy(&path, &destination)
            .await
            .map_err(io_error(&destination))?;
        copied += 1;
    }
    Ok(copied)
}
