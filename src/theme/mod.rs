//! Template compositor
//!
//! Renders pages from the five stored templates using Tera. Every page is
//! two-level: an inner template (article, index, category or tag) produces a
//! fragment, which is then wrapped by the shared `base` layout.
//!
//! Templates are registered as `<name>.html`, so Tera escapes every value by
//! default. Values inserted with [`PageContext::insert_html`] are trusted
//! HTML: they are handed to Tera as opaque placeholders and substituted after
//! rendering, so they are never escaped. Filters other than `safe` cannot be
//! applied to them.

mod error;


use serde::Serialize;
use std::collections::HashMap;
use std::error::Error as StdError;
use tera::{Context as TeraContext, Tera};
use uuid::Uuid;

use crate::models::TemplateName;

pub use error::ThemeError;

/// Default template sources, compiled into the binary
pub fn default_template(name: TemplateName) -> &'static str {
    match name {
        TemplateName::Base => include_str!("defaults/base.html"),
        TemplateName::Article => include_str!("defaults/article.html"),
        TemplateName::Index => include_str!("defaults/index.html"),
        TemplateName::Category => include_str!("defaults/category.html"),
        TemplateName::Tag => include_str!("defaults/tag.html"),
    }
}

/// The complete set of template sources, one per [`TemplateName`]
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    sources: HashMap<TemplateName, String>,
}

impl TemplateSet {
    /// Build a set from stored templates. Every name must be present.
    pub fn from_sources<I>(sources: I) -> Result<Self, ThemeError>
    where
        I: IntoIterator<Item = (TemplateName, String)>,
    {
        let sources: HashMap<TemplateName, String> = sources.into_iter().collect();
        for name in TemplateName::ALL {
            if !sources.contains_key(&name) {
                return Err(ThemeError::MissingTemplate(name));
            }
        }
        Ok(Self { sources })
    }

    /// The built-in default set
    pub fn defaults() -> Self {
        Self {
            sources: TemplateName::ALL
                .into_iter()
                .map(|name| (name, default_template(name).to_string()))
                .collect(),
        }
    }

    pub fn get(&self, name: TemplateName) -> Option<&str> {
        self.sources.get(&name).map(String::as_str)
    }
}

const TRUSTED_MARKER_PREFIX: &str = "inkpress-trusted-";

/// HTML that must be inserted into a page verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedHtml(String);

impl TrustedHtml {
    /// Mark already-rendered HTML as trusted.
    pub fn new(html: impl Into<String>) -> Self {
        Self(html.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Rendering context: ordinary (escaped) values plus trusted HTML values
#[derive(Debug, Default)]
pub struct PageContext {
    context: TeraContext,
    trusted: Vec<(String, String, TrustedHtml)>,
}

impl PageContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value that the template engine escapes on output
    pub fn insert<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) {
        self.context.insert(key, value);
    }

    /// Insert trusted HTML under `key`.
    ///
    /// The template must print the value as-is: `{{ content }}` or
    /// `{{ content | safe }}`. Other filters garble the placeholder, and
    /// rendering fails when what is left of it still shows in the output.
    pub fn insert_html(&mut self, key: &str, html: TrustedHtml) {
        // Hex-only marker survives HTML escaping unchanged
        let marker = format!("{}{}", TRUSTED_MARKER_PREFIX, Uuid::new_v4().simple());
        self.context.insert(key, &marker);
        self.trusted.push((key.to_string(), marker, html));
    }

    fn restore_trusted(&self, mut rendered: String) -> Result<String, ThemeError> {
        for (_, marker, html) in &self.trusted {
            if rendered.contains(marker.as_str()) {
                rendered = rendered.replace(marker.as_str(), html.as_str());
            }
        }

        // A filter applied to a trusted value leaves part of its marker behind
        if rendered.to_ascii_lowercase().contains(TRUSTED_MARKER_PREFIX) {
            let keys: Vec<&str> = self.trusted.iter().map(|(key, _, _)| key.as_str()).collect();
            return Err(ThemeError::TemplateError(format!(
                "HTML value '{}' must be printed without filters",
                keys.join("', '")
            )));
        }
        Ok(rendered)
    }
}

/// Values handed to the `base` layout
#[derive(Debug, Clone)]
pub struct BasePage<'a> {
    /// Page title
    pub title: &'a str,
    /// Site title
    pub site_title: &'a str,
    /// Relative path from the page to the site root (`""` or `"../"`)
    pub root: &'a str,
}

/// Tera-backed renderer for a [`TemplateSet`]
pub struct TemplateCompositor {
    tera: Tera,
}

impl TemplateCompositor {
    /// Compile every template in the set.
    pub fn new(set: &TemplateSet) -> Result<Self, ThemeError> {
        let mut templates = Vec::with_capacity(TemplateName::ALL.len());
        for name in TemplateName::ALL {
            let source = set.get(name).ok_or(ThemeError::MissingTemplate(name))?;
            templates.push((name.file_name(), source));
        }

        let mut tera = Tera::default();
        tera.add_raw_templates(templates)
            .map_err(|e| ThemeError::TemplateError(describe_tera_error("compile templates", &e)))?;

        Ok(Self { tera })
    }

    /// Compositor over the built-in default templates
    pub fn with_defaults() -> Result<Self, ThemeError> {
        Self::new(&TemplateSet::defaults())
    }

    /// Render one template to a fragment.
    pub fn render(&self, name: TemplateName, context: &PageContext) -> Result<String, ThemeError> {
        let rendered = self
            .tera
            .render(name.file_name(), &context.context)
            .map_err(|e| {
                ThemeError::TemplateError(describe_tera_error(
                    &format!("render '{}'", name.file_name()),
                    &e,
                ))
            })?;

        context.restore_trusted(rendered)
    }

    /// Wrap a rendered fragment in the `base` layout.
    pub fn compose(&self, fragment: TrustedHtml, page: &BasePage<'_>) -> Result<String, ThemeError> {
        let mut context = PageContext::new();
        context.insert("title", page.title);
        context.insert("site_title", page.site_title);
        context.insert("root", page.root);
        context.insert_html("content", fragment);

        self.render(TemplateName::Base, &context)
    }

    /// Render an inner template and wrap it in the layout in one step.
    pub fn render_page(
        &self,
        name: TemplateName,
        context: &PageContext,
        page: &BasePage<'_>,
    ) -> Result<String, ThemeError> {
        let fragment = self.render(name, context)?;
        self.compose(TrustedHtml::new(fragment), page)
    }
}

/// Flatten a Tera error and its causes into one message
fn describe_tera_error(action: &str, e: &tera::Error) -> String {
    let mut message = format!("Failed to {}: {}", action, e);
    let mut source = e.source();
    while let Some(s) = source {
        message.push_str(&format!("\n  Caused by: {}", s));
        source = s.source();
    }
    message
}
