//! Markdown rendering service
//!
//! Converts article Markdown to HTML with pulldown-cmark. Fenced code blocks
//! are highlighted with syntect. Raw HTML embedded in the Markdown is passed
//! through untouched, so article bodies are trusted content.
//!
//! # Example
//!
//! ```
//! use inkpress::services::markdown::MarkdownRenderer;
//!
//! let renderer = MarkdownRenderer::new();
//! let html = renderer.render("# Hello World\n\nThis is **bold** text.");
//! assert!(html.contains("<h1>"));
//! assert!(html.contains("<strong>"));
//! ```

use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use std::sync::Arc;
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

const DEFAULT_THEME: &str = "base16-ocean.dark";

/// A thread-safe Markdown renderer with syntax highlighting support.
///
/// Enabled extensions: tables, strikethrough, task lists. Punctuation is
/// left exactly as written.
#[derive(Clone)]
pub struct MarkdownRenderer {
    syntax_set: Arc<SyntaxSet>,
    theme_set: Arc<ThemeSet>,
    theme_name: String,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer {
    /// Creates a renderer using the "base16-ocean.dark" highlighting theme.
    pub fn new() -> Self {
        Self::with_theme(DEFAULT_THEME)
    }

    /// Creates a renderer with a specific syntect theme, falling back to
    /// the default theme when the name is unknown.
    pub fn with_theme(theme_name: &str) -> Self {
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let theme_set = ThemeSet::load_defaults();

        let validated_theme = if theme_set.themes.contains_key(theme_name) {
            theme_name.to_string()
        } else {
            DEFAULT_THEME.to_string()
        };

        Self {
            syntax_set: Arc::new(syntax_set),
            theme_set: Arc::new(theme_set),
            theme_name: validated_theme,
        }
    }

    /// Renders Markdown text to HTML.
    pub fn render(&self, markdown: &str) -> String {
        let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
        let events = self.highlight_code_blocks(Parser::new_ext(markdown, options));

        let mut html_output = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut html_output, events.into_iter());
        html_output
    }

    /// Collects the text of every fenced block that names a language and
    /// swaps the block for highlighted HTML. Other code blocks are left to
    /// the pulldown-cmark writer.
    fn highlight_code_blocks<'a>(&self, events: impl Iterator<Item = Event<'a>>) -> Vec<Event<'a>> {
        let mut output = Vec::new();
        let mut open_block: Option<(CowStr<'a>, String)> = None;

        for event in events {
            if let Some((_, code)) = open_block.as_mut() {
                match event {
                    Event::Text(text) => code.push_str(&text),
                    Event::End(TagEnd::CodeBlock) => {
                        if let Some((info, code)) = open_block.take() {
                            output.extend(self.code_block(info, code));
                        }
                    }
                    other => output.push(other),
                }
                continue;
            }

            match event {
                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) if !info.trim().is_empty() => {
                    open_block = Some((info, String::new()));
                }
                other => output.push(other),
            }
        }

        output
    }

    /// Highlighted HTML for a fenced block, or the block itself when the
    /// language is unknown so it renders as escaped `<pre><code>`.
    fn code_block<'a>(&self, info: CowStr<'a>, code: String) -> Vec<Event<'a>> {
        // Info strings may carry attributes after the language
        let lang = info.split_whitespace().next().unwrap_or_default();
        let syntax = self
            .syntax_set
            .find_syntax_by_token(lang)
            .or_else(|| self.syntax_set.find_syntax_by_extension(lang));
        let theme = self.theme_set.themes.get(&self.theme_name);

        if let (Some(syntax), Some(theme)) = (syntax, theme) {
            if let Ok(highlighted) = highlighted_html_for_string(&code, &self.syntax_set, syntax, theme) {
                return vec![Event::Html(highlighted.into())];
            }
        }

        vec![
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))),
            Event::Text(code.into()),
            Event::End(TagEnd::CodeBlock),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_invalid_theme_falls_back() {
        let renderer = MarkdownRenderer::with_theme("nonexistent-theme");
        assert_eq!(renderer.theme_name, DEFAULT_THEME);
    }

    #[test]
    fn test_render_heading_and_emphasis() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("# Title\n\n*a* **b** ~~c~~");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<em>a</em>"));
        assert!(html.contains("<strong>b</strong>"));
        assert!(html.contains("<del>c</del>"));
    }

    #[test]
    fn test_raw_html_passes_through() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("<div class=\"note\">kept</div>\n\ntext <span>inline</span>");
        assert!(html.contains("<div class=\"note\">kept</div>"));
        assert!(html.contains("<span>inline</span>"));
    }

    #[test]
    fn test_image_urls_untouched() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("![p](../images/photo.png)");
        assert!(html.contains("src=\"../images/photo.png\""));
    }

    #[test]
    fn test_code_block_without_language_is_escaped() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("```\n<script>x</script>\n```");
        assert!(html.contains("<pre><code>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_code_block_with_rust_is_highlighted() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("```rust\nfn main() {}\n```");
        assert!(html.contains("<pre style="));
        assert!(html.contains("main"));
    }

    #[test]
    fn test_code_block_with_unknown_language() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("```nosuchlang\nabc\n```");
        assert!(html.contains("class=\"language-nosuchlang\""));
        assert!(html.contains("abc"));
    }

    #[test]
    fn test_table_and_task_list() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("| a | b |\n|---|---|\n| 1 | 2 |\n\n- [x] done\n- [ ] todo");
        assert!(html.contains("<table>"));
        assert!(html.contains("type=\"checkbox\""));
    }

    #[test]
    fn test_render_empty_input() {
        let renderer = MarkdownRenderer::new();
        assert_eq!(renderer.render(""), "");
    }

    #[test]
    fn test_punctuation_kept_as_written() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("\"quoted\" it's -- done...");
        assert!(html.contains("quoted"));
        assert!(html.contains("it's -- done..."));
        for typographic in ['\u{201c}', '\u{2019}', '\u{2013}', '\u{2026}'] {
            assert!(!html.contains(typographic));
        }
    }

    #[test]
    fn test_code_block_language_with_attributes() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("```nosuchlang {linenos}\n<b>\n```");
        assert!(html.contains("class=\"language-nosuchlang\""));
        assert!(html.contains("&lt;b&gt;"));
    }
}
