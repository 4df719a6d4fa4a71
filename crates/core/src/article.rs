//! The article record produced by every extraction method.
//!
//! [`ArticleRecord::text_content`] is always computed from
//! [`ArticleRecord::content`] here, never trusted from a producer, so the word
//! position table and the rendered text agree on every char offset.

use std::sync::LazyLock;

use pulldown_cmark::{Event, Parser, TagEnd};
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::parse::Document;

/// Text some remote producers return when they could not find an article.
pub const PLACEHOLDER_TEXT: &str = "No article content found";

static HTML_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)<(p|div|h[1-6]|article|section|span|ul|ol|li|a|img|br|figure|figcaption|blockquote|pre|table|em|strong|main)[\s>/]",
    )
    .unwrap()
});

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[\w'-]+\b").unwrap());

/// How `content` is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentFormat {
    Html,
    Markdown,
}

impl ContentFormat {
    /// Guesses the format: anything containing common block or inline HTML tags is HTML.
    pub fn detect(content: &str) -> Self {
        if HTML_TAG_RE.is_match(content) { Self::Html } else { Self::Markdown }
    }
}

/// The normalized result of content extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRecord {
    pub title: String,
    pub byline: Option<String>,
    /// Article body as HTML or Markdown.
    pub content: String,
    /// Plain-text projection of `content`.
    pub text_content: String,
    pub site_name: Option<String>,
    pub url: String,
}

impl ArticleRecord {
    /// Builds a record and derives `text_content` from `content`.
    pub fn new(
        title: impl Into<String>, byline: Option<String>, content: impl Into<String>, site_name: Option<String>,
        url: impl Into<String>,
    ) -> Self {
        let content = content.into();
        let text_content = project_text(&content);
        Self {
            title: title.into(),
            byline: byline.filter(|b| !b.trim().is_empty()),
            content,
            text_content,
            site_name: site_name.filter(|s| !s.trim().is_empty()),
            url: url.into(),
        }
    }

    pub fn format(&self) -> ContentFormat {
        ContentFormat::detect(&self.content)
    }

    /// Char count of the trimmed text projection.
    pub fn text_length(&self) -> usize {
        self.text_content.trim().chars().count()
    }

    /// True when the text is the producer's "nothing found" sentinel.
    pub fn is_placeholder(&self) -> bool {
        self.text_content.trim().trim_end_matches('.').eq_ignore_ascii_case(PLACEHOLDER_TEXT)
    }

    /// True when this record should not be shown as an article.
    pub fn is_empty_for(&self, min_length: usize) -> bool {
        self.text_length() == 0 || self.is_placeholder() || self.text_length() < min_length
    }

    pub fn word_count(&self) -> usize {
        WORD_RE.find_iter(&self.text_content).count()
    }

    /// Estimated reading time in minutes at 200 words per minute.
    pub fn reading_time(&self) -> f64 {
        self.word_count() as f64 / 200.0
    }
}

/// A page handed to extraction: where it came from and its raw markup.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub url: String,
    /// Parsed `url`, when it is absolute.
    pub base_url: Option<Url>,
    pub markup: String,
    /// Title the caller already knows, such as the tab title.
    pub title_hint: Option<String>,
}

impl PageContext {
    pub fn new(url: impl Into<String>, markup: impl Into<String>, title_hint: Option<String>) -> Self {
        let url = url.into();
        let base_url = Url::parse(&url).ok();
        Self { url, base_url, markup: markup.into(), title_hint: title_hint.filter(|t| !t.trim().is_empty()) }
    }

    /// Lowercased host without a leading `www.`.
    pub fn host(&self) -> Option<String> {
        let host = self.base_url.as_ref()?.host_str()?.to_lowercase();
        Some(host.strip_prefix("www.").map(str::to_string).unwrap_or(host))
    }
}

/// Text segments of `content` in reading order.
///
/// Concatenated, the segments equal [`project_text`]. HTML content splits at
/// text nodes; Markdown content splits at paragraph breaks.
pub fn text_segments(content: &str) -> Vec<String> {
    match ContentFormat::detect(content) {
        ContentFormat::Html => Document::parse_fragment(content).text_segments(),
        ContentFormat::Markdown => markdown_segments(content),
    }
}

/// Deterministic plain-text projection of HTML or Markdown content.
pub fn project_text(content: &str) -> String {
    text_segments(content).concat()
}

fn markdown_segments(markdown: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();

    for event in Parser::new(markdown) {
        match event {
            Event::Text(t) | Event::Code(t) => current.push_str(&t),
            Event::SoftBreak | Event::HardBreak => current.push(' '),
            Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item | TagEnd::CodeBlock) => {
                if !current.trim().is_empty() {
                    current.push('\n');
                    segments.push(std::mem::take(&mut current));
                } else {
                    current.clear();
                }
            }
            _ => {}
        }
    }

    if !current.trim().is_empty() {
        segments.push(current);
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_projection() {
        let record = ArticleRecord::new(
            "Title",
            Some("Ada".into()),
            "<h1>Heading</h1><p>First <em>para</em>.</p><script>x()</script><p>Second.</p>",
            None,
            "https://example.com/a",
        );
        assert_eq!(record.text_content, "Heading\nFirst para.\nSecond.\n");
        assert_eq!(record.format(), ContentFormat::Html);
        assert_eq!(record.word_count(), 4);
    }

    #[test]
    fn test_markdown_projection() {
        let record = ArticleRecord::new("T", None, "# Heading\n\nSome **bold** text\nwrapped.\n\n- item", None, "u");
        assert_eq!(record.format(), ContentFormat::Markdown);
        assert_eq!(record.text_content, "Heading\nSome bold text wrapped.\nitem\n");
    }

    #[test]
    fn test_placeholder_is_empty() {
        let record = ArticleRecord::new("T", None, "No article content found.", None, "u");
        assert!(record.is_placeholder());
        assert!(record.is_empty_for(0));
    }

    #[test]
    fn test_blank_optional_fields_become_none() {
        let record = ArticleRecord::new("T", Some("  ".into()), "<p>x</p>", Some(String::new()), "u");
        assert_eq!(record.byline, None);
        assert_eq!(record.site_name, None);
    }

    #[test]
    fn test_min_length() {
        let record = ArticleRecord::new("T", None, "<p>Short body text.</p>", None, "u");
        assert!(!record.is_empty_for(10));
        assert!(record.is_empty_for(100));
    }

    #[test]
    fn test_serializes_camel_case() {
        let record = ArticleRecord::new("T", None, "<p>x</p>", Some("Site".into()), "u");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["textContent"], "x\n");
        assert_eq!(json["siteName"], "Site");
        assert!(json["byline"].is_null());
    }
}
