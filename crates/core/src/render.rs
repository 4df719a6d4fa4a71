//! Output formats for an extracted article.

use serde::{Deserialize, Serialize};

use crate::article::{ArticleRecord, ContentFormat};
use crate::{RecitalError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Html,
    Text,
    Markdown,
}

#[derive(Debug, Clone, Default)]
pub struct RenderConfig {
    /// Title block for text, TOML frontmatter for Markdown.
    pub include_header: bool,
    /// Wrap plain text at this width (0 = no wrapping).
    pub line_width: usize,
}

/// Renders `article` in `format`.
pub fn render_article(article: &ArticleRecord, format: OutputFormat, config: &RenderConfig) -> Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(article)
            .map_err(|e| RecitalError::ConfigError(format!("could not serialize article: {}", e))),
        OutputFormat::Html => Ok(article.content.clone()),
        OutputFormat::Text => Ok(render_text(article, config)),
        OutputFormat::Markdown => Ok(render_markdown(article, config)),
    }
}

fn render_text(article: &ArticleRecord, config: &RenderConfig) -> String {
    let mut output = String::new();

    if config.include_header && !article.title.is_empty() {
        output.push_str(&article.title);
        output.push('\n');
        output.push_str(&"=".repeat(article.title.chars().count()));
        output.push('\n');
        if let Some(byline) = &article.byline {
            output.push_str(&format!("By {}\n", byline));
        }
        if let Some(site) = &article.site_name {
            output.push_str(&format!("{}\n", site));
        }
        output.push('\n');
    }

    if config.line_width > 0 {
        let wrapped: Vec<String> = article.text_content.lines().map(|line| wrap_line(line, config.line_width)).collect();
        output.push_str(&wrapped.join("\n"));
    } else {
        output.push_str(&article.text_content);
    }

    output.trim_end().to_string()
}

fn render_markdown(article: &ArticleRecord, config: &RenderConfig) -> String {
    let mut output = String::new();

    if config.include_header {
        output.push_str(&frontmatter(article));
        output.push('\n');
    }

    let body = match article.format() {
        ContentFormat::Markdown => article.content.clone(),
        ContentFormat::Html => htmd::convert(&article.content).unwrap_or_else(|_| article.text_content.clone()),
    };
    output.push_str(body.trim());
    output.push('\n');
    output
}

fn frontmatter(article: &ArticleRecord) -> String {
    let mut frontmatter = String::from("+++");
    frontmatter.push_str(&format!("\ntitle = {}", toml_string(&article.title)));
    if let Some(byline) = &article.byline {
        frontmatter.push_str(&format!("\nauthor = {}", toml_string(byline)));
    }
    if let Some(site) = &article.site_name {
        frontmatter.push_str(&format!("\nsite = {}", toml_string(site)));
    }
    frontmatter.push_str(&format!("\nurl = {}", toml_string(&article.url)));
    frontmatter.push_str(&format!("\nword_count = {}", article.word_count()));
    frontmatter.push_str(&format!("\nreading_time_minutes = {:.1}", article.reading_time()));
    frontmatter.push_str("\n+++\n");
    frontmatter
}

fn toml_string(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n"))
}

/// Greedy word wrap by char count.
fn wrap_line(line: &str, width: usize) -> String {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in line.split_whitespace() {
        let word_len = word.chars().count();
        if current_len > 0 && current_len + 1 + word_len > width {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article() -> ArticleRecord {
        ArticleRecord::new(
            "A \"quoted\" title",
            Some("Ada".into()),
            "<h2>Part</h2><p>Some <strong>bold</strong> words here.</p>",
            Some("Example".into()),
            "https://example.com/a",
        )
    }

    #[test]
    fn test_text_with_header() {
        let config = RenderConfig { include_header: true, line_width: 0 };
        let text = render_article(&article(), OutputFormat::Text, &config).unwrap();
        assert!(text.starts_with("A \"quoted\" title\n================\nBy Ada\nExample\n\nPart\n"));
        assert!(text.ends_with("Some bold words here."));
    }

    #[test]
    fn test_text_wrapping() {
        assert_eq!(wrap_line("one two three four", 9), "one two\nthree\nfour");
        assert_eq!(wrap_line("", 9), "");
    }

    #[test]
    fn test_markdown_frontmatter_and_body() {
        let config = RenderConfig { include_header: true, line_width: 0 };
        let markdown = render_article(&article(), OutputFormat::Markdown, &config).unwrap();
        assert!(markdown.starts_with("+++\ntitle = \"A \\\"quoted\\\" title\"\nauthor = \"Ada\""));
        assert!(markdown.contains("word_count = 5"));
        assert!(markdown.contains("## Part"));
        assert!(markdown.contains("**bold**"));
    }

    #[test]
    fn test_markdown_content_passes_through() {
        let record = ArticleRecord::new("T", None, "# Heading\n\nBody.", None, "u");
        let markdown = render_article(&record, OutputFormat::Markdown, &RenderConfig::default()).unwrap();
        assert_eq!(markdown, "# Heading\n\nBody.\n");
    }

    #[test]
    fn test_json_is_camel_case() {
        let json = render_article(&article(), OutputFormat::Json, &RenderConfig::default()).unwrap();
        assert!(json.contains("\"textContent\""));
        assert!(json.contains("\"siteName\": \"Example\""));
    }
}
