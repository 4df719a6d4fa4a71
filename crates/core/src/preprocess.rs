//! Markup cleanup run before heuristic scoring and before building remote excerpts.
//!
//! Every pass streams the markup through a `lol_html` rewriter. A pass that fails
//! to rewrite returns its input unchanged, so preprocessing never loses a page.

use std::sync::LazyLock;

use lol_html::{HtmlRewriter, Settings, element};
use regex::Regex;
use url::Url;

use crate::scoring::POSITIVE_RE;

/// Tags whose content is never article text.
const NON_CONTENT_TAGS: &[&str] =
    &["script", "style", "noscript", "iframe", "svg", "canvas", "template", "object", "embed"];

static UNLIKELY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(banner|breadcrumbs?|combx|comment|community|cookie|disqus|extra|foot|header|menu|modal|newsletter|related|remark|rss|share|shoutbox|sidebar|social|sponsor|subscribe|ad-break|agegate|pagination|pager|popup)",
    )
    .unwrap()
});

static HIDDEN_STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(display\s*:\s*none|visibility\s*:\s*hidden)").unwrap());

static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Configuration for HTML preprocessing.
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Unwrap elements whose class or id looks like page chrome (default: true).
    pub remove_unlikely: bool,
    /// Spare unlikely-looking elements that also carry a content-like name (default: true).
    pub keep_positive: bool,
    /// Drop elements hidden with inline styles, `hidden`, or `aria-hidden` (default: true).
    pub remove_hidden: bool,
    /// Base URL for absolutizing `href` and `src`.
    pub base_url: Option<Url>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self { remove_unlikely: true, keep_positive: true, remove_hidden: true, base_url: None }
    }
}

/// Preprocess HTML for heuristic extraction.
pub fn preprocess_html(html: &str, config: &PreprocessConfig) -> String {
    let mut processed = remove_non_content(html);

    if config.remove_hidden {
        processed = remove_hidden_elements(&processed);
    }

    if config.remove_unlikely {
        processed = unwrap_unlikely_candidates(&processed, config.keep_positive);
    }

    if let Some(base_url) = &config.base_url {
        processed = absolutize_urls(&processed, base_url);
    }

    normalize_whitespace(&processed)
}

/// Light cleanup for markup that is handed to a language model.
///
/// Only removes what never carries article text; page structure is kept so the
/// model can see headings, bylines, and figure captions.
pub fn strip_for_prompt(html: &str) -> String {
    normalize_whitespace(&remove_non_content(html))
}

fn rewrite(html: &str, settings: Settings<'_, '_>) -> String {
    let mut output = Vec::with_capacity(html.len());
    let mut rewriter = HtmlRewriter::new(settings, |chunk: &[u8]| output.extend_from_slice(chunk));

    if rewriter.write(html.as_bytes()).is_err() || rewriter.end().is_err() {
        return html.to_string();
    }

    match String::from_utf8(output) {
        Ok(out) if !out.is_empty() || html.is_empty() => out,
        _ => html.to_string(),
    }
}

fn remove_non_content(html: &str) -> String {
    let without_comments = COMMENT_RE.replace_all(html, "");
    rewrite(
        &without_comments,
        Settings {
            element_content_handlers: NON_CONTENT_TAGS
                .iter()
                .map(|tag| {
                    element!(*tag, |el| {
                        el.remove();
                        Ok(())
                    })
                })
                .collect(),
            ..Default::default()
        },
    )
}

/// Removes every element matching one of `selectors`, content included.
///
/// Selectors lol_html cannot parse are skipped.
pub fn remove_matching(html: &str, selectors: &[&str]) -> String {
    let handlers = selectors
        .iter()
        .filter(|selector| selector.parse::<lol_html::Selector>().is_ok())
        .map(|selector| {
            element!(*selector, |el| {
                el.remove();
                Ok(())
            })
        })
        .collect::<Vec<_>>();

    if handlers.is_empty() {
        return html.to_string();
    }
    rewrite(html, Settings { element_content_handlers: handlers, ..Default::default() })
}

fn remove_hidden_elements(html: &str) -> String {
    rewrite(
        html,
        Settings {
            element_content_handlers: vec![element!("*", |el| {
                let styled_hidden = el.get_attribute("style").is_some_and(|style| HIDDEN_STYLE_RE.is_match(&style));
                let aria_hidden = el.get_attribute("aria-hidden").is_some_and(|v| v.eq_ignore_ascii_case("true"));
                if styled_hidden || aria_hidden || el.has_attribute("hidden") {
                    el.remove();
                }
                Ok(())
            })],
            ..Default::default()
        },
    )
}

/// Unwraps, rather than removes, elements named like page chrome.
///
/// Unwrapping keeps nested article text that happens to sit inside a
/// misleadingly named wrapper.
fn unwrap_unlikely_candidates(html: &str, keep_positive: bool) -> String {
    let is_unlikely = |name: &str| UNLIKELY_RE.is_match(name) && !(keep_positive && POSITIVE_RE.is_match(name));

    rewrite(
        html,
        Settings {
            element_content_handlers: vec![element!("*", |el| {
                if matches!(el.tag_name().as_str(), "body" | "html" | "article" | "main") {
                    return Ok(());
                }

                let id_hit = el.get_attribute("id").is_some_and(|id| is_unlikely(&id));
                let class_hit = el
                    .get_attribute("class")
                    .is_some_and(|class| class.split_whitespace().any(is_unlikely));

                if id_hit || class_hit {
                    el.remove_and_keep_content();
                }
                Ok(())
            })],
            ..Default::default()
        },
    )
}

/// Converts relative `href` and `src` attributes to absolute URLs.
pub fn absolutize_urls(html: &str, base_url: &Url) -> String {
    rewrite(
        html,
        Settings {
            element_content_handlers: vec![
                element!("a[href]", |el| {
                    if let Some(href) = el.get_attribute("href")
                        && let Ok(absolute) = base_url.join(&href)
                    {
                        el.set_attribute("href", absolute.as_str()).ok();
                    }
                    Ok(())
                }),
                element!("img[src]", |el| {
                    if let Some(src) = el.get_attribute("src")
                        && let Ok(absolute) = base_url.join(&src)
                    {
                        el.set_attribute("src", absolute.as_str()).ok();
                    }
                    Ok(())
                }),
            ],
            ..Default::default()
        },
    )
}

fn normalize_whitespace(html: &str) -> String {
    WHITESPACE_RE.replace_all(html, " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_non_content() {
        let html = r#"
            <html>
                <head><script>alert('test');</script><style>body{color:red;}</style></head>
                <body>
                    <!-- tracking pixel -->
                    <noscript>Enable JavaScript</noscript>
                    <iframe src="https://ads.example.com"></iframe>
                    <svg><rect width="100" height="100"/></svg>
                    <p>Content</p>
                </body>
            </html>
        "#;

        let result = remove_non_content(html);
        assert!(!result.contains("alert"));
        assert!(!result.contains("color:red"));
        assert!(!result.contains("Enable JavaScript"));
        assert!(!result.contains("ads.example.com"));
        assert!(!result.contains("rect"));
        assert!(!result.contains("tracking pixel"));
        assert!(result.contains("<p>Content</p>"));
    }

    #[test]
    fn test_unwrap_unlikely_keeps_inner_text() {
        let html = r#"<div id="sidebar"><p>Sidebar text</p></div><div class="share-tools">Share</div><div id="main-content">Main</div>"#;
        let result = unwrap_unlikely_candidates(html, true);
        assert!(!result.contains("id=\"sidebar\""));
        assert!(!result.contains("share-tools"));
        assert!(result.contains("Sidebar text"));
        assert!(result.contains("main-content"));
    }

    #[test]
    fn test_remove_matching() {
        let html = r#"<p>Rust<sup class="reference">[1]</sup> is fast.<span class="mw-editsection">[edit]</span></p>"#;
        let result = remove_matching(html, &["sup.reference", ".mw-editsection", "[[bad"]);
        assert_eq!(result, "<p>Rust is fast.</p>");
    }

    #[test]
    fn test_remove_hidden_elements() {
        let html = r#"
            <div style="display:none">Hidden content</div>
            <div aria-hidden="true">Decorative</div>
            <div hidden>Collapsed</div>
            <div>Visible content</div>
        "#;

        let result = remove_hidden_elements(html);
        assert!(!result.contains("Hidden content"));
        assert!(!result.contains("Decorative"));
        assert!(!result.contains("Collapsed"));
        assert!(result.contains("Visible content"));
    }

    #[test]
    fn test_absolutize_urls() {
        let base = Url::parse("https://example.com/blog/").unwrap();
        let html = r#"<a href="/about">About</a><a href="post.html">Post</a><img src="image.jpg" />"#;

        let result = absolutize_urls(html, &base);
        assert!(result.contains("href=\"https://example.com/about\""));
        assert!(result.contains("href=\"https://example.com/blog/post.html\""));
        assert!(result.contains("src=\"https://example.com/blog/image.jpg\""));
    }

    #[test]
    fn test_strip_for_prompt_keeps_structure() {
        let html = "<header class=\"byline\">By Ada</header><script>x</script>\n\n<p>Body</p>";
        let result = strip_for_prompt(html);
        assert_eq!(result, "<header class=\"byline\">By Ada</header> <p>Body</p>");
    }

    #[test]
    fn test_preprocess_full_pipeline() {
        let html = r#"
            <!DOCTYPE html>
            <html>
            <head><script>console.log('test');</script></head>
            <body>
                <div id="sidebar" class="menu"><a href="/home">Home</a></div>
                <div id="main" class="article">
                    <a href="/post">Link</a>
                    <p style="display:none">Hidden</p>
                    <p>Content</p>
                </div>
            </body>
            </html>
        "#;

        let base = Url::parse("https://example.com").unwrap();
        let config = PreprocessConfig { base_url: Some(base), ..Default::default() };
        let result = preprocess_html(html, &config);

        assert!(!result.contains("<script"));
        assert!(!result.contains("sidebar"));
        assert!(!result.contains("Hidden"));
        assert!(result.contains("href=\"https://example.com/post\""));
        assert!(result.contains("Content"));
    }
}
