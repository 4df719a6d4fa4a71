use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::preprocess::absolutize_urls;

static CONDITIONAL_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<!--\[if[^\]]*\]>.*?<!\[endif\]-->|<!--<!\[if[^\]]*\]>.*?<!\[endif\]-->"#).unwrap()
});

static PRESENTATION_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\s+(class|style|data-[\w-]+)=("[^"]*"|'[^']*')"#).unwrap());

static IMG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"<img[^>]*>"#).unwrap());

/// One pattern per container tag, matching the tag when it holds only whitespace or `<br>`.
static EMPTY_NODE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ["div", "p", "span", "section", "article", "aside", "header", "footer", "figure", "li", "ul", "ol"]
        .iter()
        .map(|tag| Regex::new(&format!(r#"<{tag}(?:\s[^>]*)?>(?:\s|&nbsp;|<br\s*/?>)*</{tag}>"#)).unwrap())
        .collect()
});

/// Configuration for cleanup of extracted article HTML
#[derive(Debug, Clone)]
pub struct PostProcessConfig {
    /// Whether to remove elements left empty after extraction
    pub remove_empty_nodes: bool,
    /// Maximum passes for removing nested empty nodes
    pub max_empty_node_passes: usize,
    /// Keep class, style, and data attributes (default: false)
    pub keep_presentation: bool,
    /// Whether to strip all images
    pub strip_images: bool,
    /// Base URL for converting relative URLs
    pub base_url: Option<Url>,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            remove_empty_nodes: true,
            max_empty_node_passes: 10,
            keep_presentation: false,
            strip_images: false,
            base_url: None,
        }
    }
}

/// Cleans extracted HTML before it becomes article content.
pub fn postprocess_html(html: &str, config: &PostProcessConfig) -> String {
    let mut processed = CONDITIONAL_COMMENT_RE.replace_all(html, "").into_owned();

    if config.strip_images {
        processed = IMG_RE.replace_all(&processed, "").into_owned();
    }

    if !config.keep_presentation {
        processed = PRESENTATION_ATTR_RE.replace_all(&processed, "").into_owned();
    }

    if config.remove_empty_nodes {
        processed = remove_empty_nodes(&processed, config.max_empty_node_passes);
    }

    if let Some(base_url) = &config.base_url {
        processed = absolutize_urls(&processed, base_url);
    }

    processed.trim().to_string()
}

/// Removes empty containers until a pass changes nothing, so parents emptied by
/// an earlier pass go too.
fn remove_empty_nodes(html: &str, max_passes: usize) -> String {
    let mut result = html.to_string();

    for _ in 0..max_passes {
        let before = result.len();
        for re in EMPTY_NODE_RES.iter() {
            result = re.replace_all(&result, "").into_owned();
        }
        if result.len() == before {
            break;
        }
    }

    result
}
