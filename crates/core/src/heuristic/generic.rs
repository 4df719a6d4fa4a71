use std::collections::HashMap;

use crate::article::{ArticleRecord, PageContext};
use crate::parse::{Document, Element};
use crate::postprocess::{PostProcessConfig, postprocess_html};
use crate::scoring::{ScoreConfig, initial_score, link_density, link_penalty, paragraph_score};

/// Elements whose text votes for their ancestors.
const PARAGRAPH_SELECTOR: &str = "p, pre, td, blockquote";

/// Containers tried in order when scoring picks nothing usable.
pub const GENERIC_SELECTORS: &[&str] = &["article", "main", ".article", ".content", "[role=\"main\"]"];

/// Configuration for generic extraction
#[derive(Debug, Clone)]
pub struct GenericConfig {
    pub score: ScoreConfig,
    /// Minimum final score for the top candidate
    pub min_top_score: f64,
    /// Siblings scoring at least this share of the top score are kept
    pub sibling_threshold: f64,
    pub postprocess: PostProcessConfig,
}

impl Default for GenericConfig {
    fn default() -> Self {
        Self {
            score: ScoreConfig::default(),
            min_top_score: 5.0,
            sibling_threshold: 0.2,
            postprocess: PostProcessConfig::default(),
        }
    }
}

/// A scored container.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub element: Element<'a>,
    pub score: f64,
}

/// Scores every paragraph's parent and grandparent and returns the candidates,
/// best first, with the link-density penalty applied.
///
/// A paragraph gives its full score to its parent and half to its grandparent.
pub fn score_candidates<'a>(doc: &'a Document, config: &ScoreConfig) -> Vec<Candidate<'a>> {
    let mut order: Vec<Element<'a>> = Vec::new();
    let mut scores = HashMap::new();

    for paragraph in doc.select(PARAGRAPH_SELECTOR).unwrap_or_default() {
        let Some(points) = paragraph_score(&paragraph, config) else { continue };

        let parent = paragraph.parent();
        let grandparent = parent.as_ref().and_then(Element::parent);

        for (ancestor, divider) in [(parent, 1.0), (grandparent, 2.0)] {
            let Some(ancestor) = ancestor.filter(|a| a.tag_name() != "html") else { continue };
            let score = scores.entry(ancestor.inner().id()).or_insert_with(|| {
                order.push(ancestor.clone());
                initial_score(&ancestor, config)
            });
            *score += points / divider;
        }
    }

    let mut candidates: Vec<Candidate<'a>> = order
        .into_iter()
        .map(|element| {
            let raw = scores.get(&element.inner().id()).copied().unwrap_or_default();
            let score = raw * link_penalty(&element, config);
            Candidate { element, score }
        })
        .collect();

    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    candidates
}

/// Joins the top candidate with the siblings that look like part of the same article.
fn gather_with_siblings(top: &Candidate<'_>, candidates: &[Candidate<'_>], config: &GenericConfig) -> String {
    let Some(parent) = top.element.parent() else { return top.element.outer_html() };

    let threshold = (top.score * config.sibling_threshold).max(10.0);
    let top_class = top.element.attr("class");
    let mut html = String::new();

    for sibling in parent.children() {
        if sibling.same_node(&top.element) {
            html.push_str(&sibling.outer_html());
            continue;
        }

        let mut score = candidates
            .iter()
            .find(|c| c.element.same_node(&sibling))
            .map(|c| c.score)
            .unwrap_or(0.0);
        if top_class.is_some() && sibling.attr("class") == top_class {
            score += top.score * 0.2;
        }

        let keep = score >= threshold || (sibling.tag_name() == "p" && is_prose_paragraph(&sibling));
        if keep {
            html.push_str(&sibling.outer_html());
        }
    }

    html
}

/// A paragraph sibling is kept when it is long with few links, or short, link-free, and ends a sentence.
fn is_prose_paragraph(paragraph: &Element<'_>) -> bool {
    let text = paragraph.normalized_text();
    let len = text.chars().count();
    let ld = link_density(paragraph);
    (len > 80 && ld < 0.25) || (len > 0 && ld == 0.0 && text.ends_with('.'))
}

/// Readability-style extraction. Returns the best record, or `None` when
/// nothing clears `min_length`.
pub fn extract_generic(page: &PageContext, min_length: usize, config: &GenericConfig) -> Option<ArticleRecord> {
    let meta_doc = Document::parse(&page.markup).with_base_url(page.base_url.clone());
    let doc = Document::parse_with_preprocessing(&page.markup, page.base_url.clone());
    let postprocess = PostProcessConfig { base_url: page.base_url.clone(), ..config.postprocess.clone() };

    let metadata = meta_doc.extract_metadata();
    let build = |content: String| {
        ArticleRecord::new(
            metadata.title.clone().or_else(|| page.title_hint.clone()).unwrap_or_default(),
            metadata.byline.clone(),
            content,
            metadata.site_name.clone(),
            page.url.clone(),
        )
    };

    let candidates = score_candidates(&doc, &config.score);
    if let Some(top) = candidates.first().filter(|c| c.score >= config.min_top_score) {
        let html = gather_with_siblings(top, &candidates, config);
        let record = build(postprocess_html(&html, &postprocess));
        if !record.is_empty_for(min_length) {
            tracing::debug!(score = top.score, tag = %top.element.tag_name(), "generic scoring picked a candidate");
            return Some(record);
        }
    }

    GENERIC_SELECTORS
        .iter()
        .filter_map(|selector| doc.select_first(selector))
        .map(|container| build(postprocess_html(&container.inner_html(), &postprocess)))
        .find(|record| !record.is_empty_for(min_length))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROSE: &str = "The committee met on Tuesday, after weeks of delay, to weigh the proposal in full. \
        Members raised concerns about cost, timing, and the lack of public input on the plan.";

    fn page(markup: &str) -> PageContext {
        PageContext::new("https://news.example.com/story", markup, Some("Tab title".into()))
    }

    #[test]
    fn test_scoring_prefers_prose_container() {
        let markup = format!(
            r##"<html><body>
                <div id="nav"><p><a href="#">Home</a> <a href="#">World</a> <a href="#">Sport</a> <a href="#">Culture</a></p></div>
                <div id="story"><p>{PROSE}</p><p>{PROSE}</p><p>{PROSE}</p></div>
            </body></html>"##
        );
        let doc = Document::parse(&markup);
        let candidates = score_candidates(&doc, &ScoreConfig::default());
        assert_eq!(candidates[0].element.attr("id"), Some("story"));
    }

    #[test]
    fn test_extract_generic_with_siblings_and_metadata() {
        let markup = format!(
            r#"<html><head><title>Council Vote</title><meta name="author" content="Sam Writer"></head><body>
                <div class="wrap">
                    <div class="story-body"><p>{PROSE}</p><p>{PROSE}</p></div>
                    <p>A closing paragraph that ends the story cleanly.</p>
                    <div class="comments"><a href="/c">Comments (12)</a></div>
                </div>
            </body></html>"#
        );
        let record = extract_generic(&page(&markup), 100, &GenericConfig::default()).unwrap();
        assert_eq!(record.title, "Council Vote");
        assert_eq!(record.byline.as_deref(), Some("Sam Writer"));
        assert_eq!(record.site_name.as_deref(), Some("news.example.com"));
        assert!(record.text_content.contains("The committee met"));
        assert!(record.text_content.contains("closing paragraph"));
        assert!(!record.text_content.contains("Comments"));
    }

    #[test]
    fn test_falls_back_to_generic_selectors() {
        let markup = "<html><body><main><h2>Short notes</h2><ul><li>One item with some words in it</li>\
            <li>Another item that has a few more words</li><li>A third list entry to pass the minimum</li></ul></main></body></html>";
        let record = extract_generic(&page(markup), 80, &GenericConfig::default()).unwrap();
        assert!(record.text_content.starts_with("Short notes\n"));
        assert_eq!(record.title, "Tab title");
    }

    #[test]
    fn test_empty_page_is_none() {
        let markup = "<html><body><nav><a href='/'>Home</a></nav><p>Tiny.</p></body></html>";
        assert!(extract_generic(&page(markup), 100, &GenericConfig::default()).is_none());
    }
}
