//! Per-site extraction rules keyed by hostname.
//!
//! A rule names where a known publisher keeps its title, byline, and body
//! blocks. Rules are tried before generic scoring because they are exact when
//! they match and cheap when they don't.

use crate::article::{ArticleRecord, PageContext};
use crate::parse::{Document, Element};
use crate::postprocess::{PostProcessConfig, postprocess_html};
use crate::preprocess::{remove_matching, strip_for_prompt};

/// Extraction rule for one publisher.
#[derive(Debug, Clone, Copy)]
pub struct SiteRule {
    pub name: &'static str,
    /// Hostnames this rule serves; subdomains match too.
    pub hosts: &'static [&'static str],
    pub title_selectors: &'static [&'static str],
    pub byline_selectors: &'static [&'static str],
    /// Body selectors in priority order; every match of the first selector that matches anything is kept.
    pub content_selectors: &'static [&'static str],
    /// Figure shown above the body, kept only when it holds an image.
    pub lead_figure: Option<&'static str>,
    /// Containers used whole when no content selector matches.
    pub fallback_containers: &'static [&'static str],
    /// Elements removed from the selected body.
    pub strip_selectors: &'static [&'static str],
    pub site_name: Option<&'static str>,
}

impl SiteRule {
    /// Whether `host` (already lowercased, `www.` stripped) belongs to this rule.
    pub fn matches_host(&self, host: &str) -> bool {
        self.hosts
            .iter()
            .any(|h| host == *h || host.strip_suffix(h).is_some_and(|prefix| prefix.ends_with('.')))
    }
}

pub static SITE_RULES: &[SiteRule] = &[
    SiteRule {
        name: "guardian",
        hosts: &["theguardian.com", "guardian.co.uk"],
        title_selectors: &["h1", "[data-gu-name=\"headline\"] h1"],
        byline_selectors: &["a[rel=\"author\"]", "[data-link-name=\"byline\"]"],
        content_selectors: &["div[data-component=\"text-block\"]", "#maincontent .article-body-commercial-selector"],
        lead_figure: Some("[data-gu-name=\"media\"] figure, article figure"),
        fallback_containers: &["#maincontent", "article"],
        strip_selectors: &["aside", "[data-component=\"rich-link\"]", "gu-island"],
        site_name: Some("The Guardian"),
    },
    SiteRule {
        name: "wikipedia",
        hosts: &["wikipedia.org"],
        title_selectors: &["#firstHeading"],
        byline_selectors: &[],
        content_selectors: &[
            "#mw-content-text .mw-parser-output > p, #mw-content-text .mw-parser-output > h2, #mw-content-text .mw-parser-output > h3, #mw-content-text .mw-parser-output > ul, #mw-content-text .mw-parser-output > blockquote",
        ],
        lead_figure: None,
        fallback_containers: &["#mw-content-text", "#bodyContent"],
        strip_selectors: &[
            "sup.reference",
            ".mw-editsection",
            ".navbox",
            ".infobox",
            ".hatnote",
            ".metadata",
            "style",
        ],
        site_name: Some("Wikipedia"),
    },
    SiteRule {
        name: "github",
        hosts: &["github.com"],
        title_selectors: &["article.markdown-body h1", "[itemprop=\"name\"] a"],
        byline_selectors: &["[itemprop=\"author\"]", "a[rel=\"author\"]"],
        content_selectors: &["article.markdown-body", ".markdown-body"],
        lead_figure: None,
        fallback_containers: &["#readme", "main"],
        strip_selectors: &["a.anchor", "svg", ".octicon"],
        site_name: Some("GitHub"),
    },
];

/// First rule serving `host`.
pub fn rule_for_host(host: &str) -> Option<&'static SiteRule> {
    SITE_RULES.iter().find(|rule| rule.matches_host(host))
}

/// Applies a site rule, returning `None` when the rule finds no body.
///
/// The caller checks the result against the minimum length.
pub fn apply_rule(rule: &SiteRule, page: &PageContext) -> Option<ArticleRecord> {
    let meta_doc = Document::parse(&page.markup).with_base_url(page.base_url.clone());
    let doc = Document::parse(&strip_for_prompt(&page.markup));

    let mut body = String::new();
    if let Some(figure) = rule.lead_figure.and_then(|sel| lead_figure(&doc, sel)) {
        body.push_str(&figure);
    }

    match content_blocks(&doc, rule.content_selectors) {
        Some(blocks) => body.push_str(&blocks),
        None => {
            let container = rule.fallback_containers.iter().find_map(|sel| doc.select_first(sel))?;
            body.push_str(&container.inner_html());
        }
    }

    let cleaned = remove_matching(&body, rule.strip_selectors);
    let config = PostProcessConfig { base_url: page.base_url.clone(), ..Default::default() };
    let content = postprocess_html(&cleaned, &config);

    let title = rule
        .title_selectors
        .iter()
        .find_map(|sel| meta_doc.first_text(sel))
        .or_else(|| meta_doc.extract_title())
        .or_else(|| page.title_hint.clone())
        .unwrap_or_default();
    let byline = rule
        .byline_selectors
        .iter()
        .find_map(|sel| meta_doc.first_text(sel))
        .or_else(|| meta_doc.extract_byline());
    let site_name = rule.site_name.map(str::to_string).or_else(|| meta_doc.extract_site_name());

    Some(ArticleRecord::new(title, byline, content, site_name, page.url.clone()))
}

fn content_blocks(doc: &Document, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|selector| {
        let blocks: Vec<Element<'_>> = doc.select(selector).ok()?;
        let html = blocks
            .iter()
            .filter(|block| !block.normalized_text().is_empty())
            .map(Element::outer_html)
            .collect::<String>();
        (!html.is_empty()).then_some(html)
    })
}

fn lead_figure(doc: &Document, selector: &str) -> Option<String> {
    doc.select(selector)
        .ok()?
        .into_iter()
        .find(|figure| figure.select("img").is_ok_and(|imgs| !imgs.is_empty()))
        .map(|figure| figure.outer_html())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("theguardian.com", Some("guardian"))]
    #[case("amp.theguardian.com", Some("guardian"))]
    #[case("en.wikipedia.org", Some("wikipedia"))]
    #[case("github.com", Some("github"))]
    #[case("notguardian.com", None)]
    #[case("example.com", None)]
    fn test_rule_for_host(#[case] host: &str, #[case] expected: Option<&str>) {
        assert_eq!(rule_for_host(host).map(|r| r.name), expected);
    }

    #[test]
    fn test_guardian_blocks_and_lead_figure() {
        let markup = r#"
            <html><head><meta name="author" content="Meta Name"></head><body>
            <div id="maincontent">
              <h1>Storm hits coast</h1>
              <a rel="author" href="/profile/jo">Jo Reporter</a>
              <div data-gu-name="media"><figure><img src="/lead.jpg" alt="Waves"><figcaption>Waves on the pier</figcaption></figure></div>
              <div data-component="text-block"><p>First paragraph of the report.</p></div>
              <aside>Related: other storms</aside>
              <div data-component="text-block"><p>Second paragraph of the report.</p></div>
            </div></body></html>"#;
        let page = PageContext::new("https://www.theguardian.com/world/storm", markup, None);

        let record = apply_rule(&SITE_RULES[0], &page).unwrap();
        assert_eq!(record.title, "Storm hits coast");
        assert_eq!(record.byline.as_deref(), Some("Jo Reporter"));
        assert_eq!(record.site_name.as_deref(), Some("The Guardian"));
        assert!(record.content.contains("https://www.theguardian.com/lead.jpg"));
        assert!(record.text_content.contains("Waves on the pier"));
        assert!(record.text_content.contains("First paragraph"));
        assert!(record.text_content.contains("Second paragraph"));
        assert!(!record.text_content.contains("Related"));
    }

    #[test]
    fn test_fallback_container() {
        let markup = r#"<html><body><article><h1>T</h1><p>Only an article element here.</p></article></body></html>"#;
        let page = PageContext::new("https://www.theguardian.com/x", markup, Some("Hint".into()));
        let record = apply_rule(&SITE_RULES[0], &page).unwrap();
        assert!(record.text_content.contains("Only an article element here."));
    }

    #[test]
    fn test_no_body_is_none() {
        let page = PageContext::new("https://www.theguardian.com/x", "<html><body><nav>Menu</nav></body></html>", None);
        assert!(apply_rule(&SITE_RULES[0], &page).is_none());
    }

    #[test]
    fn test_wikipedia_strips_references() {
        let markup = r#"<html><body><h1 id="firstHeading">Rust</h1><div id="mw-content-text"><div class="mw-parser-output">
            <p>Rust is a language<sup class="reference">[1]</sup> for systems.</p>
            <h2>History<span class="mw-editsection">[edit]</span></h2>
            <p>It began in 2006.</p>
        </div></div></body></html>"#;
        let page = PageContext::new("https://en.wikipedia.org/wiki/Rust", markup, None);
        let record = apply_rule(&SITE_RULES[1], &page).unwrap();
        assert_eq!(record.title, "Rust");
        assert_eq!(record.text_content, "Rust is a language for systems.\nHistory\nIt began in 2006.\n");
    }
}
