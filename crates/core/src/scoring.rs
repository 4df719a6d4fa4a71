use std::sync::LazyLock;

use regex::Regex;

use crate::parse::Element;

/// Class/id names that suggest an element holds article text.
pub(crate) static POSITIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(article|body|content|entry|hentry|h-entry|main|page|post|text|blog|story|tweet)").unwrap()
});

/// Class/id names that suggest page chrome.
pub(crate) static NEGATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(banner|breadcrumbs?|combx|comment|community|disqus|extra|foot|header|menu|related|remark|rss|shoutbox|sidebar|sponsor|ad-break|agegate|pagination|pager|popup|promo|share|social)",
    )
    .unwrap()
});

/// Configuration for content scoring
#[derive(Debug, Clone)]
pub struct ScoreConfig {
    /// Weight for positive class/ID patterns
    pub positive_weight: f64,
    /// Weight for negative class/ID patterns
    pub negative_weight: f64,
    /// Maximum density points from character count
    pub max_char_density_score: f64,
    /// Maximum density points from comma count
    pub max_comma_density_score: f64,
    /// Characters per density point
    pub chars_per_point: usize,
    /// Paragraphs shorter than this (in chars) do not vote for their ancestors
    pub min_paragraph_chars: usize,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            positive_weight: 25.0,
            negative_weight: -25.0,
            max_char_density_score: 3.0,
            max_comma_density_score: 3.0,
            chars_per_point: 100,
            min_paragraph_chars: 25,
        }
    }
}

/// Base score for an element from its tag name
///
/// - ARTICLE: +10, SECTION: +8, DIV: +5
/// - TD, BLOCKQUOTE: +3, PRE: 0
/// - FORM and list/metadata elements: -3
/// - Headings, TH, HEADER, FOOTER, NAV: -5
pub fn base_tag_score(element: &Element<'_>) -> f64 {
    match element.tag_name().as_str() {
        "article" => 10.0,
        "section" => 8.0,
        "div" | "main" => 5.0,
        "td" | "blockquote" => 3.0,
        "pre" => 0.0,
        "form" => -3.0,
        "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" | "header" | "footer" | "nav" => -5.0,
        _ => 0.0,
    }
}

/// Class/ID weight adjustment
///
/// The id is checked before the class list, and a positive match wins over a
/// negative one within the same name.
pub fn class_id_weight(element: &Element<'_>, config: &ScoreConfig) -> f64 {
    let names = element
        .attr("id")
        .into_iter()
        .chain(element.attr("class").into_iter().flat_map(str::split_whitespace));

    for name in names {
        if POSITIVE_RE.is_match(name) {
            return config.positive_weight;
        }
        if NEGATIVE_RE.is_match(name) {
            return config.negative_weight;
        }
    }

    0.0
}

/// Score an element starts with before any paragraph votes.
pub fn initial_score(element: &Element<'_>, config: &ScoreConfig) -> f64 {
    base_tag_score(element) + class_id_weight(element, config)
}

/// Density points for a run of text: one per `chars_per_point` chars plus one
/// per comma, each capped.
pub fn content_density_score(text: &str, config: &ScoreConfig) -> f64 {
    let char_score = ((text.chars().count() / config.chars_per_point) as f64).min(config.max_char_density_score);
    let comma_score = (text.matches(',').count() as f64).min(config.max_comma_density_score);
    char_score + comma_score
}

/// Points a paragraph contributes to its ancestors, or `None` if it is too short to vote.
pub fn paragraph_score(paragraph: &Element<'_>, config: &ScoreConfig) -> Option<f64> {
    let text = paragraph.normalized_text();
    if text.chars().count() < config.min_paragraph_chars {
        return None;
    }
    Some(1.0 + content_density_score(&text, config))
}

/// Ratio of link text to all text, from 0.0 (no links) to 1.0 (only links).
pub fn link_density(element: &Element<'_>) -> f64 {
    let text_length = element.text().chars().count();
    if text_length == 0 {
        return 0.0;
    }

    let link_text_length = element
        .select("a")
        .unwrap_or_default()
        .iter()
        .map(|link| link.text().chars().count())
        .sum::<usize>();

    (link_text_length as f64 / text_length as f64).min(1.0)
}

/// Multiplier applied to a candidate's accumulated score.
///
/// Elements with a content-like name or more than 500 chars of text take only
/// half the link-density penalty.
pub fn link_penalty(element: &Element<'_>, config: &ScoreConfig) -> f64 {
    let ld = link_density(element);
    let content_rich = element.text().chars().count() > 500;
    if class_id_weight(element, config) > 0.0 || content_rich { 1.0 - ld * 0.5 } else { 1.0 - ld }
}
