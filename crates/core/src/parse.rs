//! HTML parsing and DOM navigation.
//!
//! This module provides the [`Document`] and [`Element`] types used by the
//! heuristic extractor, the metadata helpers, and the text projection that
//! feeds the word position mapper.
//!
//! # Example
//!
//! ```rust
//! use recital_core::parse::Document;
//!
//! let doc = Document::parse_fragment("<h2>Lede</h2><p>The <b>tide</b> turned.</p>");
//! assert_eq!(doc.select("p").unwrap()[0].text(), "The tide turned.");
//! assert_eq!(doc.text_segments().concat(), "Lede\nThe tide turned.\n");
//! ```

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::preprocess::{self, PreprocessConfig};
use crate::{RecitalError, Result};

/// Elements whose contents never reach the reader.
const INVISIBLE_TAGS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Elements that end a line in the plain-text projection.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "figcaption", "figure", "footer", "h1",
    "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "tr",
    "ul",
];

/// A parsed HTML document.
pub struct Document {
    html: Html,
    base_url: Option<Url>,
}

impl Document {
    /// Parses a full HTML document without preprocessing.
    ///
    /// html5ever recovers from any malformed markup, so this never fails.
    pub fn parse(html: &str) -> Self {
        Self { html: Html::parse_document(html), base_url: None }
    }

    /// Parses an HTML fragment, such as extracted article content.
    pub fn parse_fragment(html: &str) -> Self {
        Self { html: Html::parse_fragment(html), base_url: None }
    }

    /// Parses a document after stripping scripts, styles, hidden and unlikely nodes.
    ///
    /// `base_url` is kept for host matching and used to absolutize links.
    pub fn parse_with_preprocessing(html: &str, base_url: Option<Url>) -> Self {
        let config = PreprocessConfig { base_url: base_url.clone(), ..Default::default() };
        let cleaned = preprocess::preprocess_html(html, &config);
        Self { html: Html::parse_document(&cleaned), base_url }
    }

    /// Attaches a page URL after parsing.
    pub fn with_base_url(mut self, base_url: Option<Url>) -> Self {
        self.base_url = base_url;
        self
    }

    /// Lowercased host of the page URL, without a leading `www.`.
    pub fn host(&self) -> Option<String> {
        let host = self.base_url.as_ref()?.host_str()?.to_lowercase();
        Some(host.strip_prefix("www.").map(str::to_string).unwrap_or(host))
    }

    /// Selects elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`RecitalError::HtmlParseError`] if the selector is invalid.
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel = parse_selector(selector)?;
        Ok(self.html.select(&sel).map(Element::from_ref).collect())
    }

    /// First element matching `selector`, ignoring invalid selectors.
    pub fn select_first(&'_ self, selector: &str) -> Option<Element<'_>> {
        let sel = parse_selector(selector).ok()?;
        self.html.select(&sel).next().map(Element::from_ref)
    }

    /// Gets the trimmed content of the `<title>` element if present.
    pub fn title(&self) -> Option<String> {
        let title = self.select_first("title")?.text();
        let title = title.trim();
        (!title.is_empty()).then(|| title.to_string())
    }

    /// Readable text split at text-node granularity, in document order.
    ///
    /// Script and style content is skipped, whitespace-only nodes at the start of
    /// a line are dropped, and a `"\n"` segment is emitted after each block
    /// element. Concatenating the segments gives the plain-text projection of
    /// the document.
    pub fn text_segments(&self) -> Vec<String> {
        let mut segments = Vec::new();
        collect_segments(self.html.root_element(), &mut segments);
        segments
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| RecitalError::HtmlParseError(format!("Invalid selector: {}", e)))
}

fn collect_segments(element: ElementRef<'_>, out: &mut Vec<String>) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            let at_line_start = out.last().is_none_or(|s| s.ends_with('\n'));
            if !text.is_empty() && !(at_line_start && text.trim().is_empty()) {
                out.push(String::from(&**text));
            }
            continue;
        }

        let Some(child) = ElementRef::wrap(child) else { continue };
        let name = child.value().name();
        if INVISIBLE_TAGS.contains(&name) {
            continue;
        }
        if name == "br" {
            out.push("\n".to_string());
            continue;
        }

        collect_segments(child, out);

        if BLOCK_TAGS.contains(&name) && !out.last().is_some_and(|s| s.ends_with('\n')) {
            out.push("\n".to_string());
        }
    }
}

/// A wrapper around scraper's ElementRef.
#[derive(Clone, Debug)]
pub struct Element<'a> {
    element: ElementRef<'a>,
}

impl<'a> Element<'a> {
    pub(crate) fn from_ref(element: ElementRef<'a>) -> Self {
        Self { element }
    }

    /// The underlying scraper reference, for tree identity and traversal.
    pub fn inner(&self) -> ElementRef<'a> {
        self.element
    }

    pub fn inner_html(&self) -> String {
        self.element.inner_html()
    }

    pub fn outer_html(&self) -> String {
        self.element.html()
    }

    /// Concatenation of all text nodes within this element.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    /// Text with runs of whitespace collapsed to single spaces.
    pub fn normalized_text(&self) -> String {
        self.element.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    /// Lowercase tag name.
    pub fn tag_name(&self) -> String {
        self.element.value().name().to_lowercase()
    }

    /// Parent element, if the parent is an element and not the document root.
    pub fn parent(&self) -> Option<Element<'a>> {
        self.element.parent().and_then(ElementRef::wrap).map(Element::from_ref)
    }

    /// Direct element children.
    pub fn children(&self) -> Vec<Element<'a>> {
        self.element.children().filter_map(ElementRef::wrap).map(Element::from_ref).collect()
    }

    /// Selects descendant elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`RecitalError::HtmlParseError`] if the selector is invalid.
    pub fn select(&self, selector: &str) -> Result<Vec<Element<'a>>> {
        let sel = parse_selector(selector)?;
        Ok(self.element.select(&sel).map(Element::from_ref).collect())
    }

    /// Whether two wrappers point at the same node.
    pub fn same_node(&self, other: &Element<'_>) -> bool {
        self.element.id() == other.element.id()
    }
}
