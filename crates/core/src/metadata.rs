use serde_json::Value;

use crate::Document;

/// Page-level metadata shared by every heuristic tier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub byline: Option<String>,
    pub site_name: Option<String>,
}

/// Selectors that mark up an author explicitly, in priority order.
const BYLINE_SELECTORS: &[&str] = &[
    "[rel=\"author\"]",
    "[itemprop=\"author\"] [itemprop=\"name\"]",
    "[itemprop=\"author\"]",
    ".byline",
    ".author",
];

impl Document {
    /// Title with priority fallback:
    /// 1. Open Graph `og:title`
    /// 2. JSON-LD `headline`
    /// 3. Twitter `twitter:title`
    /// 4. `<title>` element
    /// 5. First `<h1>` element
    pub fn extract_title(&self) -> Option<String> {
        self.get_meta_content("og:title")
            .or_else(|| self.json_ld_str("headline"))
            .or_else(|| self.get_meta_content("twitter:title"))
            .or_else(|| self.title())
            .or_else(|| self.first_text("h1"))
    }

    /// Byline with priority fallback:
    /// 1. Explicit author markup (`rel=author`, `itemprop=author`, `.byline`, `.author`)
    /// 2. JSON-LD `author` (string, object, or array)
    /// 3. Meta `author` / `article:author`
    pub fn extract_byline(&self) -> Option<String> {
        BYLINE_SELECTORS
            .iter()
            .find_map(|selector| {
                self.select(selector)
                    .ok()?
                    .iter()
                    .map(|el| el.normalized_text())
                    .find(|text| !text.is_empty() && text.chars().count() < 100)
            })
            .or_else(|| {
                self.json_ld_objects()
                    .iter()
                    .find_map(|obj| obj.get("author").and_then(author_from_json_ld))
            })
            .or_else(|| self.get_meta_content("author"))
            .or_else(|| self.get_meta_content("article:author"))
    }

    /// Site name with priority fallback:
    /// 1. Open Graph `og:site_name`
    /// 2. JSON-LD `publisher.name`
    /// 3. Host of the page URL
    pub fn extract_site_name(&self) -> Option<String> {
        self.get_meta_content("og:site_name")
            .or_else(|| {
                self.json_ld_objects().iter().find_map(|obj| {
                    obj.get("publisher")
                        .and_then(|p| p.get("name"))
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
            })
            .or_else(|| self.host())
    }

    pub fn extract_metadata(&self) -> PageMetadata {
        PageMetadata {
            title: self.extract_title(),
            byline: self.extract_byline(),
            site_name: self.extract_site_name(),
        }
    }

    /// Trimmed, non-empty text of the first match.
    pub(crate) fn first_text(&self, selector: &str) -> Option<String> {
        let text = self.select_first(selector)?.normalized_text();
        (!text.is_empty()).then_some(text)
    }

    /// Meta tag content by `name` or `property`.
    fn get_meta_content(&self, attr: &str) -> Option<String> {
        ["name", "property"].iter().find_map(|key| {
            let el = self.select_first(&format!("meta[{}=\"{}\"]", key, attr))?;
            let content = el.attr("content")?.trim();
            (!content.is_empty()).then(|| content.to_string())
        })
    }

    /// Every JSON-LD object on the page, flattening top-level arrays and `@graph`.
    fn json_ld_objects(&self) -> Vec<Value> {
        let mut objects = Vec::new();
        for el in self.select("script[type=\"application/ld+json\"]").unwrap_or_default() {
            let Ok(value) = serde_json::from_str::<Value>(el.text().trim()) else { continue };
            match value {
                Value::Array(items) => objects.extend(items),
                Value::Object(ref map) if map.contains_key("@graph") => {
                    if let Some(Value::Array(items)) = map.get("@graph") {
                        objects.extend(items.iter().cloned());
                    }
                }
                other => objects.push(other),
            }
        }
        objects
    }

    fn json_ld_str(&self, key: &str) -> Option<String> {
        self.json_ld_objects()
            .iter()
            .find_map(|obj| obj.get(key).and_then(Value::as_str).map(str::to_string))
    }
}

/// Author name from a JSON-LD `author` field in string, object, or array form.
fn author_from_json_ld(author: &Value) -> Option<String> {
    match author {
        Value::String(name) => Some(name.clone()),
        Value::Object(obj) => obj.get("name").and_then(Value::as_str).map(str::to_string),
        Value::Array(items) => items.iter().find_map(author_from_json_ld),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    const HTML_WITH_META: &str = r#"
        <!DOCTYPE html>
        <html lang="en">
        <head>
            <title>Test Page Title</title>
            <meta name="author" content="Meta Author">
            <meta property="og:site_name" content="Example Site">
            <script type="application/ld+json">
                {"@context": "https://schema.org", "@graph": [
                    {"@type": "NewsArticle", "headline": "JSON-LD Headline", "author": [{"@type": "Person", "name": "Ld Author"}]}
                ]}
            </script>
        </head>
        <body><h1>Heading</h1><p>Body</p></body>
        </html>
    "#;

    #[test]
    fn test_title_prefers_json_ld_over_title_tag() {
        let doc = Document::parse(HTML_WITH_META);
        assert_eq!(doc.extract_title(), Some("JSON-LD Headline".to_string()));
    }

    #[test]
    fn test_byline_json_ld_before_meta() {
        let doc = Document::parse(HTML_WITH_META);
        assert_eq!(doc.extract_byline(), Some("Ld Author".to_string()));
    }

    #[test]
    fn test_byline_explicit_markup_wins() {
        let html = HTML_WITH_META.replace("<h1>Heading</h1>", r#"<a rel="author" href="/p/ada">Ada  Lovelace</a>"#);
        let doc = Document::parse(&html);
        assert_eq!(doc.extract_byline(), Some("Ada Lovelace".to_string()));
    }

    #[test]
    fn test_byline_skips_empty_author_links() {
        let html = HTML_WITH_META
            .replace("<head>", r#"<head><link rel="author" href="/humans.txt">"#)
            .replace("<h1>Heading</h1>", r#"<a rel="author" href="/p/grace">Grace Hopper</a>"#);
        let doc = Document::parse(&html);
        assert_eq!(doc.extract_byline(), Some("Grace Hopper".to_string()));
    }

    #[test]
    fn test_byline_meta_fallback() {
        let doc = Document::parse(r#"<html><head><meta name="author" content="Meta Author"></head></html>"#);
        assert_eq!(doc.extract_byline(), Some("Meta Author".to_string()));
    }

    #[test]
    fn test_site_name_falls_back_to_host() {
        let doc = Document::parse("<html><body></body></html>")
            .with_base_url(Some(Url::parse("https://www.example.org/x").unwrap()));
        assert_eq!(doc.extract_site_name(), Some("example.org".to_string()));

        let doc = Document::parse(HTML_WITH_META);
        assert_eq!(doc.extract_site_name(), Some("Example Site".to_string()));
    }

    #[test]
    fn test_title_falls_back_to_h1() {
        let doc = Document::parse("<html><body><h1> Only Heading </h1></body></html>");
        assert_eq!(doc.extract_title(), Some("Only Heading".to_string()));
    }
}
