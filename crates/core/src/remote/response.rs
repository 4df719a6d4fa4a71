//! Recovery of an article record from free-form model output and service replies.

use serde::Deserialize;

use crate::article::{ArticleRecord, PageContext};
use crate::{RecitalError, Result};

/// Fields a producer may send. Everything but `content` is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawArticle {
    pub title: Option<String>,
    pub byline: Option<String>,
    pub content: Option<String>,
    pub text_content: Option<String>,
    pub site_name: Option<String>,
    pub url: Option<String>,
}

impl RawArticle {
    /// Normalizes into a record; `textContent` is recomputed from `content`.
    ///
    /// When `content` is missing but `textContent` is present, the text is used as content.
    pub fn into_record(self, page: &PageContext) -> ArticleRecord {
        let content = self.content.filter(|c| !c.trim().is_empty()).or(self.text_content).unwrap_or_default();
        let title = self
            .title
            .filter(|t| !t.trim().is_empty())
            .or_else(|| page.title_hint.clone())
            .unwrap_or_default();
        let url = self.url.filter(|u| !u.is_empty()).unwrap_or_else(|| page.url.clone());
        ArticleRecord::new(title, self.byline, content, self.site_name, url)
    }
}

/// Service reply envelope.
///
/// `{ success, article }` and `{ success: false, error }` are the current shape;
/// a bare `{ url, title, content }` object is the legacy one.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ServiceReply {
    Envelope {
        success: bool,
        #[serde(default)]
        article: Option<RawArticle>,
        #[serde(default)]
        error: Option<String>,
    },
    Legacy(RawArticle),
}

/// Finds the JSON object inside model output.
///
/// A fenced block tagged `json` wins; otherwise the first balanced `{...}` span
/// is taken, skipping braces inside string literals.
pub fn locate_json(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let body = &text[start + "```json".len()..];
        if let Some(end) = body.find("```") {
            let block = body[..end].trim();
            if !block.is_empty() {
                return Some(block);
            }
        }
    }
    balanced_object(text)
}

fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parses model output into a record.
pub fn parse_model_output(text: &str, page: &PageContext) -> Result<ArticleRecord> {
    let json = locate_json(text)
        .ok_or_else(|| RecitalError::RemoteResponseUnparsable("no JSON object in model output".to_string()))?;
    let raw: RawArticle = serde_json::from_str(json)
        .map_err(|e| RecitalError::RemoteResponseUnparsable(format!("invalid article JSON: {}", e)))?;
    Ok(raw.into_record(page))
}

/// Parses an extraction service reply body.
pub fn parse_service_reply(body: &str, page: &PageContext) -> Result<ArticleRecord> {
    let reply: ServiceReply = serde_json::from_str(body)
        .map_err(|e| RecitalError::RemoteResponseUnparsable(format!("invalid service reply: {}", e)))?;

    match reply {
        ServiceReply::Envelope { success: true, article: Some(article), .. } => Ok(article.into_record(page)),
        ServiceReply::Envelope { success: true, article: None, .. } => {
            Err(RecitalError::RemoteResponseUnparsable("reply has no article".to_string()))
        }
        ServiceReply::Envelope { success: false, error, .. } => Err(RecitalError::RemoteRequestFailed {
            status: None,
            message: error.unwrap_or_else(|| "service reported failure".to_string()),
        }),
        ServiceReply::Legacy(article) if article.content.is_some() => Ok(article.into_record(page)),
        ServiceReply::Legacy(_) => Err(RecitalError::RemoteResponseUnparsable("reply has no content".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn page() -> PageContext {
        PageContext::new("https://example.com/a", "", Some("Tab Title".into()))
    }

    #[rstest]
    #[case("Here you go:\n```json\n{\"title\": \"A\"}\n```\nDone.", "{\"title\": \"A\"}")]
    #[case("prefix {\"a\": {\"b\": 1}} suffix {\"c\": 2}", "{\"a\": {\"b\": 1}}")]
    #[case(r#"{"content": "a } inside \" quotes {"}"#, r#"{"content": "a } inside \" quotes {"}"#)]
    fn test_locate_json(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(locate_json(text), Some(expected));
    }

    #[test]
    fn test_locate_json_none() {
        assert_eq!(locate_json("no json here"), None);
        assert_eq!(locate_json("{ unbalanced"), None);
    }

    #[test]
    fn test_model_output_defaults() {
        let text = "```json\n{\"content\": \"<p>Body text.</p>\"}\n```";
        let record = parse_model_output(text, &page()).unwrap();
        assert_eq!(record.title, "Tab Title");
        assert_eq!(record.byline, None);
        assert_eq!(record.site_name, None);
        assert_eq!(record.text_content, "Body text.\n");
        assert_eq!(record.url, "https://example.com/a");
    }

    #[test]
    fn test_model_output_unparsable() {
        let result = parse_model_output("{\"title\": oops}", &page());
        assert!(matches!(result, Err(RecitalError::RemoteResponseUnparsable(_))));
    }

    #[test]
    fn test_text_content_used_when_content_missing() {
        let record = parse_model_output(r#"{"title": "T", "textContent": "Plain words."}"#, &page()).unwrap();
        assert_eq!(record.content, "Plain words.");
        assert_eq!(record.text_content, "Plain words.\n");
    }

    #[test]
    fn test_service_reply_shapes() {
        let ok = r#"{"success": true, "article": {"title": "T", "content": "<p>Hi there.</p>", "siteName": "Ex"}}"#;
        let record = parse_service_reply(ok, &page()).unwrap();
        assert_eq!(record.site_name.as_deref(), Some("Ex"));

        let failed = r#"{"success": false, "error": "Gemini API key is not configured"}"#;
        match parse_service_reply(failed, &page()) {
            Err(RecitalError::RemoteRequestFailed { status: None, message }) => assert!(message.contains("API key")),
            other => panic!("unexpected: {other:?}"),
        }

        let legacy = r##"{"url": "https://example.com/a", "title": "Legacy", "content": "# Head\n\nBody."}"##;
        let record = parse_service_reply(legacy, &page()).unwrap();
        assert_eq!(record.title, "Legacy");
        assert_eq!(record.text_content, "Head\nBody.\n");

        assert!(matches!(parse_service_reply("[]", &page()), Err(RecitalError::RemoteResponseUnparsable(_))));
    }
}
