use crate::article::PageContext;
use crate::preprocess::strip_for_prompt;

/// Cleans `markup` and cuts it to at most `max_chars` chars.
pub fn build_excerpt(markup: &str, max_chars: usize) -> String {
    let stripped = strip_for_prompt(markup);
    match stripped.char_indices().nth(max_chars) {
        Some((cut, _)) => stripped[..cut].to_string(),
        None => stripped,
    }
}

/// Instructions plus the page excerpt, sent to a language model.
pub fn build_prompt(page: &PageContext, max_chars: usize) -> String {
    let excerpt = build_excerpt(&page.markup, max_chars);
    let url = if page.url.is_empty() { "Unknown" } else { page.url.as_str() };
    let title = page.title_hint.as_deref().unwrap_or("Unknown");

    format!(
        r#"You extract the main article from web pages.

Keep only the article: its title, its author if shown, and its body. Drop navigation,
menus, ads, footers, sidebars, comment threads, and related-article lists. Keep images that
belong to the article, with absolute URLs. Keep the body's HTML structure.

Reply with a single JSON object in a ```json code block, shaped like this:
{{
  "title": "The article title",
  "byline": "Author name, or null",
  "content": "The article body as HTML",
  "textContent": "The article body as plain text",
  "siteName": "The site name, or null"
}}

If the page holds no article, reply with {{"title": "", "content": "No article content found"}}.

URL: {url}
Title: {title}

HTML:
{excerpt}
"#
    )
}
