//! Word highlighting over a rendered article.
//!
//! A [`HighlightSurface`] exposes the rendered text as an ordered list of text
//! nodes. [`HighlightRenderer`] resolves an absolute char offset to one node,
//! decorates the word there, and keeps at most one decoration alive.

use crate::RecitalError;
use crate::article::text_segments;

/// A char range inside one text node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRange {
    pub node: usize,
    /// Char offset within the node, inclusive.
    pub start: usize,
    /// Char offset within the node, exclusive.
    pub end: usize,
}

/// The live decoration on the current word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightHandle {
    pub id: u64,
    pub range: NodeRange,
    /// Absolute char offset the highlight was requested for.
    pub offset: usize,
    pub length: usize,
}

/// Rendered text that can be decorated.
pub trait HighlightSurface: Send {
    fn node_count(&self) -> usize;

    fn node_text(&self, node: usize) -> &str;

    /// Wraps `range` in the highlight marker.
    fn decorate(&mut self, range: NodeRange);

    /// Removes the marker around `range`.
    fn undecorate(&mut self, range: NodeRange);

    /// Scrolls so that `range` sits at the vertical center of the view.
    fn scroll_to_center(&mut self, range: NodeRange);
}

/// Places and retires the single highlight on a surface.
pub struct HighlightRenderer<S: HighlightSurface> {
    surface: S,
    current: Option<HighlightHandle>,
    next_id: u64,
}

impl<S: HighlightSurface> HighlightRenderer<S> {
    pub fn new(surface: S) -> Self {
        Self { surface, current: None, next_id: 1 }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Swaps in a new surface, clearing any highlight on the old one.
    pub fn replace_surface(&mut self, surface: S) -> S {
        self.clear_current();
        std::mem::replace(&mut self.surface, surface)
    }

    pub fn current(&self) -> Option<&HighlightHandle> {
        self.current.as_ref()
    }

    /// Highlights `length` chars at absolute `offset`.
    ///
    /// The previous highlight is cleared first. A range running past the end of
    /// its text node is clamped to the node. An empty range, or an offset outside
    /// every node, is a no-op that returns `None`.
    pub fn highlight(&mut self, offset: usize, length: usize) -> Option<HighlightHandle> {
        self.clear_current();

        let Some(range) = self.locate(offset, length) else {
            let err = RecitalError::HighlightDesync { offset };
            tracing::debug!(error = %err, "highlight skipped");
            return None;
        };

        self.surface.decorate(range);
        self.surface.scroll_to_center(range);

        let handle = HighlightHandle { id: self.next_id, range, offset, length };
        self.next_id += 1;
        self.current = Some(handle.clone());
        Some(handle)
    }

    /// Removes `handle` if it is still the live highlight.
    pub fn clear(&mut self, handle: &HighlightHandle) {
        if self.current.as_ref().is_some_and(|c| c.id == handle.id) {
            self.clear_current();
        }
    }

    pub fn clear_current(&mut self) {
        if let Some(handle) = self.current.take() {
            self.surface.undecorate(handle.range);
        }
    }

    fn locate(&self, offset: usize, length: usize) -> Option<NodeRange> {
        let mut running = 0;
        for node in 0..self.surface.node_count() {
            let node_len = self.surface.node_text(node).chars().count();
            if offset < running + node_len {
                let start = offset - running;
                let end = start.saturating_add(length).min(node_len);
                return (end > start).then_some(NodeRange { node, start, end });
            }
            running += node_len;
        }
        None
    }
}

/// In-memory surface made of text segments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBuffer {
    segments: Vec<String>,
    marked: Option<NodeRange>,
    centered: Option<usize>,
}

impl TextBuffer {
    /// One node per line of `text`, newlines kept.
    pub fn from_text(text: &str) -> Self {
        Self::from_segments(text.split_inclusive('\n').map(str::to_string).collect())
    }

    /// Text nodes of article content (HTML or Markdown), in reading order.
    pub fn from_html(content: &str) -> Self {
        Self::from_segments(text_segments(content))
    }

    pub fn from_segments(segments: Vec<String>) -> Self {
        Self { segments, marked: None, centered: None }
    }

    /// The full text, equal to the concatenated nodes.
    pub fn text(&self) -> String {
        self.segments.concat()
    }

    pub fn marked(&self) -> Option<NodeRange> {
        self.marked
    }

    /// Node last scrolled to the center.
    pub fn centered_node(&self) -> Option<usize> {
        self.centered
    }

    /// The marked text, if any.
    pub fn marked_text(&self) -> Option<String> {
        let range = self.marked?;
        Some(self.segments[range.node].chars().skip(range.start).take(range.end - range.start).collect())
    }

    /// The full text with the marked range wrapped in `open` and `close`.
    pub fn render(&self, open: &str, close: &str) -> String {
        let mut out = String::new();
        for (i, segment) in self.segments.iter().enumerate() {
            match self.marked {
                Some(range) if range.node == i => {
                    for (j, c) in segment.chars().enumerate() {
                        if j == range.start {
                            out.push_str(open);
                        }
                        out.push(c);
                        if j + 1 == range.end {
                            out.push_str(close);
                        }
                    }
                }
                _ => out.push_str(segment),
            }
        }
        out
    }
}

impl HighlightSurface for TextBuffer {
    fn node_count(&self) -> usize {
        self.segments.len()
    }

    fn node_text(&self, node: usize) -> &str {
        &self.segments[node]
    }

    fn decorate(&mut self, range: NodeRange) {
        self.marked = Some(range);
    }

    fn undecorate(&mut self, range: NodeRange) {
        if self.marked == Some(range) {
            self.marked = None;
        }
    }

    fn scroll_to_center(&mut self, range: NodeRange) {
        self.centered = Some(range.node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_across_nodes() {
        let mut renderer = HighlightRenderer::new(TextBuffer::from_html("<p>Hello <b>world</b>.</p><p>Next line</p>"));
        let handle = renderer.highlight(6, 5).unwrap();
        assert_eq!(handle.range, NodeRange { node: 1, start: 0, end: 5 });
        assert_eq!(renderer.surface().marked_text().as_deref(), Some("world"));
        assert_eq!(renderer.surface().render("[", "]"), "Hello [world].\nNext line\n");
        assert_eq!(renderer.surface().centered_node(), Some(1));
    }

    #[test]
    fn test_clamps_to_node_end() {
        let mut renderer = HighlightRenderer::new(TextBuffer::from_segments(vec!["abc".into(), "defgh".into()]));
        let handle = renderer.highlight(1, 10).unwrap();
        assert_eq!(handle.range, NodeRange { node: 0, start: 1, end: 3 });
    }

    #[test]
    fn test_out_of_range_is_noop() {
        let mut renderer = HighlightRenderer::new(TextBuffer::from_text("0123456789"));
        assert!(renderer.highlight(50, 4).is_none());
        assert!(renderer.current().is_none());
        assert_eq!(renderer.surface().marked(), None);
    }

    #[test]
    fn test_huge_length_clamps_without_overflow() {
        let mut renderer = HighlightRenderer::new(TextBuffer::from_text("abc def"));
        let handle = renderer.highlight(4, usize::MAX).unwrap();
        assert_eq!(handle.range, NodeRange { node: 0, start: 4, end: 7 });
        assert_eq!(renderer.surface().render("[", "]"), "abc [def]");
    }

    #[test]
    fn test_empty_range_is_noop() {
        let mut renderer = HighlightRenderer::new(TextBuffer::from_text("abc def"));
        renderer.highlight(0, 3).unwrap();
        assert!(renderer.highlight(4, 0).is_none());
        assert!(renderer.current().is_none());
        assert_eq!(renderer.surface().render("[", "]"), "abc def");
    }

    #[test]
    fn test_single_live_highlight() {
        let mut renderer = HighlightRenderer::new(TextBuffer::from_text("one two three"));
        let first = renderer.highlight(0, 3).unwrap();
        let second = renderer.highlight(4, 3).unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(renderer.surface().marked_text().as_deref(), Some("two"));

        renderer.clear(&first);
        assert!(renderer.current().is_some());
        renderer.clear(&second);
        assert!(renderer.current().is_none());
        assert_eq!(renderer.surface().render("[", "]"), "one two three");
    }

    #[test]
    fn test_multibyte_offsets() {
        let mut renderer = HighlightRenderer::new(TextBuffer::from_text("Café au lait"));
        renderer.highlight(5, 2).unwrap();
        assert_eq!(renderer.surface().render("<", ">"), "Café <au> lait");
    }
}
