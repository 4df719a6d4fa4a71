//! Spoken-word index to character offset mapping.
//!
//! Speech engines report boundaries as "the next word starts"; the table built
//! here turns the running word count into a char offset and length in the
//! rendered text. Offsets and lengths count chars, not bytes.
//!
//! # Example
//!
//! ```rust
//! use recital_core::wordmap::WordTable;
//!
//! let table = WordTable::build("Hello, world! This is Reader Mode.");
//! let reader = table.get(4).unwrap();
//! assert_eq!((reader.normalized_word.as_str(), reader.start_offset, reader.length), ("reader", 22, 6));
//! ```

use serde::Serialize;

/// Punctuation that always separates words, even without surrounding spaces.
const SEPARATORS: &[char] = &['.', ',', '!', '?', ';', ':'];

/// Chars after which the next word opens a new sentence.
const SENTENCE_BREAKS: &[char] = &['.', '!', '?', '\n'];

/// One spoken word located in the source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordPositionEntry {
    pub normalized_word: String,
    /// Char offset of the first char of the word.
    pub start_offset: usize,
    /// Length of the word in chars.
    pub length: usize,
}

impl WordPositionEntry {
    pub fn end_offset(&self) -> usize {
        self.start_offset + self.length
    }
}

/// Immutable word position table for one text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordTable {
    entries: Vec<WordPositionEntry>,
    sentence_starts: Vec<bool>,
}

impl WordTable {
    /// Builds the table for `text`. Deterministic and pure.
    pub fn build(text: &str) -> Self {
        let entries = build_table(text);
        let chars: Vec<char> = text.chars().collect();

        let sentence_starts = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| match i.checked_sub(1).map(|p| &entries[p]) {
                None => true,
                Some(prev) => chars[prev.end_offset()..entry.start_offset].iter().any(|c| SENTENCE_BREAKS.contains(c)),
            })
            .collect();

        Self { entries, sentence_starts }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&WordPositionEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[WordPositionEntry] {
        &self.entries
    }

    /// Index of the entry whose span contains `offset`.
    pub fn entry_containing(&self, offset: usize) -> Option<usize> {
        let index = self.entries.partition_point(|e| e.start_offset <= offset).checked_sub(1)?;
        (offset < self.entries[index].end_offset()).then_some(index)
    }

    /// Index of the entry containing `offset`, or else the first one after it.
    pub fn index_at_or_after(&self, offset: usize) -> Option<usize> {
        let index = self.entries.partition_point(|e| e.end_offset() <= offset);
        (index < self.entries.len()).then_some(index)
    }

    /// Index of the first word of the sentence holding word `index`.
    ///
    /// Indexes past the end resolve against the last word.
    pub fn sentence_start_index(&self, index: usize) -> usize {
        if self.entries.is_empty() {
            return 0;
        }
        let index = index.min(self.entries.len() - 1);
        (0..=index).rev().find(|&i| self.sentence_starts[i]).unwrap_or(0)
    }
}

/// Builds the ordered word entries for `text`.
///
/// Separator punctuation is padded with spaces before splitting, tokens are
/// trimmed of non-alphanumeric edges and lowercased, and each is searched for
/// from the end of the previous match. Tokens that cannot be found are skipped.
pub fn build_table(text: &str) -> Vec<WordPositionEntry> {
    let haystack: Vec<char> = text.chars().map(fold_char).collect();

    let mut padded = String::with_capacity(text.len() + text.len() / 4);
    for c in text.chars() {
        if SEPARATORS.contains(&c) {
            padded.push(' ');
            padded.push(c);
            padded.push(' ');
        } else {
            padded.push(c);
        }
    }

    let mut entries = Vec::new();
    let mut cursor = 0;

    for token in padded.split_whitespace() {
        let word: Vec<char> = token.trim_matches(|c: char| !c.is_alphanumeric()).chars().map(fold_char).collect();
        if word.is_empty() {
            continue;
        }

        if let Some(start) = find_from(&haystack, &word, cursor) {
            entries.push(WordPositionEntry {
                normalized_word: word.iter().collect(),
                start_offset: start,
                length: word.len(),
            });
            cursor = start + word.len();
        }
    }

    entries
}

/// Lowercases one char without changing the char count.
fn fold_char(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

fn find_from(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if from >= haystack.len() || needle.len() > haystack.len() - from {
        return None;
    }
    haystack[from..].windows(needle.len()).position(|w| w == needle).map(|p| p + from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn words(text: &str) -> Vec<(String, usize, usize)> {
        build_table(text).into_iter().map(|e| (e.normalized_word, e.start_offset, e.length)).collect()
    }

    #[test]
    fn test_reader_mode_sentence() {
        let table = WordTable::build("Hello, world! This is Reader Mode.");
        let get = |i| table.get(i).map(|e| (e.normalized_word.as_str(), e.start_offset, e.length));
        assert_eq!(table.len(), 6);
        assert_eq!(get(0), Some(("hello", 0, 5)));
        assert_eq!(get(1), Some(("world", 7, 5)));
        assert_eq!(get(4), Some(("reader", 22, 6)));
    }

    #[rstest]
    #[case("Hello, world! This is Reader Mode.")]
    #[case("  Leading spaces;and:glued,punctuation!  ")]
    #[case("Crème brûlée, naïve café. ΣΊΣΥΦΟΣ wrote it.")]
    #[case("Quotes \"inside\" (parens) and dashes - here -- there.")]
    #[case("Line one\nLine two\n\nLine three")]
    fn test_entries_match_source(#[case] text: &str) {
        let chars: Vec<char> = text.chars().collect();
        let entries = build_table(text);
        assert!(!entries.is_empty());

        for pair in entries.windows(2) {
            assert!(pair[0].start_offset <= pair[1].start_offset);
        }
        for entry in &entries {
            let slice: String = chars[entry.start_offset..entry.end_offset()].iter().map(|c| fold_char(*c)).collect();
            assert_eq!(slice, entry.normalized_word);
        }
    }

    #[test]
    fn test_repeated_words_advance() {
        assert_eq!(words("the cat and the hat"), vec![
            ("the".into(), 0, 3),
            ("cat".into(), 4, 3),
            ("and".into(), 8, 3),
            ("the".into(), 12, 3),
            ("hat".into(), 16, 3),
        ]);
    }

    #[test]
    fn test_glued_punctuation_splits() {
        let found: Vec<String> = words("one,two;three").into_iter().map(|w| w.0).collect();
        assert_eq!(found, ["one", "two", "three"]);
    }

    #[test]
    fn test_punctuation_only_tokens_are_skipped() {
        assert!(build_table("... --- !!!").is_empty());
        assert!(build_table("").is_empty());
    }

    #[test]
    fn test_offset_lookups() {
        let table = WordTable::build("Hello, world! This is Reader Mode.");
        assert_eq!(table.entry_containing(8), Some(1));
        assert_eq!(table.entry_containing(5), None);
        assert_eq!(table.index_at_or_after(5), Some(1));
        assert_eq!(table.index_at_or_after(0), Some(0));
        assert_eq!(table.index_at_or_after(33), None);
    }

    #[test]
    fn test_sentence_starts() {
        let table = WordTable::build("First sentence here. Second one follows! Third\nline");
        assert_eq!(table.sentence_start_index(2), 0);
        assert_eq!(table.sentence_start_index(4), 3);
        assert_eq!(table.sentence_start_index(6), 6);
        assert_eq!(table.sentence_start_index(99), 7);
        assert_eq!(WordTable::default().sentence_start_index(3), 0);
    }
}
