use regex::{NoExpand, Regex, RegexBuilder};

use crate::buffer::DocumentBuffer;

/// One occurrence of the query, in chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    pub offset: usize,
    pub length: usize,
}

impl SearchMatch {
    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

/// Find/replace state for the active buffer.
#[derive(Debug, Default)]
pub struct SearchEngine {
    query: String,
    case_sensitive: bool,
    matches: Vec<SearchMatch>,
    current: Option<usize>,
}

/// The query is always literal; regex syntax in it is escaped.
fn literal_pattern(query: &str, case_sensitive: bool) -> Option<Regex> {
    match RegexBuilder::new(&regex::escape(query))
        .case_insensitive(!case_sensitive)
        .build()
    {
        Ok(re) => Some(re),
        Err(e) => {
            log::warn!("Could not build search pattern for {:?}: {}", query, e);
            None
        }
    }
}

/// All non-overlapping occurrences of `query` in `text`, ascending.
pub fn find_matches(text: &str, query: &str, case_sensitive: bool) -> Vec<SearchMatch> {
    if query.is_empty() {
        return Vec::new();
    }
    let Some(re) = literal_pattern(query, case_sensitive) else {
        return Vec::new();
    };

    let length = query.chars().count();
    let mut matches = Vec::new();
    let mut byte_pos = 0;
    let mut char_pos = 0;
    for m in re.find_iter(text) {
        char_pos += text[byte_pos..m.start()].chars().count();
        byte_pos = m.start();
        matches.push(SearchMatch {
            offset: char_pos,
            length,
        });
    }
    matches
}

/// Index of the match starting closest to `cursor`; the first one wins ties.
fn closest_to(matches: &[SearchMatch], cursor: usize) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (index, m) in matches.iter().enumerate() {
        let distance = m.offset.abs_diff(cursor);
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((index, distance)),
        }
    }
    best.map(|(index, _)| index)
}

impl SearchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn set_case_sensitive(&mut self, case_sensitive: bool) {
        self.case_sensitive = case_sensitive;
    }

    pub fn matches(&self) -> &[SearchMatch] {
        &self.matches
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_match(&self) -> Option<SearchMatch> {
        self.current.and_then(|i| self.matches.get(i).copied())
    }

    pub fn is_active(&self) -> bool {
        !self.query.is_empty()
    }

    /// Fresh search: store the query and pick the match nearest `cursor`.
    pub fn search(&mut self, text: &str, query: &str, case_sensitive: bool, cursor: usize) -> &[SearchMatch] {
        self.query = query.to_string();
        self.case_sensitive = case_sensitive;
        self.refresh(text, cursor);
        &self.matches
    }

    /// Re-run the stored query against changed text.
    pub fn refresh(&mut self, text: &str, cursor: usize) {
        self.matches = find_matches(text, &self.query, self.case_sensitive);
        self.current = closest_to(&self.matches, cursor);
    }

    pub fn clear(&mut self) {
        self.query.clear();
        self.matches.clear();
        self.current = None;
    }

    pub fn next(&mut self) -> Option<SearchMatch> {
        if self.matches.is_empty() {
            return None;
        }
        let len = self.matches.len();
        self.current = Some(self.current.map_or(0, |i| (i + 1) % len));
        self.current_match()
    }

    pub fn prev(&mut self) -> Option<SearchMatch> {
        if self.matches.is_empty() {
            return None;
        }
        let len = self.matches.len();
        self.current = Some(match self.current {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        });
        self.current_match()
    }

    /// Select the current match in the buffer and scroll it into view.
    pub fn select_current(&self, buffer: &mut DocumentBuffer) -> bool {
        match self.current_match() {
            Some(m) => {
                buffer.set_selection(m.offset, m.end());
                buffer.scroll_to_char(m.offset);
                true
            }
            None => false,
        }
    }

    /// Replace the current match, then search again from scratch and move to
    /// the first match after the inserted text (wrapping).
    pub fn replace_one(&mut self, buffer: &mut DocumentBuffer, replacement: &str) -> bool {
        let Some(current) = self.current_match() else {
            return false;
        };
        buffer.replace_range(current.offset, current.end(), replacement);
        let resume = current.offset + replacement.chars().count();
        buffer.set_cursor(resume);

        let text = buffer.content();
        self.matches = find_matches(&text, &self.query, self.case_sensitive);
        self.current = if self.matches.is_empty() {
            None
        } else {
            Some(
                self.matches
                    .iter()
                    .position(|m| m.offset >= resume)
                    .unwrap_or(0),
            )
        };
        self.select_current(buffer);
        true
    }

    /// Replace every occurrence in one pass. The selection keeps its absolute
    /// offsets. Returns the number of replacements.
    pub fn replace_all(&mut self, buffer: &mut DocumentBuffer, replacement: &str) -> usize {
        if self.query.is_empty() {
            return 0;
        }
        let Some(re) = literal_pattern(&self.query, self.case_sensitive) else {
            return 0;
        };
        let text = buffer.content();
        let count = re.find_iter(&text).count();
        if count == 0 {
            return 0;
        }
        let replaced = re.replace_all(&text, NoExpand(replacement));
        buffer.replace_content_keep_selection(&replaced);
        let updated = buffer.content();
        self.refresh(&updated, buffer.cursor());
        count
    }

    /// `"2 of 5"`, or `"No results"`.
    pub fn status_label(&self) -> String {
        match self.current {
            Some(i) if !self.matches.is_empty() => format!("{} of {}", i + 1, self.matches.len()),
            _ => "No results".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offsets(matches: &[SearchMatch]) -> Vec<usize> {
        matches.iter().map(|m| m.offset).collect()
    }

    #[test]
    fn test_overlapping_query_yields_disjoint_matches() {
        let mut engine = SearchEngine::new();
        let found = engine.search("ababab", "ab", false, 0);
        assert_eq!(offsets(found), vec![0, 2, 4]);
        assert!(found.iter().all(|m| m.length == 2));

        assert_eq!(engine.current_index(), Some(0));
        engine.next();
        assert_eq!(engine.current_index(), Some(1));
        engine.next();
        assert_eq!(engine.current_index(), Some(2));
        engine.next();
        assert_eq!(engine.current_index(), Some(0));
    }

    #[test]
    fn test_prev_wraps_backwards() {
        let mut engine = SearchEngine::new();
        engine.search("ababab", "ab", false, 0);
        assert_eq!(engine.prev().map(|m| m.offset), Some(4));
        assert_eq!(engine.prev().map(|m| m.offset), Some(2));
    }

    #[test]
    fn test_case_sensitivity() {
        assert_eq!(find_matches("Foo foo FOO", "foo", false).len(), 3);
        assert_eq!(offsets(&find_matches("Foo foo FOO", "foo", true)), vec![4]);
    }

    #[test]
    fn test_query_is_literal() {
        assert_eq!(offsets(&find_matches("a.b axb", "a.b", false)), vec![0]);
        assert_eq!(offsets(&find_matches("(x) x", "(x)", false)), vec![0]);
        assert!(find_matches("abc", "[a-z]", false).is_empty());
    }

    #[test]
    fn test_empty_query_resets() {
        let mut engine = SearchEngine::new();
        engine.search("abc", "b", false, 0);
        assert_eq!(engine.current_index(), Some(0));
        engine.search("abc", "", false, 0);
        assert!(engine.matches().is_empty());
        assert_eq!(engine.current_index(), None);
        assert!(engine.next().is_none());
        assert_eq!(engine.status_label(), "No results");
    }

    #[test]
    fn test_initial_match_is_closest_to_cursor() {
        let mut engine = SearchEngine::new();
        engine.search("ab ab ab ab", "ab", false, 7);
        assert_eq!(engine.current_match().map(|m| m.offset), Some(6));
        assert_eq!(engine.status_label(), "3 of 4");

        // Equal distance: the earlier match wins.
        engine.search("ab__ab", "ab", false, 2);
        assert_eq!(engine.current_index(), Some(0));
    }

    #[test]
    fn test_offsets_are_chars() {
        assert_eq!(offsets(&find_matches("éa éa", "a", false)), vec![1, 4]);
        assert_eq!(offsets(&find_matches("日本語と日本", "日本", false)), vec![0, 4]);
    }

    #[test]
    fn test_replace_all_keeps_cursor_offset() {
        let mut buffer = DocumentBuffer::from_text("foo bar foo");
        buffer.set_cursor(9);
        let mut engine = SearchEngine::new();
        engine.search(&buffer.content(), "foo", false, buffer.cursor());

        assert_eq!(engine.replace_all(&mut buffer, "baz"), 2);
        assert_eq!(buffer.content(), "baz bar baz");
        assert_eq!(buffer.cursor(), 9);
        assert_eq!(engine.matches().len(), 0);
    }

    #[test]
    fn test_replace_all_is_literal() {
        let mut buffer = DocumentBuffer::from_text("cost: 5");
        let mut engine = SearchEngine::new();
        engine.search(&buffer.content(), "5", false, 0);
        engine.replace_all(&mut buffer, "$1 ${0}");
        assert_eq!(buffer.content(), "cost: $1 ${0}");
    }

    #[test]
    fn test_replace_one_advances() {
        let mut buffer = DocumentBuffer::from_text("cat cat cat");
        let mut engine = SearchEngine::new();
        engine.search(&buffer.content(), "cat", false, 0);

        assert!(engine.replace_one(&mut buffer, "dog"));
        assert_eq!(buffer.content(), "dog cat cat");
        assert_eq!(offsets(engine.matches()), vec![4, 8]);
        assert_eq!(engine.current_index(), Some(0));
        assert_eq!(buffer.selection(), (4, 7));

        engine.next();
        assert!(engine.replace_one(&mut buffer, "dog"));
        assert_eq!(buffer.content(), "dog cat dog");
        // Nothing after the edit: wrap to the first remaining match.
        assert_eq!(engine.current_match().map(|m| m.offset), Some(4));
    }

    #[test]
    fn test_replace_one_with_text_containing_query() {
        let mut buffer = DocumentBuffer::from_text("a a");
        let mut engine = SearchEngine::new();
        engine.search(&buffer.content(), "a", false, 0);
        engine.replace_one(&mut buffer, "aa");
        assert_eq!(buffer.content(), "aa a");
        assert_eq!(engine.current_match().map(|m| m.offset), Some(3));
    }

    #[test]
    fn test_replace_without_match_is_noop() {
        let mut buffer = DocumentBuffer::from_text("nothing here");
        let mut engine = SearchEngine::new();
        engine.search(&buffer.content(), "zzz", false, 0);
        assert!(!engine.replace_one(&mut buffer, "x"));
        assert_eq!(engine.replace_all(&mut buffer, "x"), 0);
        assert_eq!(buffer.content(), "nothing here");
    }

    #[test]
    fn test_select_current_scrolls() {
        let mut buffer = DocumentBuffer::from_text("one\ntwo\nneedle");
        let mut engine = SearchEngine::new();
        engine.search(&buffer.content(), "needle", false, 0);
        assert!(engine.select_current(&mut buffer));
        assert_eq!(buffer.selection(), (8, 14));
        assert_eq!(buffer.scroll_line(), 2);
    }
}
