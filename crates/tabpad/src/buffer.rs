use ropey::Rope;
use std::cmp;

/// Live text of the active tab plus its selection and scroll position.
///
/// All offsets are char indices into the rope. `selection_start` doubles as
/// the caret.
#[derive(Clone, Debug, Default)]
pub struct DocumentBuffer {
    rope: Rope,
    selection_start: usize,
    selection_end: usize,
    scroll_line: usize,
}

impl DocumentBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            ..Self::default()
        }
    }

    /// Replace the whole text and reset selection and scroll.
    pub fn set_content(&mut self, content: &str) {
        self.rope = Rope::from_str(content);
        self.selection_start = 0;
        self.selection_end = 0;
        self.scroll_line = 0;
    }

    /// Replace the whole text but keep the selection at the same absolute
    /// offsets, clamped to the new length.
    pub fn replace_content_keep_selection(&mut self, content: &str) {
        let (start, end) = self.selection();
        self.rope = Rope::from_str(content);
        self.set_selection(start, end);
        self.scroll_line = cmp::min(self.scroll_line, self.rope.len_lines().saturating_sub(1));
    }

    pub fn content(&self) -> String {
        self.rope.to_string()
    }

    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    pub fn selection(&self) -> (usize, usize) {
        (self.selection_start, self.selection_end)
    }

    pub fn cursor(&self) -> usize {
        self.selection_start
    }

    /// Set the selection; offsets are clamped and ordered.
    pub fn set_selection(&mut self, start: usize, end: usize) {
        let len = self.rope.len_chars();
        let start = cmp::min(start, len);
        let end = cmp::min(end, len);
        self.selection_start = cmp::min(start, end);
        self.selection_end = cmp::max(start, end);
    }

    pub fn set_cursor(&mut self, offset: usize) {
        self.set_selection(offset, offset);
    }

    pub fn selected_text(&self) -> String {
        self.rope
            .slice(self.selection_start..self.selection_end)
            .to_string()
    }

    pub fn scroll_line(&self) -> usize {
        self.scroll_line
    }

    /// Scroll so the line holding `char_idx` is the first visible one.
    pub fn scroll_to_char(&mut self, char_idx: usize) {
        let idx = cmp::min(char_idx, self.rope.len_chars());
        self.scroll_line = self.rope.char_to_line(idx);
    }

    /// Insert `text` in place of the selection; the caret lands after it.
    pub fn insert(&mut self, text: &str) {
        let (start, end) = self.selection();
        self.replace_range(start, end, text);
        let caret = start + text.chars().count();
        self.set_cursor(caret);
    }

    /// Delete the selection, or the char before the caret when nothing is
    /// selected. Returns whether anything changed.
    pub fn delete_backward(&mut self) -> bool {
        let (start, end) = self.selection();
        if start != end {
            self.rope.remove(start..end);
            self.set_cursor(start);
            return true;
        }
        if start == 0 {
            return false;
        }
        self.rope.remove(start - 1..start);
        self.set_cursor(start - 1);
        true
    }

    /// Replace the chars in `start..end` with `text`. The selection is not
    /// touched beyond clamping.
    pub fn replace_range(&mut self, start: usize, end: usize, text: &str) {
        let len = self.rope.len_chars();
        let start = cmp::min(start, len);
        let end = cmp::min(cmp::max(start, end), len);
        if start < end {
            self.rope.remove(start..end);
        }
        if !text.is_empty() {
            self.rope.insert(start, text);
        }
        let (sel_start, sel_end) = self.selection();
        self.set_selection(sel_start, sel_end);
    }

    /// 1-based line and column of `char_idx`, for the status bar.
    pub fn line_col(&self, char_idx: usize) -> (usize, usize) {
        let idx = cmp::min(char_idx, self.rope.len_chars());
        let line = self.rope.char_to_line(idx);
        let col = idx - self.rope.line_to_char(line);
        (line + 1, col + 1)
    }
}
