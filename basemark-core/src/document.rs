//! In-memory document: text plus a single cursor.
//!
//! The cursor is a byte offset that always sits on a char boundary. Every
//! mutating method returns `true` when the text changed, which is the signal
//! the workspace uses to notify annotators and arm debounced requests.

use crate::annotate::LineIndex;
use crate::types::FileId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    id: FileId,
    text: String,
    cursor: usize,
}

impl Document {
    pub fn new(id: FileId, text: impl Into<String>) -> Self {
        Self { id, text: text.into(), cursor: 0 }
    }

    pub fn id(&self) -> &FileId {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Moves the cursor, snapping back to the nearest char boundary.
    pub fn set_cursor(&mut self, offset: usize) {
        let mut offset = offset.min(self.text.len());
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        self.cursor = offset;
    }

    /// Zero-based (line, column-in-chars) of the cursor.
    pub fn cursor_position(&self) -> (usize, usize) {
        let index = LineIndex::new(&self.text);
        let line = index.line_of_offset(self.cursor);
        let start = index.line_start(line).unwrap_or(0);
        (line, self.text[start..self.cursor].chars().count())
    }

    pub fn insert_str(&mut self, s: &str) -> bool {
        if s.is_empty() {
            return false;
        }
        self.text.insert_str(self.cursor, s);
        self.cursor += s.len();
        true
    }

    pub fn insert_char(&mut self, c: char) -> bool {
        self.text.insert(self.cursor, c);
        self.cursor += c.len_utf8();
        true
    }

    pub fn backspace(&mut self) -> bool {
        let Some(prev) = self.text[..self.cursor].chars().next_back() else {
            return false;
        };
        self.cursor -= prev.len_utf8();
        self.text.remove(self.cursor);
        true
    }

    pub fn delete_forward(&mut self) -> bool {
        if self.cursor >= self.text.len() {
            return false;
        }
        self.text.remove(self.cursor);
        true
    }

    pub fn move_left(&mut self) {
        if let Some(prev) = self.text[..self.cursor].chars().next_back() {
            self.cursor -= prev.len_utf8();
        }
    }

    pub fn move_right(&mut self) {
        if let Some(next) = self.text[self.cursor..].chars().next() {
            self.cursor += next.len_utf8();
        }
    }

    pub fn move_line_start(&mut self) {
        let index = LineIndex::new(&self.text);
        let line = index.line_of_offset(self.cursor);
        self.cursor = index.line_start(line).unwrap_or(0);
    }

    pub fn move_line_end(&mut self) {
        let index = LineIndex::new(&self.text);
        let line = index.line_of_offset(self.cursor);
        if let Some(range) = index.line_range(line) {
            self.cursor = range.end;
        }
    }

    /// Moves up (negative) or down (positive) by `lines`, keeping the column
    /// where the target line is long enough.
    pub fn move_vertical(&mut self, lines: isize) {
        let index = LineIndex::new(&self.text);
        let (line, column) = self.cursor_position();
        let last = index.line_count() - 1;
        let target = (line as isize + lines).clamp(0, last as isize) as usize;
        if let Some(range) = index.line_range(target) {
            let line_text = &self.text[range.clone()];
            let byte = line_text.char_indices().nth(column).map_or(line_text.len(), |(i, _)| i);
            self.cursor = range.start + byte;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Document {
        Document::new(FileId::from("f"), text)
    }

    #[test]
    fn editing_keeps_cursor_on_char_boundaries() {
        let mut d = doc("");
        d.insert_char('é');
        d.insert_str("x\ny");
        assert_eq!(d.text(), "éx\ny");
        assert_eq!(d.cursor_position(), (1, 1));
        assert!(d.backspace());
        assert!(d.backspace());
        assert_eq!(d.text(), "éx");
        d.move_left();
        d.move_left();
        assert_eq!(d.cursor(), 0);
        assert!(!d.backspace());
        assert!(d.delete_forward());
        assert_eq!(d.text(), "x");

        d.set_cursor(1);
        let mut d = doc("é");
        d.set_cursor(1);
        assert_eq!(d.cursor(), 0);
    }

    #[test]
    fn vertical_motion_clamps_columns() {
        let mut d = doc("long line\nab\nanother");
        d.set_cursor(7);
        d.move_vertical(1);
        assert_eq!(d.cursor_position(), (1, 2));
        d.move_vertical(1);
        assert_eq!(d.cursor_position(), (2, 2));
        d.move_vertical(5);
        assert_eq!(d.cursor_position(), (2, 2));
        d.move_line_end();
        assert_eq!(d.cursor(), d.text().len());
        d.move_line_start();
        assert_eq!(d.cursor_position(), (2, 0));
    }
}
