use crate::tags::{byte_offset, insert_at_caret};

/// Caret over a multi-line text buffer, tracked as a character offset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    caret: usize,
}

impl Cursor {
    pub fn at(caret: usize) -> Self {
        Self { caret }
    }

    pub fn end_of(text: &str) -> Self {
        Self { caret: text.chars().count() }
    }

    pub fn clamp_to(&mut self, text: &str) {
        self.caret = self.caret.min(text.chars().count());
    }

    pub fn insert(&mut self, text: &mut String, value: &str) {
        let splice = insert_at_caret(text, self.caret, self.caret, value);
        *text = splice.text;
        self.caret = splice.caret;
    }

    pub fn backspace(&mut self, text: &mut String) {
        self.clamp_to(text);
        if self.caret == 0 {
            return;
        }
        let start = byte_offset(text, self.caret - 1);
        let end = byte_offset(text, self.caret);
        text.replace_range(start..end, "");
        self.caret -= 1;
    }

    pub fn delete(&mut self, text: &mut String) {
        self.clamp_to(text);
        if self.caret >= text.chars().count() {
            return;
        }
        let start = byte_offset(text, self.caret);
        let end = byte_offset(text, self.caret + 1);
        text.replace_range(start..end, "");
    }

    pub fn left(&mut self) {
        self.caret = self.caret.saturating_sub(1);
    }

    pub fn right(&mut self, text: &str) {
        self.caret = (self.caret + 1).min(text.chars().count());
    }

    pub fn home(&mut self, text: &str) {
        let (line, _) = self.line_and_column(text);
        self.caret = line_start(text, line);
    }

    pub fn end(&mut self, text: &str) {
        let (line, _) = self.line_and_column(text);
        self.caret = line_start(text, line) + line_length(text, line);
    }

    pub fn up(&mut self, text: &str) {
        let (line, column) = self.line_and_column(text);
        if line == 0 {
            self.caret = 0;
            return;
        }
        self.caret = line_start(text, line - 1) + column.min(line_length(text, line - 1));
    }

    pub fn down(&mut self, text: &str) {
        let (line, column) = self.line_and_column(text);
        let line_count = text.split('\n').count();
        if line + 1 >= line_count {
            self.caret = text.chars().count();
            return;
        }
        self.caret = line_start(text, line + 1) + column.min(line_length(text, line + 1));
    }

    /// Zero-based line and column (in characters) of the caret.
    pub fn line_and_column(&self, text: &str) -> (usize, usize) {
        let mut line = 0;
        let mut column = 0;
        for ch in text.chars().take(self.caret) {
            if ch == '\n' {
                line += 1;
                column = 0;
            } else {
                column += 1;
            }
        }
        (line, column)
    }
}

fn line_start(text: &str, line: usize) -> usize {
    text.split('\n').take(line).map(|l| l.chars().count() + 1).sum()
}

fn line_length(text: &str, line: usize) -> usize {
    text.split('\n').nth(line).map(|l| l.chars().count()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typing_and_deleting_multibyte_text() {
        let mut text = String::new();
        let mut cursor = Cursor::default();
        cursor.insert(&mut text, "夜空");
        cursor.insert(&mut text, "\n");
        cursor.insert(&mut text, "星");
        assert_eq!(text, "夜空\n星");
        assert_eq!(cursor, Cursor::at(4));

        cursor.backspace(&mut text);
        assert_eq!(text, "夜空\n");
        cursor.left();
        cursor.left();
        cursor.delete(&mut text);
        assert_eq!(text, "夜\n");
        assert_eq!(cursor, Cursor::at(1));
    }

    #[test]
    fn vertical_motion_keeps_column_where_possible() {
        let text = "long first line\nab\nthird line";
        let mut cursor = Cursor::at(10);
        cursor.down(text);
        assert_eq!(cursor.line_and_column(text), (1, 2));
        cursor.down(text);
        assert_eq!(cursor.line_and_column(text), (2, 2));
        cursor.down(text);
        assert_eq!(cursor, Cursor::at(text.chars().count()));
        cursor.up(text);
        cursor.home(text);
        assert_eq!(cursor.line_and_column(text), (1, 0));
        cursor.end(text);
        assert_eq!(cursor.line_and_column(text), (1, 2));
    }

    #[test]
    fn caret_is_clamped_after_external_edits() {
        let mut text = String::from("abc");
        let mut cursor = Cursor::at(40);
        cursor.backspace(&mut text);
        assert_eq!(text, "ab");
        assert_eq!(cursor, Cursor::at(2));
        cursor.delete(&mut text);
        assert_eq!(text, "ab");
    }
}
