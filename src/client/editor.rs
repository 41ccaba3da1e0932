use crate::models::Cursor;

pub const DEFAULT_FILENAME: &str = "Untitled";

/// Local text buffer as the editor sees it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditorDocument {
    pub content: String,
    pub filename: String,
    /// No changes since the last save-to-file or authoritative sync
    pub saved: bool,
}

impl Default for EditorDocument {
    fn default() -> Self {
        Self {
            content: String::new(),
            filename: DEFAULT_FILENAME.to_string(),
            saved: true,
        }
    }
}

/// 1-based line and column of the caret sitting `offset` characters into
/// `content`. Offsets past the end clamp to the end.
pub fn cursor_position(content: &str, offset: usize) -> Cursor {
    let before: String = content.chars().take(offset).collect();
    let line = before.split('\n').count();
    let column = before.rsplit('\n').next().map_or(0, |last| last.chars().count()) + 1;
    Cursor {
        line: line as u32,
        column: column as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_of_document_is_line_one_column_one() {
        assert_eq!(cursor_position("", 0), Cursor { line: 1, column: 1 });
        assert_eq!(cursor_position("abc", 0), Cursor { line: 1, column: 1 });
    }

    #[test]
    fn counts_lines_and_columns() {
        let text = "first\nsecond\nthird";
        assert_eq!(cursor_position(text, 5), Cursor { line: 1, column: 6 });
        assert_eq!(cursor_position(text, 6), Cursor { line: 2, column: 1 });
        assert_eq!(cursor_position(text, 9), Cursor { line: 2, column: 4 });
        assert_eq!(cursor_position(text, 1000), Cursor { line: 3, column: 6 });
    }

    #[test]
    fn columns_count_characters_not_bytes() {
        assert_eq!(cursor_position("héllo", 3), Cursor { line: 1, column: 4 });
    }
}
