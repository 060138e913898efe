use unicode_width::UnicodeWidthChar;

/// Splits the buffer into display rows no wider than `width` terminal
/// cells, breaking on newlines and wrapping long lines.
pub fn wrap_buffer_lines(buffer: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = vec![String::new()];
    let mut current_width = 0usize;
    for ch in buffer.chars() {
        if ch == '\r' {
            continue;
        }
        if ch == '\n' {
            lines.push(String::new());
            current_width = 0;
            continue;
        }
        let ch_width = char_cell_width(ch);
        if current_width + ch_width > width && current_width > 0 {
            lines.push(String::new());
            current_width = 0;
        }
        if let Some(line) = lines.last_mut() {
            line.push(ch);
        }
        current_width += ch_width;
    }
    lines
}

/// Visual row/column of the byte-offset cursor within the wrapped buffer.
/// Columns here are terminal cells, unlike the editor's scalar-value
/// columns; this is display geometry only.
pub fn cursor_visual_position(buffer: &str, cursor_byte: usize, width: usize) -> (usize, usize) {
    let width = width.max(1);
    let mut row = 0usize;
    let mut col = 0usize;
    let cursor_byte = cursor_byte.min(buffer.len());

    for (idx, ch) in buffer.char_indices() {
        if idx >= cursor_byte {
            break;
        }
        if ch == '\r' {
            continue;
        }
        if ch == '\n' {
            row += 1;
            col = 0;
            continue;
        }
        let ch_width = char_cell_width(ch);
        if col + ch_width > width && col > 0 {
            row += 1;
            col = 0;
        }
        col += ch_width;
    }

    if col >= width {
        row += 1;
        col = 0;
    }

    (row, col)
}

pub fn char_cell_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_respects_newlines_and_width() {
        let lines = wrap_buffer_lines("abcd\nef", 3);
        assert_eq!(lines, ["abc", "d", "ef"]);
    }

    #[test]
    fn test_wrap_accounts_for_wide_characters() {
        // CJK glyphs take two cells.
        let lines = wrap_buffer_lines("日本語", 4);
        assert_eq!(lines, ["日本", "語"]);
    }

    #[test]
    fn test_cursor_visual_position_follows_wrapping() {
        assert_eq!(cursor_visual_position("abcd\nef", 0, 3), (0, 0));
        // Cursor sitting past the last cell of a full row wraps to the next.
        assert_eq!(cursor_visual_position("abcd\nef", 3, 3), (1, 0));
        assert_eq!(cursor_visual_position("abcd\nef", 4, 3), (1, 1));
        assert_eq!(cursor_visual_position("abcd\nef", 6, 3), (2, 1));
    }

    #[test]
    fn test_cursor_visual_position_with_wide_chars() {
        let buffer = "日本語";
        assert_eq!(cursor_visual_position(buffer, "日本".len(), 4), (1, 0));
    }
}
