//! Conversions between LSP positions (line, UTF-16 column) and byte offsets.

use tower_lsp::lsp_types::Position;

/// Byte offset of `position` in `content`.
///
/// Lines past the end clamp to the end of the document and columns past the
/// end of a line clamp to the end of that line.
pub fn position_to_byte(content: &str, position: Position) -> usize {
    let mut line_start = 0;
    for _ in 0..position.line {
        match content[line_start..].find('\n') {
            Some(newline) => line_start += newline + 1,
            None => return content.len(),
        }
    }

    let line_end = content[line_start..]
        .find('\n')
        .map_or(content.len(), |i| line_start + i);
    let line = &content[line_start..line_end];

    let mut utf16_col = 0u32;
    for (byte_idx, ch) in line.char_indices() {
        if utf16_col >= position.character {
            return line_start + byte_idx;
        }
        utf16_col += ch.len_utf16() as u32;
    }
    line_end
}

/// Position of the start of 0-based `line`.
pub fn line_start(line: usize) -> Position {
    Position {
        line: u32::try_from(line).unwrap_or(u32::MAX),
        character: 0,
    }
}
