//! Word extraction around a byte offset.

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn clamp_to_boundary(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

fn span_at(text: &str, offset: usize, accept: impl Fn(char) -> bool) -> Option<(usize, usize)> {
    let offset = clamp_to_boundary(text, offset);
    let start = text[..offset]
        .char_indices()
        .rev()
        .take_while(|(_, c)| accept(*c))
        .last()
        .map_or(offset, |(i, _)| i);
    let end = text[offset..]
        .char_indices()
        .find(|(_, c)| !accept(*c))
        .map_or(text.len(), |(i, _)| offset + i);
    (start < end).then_some((start, end))
}

/// The identifier touching `offset` (the cursor may sit just after it).
pub fn word_at(text: &str, offset: usize) -> Option<&str> {
    span_at(text, offset, is_word_char).map(|(start, end)| &text[start..end])
}

/// A `file.function` pair touching `offset`, if the cursor is on one.
pub fn dotted_word_at(text: &str, offset: usize) -> Option<&str> {
    let (start, end) = span_at(text, offset, |c| is_word_char(c) || c == '.')?;
    let candidate = &text[start..end];
    let (left, right) = candidate.split_once('.')?;
    let valid = !left.is_empty()
        && !right.is_empty()
        && !right.contains('.')
        && left.chars().all(is_word_char)
        && right.chars().all(is_word_char);
    valid.then_some(candidate)
}

/// Trailing identifier of `line`, used as the completion prefix.
pub fn trailing_word(line: &str) -> &str {
    let start = line
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_word_char(*c))
        .last()
        .map_or(line.len(), |(i, _)| i);
    &line[start..]
}
