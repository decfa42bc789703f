//! Cursor context classification.
//!
//! Decides which completion set applies at the cursor by looking at the
//! current line up to the cursor and the text before it. This is a text
//! heuristic, not a parse of the pipeline grammar: the checks run in a fixed
//! priority order and exactly one context wins.
//!
//! 1. [`EditContext::Parameter`]: inside a call to a known instruction
//! 2. [`EditContext::Environment`]: right after `env.`
//! 3. [`EditContext::PostBlock`]: inside an unclosed `post { ... }`
//! 4. [`EditContext::Default`]

use regex::Regex;
use std::sync::OnceLock;

use crate::knowledge_base::KnowledgeBase;

static CALL_PATTERN: OnceLock<Regex> = OnceLock::new();
static ENV_PATTERN: OnceLock<Regex> = OnceLock::new();
static POST_OPEN_TAIL_PATTERN: OnceLock<Regex> = OnceLock::new();
static POST_OPEN_PATTERN: OnceLock<Regex> = OnceLock::new();

fn call_pattern() -> &'static Regex {
    // Anchored so it can be tried at every start offset of the line
    CALL_PATTERN.get_or_init(|| Regex::new(r"^\{?\s*(\w+)\s*[( ]").unwrap())
}

fn env_pattern() -> &'static Regex {
    ENV_PATTERN.get_or_init(|| Regex::new(r"env\.(\w*)$").unwrap())
}

fn post_open_tail_pattern() -> &'static Regex {
    POST_OPEN_TAIL_PATTERN.get_or_init(|| Regex::new(r"post\s*\{\s*\w*$").unwrap())
}

fn post_open_pattern() -> &'static Regex {
    POST_OPEN_PATTERN.get_or_init(|| Regex::new(r"\bpost\s*\{").unwrap())
}

/// The classified editing situation at the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditContext {
    /// Inside the argument list of `function_name`, a known instruction
    Parameter { function_name: String },
    /// After `env.`; `partial` is the identifier fragment typed so far
    Environment { partial: String },
    /// Inside an unclosed `post { ... }` block
    PostBlock,
    Default,
}

/// Find the instruction whose call the cursor sits in.
///
/// Leftmost match of `\{?\s*(\w+)\s*[( ]` such that no `{` or `(` follows the
/// match on the line. For a fixed start the regex returns its longest match,
/// and shorter ones only leave more text behind, so checking that one is
/// enough.
pub(crate) fn call_target(line: &str) -> Option<&str> {
    let pattern = call_pattern();
    line.char_indices().find_map(|(start, _)| {
        let captures = pattern.captures(&line[start..])?;
        let end = start + captures.get(0)?.end();
        if line[end..].contains(['{', '(']) {
            return None;
        }
        captures.get(1).map(|m| &line[start + m.start()..start + m.end()])
    })
}

/// Whether the text ends inside the last `post {` block it opens.
///
/// Braces inside strings and comments are counted like any other brace.
pub fn is_inside_post_block(text_up_to_cursor: &str) -> bool {
    let Some(last_open) = post_open_pattern().find_iter(text_up_to_cursor).last() else {
        return false;
    };

    let mut depth: i64 = 1;
    for ch in text_up_to_cursor[last_open.end()..].chars() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    true
}

/// Split `text` at byte `offset` into (text before the current line, the
/// current line up to the cursor). Offsets past the end clamp to the end and
/// offsets inside a UTF-8 sequence move back to the previous boundary.
pub fn split_at_cursor(text: &str, offset: usize) -> (&str, &str) {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    let before = &text[..offset];
    match before.rfind('\n') {
        Some(newline) => (&before[..newline + 1], &before[newline + 1..]),
        None => ("", before),
    }
}

/// Classifies cursor contexts against a knowledge base.
#[derive(Debug, Clone, Copy)]
pub struct ContextClassifier<'a> {
    kb: &'a KnowledgeBase,
}

impl<'a> ContextClassifier<'a> {
    pub fn new(kb: &'a KnowledgeBase) -> Self {
        Self { kb }
    }

    /// Classify the cursor position.
    ///
    /// `preceding_lines` is the document text before the current line and
    /// `current_line` the current line up to the cursor.
    pub fn classify(&self, preceding_lines: &str, current_line: &str) -> EditContext {
        if let Some(function_name) = call_target(current_line) {
            if self.kb.instruction(function_name).is_some() {
                return EditContext::Parameter {
                    function_name: function_name.to_string(),
                };
            }
        }

        if let Some(captures) = env_pattern().captures(current_line) {
            return EditContext::Environment {
                partial: captures[1].to_string(),
            };
        }

        let previous_line = preceding_lines
            .strip_suffix('\n')
            .unwrap_or(preceding_lines)
            .rsplit('\n')
            .next()
            .unwrap_or("");
        let tail = format!("{previous_line}\n{current_line}");
        if post_open_tail_pattern().is_match(&tail) {
            return EditContext::PostBlock;
        }

        let text_up_to_cursor = format!("{preceding_lines}{current_line}");
        if is_inside_post_block(&text_up_to_cursor) {
            return EditContext::PostBlock;
        }

        EditContext::Default
    }

    /// Classify the cursor at byte `offset` of `text`.
    pub fn classify_at(&self, text: &str, offset: usize) -> EditContext {
        let (preceding_lines, current_line) = split_at_cursor(text, offset);
        self.classify(preceding_lines, current_line)
    }
}
