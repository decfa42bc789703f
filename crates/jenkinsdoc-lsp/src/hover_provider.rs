//! Hover documentation provider for LSP.
//!
//! Renders the knowledge base entry under the cursor as Markdown and, when
//! the cursor sits on a `file.function` call, appends a hint that
//! go-to-definition can follow it.

use jenkinsdoc_core::JenkinsDoc;
use tower_lsp::lsp_types::{Hover, HoverContents, MarkupContent, MarkupKind, Position};

use crate::position::position_to_byte;

/// Hover for a document position, or `None` when there is nothing to show.
pub fn hover_for_document(engine: &JenkinsDoc, content: &str, position: Position) -> Option<Hover> {
    let offset = position_to_byte(content, position);

    let mut sections = Vec::new();
    if let Some(payload) = engine.hover(content, offset) {
        sections.push(payload.to_markdown());
    }
    if let Some(target) = engine.goto_hint(content, offset) {
        sections.push(format!("Go to definition of `{target}`"));
    }
    if sections.is_empty() {
        return None;
    }

    Some(Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: sections.join("\n\n---\n\n"),
        }),
        range: None,
    })
}
