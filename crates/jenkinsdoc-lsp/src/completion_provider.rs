//! Completion provider adapter for the jenkinsdoc-core resolver.

use jenkinsdoc_core::text::trailing_word;
use jenkinsdoc_core::{Candidate, CandidateKind, CompletionList, JenkinsDoc};
use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, CompletionItemLabelDetails, CompletionResponse,
    Documentation, InsertTextFormat, Position,
};

use crate::position::position_to_byte;

fn completion_kind(kind: CandidateKind) -> CompletionItemKind {
    match kind {
        CandidateKind::Keyword => CompletionItemKind::KEYWORD,
        CandidateKind::Function => CompletionItemKind::FUNCTION,
        CandidateKind::Section => CompletionItemKind::MODULE,
        CandidateKind::Directive => CompletionItemKind::PROPERTY,
        CandidateKind::Parameter => CompletionItemKind::FIELD,
        CandidateKind::EnvironmentVariable => CompletionItemKind::VARIABLE,
        CandidateKind::PostCondition => CompletionItemKind::EVENT,
    }
}

/// Completion list for a document position.
///
/// The prefix is the identifier immediately left of the cursor.
pub fn completion_list_for_document(
    engine: &JenkinsDoc,
    content: &str,
    position: Position,
) -> CompletionList {
    let cursor = position_to_byte(content, position);
    let line_start = content[..cursor].rfind('\n').map_or(0, |i| i + 1);
    let prefix = trailing_word(&content[line_start..cursor]);
    engine.completions(content, cursor, prefix)
}

fn completion_item(candidate: Candidate, inhibit_word_completions: bool) -> CompletionItem {
    let annotation = candidate.annotation().map(str::to_string);
    CompletionItem {
        label: candidate.trigger().to_string(),
        label_details: annotation.as_ref().map(|annotation| CompletionItemLabelDetails {
            detail: None,
            description: Some(annotation.clone()),
        }),
        kind: Some(completion_kind(candidate.kind)),
        detail: annotation,
        documentation: candidate.detail.map(Documentation::String),
        insert_text: Some(candidate.insert_text),
        insert_text_format: Some(InsertTextFormat::SNIPPET),
        data: Some(serde_json::json!({
            "inhibit_word_completions": inhibit_word_completions
        })),
        ..Default::default()
    }
}

/// LSP response for a resolved list, keeping the resolver's order.
pub fn completion_response(list: CompletionList) -> CompletionResponse {
    let inhibit = list.inhibit_word_completions;
    let items: Vec<CompletionItem> = list
        .items
        .into_iter()
        .enumerate()
        .map(|(rank, candidate)| CompletionItem {
            sort_text: Some(format!("{rank:05}")),
            ..completion_item(candidate, inhibit)
        })
        .collect();
    CompletionResponse::List(tower_lsp::lsp_types::CompletionList {
        is_incomplete: false,
        items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jenkinsdoc_core::{DocConfig, KnowledgeBase};

    fn engine() -> JenkinsDoc {
        JenkinsDoc::init(KnowledgeBase::bundled(), DocConfig::default())
    }

    fn items(response: CompletionResponse) -> Vec<CompletionItem> {
        match response {
            CompletionResponse::List(list) => list.items,
            CompletionResponse::Array(items) => items,
        }
    }

    #[test]
    fn test_default_context_uses_prefix_from_line() {
        let content = "pipeline {\n  stages {\n    ec";
        let list = completion_list_for_document(
            &engine(),
            content,
            Position {
                line: 2,
                character: 6,
            },
        );
        assert!(!list.items.is_empty());
        assert!(list.items.iter().all(|c| c.trigger().to_lowercase().starts_with("ec")));
    }

    #[test]
    fn test_parameter_items_are_snippets_with_annotation() {
        let content = "sh(";
        let list = completion_list_for_document(
            &engine(),
            content,
            Position {
                line: 0,
                character: 3,
            },
        );
        let items = items(completion_response(list));
        let script = items.iter().find(|i| i.label == "script").unwrap();
        assert_eq!(script.kind, Some(CompletionItemKind::FIELD));
        assert_eq!(script.insert_text_format, Some(InsertTextFormat::SNIPPET));
        assert!(script.detail.as_deref().unwrap().starts_with("String"));
        assert_eq!(
            script.data,
            Some(serde_json::json!({"inhibit_word_completions": true}))
        );
    }

    #[test]
    fn test_response_preserves_resolver_order() {
        let list = CompletionList {
            items: jenkinsdoc_core::fallback_candidates(),
            inhibit_word_completions: false,
        };
        let items = items(completion_response(list));
        let labels: Vec<_> = items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["echo", "sh", "pipeline"]);
        assert!(items[0].sort_text < items[1].sort_text);
        assert_eq!(items[0].kind, Some(CompletionItemKind::KEYWORD));
        assert_eq!(items[0].detail.as_deref(), Some("Jenkins"));
    }

    #[test]
    fn test_env_items_insert_bare_names() {
        let content = "def v = env.BUI";
        let list = completion_list_for_document(
            &engine(),
            content,
            Position {
                line: 0,
                character: 15,
            },
        );
        let items = items(completion_response(list));
        assert!(items.iter().any(|i| i.label == "BUILD_NUMBER"));
        assert!(items.iter().all(|i| i.kind == Some(CompletionItemKind::VARIABLE)));
        assert!(
            items
                .iter()
                .all(|i| !i.insert_text.as_deref().unwrap().starts_with("env."))
        );
    }
}
