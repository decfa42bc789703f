//! Cross-crate integration tests verifying the contracts the CLI and LSP
//! binaries rely on when they drive jenkinsdoc-core.
//!
//! Each test builds its own small knowledge base so the expectations do not
//! drift with the bundled data.

use std::path::PathBuf;

use jenkinsdoc_core::{
    CandidateKind, CompletionResolver, ContextClassifier, DefinitionFile, DefinitionMiss,
    DefinitionTarget, DocConfig, EditContext, JenkinsDoc, KnowledgeBase, SearchScope,
};
use serde_json::json;

fn kb(raw: serde_json::Value) -> KnowledgeBase {
    KnowledgeBase::build(&raw)
}

// ============================================================================
// Completion scenarios
// ============================================================================

#[test]
fn call_opener_offers_declared_parameters() {
    let kb = kb(json!({
        "instructions": [{
            "command": "echo",
            "parameters": [{"name": "message", "type": "String", "isOptional": false}]
        }]
    }));

    let context = ContextClassifier::new(&kb).classify("steps {\n", "echo(");
    assert_eq!(
        context,
        EditContext::Parameter {
            function_name: "echo".to_string()
        }
    );

    let candidates = CompletionResolver::new(&kb).resolve(&context, "", None);
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].label, "message\tString ");
    assert_eq!(candidates[0].insert_text, "message: '${1}'");
}

#[test]
fn env_access_offers_bare_variable_names() {
    let kb = kb(json!({
        "environmentVariables": [
            {"name": "BUILD_NUMBER", "description": "Build number"},
            {"name": "JOB_NAME", "description": "Job name"}
        ]
    }));

    let context = ContextClassifier::new(&kb).classify("", "env.");
    assert_eq!(
        context,
        EditContext::Environment {
            partial: String::new()
        }
    );

    let candidates = CompletionResolver::new(&kb).resolve(&context, "", None);
    let inserts: Vec<_> = candidates.iter().map(|c| c.insert_text.as_str()).collect();
    assert_eq!(inserts, vec!["BUILD_NUMBER", "JOB_NAME"]);
}

#[test]
fn unclosed_post_block_without_post_section_uses_fallback_conditions() {
    let kb = kb(json!({"instructions": [{"command": "echo"}]}));
    let doc = JenkinsDoc::init(kb, DocConfig::default());
    let text = "pipeline {\n  stages {\n  }\n  post {\n    success {\n    }\n    ";

    let list = doc.completions(text, text.len(), "");
    let names: Vec<_> = list.items.iter().map(|c| c.trigger()).collect();
    assert_eq!(
        names,
        vec![
            "always",
            "changed",
            "fixed",
            "regression",
            "aborted",
            "failure",
            "success",
            "unstable",
            "unsuccessful",
            "cleanup"
        ]
    );
    assert!(list.items.iter().all(|c| c.insert_text.ends_with(" {\n\t$0\n}")));
}

#[test]
fn default_context_filters_every_tier_by_prefix() {
    let kb = kb(json!({
        "instructions": [{"command": "sh"}, {"command": "stage"}, {"command": "echo"}]
    }));
    let doc = JenkinsDoc::init(kb, DocConfig::default());

    let list = doc.completions("s", 1, "s");
    let names: Vec<_> = list.items.iter().map(|c| c.trigger()).collect();
    assert!(names.contains(&"sh"));
    assert!(names.contains(&"stage"));
    assert!(!names.contains(&"echo"));
    assert_eq!(names.iter().filter(|n| **n == "sh").count(), 1);
}

#[test]
fn completion_cap_truncates_in_tier_order() {
    let doc = JenkinsDoc::init(
        KnowledgeBase::bundled(),
        DocConfig {
            max_completions: 3,
            ..DocConfig::default()
        },
    );
    let list = doc.completions("", 0, "");
    let names: Vec<_> = list.items.iter().map(|c| c.trigger()).collect();
    assert_eq!(names, vec!["echo", "sh", "git"]);
    assert!(list.items.iter().all(|c| c.kind == CandidateKind::Keyword));
}

#[test]
fn empty_knowledge_base_still_offers_priority_commands() {
    let doc = JenkinsDoc::init(KnowledgeBase::empty(), DocConfig::default());
    assert!(doc.hover("echo 'x'", 1).is_none());

    let list = doc.completions("ec", 2, "ec");
    assert_eq!(list.items.len(), 1);
    assert_eq!(list.items[0].trigger(), "echo");
}

// ============================================================================
// Rendering contracts
// ============================================================================

#[test]
fn hover_payload_is_escaped_and_links_once() {
    let kb = kb(json!({
        "instructions": [{
            "command": "echo",
            "description": "Print <b>\"text\"</b>",
            "url": "https://example.test/echo?a=1&b=2",
            "parameters": [{"name": "message", "type": "String"}]
        }, {
            "command": "pwd"
        }]
    }));
    let doc = JenkinsDoc::init(kb, DocConfig::default());

    let echo = doc.hover("echo 'x'", 1).unwrap();
    let html = echo.to_html();
    assert!(html.contains("Print &lt;b&gt;&quot;text&quot;&lt;/b&gt;"));
    assert!(html.contains("message"));
    assert!(html.contains("https://example.test/echo?a=1&amp;b=2"));
    assert_eq!(html.matches("View Documentation").count(), 1);

    let pwd = doc.hover("pwd()", 1).unwrap();
    assert!(pwd.parameters.is_none());
    assert!(!pwd.to_html().contains("Parameters"));
    assert!(!pwd.to_html().contains("View Documentation"));
}

// ============================================================================
// Navigation contracts
// ============================================================================

#[test]
fn definition_in_current_document() {
    let doc = JenkinsDoc::init(KnowledgeBase::empty(), DocConfig::default());
    let text = "def myFunc() {\n  echo 'x'\n}";
    let found = doc
        .definition(
            &DefinitionTarget::parse("myFunc").unwrap(),
            &SearchScope {
                current_text: Some(text),
                roots: &[],
            },
        )
        .unwrap();
    assert_eq!(found.file, DefinitionFile::Current);
    assert_eq!(found.line, 0);
}

#[test]
fn qualified_definition_without_file_is_not_found() {
    let temp = tempfile::tempdir().unwrap();
    std::fs::write(temp.path().join("other.groovy"), "def helper() {\n}\n").unwrap();
    let roots: Vec<PathBuf> = vec![temp.path().to_path_buf()];

    let doc = JenkinsDoc::init(KnowledgeBase::empty(), DocConfig::default());
    let miss = doc
        .definition(
            &DefinitionTarget::parse("lib.helper").unwrap(),
            &SearchScope {
                current_text: None,
                roots: &roots,
            },
        )
        .unwrap_err();
    assert_eq!(
        miss,
        DefinitionMiss::FileNotFound {
            file_name: "lib".to_string()
        }
    );
}

#[test]
fn reload_swaps_knowledge_base_and_keeps_settings() {
    let doc = JenkinsDoc::init(
        KnowledgeBase::empty(),
        DocConfig {
            status_bar_text: "Jenkins".to_string(),
            show_instruction_count: true,
            ..DocConfig::default()
        },
    );
    let jenkinsfile = std::path::Path::new("/repo/Jenkinsfile");
    assert_eq!(
        doc.status(Some(jenkinsfile), None).as_deref(),
        Some("Jenkins (no data)")
    );

    let reloaded = doc.reload(kb(json!({"instructions": [{"command": "sh"}, {"command": "echo"}]})));
    assert_eq!(
        reloaded.status(Some(jenkinsfile), None).as_deref(),
        Some("Jenkins (2 steps)")
    );
    assert!(doc.knowledge_base().is_empty());
}
