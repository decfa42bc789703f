//! Integration tests for jenkinsdoc-lsp.
//!
//! These tests drive the public `Backend` through the `LanguageServer`
//! trait the way an editor session would: initialize, open, query.

use futures::StreamExt;
use jenkinsdoc_lsp::{Backend, DIAGNOSTICS_COMMAND, RELOAD_COMMAND, StatusParams};
use tower_lsp::lsp_types::*;
use tower_lsp::{LanguageServer, LspService};

fn at(uri: &Url, line: u32, character: u32) -> TextDocumentPositionParams {
    TextDocumentPositionParams {
        text_document: TextDocumentIdentifier { uri: uri.clone() },
        position: Position { line, character },
    }
}

mod session_tests {
    use super::*;

    const PIPELINE: &str = "pipeline {
    agent any
    stages {
        stage('Build') {
            steps {
                sh 'make'
                deploy.toProd()
            }
        }
    }
    post {

    }
}
";

    #[tokio::test]
    async fn test_editor_session_round_trip() {
        let temp = tempfile::tempdir().unwrap();
        let vars = temp.path().join("vars");
        std::fs::create_dir_all(&vars).unwrap();
        std::fs::write(
            vars.join("deploy.groovy"),
            "def toProd() {\n    sh './deploy.sh prod'\n}\n",
        )
        .unwrap();

        let (service, socket) = LspService::new(Backend::new);
        // Act as the client end so log and status messages never back up
        tokio::spawn(socket.for_each(|_| async {}));
        let server = service.inner();
        server
            .initialize(InitializeParams {
                workspace_folders: Some(vec![WorkspaceFolder {
                    uri: Url::from_file_path(temp.path()).unwrap(),
                    name: "repo".to_string(),
                }]),
                ..Default::default()
            })
            .await
            .unwrap();
        server.initialized(InitializedParams {}).await;

        let uri = Url::from_file_path(temp.path().join("Jenkinsfile")).unwrap();
        server
            .did_open(DidOpenTextDocumentParams {
                text_document: TextDocumentItem {
                    uri: uri.clone(),
                    language_id: "groovy".to_string(),
                    version: 1,
                    text: PIPELINE.to_string(),
                },
            })
            .await;

        // Hover over `agent`
        let hover = server
            .hover(HoverParams {
                text_document_position_params: at(&uri, 1, 6),
                work_done_progress_params: WorkDoneProgressParams::default(),
            })
            .await
            .unwrap()
            .expect("agent should have documentation");
        let HoverContents::Markup(markup) = hover.contents else {
            panic!("Expected markdown hover");
        };
        assert!(markup.value.contains("Pipeline Section"));

        // Completion inside the empty post block
        let completion = server
            .completion(CompletionParams {
                text_document_position: at(&uri, 11, 8),
                work_done_progress_params: WorkDoneProgressParams::default(),
                partial_result_params: PartialResultParams::default(),
                context: None,
            })
            .await
            .unwrap();
        let Some(CompletionResponse::List(list)) = completion else {
            panic!("Expected a completion list");
        };
        assert!(list.items.iter().any(|item| item.label == "always"));
        assert!(
            list.items
                .iter()
                .all(|item| item.kind == Some(CompletionItemKind::EVENT))
        );

        // Go to the shared library function
        let definition = server
            .goto_definition(GotoDefinitionParams {
                text_document_position_params: at(&uri, 6, 24),
                work_done_progress_params: WorkDoneProgressParams::default(),
                partial_result_params: PartialResultParams::default(),
            })
            .await
            .unwrap();
        let Some(GotoDefinitionResponse::Scalar(location)) = definition else {
            panic!("Expected a definition location");
        };
        assert_eq!(
            location.uri,
            Url::from_file_path(vars.join("deploy.groovy")).unwrap()
        );
        assert_eq!(location.range.start.line, 0);

        let report = server
            .execute_command(ExecuteCommandParams {
                command: DIAGNOSTICS_COMMAND.to_string(),
                arguments: vec![serde_json::json!(uri)],
                work_done_progress_params: WorkDoneProgressParams::default(),
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report["detected_as_jenkins_file"], serde_json::json!(true));

        let summary = server
            .execute_command(ExecuteCommandParams {
                command: RELOAD_COMMAND.to_string(),
                arguments: vec![],
                work_done_progress_params: WorkDoneProgressParams::default(),
            })
            .await
            .unwrap()
            .unwrap();
        assert!(summary["instructions"].as_u64().unwrap() > 0);

        assert!(server.shutdown().await.is_ok());
    }
}

mod notification_tests {
    use super::*;
    use tower_lsp::lsp_types::notification::Notification;

    #[test]
    fn test_status_notification_wire_shape() {
        let params = StatusParams {
            uri: Url::parse("file:///repo/Jenkinsfile").unwrap(),
            key: jenkinsdoc_core::STATUS_KEY.to_string(),
            text: None,
        };
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "uri": "file:///repo/Jenkinsfile",
                "key": "jenkins_doc",
                "text": null
            })
        );
        assert_eq!(
            <jenkinsdoc_lsp::StatusNotification as Notification>::METHOD,
            "jenkinsdoc/status"
        );
    }
}
