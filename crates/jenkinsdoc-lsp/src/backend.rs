//! LSP backend implementation for jenkinsdoc.
//!
//! Implements the Language Server Protocol using tower-lsp. Every request
//! reads one shared [`JenkinsDoc`] snapshot; reloads and configuration
//! changes swap the snapshot as a whole.

mod events;
mod helpers;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jenkinsdoc_core::{JenkinsDoc, KnowledgeBase, STATUS_KEY, StatusThrottle};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::notification::Notification;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use crate::completion_provider::{completion_list_for_document, completion_response};
use crate::definition_provider::definition_for_document;
use crate::hover_provider::hover_for_document;
use helpers::*;

/// Reload the knowledge base from disk.
pub const RELOAD_COMMAND: &str = "jenkinsdoc.reload";

/// Return the diagnostics report for the engine (and an optional document).
pub const DIAGNOSTICS_COMMAND: &str = "jenkinsdoc.diagnostics";

/// Server-to-client notification carrying the status indicator text.
#[derive(Debug)]
pub enum StatusNotification {}

impl Notification for StatusNotification {
    type Params = StatusParams;
    const METHOD: &'static str = "jenkinsdoc/status";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusParams {
    pub uri: Url,
    pub key: String,
    /// `None` clears the indicator
    pub text: Option<String>,
}

/// An open document as last sent by the client.
#[derive(Debug, Clone)]
pub(crate) struct OpenDocument {
    pub(crate) text: Arc<String>,
    pub(crate) language_id: String,
}

/// LSP backend that serves documentation, completion and navigation.
pub struct Backend {
    client: Client,
    engine: RwLock<Arc<JenkinsDoc>>,
    documents: RwLock<HashMap<Url, OpenDocument>>,
    workspace_roots: RwLock<Vec<PathBuf>>,
    status_throttle: StatusThrottle<Url>,
}

impl Backend {
    /// Create a new backend instance with the given client connection.
    ///
    /// Starts with the bundled knowledge base and default settings; the
    /// workspace config is applied during `initialize`.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            engine: RwLock::new(Arc::new(JenkinsDoc::init(
                KnowledgeBase::bundled(),
                Default::default(),
            ))),
            documents: RwLock::new(HashMap::new()),
            workspace_roots: RwLock::new(Vec::new()),
            status_throttle: StatusThrottle::default(),
        }
    }

    async fn engine(&self) -> Arc<JenkinsDoc> {
        Arc::clone(&*self.engine.read().await)
    }

    /// The document at `uri` if it is open and recognized as a Jenkins file.
    async fn jenkins_document(&self, engine: &JenkinsDoc, uri: &Url) -> Option<OpenDocument> {
        let document = self.documents.read().await.get(uri).cloned()?;
        let path = uri.to_file_path().ok();
        engine
            .is_jenkins_file(path.as_deref(), Some(&document.language_id))
            .then_some(document)
    }

    async fn log(&self, typ: MessageType, message: impl Into<String>) {
        let message = message.into();
        if typ == MessageType::ERROR {
            tracing::error!("{message}");
        } else if typ == MessageType::WARNING {
            tracing::warn!("{message}");
        } else {
            tracing::debug!("{message}");
        }
        let (console, debug_mode) = {
            let engine = self.engine.read().await;
            (
                engine.config().show_console_messages,
                engine.config().debug_mode,
            )
        };
        // LOG-level messages are request traces, only forwarded in debug mode
        if typ == MessageType::LOG && !debug_mode {
            return;
        }
        if console || typ == MessageType::ERROR {
            self.client.log_message(typ, message).await;
        }
    }

    /// Publish the status indicator for `uri`, at most once per throttle
    /// interval unless `force` is set.
    async fn publish_status(&self, uri: &Url, force: bool) {
        if !force && !self.status_throttle.should_update(uri.clone()) {
            return;
        }
        let engine = self.engine().await;
        let language_id = self
            .documents
            .read()
            .await
            .get(uri)
            .map(|d| d.language_id.clone());
        let path = uri.to_file_path().ok();
        let text = engine.status(path.as_deref(), language_id.as_deref());
        self.client
            .send_notification::<StatusNotification>(StatusParams {
                uri: uri.clone(),
                key: STATUS_KEY.to_string(),
                text,
            })
            .await;
    }

    /// Load config and data for `roots` and install a fresh engine.
    async fn load_workspace(&self, roots: Vec<PathBuf>, overrides: Option<serde_json::Value>) {
        let (config, warning) = load_workspace_config(roots.first().map(PathBuf::as_path));
        if let Some(warning) = warning {
            self.log(MessageType::WARNING, warning).await;
        }

        let config = match overrides {
            Some(settings) => match merge_settings(&config, &settings) {
                Ok(merged) => merged,
                Err(e) => {
                    self.log(
                        MessageType::WARNING,
                        format!("Ignoring invalid initialization options: {e}"),
                    )
                    .await;
                    config
                }
            },
            None => config,
        };

        let (kb, warning) = load_knowledge_base(&config, roots.first().map(PathBuf::as_path));
        if let Some(warning) = warning {
            self.log(MessageType::ERROR, warning).await;
        }

        *self.workspace_roots.write().await = roots;
        *self.engine.write().await = Arc::new(JenkinsDoc::init(kb, config));
    }

    /// Re-read the knowledge base using the current settings.
    async fn reload(&self) -> serde_json::Value {
        let roots = self.workspace_roots.read().await.clone();
        let current = self.engine().await;
        let (kb, warning) =
            load_knowledge_base(current.config(), roots.first().map(PathBuf::as_path));
        if let Some(warning) = warning {
            self.log(MessageType::ERROR, warning).await;
        }

        let reloaded = current.reload(kb);
        reloaded.invalidate_definition_cache();
        let summary = reloaded.knowledge_base().summary();
        *self.engine.write().await = Arc::new(reloaded);

        self.log(
            MessageType::INFO,
            format!(
                "Reloaded Jenkins data: {} instructions, {} sections, {} directives, {} environment variables",
                summary.instructions,
                summary.sections,
                summary.directives,
                summary.environment_variables
            ),
        )
        .await;
        serde_json::to_value(summary).unwrap_or(serde_json::Value::Null)
    }

    async fn diagnostics(&self, uri: Option<Url>) -> serde_json::Value {
        let engine = self.engine().await;
        let language_id = match &uri {
            Some(uri) => self
                .documents
                .read()
                .await
                .get(uri)
                .map(|d| d.language_id.clone()),
            None => None,
        };
        let path = uri.as_ref().and_then(|u| u.to_file_path().ok());
        let report = engine.diagnostics_report(path.as_deref(), language_id.as_deref());
        self.log(MessageType::INFO, report.to_string()).await;
        serde_json::to_value(report).unwrap_or(serde_json::Value::Null)
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let roots = workspace_roots(&params);
        self.load_workspace(roots, params.initialization_options)
            .await;

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(
                        COMPLETION_TRIGGERS.iter().map(|c| c.to_string()).collect(),
                    ),
                    ..Default::default()
                }),
                definition_provider: Some(OneOf::Left(true)),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: vec![RELOAD_COMMAND.to_string(), DIAGNOSTICS_COMMAND.to_string()],
                    ..Default::default()
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "jenkinsdoc-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        let summary = self.engine().await.knowledge_base().summary();
        self.log(
            MessageType::INFO,
            format!(
                "jenkinsdoc-lsp initialized ({} instructions loaded)",
                summary.instructions
            ),
        )
        .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        self.handle_did_open(params).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        self.handle_did_change(params).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.handle_did_close(params).await;
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        self.handle_did_change_configuration(params).await;
    }

    async fn did_change_watched_files(&self, _: DidChangeWatchedFilesParams) {
        self.engine().await.invalidate_definition_cache();
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        let engine = self.engine().await;
        let Some(document) = self.jenkins_document(&engine, &uri).await else {
            return Ok(None);
        };

        let result = tokio::task::spawn_blocking(move || {
            hover_for_document(&engine, &document.text, position)
        })
        .await;

        match result {
            Ok(hover) => {
                if hover.is_none() {
                    self.log(
                        MessageType::LOG,
                        format!(
                            "No hover at {uri} {}:{}",
                            position.line, position.character
                        ),
                    )
                    .await;
                }
                Ok(hover)
            }
            Err(e) => {
                self.log(MessageType::ERROR, format!("Hover failed: {e}")).await;
                Ok(None)
            }
        }
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        let engine = self.engine().await;
        let Some(document) = self.jenkins_document(&engine, &uri).await else {
            return Ok(None);
        };

        let inhibit_word_completions = engine.config().inhibit_word_completions;
        let result = tokio::task::spawn_blocking(move || {
            completion_list_for_document(&engine, &document.text, position)
        })
        .await;

        let (list, failure) = list_or_fallback(result, inhibit_word_completions);
        match failure {
            Some(failure) => self.log(MessageType::ERROR, failure).await,
            None => {
                self.log(
                    MessageType::LOG,
                    format!("{} completions for {uri}", list.items.len()),
                )
                .await
            }
        }
        Ok(Some(completion_response(list)))
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        let engine = self.engine().await;
        if !engine.config().enable_goto_definition {
            return Ok(None);
        }
        let Some(document) = self.jenkins_document(&engine, &uri).await else {
            return Ok(None);
        };
        let roots = self.workspace_roots.read().await.clone();

        let request_uri = uri.clone();
        let result = tokio::task::spawn_blocking(move || {
            definition_for_document(&engine, &request_uri, &document.text, position, &roots)
        })
        .await;

        match result {
            Ok(Some(Ok(response))) => Ok(Some(response)),
            Ok(Some(Err(miss))) => {
                self.client
                    .show_message(MessageType::INFO, miss.to_string())
                    .await;
                Ok(None)
            }
            Ok(None) => Ok(None),
            Err(e) => {
                self.log(MessageType::ERROR, format!("Go to definition failed: {e}"))
                    .await;
                Ok(None)
            }
        }
    }

    async fn execute_command(
        &self,
        params: ExecuteCommandParams,
    ) -> Result<Option<serde_json::Value>> {
        match params.command.as_str() {
            RELOAD_COMMAND => Ok(Some(self.reload().await)),
            DIAGNOSTICS_COMMAND => {
                let uri = params
                    .arguments
                    .first()
                    .and_then(|arg| serde_json::from_value::<Url>(arg.clone()).ok());
                Ok(Some(self.diagnostics(uri).await))
            }
            other => {
                self.log(MessageType::WARNING, format!("Unknown command: {other}"))
                    .await;
                Ok(None)
            }
        }
    }
}
