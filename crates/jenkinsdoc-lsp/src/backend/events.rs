use super::*;

impl Backend {
    pub(super) async fn handle_did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        {
            let mut docs = self.documents.write().await;
            docs.insert(
                uri.clone(),
                OpenDocument {
                    text: Arc::new(params.text_document.text),
                    language_id: params.text_document.language_id,
                },
            );
        }
        self.publish_status(&uri, true).await;
    }

    pub(super) async fn handle_did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        if let Some(change) = params.content_changes.into_iter().last() {
            {
                let mut docs = self.documents.write().await;
                match docs.get_mut(&uri) {
                    Some(document) => document.text = Arc::new(change.text),
                    None => {
                        docs.insert(
                            uri.clone(),
                            OpenDocument {
                                text: Arc::new(change.text),
                                language_id: String::new(),
                            },
                        );
                    }
                }
            }
            self.publish_status(&uri, false).await;
        }
    }

    pub(super) async fn handle_did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        {
            let mut docs = self.documents.write().await;
            docs.remove(&uri);
        }
        self.status_throttle.forget(&uri);
        self.client
            .send_notification::<StatusNotification>(StatusParams {
                uri,
                key: STATUS_KEY.to_string(),
                text: None,
            })
            .await;
    }

    pub(super) async fn handle_did_change_configuration(
        &self,
        params: DidChangeConfigurationParams,
    ) {
        let current = self.engine().await;
        let config = match merge_settings(current.config(), &params.settings) {
            Ok(config) => config,
            Err(e) => {
                self.log(
                    MessageType::WARNING,
                    format!("Failed to parse settings: {e}"),
                )
                .await;
                return;
            }
        };

        if &config == current.config() {
            return;
        }

        let data_changed = config.data_file != current.config().data_file;
        let mut updated = current.reconfigure(config, Arc::new(jenkinsdoc_core::RealFileSystem));
        if data_changed {
            let roots = self.workspace_roots.read().await.clone();
            let (kb, warning) =
                load_knowledge_base(updated.config(), roots.first().map(PathBuf::as_path));
            if let Some(warning) = warning {
                self.log(MessageType::ERROR, warning).await;
            }
            updated = updated.reload(kb);
        }
        *self.engine.write().await = Arc::new(updated);

        self.log(MessageType::INFO, "Settings updated").await;

        // Indicator text depends on the settings
        let documents: Vec<Url> = self.documents.read().await.keys().cloned().collect();
        for uri in documents {
            self.publish_status(&uri, true).await;
        }
    }
}
