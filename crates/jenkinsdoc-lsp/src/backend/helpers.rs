use super::*;
use jenkinsdoc_core::{CompletionList, DocConfig, fallback_candidates};

/// Workspace config file, looked up in the first workspace root.
pub(super) const CONFIG_FILE_NAME: &str = ".jenkinsdoc.toml";

/// Settings may arrive nested under this key.
pub(super) const SETTINGS_SECTION: &str = "jenkinsdoc";

pub(super) const COMPLETION_TRIGGERS: &[char] = &['.', '(', ' '];

/// Workspace roots from the workspace folders, or the root URI if the
/// client sent no folders.
pub(super) fn workspace_roots(params: &InitializeParams) -> Vec<PathBuf> {
    let from_folders: Vec<PathBuf> = params
        .workspace_folders
        .iter()
        .flatten()
        .filter_map(|folder| folder.uri.to_file_path().ok())
        .collect();
    if !from_folders.is_empty() {
        return from_folders;
    }
    params
        .root_uri
        .as_ref()
        .and_then(|uri| uri.to_file_path().ok())
        .into_iter()
        .collect()
}

/// `.jenkinsdoc.toml` from `root`, if present.
pub(super) fn load_workspace_config(root: Option<&Path>) -> (DocConfig, Option<String>) {
    let config_path = root
        .map(|r| r.join(CONFIG_FILE_NAME))
        .filter(|p| p.is_file());
    DocConfig::load_or_default(config_path.as_ref())
}

/// Relative data file paths resolve against the workspace root.
pub(super) fn resolve_data_file(data_file: &Path, root: Option<&Path>) -> PathBuf {
    match root {
        Some(root) if data_file.is_relative() => root.join(data_file),
        _ => data_file.to_path_buf(),
    }
}

/// The configured data file, or the bundled data when none is set.
pub(super) fn load_knowledge_base(
    config: &DocConfig,
    root: Option<&Path>,
) -> (KnowledgeBase, Option<String>) {
    match &config.data_file {
        Some(data_file) => KnowledgeBase::load_or_empty(resolve_data_file(data_file, root)),
        None => (KnowledgeBase::bundled(), None),
    }
}

/// Overlay a settings payload onto `base`. Keys absent from the payload
/// keep their current values.
pub(super) fn merge_settings(
    base: &DocConfig,
    settings: &serde_json::Value,
) -> std::result::Result<DocConfig, serde_json::Error> {
    let settings = settings.get(SETTINGS_SECTION).unwrap_or(settings);
    let Some(overrides) = settings.as_object() else {
        return Err(<serde_json::Error as serde::de::Error>::custom(
            "settings must be an object",
        ));
    };

    let mut merged = serde_json::to_value(base)?;
    if let Some(target) = merged.as_object_mut() {
        for (key, value) in overrides {
            target.insert(key.clone(), value.clone());
        }
    }
    serde_json::from_value(merged)
}

pub(super) fn fallback_list(inhibit_word_completions: bool) -> CompletionList {
    CompletionList {
        items: fallback_candidates(),
        inhibit_word_completions,
    }
}

/// The resolved list, or the fallback list plus the failure message when
/// the resolution task panicked.
pub(super) fn list_or_fallback(
    result: std::result::Result<CompletionList, tokio::task::JoinError>,
    inhibit_word_completions: bool,
) -> (CompletionList, Option<String>) {
    match result {
        Ok(list) => (list, None),
        Err(e) => (
            fallback_list(inhibit_word_completions),
            Some(format!("Completion failed: {e}")),
        ),
    }
}
