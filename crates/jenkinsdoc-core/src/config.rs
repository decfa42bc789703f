//! Plugin configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::DocError;

/// Default cap on the number of completion candidates returned.
pub const DEFAULT_MAX_COMPLETIONS: usize = 100;

/// Default lifetime of a cached project file listing, in seconds.
pub const DEFAULT_GOTO_CACHE_TTL_SECS: u64 = 60;

/// Typed settings consumed by the engine and the editor adapters.
///
/// Every field has a default, so partial TOML files and partial
/// `workspace/didChangeConfiguration` payloads merge onto [`DocConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocConfig {
    /// Master switch; when off no file is treated as a Jenkins file
    pub enabled: bool,
    pub enable_autocompletion: bool,
    pub show_hover_docs: bool,
    pub show_status_bar: bool,
    pub status_bar_text: String,
    /// Append the number of loaded steps to the status text
    pub show_instruction_count: bool,

    /// Treat Groovy files (by language id or `.groovy` extension) as Jenkins files
    pub detect_groovy_files: bool,
    /// Treat any file whose name contains `Jenkinsfile` as a Jenkins file
    pub detect_jenkinsfile: bool,
    /// Extra glob patterns matched against the full path and the file name
    pub additional_file_patterns: Vec<String>,

    /// Maximum number of completion candidates; `0` disables the cap
    pub max_completions: usize,
    /// Ask the editor to suppress its own buffer-word completions
    pub inhibit_word_completions: bool,

    pub hover_popup_max_width: u32,
    pub hover_popup_max_height: u32,

    pub enable_goto_definition: bool,
    /// Offer a "Go to definition" link when hovering `file.function`
    pub show_goto_popup: bool,
    pub goto_cache_ttl_secs: u64,

    /// Knowledge base file replacing the bundled data
    pub data_file: Option<PathBuf>,

    pub debug_mode: bool,
    pub show_console_messages: bool,
}

impl Default for DocConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            enable_autocompletion: true,
            show_hover_docs: true,
            show_status_bar: true,
            status_bar_text: "JenkinsDoc".to_string(),
            show_instruction_count: false,
            detect_groovy_files: true,
            detect_jenkinsfile: true,
            additional_file_patterns: Vec::new(),
            max_completions: DEFAULT_MAX_COMPLETIONS,
            inhibit_word_completions: true,
            hover_popup_max_width: 800,
            hover_popup_max_height: 500,
            enable_goto_definition: true,
            show_goto_popup: true,
            goto_cache_ttl_secs: DEFAULT_GOTO_CACHE_TTL_SECS,
            data_file: None,
            debug_mode: false,
            show_console_messages: true,
        }
    }
}

impl DocConfig {
    /// Load config from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| DocError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|e| DocError::InvalidConfig {
            path: path.to_path_buf(),
            message: e.message().to_string(),
        })?;
        Ok(config)
    }

    /// Load config or use default, returning any load warning
    ///
    /// A configured path that cannot be read or parsed yields the default
    /// config together with a message describing the failure.
    pub fn load_or_default(path: Option<&PathBuf>) -> (Self, Option<String>) {
        match path {
            Some(p) => match Self::load(p) {
                Ok(config) => (config, None),
                Err(e) => {
                    let warning = format!(
                        "Failed to load config {}: {}. Using defaults.",
                        p.display(),
                        e
                    );
                    (Self::default(), Some(warning))
                }
            },
            None => (Self::default(), None),
        }
    }

    /// Completion cap as an option; `None` means unlimited.
    pub fn completion_limit(&self) -> Option<usize> {
        (self.max_completions > 0).then_some(self.max_completions)
    }

    pub fn goto_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.goto_cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = DocConfig::default();
        assert!(config.enabled);
        assert_eq!(config.max_completions, 100);
        assert!(config.inhibit_word_completions);
        assert_eq!(config.hover_popup_max_width, 800);
        assert_eq!(config.hover_popup_max_height, 500);
        assert!(config.enable_goto_definition);
        assert!(config.show_goto_popup);
        assert_eq!(config.goto_cache_ttl(), Duration::from_secs(60));
        assert_eq!(config.status_bar_text, "JenkinsDoc");
        assert!(config.data_file.is_none());
    }

    #[test]
    fn test_partial_toml_merges_onto_defaults() {
        let config: DocConfig = toml::from_str(
            r#"
max_completions = 20
show_goto_popup = false
additional_file_patterns = ["*.jenkins"]
"#,
        )
        .unwrap();

        assert_eq!(config.max_completions, 20);
        assert!(!config.show_goto_popup);
        assert_eq!(config.additional_file_patterns, vec!["*.jenkins"]);
        assert!(config.show_hover_docs);
    }

    #[test]
    fn test_partial_json_merges_onto_defaults() {
        let config: DocConfig =
            serde_json::from_value(serde_json::json!({"debug_mode": true})).unwrap();
        assert!(config.debug_mode);
        assert_eq!(config.max_completions, DEFAULT_MAX_COMPLETIONS);
    }

    #[test]
    fn test_completion_limit_zero_is_unlimited() {
        let config = DocConfig {
            max_completions: 0,
            ..DocConfig::default()
        };
        assert_eq!(config.completion_limit(), None);
        assert_eq!(DocConfig::default().completion_limit(), Some(100));
    }

    #[test]
    fn test_load_reads_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "status_bar_text = \"Jenkins\"\nshow_instruction_count = true").unwrap();

        let config = DocConfig::load(file.path()).unwrap();
        assert_eq!(config.status_bar_text, "Jenkins");
        assert!(config.show_instruction_count);
    }

    #[test]
    fn test_load_or_default_warns_on_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_completions = \"many\"").unwrap();
        let path = file.path().to_path_buf();

        let (config, warning) = DocConfig::load_or_default(Some(&path));
        assert_eq!(config, DocConfig::default());
        assert!(warning.unwrap().contains("Using defaults"));
    }

    #[test]
    fn test_load_or_default_without_path() {
        let (config, warning) = DocConfig::load_or_default(None);
        assert_eq!(config, DocConfig::default());
        assert!(warning.is_none());
    }
}
