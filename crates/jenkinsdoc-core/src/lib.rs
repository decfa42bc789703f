//! # jenkinsdoc-core
//!
//! Documentation and completion engine for Jenkins Pipeline scripts.
//!
//! Provides:
//! - A name-keyed knowledge base of steps, sections, directives and
//!   environment variables
//! - Cursor context classification and completion candidates
//! - Escaped hover documentation
//! - Text-search go-to-definition for Groovy functions
//!
//! [`JenkinsDoc`] ties these together behind one context object that the
//! editor adapters hold and swap wholesale on reload.

pub mod completion;
pub mod config;
pub mod context;
pub mod definition;
pub mod error;
pub mod file_types;
pub mod fs;
pub mod knowledge_base;
pub mod render;
pub mod status;
pub mod text;

use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

pub use completion::{
    Candidate, CandidateKind, CompletionList, CompletionResolver, fallback_candidates,
};
pub use config::DocConfig;
pub use context::{ContextClassifier, EditContext};
pub use definition::{
    DefinitionFile, DefinitionLocator, DefinitionMiss, DefinitionTarget, Location, SearchScope,
};
pub use error::{DocError, DocResult};
pub use file_types::is_jenkins_file;
pub use fs::{FileSystem, RealFileSystem};
pub use knowledge_base::{
    Collection, EntityKind, EntityRef, KnowledgeBase, KnowledgeBaseSummary,
};
pub use render::{DocPayload, ParameterDoc, render};
pub use status::{STATUS_KEY, StatusThrottle, status_text};

/// Number of instructions listed in the diagnostics report.
const SAMPLE_INSTRUCTIONS: usize = 3;

/// Engine state shared by every request: the knowledge base, the settings
/// and the definition locator with its listing cache.
#[derive(Debug, Clone)]
pub struct JenkinsDoc {
    kb: Arc<KnowledgeBase>,
    config: DocConfig,
    locator: Arc<DefinitionLocator>,
}

impl JenkinsDoc {
    /// Engine over the real filesystem.
    pub fn init(kb: KnowledgeBase, config: DocConfig) -> Self {
        Self::with_file_system(kb, config, Arc::new(RealFileSystem))
    }

    pub fn with_file_system(kb: KnowledgeBase, config: DocConfig, fs: Arc<dyn FileSystem>) -> Self {
        let locator = DefinitionLocator::new(fs).with_cache_ttl(config.goto_cache_ttl());
        Self {
            kb: Arc::new(kb),
            config,
            locator: Arc::new(locator),
        }
    }

    /// New engine with `kb` replacing the knowledge base. Settings and the
    /// definition cache carry over.
    pub fn reload(&self, kb: KnowledgeBase) -> Self {
        Self {
            kb: Arc::new(kb),
            config: self.config.clone(),
            locator: Arc::clone(&self.locator),
        }
    }

    /// New engine with updated settings over the same knowledge base and
    /// filesystem. The listing cache is rebuilt when its TTL changes.
    pub fn reconfigure(&self, config: DocConfig, fs: Arc<dyn FileSystem>) -> Self {
        let locator = if config.goto_cache_ttl() == self.locator.cache().ttl() {
            Arc::clone(&self.locator)
        } else {
            Arc::new(DefinitionLocator::new(fs).with_cache_ttl(config.goto_cache_ttl()))
        };
        Self {
            kb: Arc::clone(&self.kb),
            config,
            locator,
        }
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.kb
    }

    pub fn config(&self) -> &DocConfig {
        &self.config
    }

    pub fn is_jenkins_file(&self, path: Option<&Path>, language_id: Option<&str>) -> bool {
        is_jenkins_file(path, language_id, &self.config)
    }

    /// Documentation for the word under byte `offset`.
    pub fn hover(&self, text: &str, offset: usize) -> Option<DocPayload> {
        if !self.config.show_hover_docs {
            return None;
        }
        let word = text::word_at(text, offset)?;
        let entity = self.kb.resolve_word(word)?;
        tracing::debug!(word, kind = ?entity.kind(), "hover resolved");
        Some(render(&entity))
    }

    /// Navigation link for a `file.function` under the cursor, when the
    /// go-to popup is enabled.
    pub fn goto_hint(&self, text: &str, offset: usize) -> Option<DefinitionTarget> {
        if !self.config.enable_goto_definition || !self.config.show_goto_popup {
            return None;
        }
        text::dotted_word_at(text, offset).and_then(DefinitionTarget::parse)
    }

    /// Completion list for the cursor at byte `offset`.
    ///
    /// `prefix` is the partial word the editor is completing; it only
    /// filters the default context.
    pub fn completions(&self, text: &str, offset: usize, prefix: &str) -> CompletionList {
        if !self.config.enable_autocompletion {
            return CompletionList {
                items: Vec::new(),
                inhibit_word_completions: false,
            };
        }

        let context = ContextClassifier::new(&self.kb).classify_at(text, offset);
        let items = CompletionResolver::new(&self.kb).resolve(
            &context,
            prefix,
            self.config.completion_limit(),
        );
        CompletionList {
            items,
            inhibit_word_completions: self.config.inhibit_word_completions,
        }
    }

    /// The navigation target under the cursor: a `file.function` pair if
    /// present, otherwise the bare identifier.
    pub fn definition_target_at(&self, text: &str, offset: usize) -> Option<DefinitionTarget> {
        text::dotted_word_at(text, offset)
            .or_else(|| text::word_at(text, offset))
            .and_then(DefinitionTarget::parse)
    }

    pub fn definition(
        &self,
        target: &DefinitionTarget,
        scope: &SearchScope<'_>,
    ) -> Result<Location, DefinitionMiss> {
        self.locator.locate(target, scope)
    }

    /// Drop cached project listings, e.g. after files are created.
    pub fn invalidate_definition_cache(&self) {
        self.locator.cache().invalidate();
    }

    /// Status indicator text for a document; `None` clears the indicator.
    pub fn status(&self, path: Option<&Path>, language_id: Option<&str>) -> Option<String> {
        status_text(&self.config, &self.kb, self.is_jenkins_file(path, language_id))
    }

    pub fn diagnostics_report(
        &self,
        path: Option<&Path>,
        language_id: Option<&str>,
    ) -> DiagnosticsReport {
        DiagnosticsReport {
            version: env!("CARGO_PKG_VERSION"),
            data: self.kb.summary(),
            data_loaded: !self.kb.is_empty(),
            enabled: self.config.enabled,
            autocompletion: self.config.enable_autocompletion,
            hover_docs: self.config.show_hover_docs,
            status_bar: self.config.show_status_bar,
            debug_mode: self.config.debug_mode,
            current_file: path.map(|p| p.display().to_string()),
            language_id: language_id.map(str::to_string),
            detected_as_jenkins_file: path
                .is_some()
                .then(|| self.is_jenkins_file(path, language_id)),
            sample_instructions: self
                .kb
                .instructions()
                .iter()
                .take(SAMPLE_INSTRUCTIONS)
                .map(|i| i.command.clone())
                .collect(),
        }
    }
}

/// Snapshot of engine state for troubleshooting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticsReport {
    pub version: &'static str,
    pub data: KnowledgeBaseSummary,
    pub data_loaded: bool,
    pub enabled: bool,
    pub autocompletion: bool,
    pub hover_docs: bool,
    pub status_bar: bool,
    pub debug_mode: bool,
    pub current_file: Option<String>,
    pub language_id: Option<String>,
    pub detected_as_jenkins_file: Option<bool>,
    pub sample_instructions: Vec<String>,
}

fn yes_no(value: bool) -> &'static str {
    if value { "Yes" } else { "No" }
}

impl fmt::Display for DiagnosticsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== JenkinsDoc Diagnostics ===")?;
        writeln!(f)?;
        writeln!(f, "Version: {}", self.version)?;
        writeln!(f)?;
        if self.data_loaded {
            writeln!(f, "Data loaded: Yes")?;
            writeln!(f, "  - Plugins: {}", self.data.plugins)?;
            writeln!(f, "  - Instructions: {}", self.data.instructions)?;
            writeln!(f, "  - Sections: {}", self.data.sections)?;
            writeln!(f, "  - Directives: {}", self.data.directives)?;
            writeln!(f, "  - Environment Variables: {}", self.data.environment_variables)?;
        } else {
            writeln!(f, "Data loaded: No (ERROR!)")?;
        }
        writeln!(f)?;
        writeln!(f, "Settings:")?;
        writeln!(f, "  - Enabled: {}", self.enabled)?;
        writeln!(f, "  - Autocompletion: {}", self.autocompletion)?;
        writeln!(f, "  - Hover docs: {}", self.hover_docs)?;
        writeln!(f, "  - Status bar: {}", self.status_bar)?;
        writeln!(f, "  - Debug mode: {}", self.debug_mode)?;

        if let Some(file) = &self.current_file {
            writeln!(f)?;
            writeln!(f, "Current file: {file}")?;
            writeln!(f, "Language: {}", self.language_id.as_deref().unwrap_or("None"))?;
            if let Some(detected) = self.detected_as_jenkins_file {
                writeln!(f, "Detected as Jenkins file: {}", yes_no(detected))?;
            }
        }

        if !self.sample_instructions.is_empty() {
            writeln!(f)?;
            writeln!(f, "Sample instructions:")?;
            for command in &self.sample_instructions {
                writeln!(f, "  - {command}")?;
            }
        }
        Ok(())
    }
}
