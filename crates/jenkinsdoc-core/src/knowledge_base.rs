//! In-memory index over the Jenkins Pipeline knowledge base.
//!
//! The knowledge base is produced by an external documentation scraper as a
//! single JSON document with five top-level arrays (`plugins`,
//! `instructions`, `sections`, `directives`, `environmentVariables`). This
//! module turns that document into name-keyed collections that are
//! immutable after construction and cheap to share behind an `Arc`.
//!
//! Loading never fails hard: a missing or malformed document yields an empty
//! knowledge base, and individual malformed entries are skipped.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{DocError, DocResult};

const BUNDLED_DATA: &str = include_str!("../data/jenkins_data.json");

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn default_param_type() -> String {
    "Unknown".to_string()
}

/// Broad classification of a parameter's declared `type` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Boolean,
    Int,
    Enum,
    Other,
}

/// A single named argument of an [`Instruction`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    /// Declared type as written in the source data (`String`, `boolean`, `Enum`, ...)
    #[serde(rename = "type", default = "default_param_type")]
    pub param_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_optional: bool,
    /// Allowed values; only meaningful for `Enum` parameters
    #[serde(default, deserialize_with = "null_as_default")]
    pub values: Vec<String>,
}

impl Parameter {
    pub fn kind(&self) -> ParamKind {
        match self.param_type.as_str() {
            "String" => ParamKind::String,
            "boolean" => ParamKind::Boolean,
            "int" => ParamKind::Int,
            "Enum" => ParamKind::Enum,
            _ => ParamKind::Other,
        }
    }
}

/// A callable pipeline step such as `sh` or `checkout`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instruction {
    pub command: String,
    /// Display name; falls back to `command` when the source omits it
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub url: Option<String>,
    /// Id of the plugin that contributes this step
    #[serde(default)]
    pub plugin: Option<String>,
    #[serde(default)]
    pub instruction_type: Option<String>,
}

/// Shape shared by sections (`post`, `stages`) and directives
/// (`environment`, `options`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Construct {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Free-text constraint on where the construct may appear
    #[serde(default)]
    pub allowed: Option<String>,
    /// Children valid inside the block, e.g. `always` and `success` for `post`
    #[serde(default, deserialize_with = "null_as_default")]
    pub inner_instructions: Vec<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub is_optional: Option<bool>,
}

pub type Section = Construct;
pub type Directive = Construct;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plugin {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Instruction {
    fn key(&self) -> &str {
        &self.command
    }
}

impl Keyed for Construct {
    fn key(&self) -> &str {
        &self.name
    }
}

impl Keyed for EnvironmentVariable {
    fn key(&self) -> &str {
        &self.name
    }
}

/// Declaration-ordered entries plus a key index. A later duplicate replaces
/// the earlier entry in place.
#[derive(Debug, Clone)]
struct Index<T> {
    items: Vec<T>,
    by_key: HashMap<String, usize>,
}

impl<T> Default for Index<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            by_key: HashMap::new(),
        }
    }
}

impl<T: Keyed> Index<T> {
    fn from_items(entries: impl IntoIterator<Item = T>) -> Self {
        let mut index = Self::default();
        for entry in entries {
            if entry.key().is_empty() {
                continue;
            }
            match index.by_key.get(entry.key()) {
                Some(&slot) => index.items[slot] = entry,
                None => {
                    index.by_key.insert(entry.key().to_string(), index.items.len());
                    index.items.push(entry);
                }
            }
        }
        index
    }

    fn get(&self, key: &str) -> Option<&T> {
        self.by_key.get(key).map(|&slot| &self.items[slot])
    }
}

/// Which entity collection a lookup targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Instructions,
    Sections,
    Directives,
    EnvironmentVariables,
}

/// Kind of a resolved entity, used for rendering and completion labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntityKind {
    Instruction,
    Section,
    Directive,
    EnvironmentVariable,
}

impl EntityKind {
    /// Human-readable label shown next to the entity title.
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Instruction => "Pipeline Step",
            EntityKind::Section => "Pipeline Section",
            EntityKind::Directive => "Pipeline Directive",
            EntityKind::EnvironmentVariable => "Environment Variable",
        }
    }
}

/// Borrowed view of any entity in the knowledge base.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntityRef<'a> {
    Instruction(&'a Instruction),
    Section(&'a Section),
    Directive(&'a Directive),
    EnvironmentVariable(&'a EnvironmentVariable),
}

impl EntityRef<'_> {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRef::Instruction(_) => EntityKind::Instruction,
            EntityRef::Section(_) => EntityKind::Section,
            EntityRef::Directive(_) => EntityKind::Directive,
            EntityRef::EnvironmentVariable(_) => EntityKind::EnvironmentVariable,
        }
    }

    /// The lookup key of the entity (`command` for instructions).
    pub fn key(&self) -> &str {
        match self {
            EntityRef::Instruction(i) => &i.command,
            EntityRef::Section(c) | EntityRef::Directive(c) => &c.name,
            EntityRef::EnvironmentVariable(e) => &e.name,
        }
    }
}

/// Entity counts, reported by the diagnostics command and status bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KnowledgeBaseSummary {
    pub plugins: usize,
    pub instructions: usize,
    pub sections: usize,
    pub directives: usize,
    pub environment_variables: usize,
}

/// Immutable, name-keyed index over instructions, sections, directives and
/// environment variables.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    plugins: Vec<Plugin>,
    instructions: Index<Instruction>,
    sections: Index<Section>,
    directives: Index<Directive>,
    environment_variables: Index<EnvironmentVariable>,
}

fn parse_entries<T: DeserializeOwned>(raw: &serde_json::Value, field: &str) -> Vec<T> {
    let Some(value) = raw.get(field) else {
        return Vec::new();
    };
    let Some(entries) = value.as_array() else {
        tracing::warn!(field, "knowledge base field is not an array, ignoring it");
        return Vec::new();
    };

    entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| match T::deserialize(entry) {
            Ok(parsed) => Some(parsed),
            Err(error) => {
                tracing::warn!(field, index, %error, "skipping malformed knowledge base entry");
                None
            }
        })
        .collect()
}

impl KnowledgeBase {
    /// An index with all collections empty.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the index from an already-parsed document.
    ///
    /// Anything that is not an object yields an empty knowledge base.
    pub fn build(raw: &serde_json::Value) -> Self {
        if !raw.is_object() {
            tracing::warn!("knowledge base document is not an object, using empty data");
            return Self::empty();
        }

        let instructions = parse_entries::<Instruction>(raw, "instructions")
            .into_iter()
            .map(|mut instruction| {
                if instruction.name.is_empty() {
                    instruction.name = instruction.command.clone();
                }
                instruction
            });

        Self {
            plugins: parse_entries(raw, "plugins"),
            instructions: Index::from_items(instructions),
            sections: Index::from_items(parse_entries(raw, "sections")),
            directives: Index::from_items(parse_entries(raw, "directives")),
            environment_variables: Index::from_items(parse_entries(raw, "environmentVariables")),
        }
    }

    /// Parse JSON text and build the index. Invalid JSON yields an empty
    /// knowledge base.
    pub fn from_json_str(text: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(text) {
            Ok(raw) => Self::build(&raw),
            Err(error) => {
                tracing::warn!(%error, "knowledge base is not valid JSON, using empty data");
                Self::empty()
            }
        }
    }

    /// The knowledge base shipped with the crate.
    pub fn bundled() -> Self {
        Self::from_json_str(BUNDLED_DATA)
    }

    /// Load a knowledge base file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> DocResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| DocError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: serde_json::Value =
            serde_json::from_str(&content).map_err(|source| DocError::InvalidJson {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::build(&raw))
    }

    /// Load a knowledge base file, falling back to the empty knowledge base.
    ///
    /// Returns a warning describing the failure instead of an error so the
    /// editor integration keeps running without documentation.
    pub fn load_or_empty<P: AsRef<Path>>(path: P) -> (Self, Option<String>) {
        match Self::load(path.as_ref()) {
            Ok(kb) => (kb, None),
            Err(e) => {
                let warning = format!("Failed to load {} - {}", path.as_ref().display(), e);
                (Self::empty(), Some(warning))
            }
        }
    }

    pub fn lookup(&self, collection: Collection, name: &str) -> Option<EntityRef<'_>> {
        match collection {
            Collection::Instructions => self.instruction(name).map(EntityRef::Instruction),
            Collection::Sections => self.section(name).map(EntityRef::Section),
            Collection::Directives => self.directive(name).map(EntityRef::Directive),
            Collection::EnvironmentVariables => self
                .environment_variable(name)
                .map(EntityRef::EnvironmentVariable),
        }
    }

    /// Resolve a hovered word, trying instructions, environment variables,
    /// sections and directives in that order.
    pub fn resolve_word(&self, word: &str) -> Option<EntityRef<'_>> {
        [
            Collection::Instructions,
            Collection::EnvironmentVariables,
            Collection::Sections,
            Collection::Directives,
        ]
        .into_iter()
        .find_map(|collection| self.lookup(collection, word))
    }

    pub fn instruction(&self, command: &str) -> Option<&Instruction> {
        self.instructions.get(command)
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    pub fn directive(&self, name: &str) -> Option<&Directive> {
        self.directives.get(name)
    }

    pub fn environment_variable(&self, name: &str) -> Option<&EnvironmentVariable> {
        self.environment_variables.get(name)
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions.items
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections.items
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives.items
    }

    pub fn environment_variables(&self) -> &[EnvironmentVariable] {
        &self.environment_variables.items
    }

    pub fn plugins(&self) -> &[Plugin] {
        &self.plugins
    }

    pub fn summary(&self) -> KnowledgeBaseSummary {
        KnowledgeBaseSummary {
            plugins: self.plugins.len(),
            instructions: self.instructions.items.len(),
            sections: self.sections.items.len(),
            directives: self.directives.items.len(),
            environment_variables: self.environment_variables.items.len(),
        }
    }

    /// True when no instruction, section, directive or environment variable
    /// is loaded.
    pub fn is_empty(&self) -> bool {
        self.instructions.items.is_empty()
            && self.sections.items.is_empty()
            && self.directives.items.is_empty()
            && self.environment_variables.items.is_empty()
    }
}
