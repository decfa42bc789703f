//! Completion candidates for a classified cursor context.
//!
//! Labels follow the `"<name>\t<annotation>"` convention: the part before the
//! tab is what the user types, the part after it is a short description the
//! editor shows alongside. Insert texts use TextMate/LSP snippet syntax
//! (`${1:placeholder}`, `$0`).

use std::collections::HashSet;

use crate::context::EditContext;
use crate::knowledge_base::{Construct, KnowledgeBase, ParamKind, Parameter};

/// Post conditions offered when the knowledge base has no `post` section.
pub const FALLBACK_POST_CONDITIONS: &[&str] = &[
    "always",
    "changed",
    "fixed",
    "regression",
    "aborted",
    "failure",
    "success",
    "unstable",
    "unsuccessful",
    "cleanup",
];

/// Common steps offered first in the default context, with curated snippets.
pub const PRIORITY_COMMANDS: &[(&str, &str)] = &[
    ("echo", "echo '${1:message}'"),
    ("sh", "sh '${1:script}'"),
    ("git", "git url: '${1:url}'"),
    ("checkout", "checkout scm"),
    ("stage", "stage('${1:name}') {\n\t${0}\n}"),
    ("steps", "steps {\n\t${0}\n}"),
    ("pipeline", "pipeline {\n\t${0}\n}"),
    ("agent", "agent ${1:any}"),
    ("node", "node('${1:label}') {\n\t${0}\n}"),
    ("script", "script {\n\t${0}\n}"),
    ("bat", "bat '${1:script}'"),
    ("powershell", "powershell '${1:script}'"),
    ("pwd", "pwd()"),
    ("dir", "dir('${1:path}') {\n\t${0}\n}"),
    ("deleteDir", "deleteDir()"),
    ("error", "error '${1:message}'"),
    ("unstable", "unstable '${1:message}'"),
    ("retry", "retry(${1:3}) {\n\t${0}\n}"),
    ("timeout", "timeout(time: ${1:1}, unit: '${2:HOURS}') {\n\t${0}\n}"),
    ("waitUntil", "waitUntil {\n\t${0}\n}"),
    ("sleep", "sleep ${1:60}"),
    ("input", "input '${1:Proceed?}'"),
    ("parallel", "parallel {\n\t${0}\n}"),
    ("when", "when {\n\t${0}\n}"),
    ("post", "post {\n\t${0}\n}"),
];

/// How many inner instructions a section/directive label previews.
const INNER_PREVIEW_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    /// Curated priority command
    Keyword,
    /// Knowledge base instruction
    Function,
    Section,
    Directive,
    Parameter,
    EnvironmentVariable,
    PostCondition,
}

/// One completion offering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// `"<name>\t<annotation>"`
    pub label: String,
    pub insert_text: String,
    pub kind: CandidateKind,
    /// Longer description shown in the completion details, if any
    pub detail: Option<String>,
}

impl Candidate {
    fn new(
        name: &str,
        annotation: &str,
        insert_text: impl Into<String>,
        kind: CandidateKind,
    ) -> Self {
        Self {
            label: format!("{name}\t{annotation}"),
            insert_text: insert_text.into(),
            kind,
            detail: None,
        }
    }

    /// The part of the label before the tab.
    pub fn trigger(&self) -> &str {
        self.label.split('\t').next().unwrap_or(&self.label)
    }

    /// The part of the label after the tab, if any.
    pub fn annotation(&self) -> Option<&str> {
        self.label.split_once('\t').map(|(_, annotation)| annotation)
    }
}

/// Completions handed to the editor together with the word-completion hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionList {
    pub items: Vec<Candidate>,
    /// Ask the editor to hide its own buffer-word suggestions
    pub inhibit_word_completions: bool,
}

/// Minimal set returned when completion fails unexpectedly.
pub fn fallback_candidates() -> Vec<Candidate> {
    ["echo", "sh", "pipeline"]
        .into_iter()
        .filter_map(|name| {
            PRIORITY_COMMANDS
                .iter()
                .find(|(command, _)| *command == name)
                .map(|(command, snippet)| {
                    Candidate::new(command, "Jenkins", *snippet, CandidateKind::Keyword)
                })
        })
        .collect()
}

fn starts_with_ignore_case(candidate: &str, prefix: &str) -> bool {
    candidate.to_lowercase().starts_with(&prefix.to_lowercase())
}

fn parameter_candidate(param: &Parameter) -> Candidate {
    let optional = if param.is_optional { "(Optional)" } else { "" };
    let name = &param.name;
    let insert_text = match param.kind() {
        ParamKind::String | ParamKind::Enum => format!("{name}: '${{1}}'"),
        ParamKind::Boolean => format!("{name}: ${{1:true}}"),
        ParamKind::Int | ParamKind::Other => format!("{name}: "),
    };

    let mut annotation = format!("{} {}", param.param_type, optional);
    let has_values = !param.values.is_empty();
    if param.kind() == ParamKind::Enum && has_values {
        annotation.push_str(&format!(" Values: {}", param.values.join(", ")));
    }

    let mut detail_parts = Vec::new();
    if has_values {
        detail_parts.push(format!("Values: {}", param.values.join(", ")));
    }
    if !param.description.is_empty() {
        detail_parts.push(param.description.clone());
    }

    let mut candidate = Candidate::new(name, &annotation, insert_text, CandidateKind::Parameter);
    candidate.detail = (!detail_parts.is_empty()).then(|| detail_parts.join(" - "));
    candidate
}

fn block_candidate(construct: &Construct, annotation: &str, kind: CandidateKind) -> Candidate {
    let name = &construct.name;
    if construct.inner_instructions.is_empty() {
        return Candidate::new(name, annotation, format!("{name} {{\n\t$0\n}}"), kind);
    }

    let inner = &construct.inner_instructions;
    let mut preview = inner
        .iter()
        .take(INNER_PREVIEW_LEN)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    if inner.len() > INNER_PREVIEW_LEN {
        preview.push_str("...");
    }

    let mut candidate = Candidate::new(
        name,
        &format!("{annotation} ({preview})"),
        format!("{name} {{\n\t${{1:// {}}}\n}}", inner.join(", ")),
        kind,
    );
    candidate.detail = (!construct.description.is_empty()).then(|| construct.description.clone());
    candidate
}

/// Produces completion candidates from a knowledge base.
#[derive(Debug, Clone, Copy)]
pub struct CompletionResolver<'a> {
    kb: &'a KnowledgeBase,
}

impl<'a> CompletionResolver<'a> {
    pub fn new(kb: &'a KnowledgeBase) -> Self {
        Self { kb }
    }

    /// Candidates for `context`, in tier order, truncated to `limit`.
    ///
    /// `prefix` only filters the default context; the environment context
    /// filters by the fragment it captured after `env.`.
    pub fn resolve(
        &self,
        context: &EditContext,
        prefix: &str,
        limit: Option<usize>,
    ) -> Vec<Candidate> {
        let mut candidates = match context {
            EditContext::Parameter { function_name } => self.parameter_candidates(function_name),
            EditContext::Environment { partial } => self.environment_candidates(partial),
            EditContext::PostBlock => self.post_candidates(),
            EditContext::Default => self.default_candidates(prefix),
        };

        if let Some(limit) = limit {
            candidates.truncate(limit);
        }
        tracing::debug!(?context, prefix, count = candidates.len(), "resolved completions");
        candidates
    }

    fn parameter_candidates(&self, function_name: &str) -> Vec<Candidate> {
        self.kb
            .instruction(function_name)
            .map(|instruction| instruction.parameters.iter().map(parameter_candidate).collect())
            .unwrap_or_default()
    }

    fn environment_candidates(&self, partial: &str) -> Vec<Candidate> {
        self.kb
            .environment_variables()
            .iter()
            .filter(|var| var.name.starts_with(partial))
            .map(|var| {
                let mut candidate = Candidate::new(
                    &var.name,
                    "Environment Variable",
                    var.name.clone(),
                    CandidateKind::EnvironmentVariable,
                );
                candidate.detail = (!var.description.is_empty()).then(|| var.description.clone());
                candidate
            })
            .collect()
    }

    fn post_candidates(&self) -> Vec<Candidate> {
        let conditions: Vec<&str> = match self.kb.section("post") {
            Some(post) if !post.inner_instructions.is_empty() => {
                post.inner_instructions.iter().map(String::as_str).collect()
            }
            _ => FALLBACK_POST_CONDITIONS.to_vec(),
        };

        conditions
            .into_iter()
            .map(|condition| {
                Candidate::new(
                    condition,
                    "Post Condition",
                    format!("{condition} {{\n\t$0\n}}"),
                    CandidateKind::PostCondition,
                )
            })
            .collect()
    }

    fn default_candidates(&self, prefix: &str) -> Vec<Candidate> {
        let mut added: HashSet<String> = HashSet::new();
        let mut candidates = Vec::new();
        let matches = |name: &str| prefix.is_empty() || starts_with_ignore_case(name, prefix);

        for (command, snippet) in PRIORITY_COMMANDS {
            if matches(command) && added.insert(command.to_lowercase()) {
                candidates.push(Candidate::new(
                    command,
                    "Jenkins",
                    *snippet,
                    CandidateKind::Keyword,
                ));
            }
        }

        for instruction in self.kb.instructions() {
            let command = &instruction.command;
            if !matches(command) || !added.insert(command.to_lowercase()) {
                continue;
            }
            let insert_text = if instruction.parameters.is_empty() {
                format!("{command}()")
            } else {
                format!("{command}(${{1}})")
            };
            let mut candidate =
                Candidate::new(command, "Jenkins Step", insert_text, CandidateKind::Function);
            candidate.detail =
                (!instruction.description.is_empty()).then(|| instruction.description.clone());
            candidates.push(candidate);
        }

        // Blocks are offered even when a step of the same name was added
        for section in self.kb.sections() {
            if matches(&section.name) {
                candidates.push(block_candidate(
                    section,
                    "Jenkins Section",
                    CandidateKind::Section,
                ));
            }
        }

        for directive in self.kb.directives() {
            if matches(&directive.name) {
                candidates.push(block_candidate(
                    directive,
                    "Jenkins Directive",
                    CandidateKind::Directive,
                ));
            }
        }

        for var in self.kb.environment_variables() {
            if matches(&var.name) && added.insert(format!("env.{}", var.name.to_lowercase())) {
                let mut candidate = Candidate::new(
                    &var.name,
                    "Environment Variable",
                    format!("env.{}", var.name),
                    CandidateKind::EnvironmentVariable,
                );
                candidate.detail = (!var.description.is_empty()).then(|| var.description.clone());
                candidates.push(candidate);
            }
        }

        candidates
    }
}
