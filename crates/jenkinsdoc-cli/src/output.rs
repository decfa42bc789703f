//! Output formatting for the CLI.

use std::fmt::Write;

use colored::Colorize;
use jenkinsdoc_core::render::unescape_html;
use jenkinsdoc_core::{Candidate, CandidateKind, CompletionList, DiagnosticsReport, DocPayload};
use serde::Serialize;

use crate::OutputFormat;

pub fn format_doc(payload: &DocPayload, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(payload)?,
        OutputFormat::Html => payload.to_html(),
        OutputFormat::Text => doc_text(payload),
    })
}

fn doc_text(payload: &DocPayload) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}  {}",
        unescape_html(&payload.title).bold(),
        payload.kind_label.dimmed()
    );
    if !payload.description_html.is_empty() {
        let _ = writeln!(out, "\n{}", unescape_html(&payload.description_html));
    }

    if let Some(parameters) = &payload.parameters {
        let _ = writeln!(out, "\n{}", "Parameters:".bold());
        for param in parameters {
            let optional = if param.optional { " (Optional)" } else { "" };
            let _ = writeln!(
                out,
                "  {}  {}{}",
                unescape_html(&param.name).cyan(),
                unescape_html(&param.param_type),
                optional.dimmed()
            );
            if !param.values.is_empty() {
                let values: Vec<String> = param.values.iter().map(|v| unescape_html(v)).collect();
                let _ = writeln!(out, "      Values: {}", values.join(", "));
            }
            if !param.description.is_empty() {
                let _ = writeln!(out, "      {}", unescape_html(&param.description));
            }
        }
    }

    if let Some(allowed) = &payload.allowed {
        let _ = writeln!(out, "\n{} {}", "Allowed:".bold(), unescape_html(allowed));
    }
    if let Some(url) = &payload.url {
        let _ = writeln!(out, "\n{}", unescape_html(url).underline());
    }
    out
}

fn kind_name(kind: CandidateKind) -> &'static str {
    match kind {
        CandidateKind::Keyword => "keyword",
        CandidateKind::Function => "step",
        CandidateKind::Section => "section",
        CandidateKind::Directive => "directive",
        CandidateKind::Parameter => "parameter",
        CandidateKind::EnvironmentVariable => "environment",
        CandidateKind::PostCondition => "post-condition",
    }
}

#[derive(Serialize)]
struct CandidateJson<'a> {
    label: &'a str,
    trigger: &'a str,
    insert_text: &'a str,
    kind: &'static str,
    detail: Option<&'a str>,
}

#[derive(Serialize)]
struct CompletionJson<'a> {
    inhibit_word_completions: bool,
    items: Vec<CandidateJson<'a>>,
}

fn candidate_json(candidate: &Candidate) -> CandidateJson<'_> {
    CandidateJson {
        label: &candidate.label,
        trigger: candidate.trigger(),
        insert_text: &candidate.insert_text,
        kind: kind_name(candidate.kind),
        detail: candidate.detail.as_deref(),
    }
}

pub fn format_completions(list: &CompletionList, format: OutputFormat) -> anyhow::Result<String> {
    if format == OutputFormat::Json {
        let json = CompletionJson {
            inhibit_word_completions: list.inhibit_word_completions,
            items: list.items.iter().map(candidate_json).collect(),
        };
        return Ok(serde_json::to_string_pretty(&json)?);
    }

    let width = list
        .items
        .iter()
        .map(|c| c.trigger().chars().count())
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    for candidate in &list.items {
        let trigger = candidate.trigger();
        let padding = " ".repeat(width - trigger.chars().count());
        let _ = writeln!(
            out,
            "{}{}  {}",
            trigger.green(),
            padding,
            candidate.annotation().unwrap_or_default().dimmed()
        );
    }
    Ok(out)
}

pub fn format_report(report: &DiagnosticsReport, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(report)?,
        OutputFormat::Text | OutputFormat::Html => report.to_string(),
    })
}
