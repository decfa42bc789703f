//! Documentation payloads for hover popups.
//!
//! Knowledge base text is scraped from third-party documentation, so every
//! source-derived field is HTML-escaped when the payload is built. The
//! presentation helpers only ever concatenate already-escaped text.

use serde::Serialize;
use std::fmt::Write;

use crate::knowledge_base::{Construct, EntityKind, EntityRef, Instruction};

const DOC_LINK_TEXT: &str = "View Documentation";

/// Escape `& < > " '` for embedding in HTML text and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Reverse [`escape_html`], for presentations other than HTML.
pub fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

/// Backslash-escape the characters Markdown would treat as markup.
fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(
            ch,
            '\\' | '`' | '*' | '_' | '[' | ']' | '(' | ')' | '<' | '>' | '&' | '#' | '|' | '~' | '!'
        ) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Inline code span; the fence is one backtick longer than any run inside.
fn code_span(text: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for ch in text.chars() {
        run = if ch == '`' { run + 1 } else { 0 };
        longest = longest.max(run);
    }
    let fence = "`".repeat(longest + 1);
    if longest == 0 {
        format!("{fence}{text}{fence}")
    } else {
        format!("{fence} {text} {fence}")
    }
}

/// Percent-encode the characters that would end a link destination early.
fn link_destination(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    for ch in url.chars() {
        match ch {
            ' ' => out.push_str("%20"),
            '(' => out.push_str("%28"),
            ')' => out.push_str("%29"),
            '<' => out.push_str("%3C"),
            '>' => out.push_str("%3E"),
            _ => out.push(ch),
        }
    }
    out
}

/// One documented parameter. All text is escaped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterDoc {
    pub name: String,
    pub param_type: String,
    pub optional: bool,
    /// Enum values; empty for other types
    pub values: Vec<String>,
    pub description: String,
}

/// Structured documentation for one entity. All text is escaped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocPayload {
    pub title: String,
    pub kind: EntityKind,
    pub kind_label: &'static str,
    pub description_html: String,
    /// Present only for instructions that declare parameters
    pub parameters: Option<Vec<ParameterDoc>>,
    /// Location constraint of a section or directive
    pub allowed: Option<String>,
    pub url: Option<String>,
}

fn escape_opt(text: Option<&String>) -> Option<String> {
    text.filter(|t| !t.is_empty()).map(|t| escape_html(t))
}

fn render_instruction(instruction: &Instruction) -> DocPayload {
    let parameters = (!instruction.parameters.is_empty()).then(|| {
        instruction
            .parameters
            .iter()
            .map(|param| ParameterDoc {
                name: escape_html(&param.name),
                param_type: escape_html(&param.param_type),
                optional: param.is_optional,
                values: param.values.iter().map(|v| escape_html(v)).collect(),
                description: escape_html(&param.description),
            })
            .collect()
    });

    DocPayload {
        title: escape_html(&instruction.name),
        kind: EntityKind::Instruction,
        kind_label: EntityKind::Instruction.label(),
        description_html: escape_html(&instruction.description),
        parameters,
        allowed: None,
        url: escape_opt(instruction.url.as_ref()),
    }
}

fn render_construct(construct: &Construct, kind: EntityKind) -> DocPayload {
    DocPayload {
        title: escape_html(&construct.name),
        kind,
        kind_label: kind.label(),
        description_html: escape_html(&construct.description),
        parameters: None,
        allowed: escape_opt(construct.allowed.as_ref()),
        url: escape_opt(construct.url.as_ref()),
    }
}

/// Build the documentation payload for a resolved entity.
pub fn render(entity: &EntityRef<'_>) -> DocPayload {
    match entity {
        EntityRef::Instruction(instruction) => render_instruction(instruction),
        EntityRef::Section(section) => render_construct(section, EntityKind::Section),
        EntityRef::Directive(directive) => render_construct(directive, EntityKind::Directive),
        EntityRef::EnvironmentVariable(var) => DocPayload {
            title: escape_html(&var.name),
            kind: EntityKind::EnvironmentVariable,
            kind_label: EntityKind::EnvironmentVariable.label(),
            description_html: escape_html(&var.description),
            parameters: None,
            allowed: None,
            url: None,
        },
    }
}

impl DocPayload {
    /// Popup markup.
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        let _ = write!(
            html,
            "<div class=\"content-wrapper\"><h3>{}</h3><div class=\"section-info\">{}</div><p>{}</p>",
            self.title, self.kind_label, self.description_html
        );

        if let Some(parameters) = &self.parameters {
            html.push_str("<h4>Parameters</h4><ul>");
            for param in parameters {
                let optional = if param.optional { "(Optional)" } else { "" };
                let _ = write!(
                    html,
                    "<li><div><span class=\"param-name\">{}</span> <span class=\"param-type\">{}</span> <span class=\"param-optional\">{}</span></div>",
                    param.name, param.param_type, optional
                );
                if !param.values.is_empty() {
                    html.push_str("<div class=\"param-values\"><strong>Values:</strong><ul>");
                    for value in &param.values {
                        let _ = write!(html, "<li>{value}</li>");
                    }
                    html.push_str("</ul></div>");
                }
                let _ = write!(html, "<div class=\"param-desc\">{}</div></li>", param.description);
            }
            html.push_str("</ul>");
        }

        if let Some(allowed) = &self.allowed {
            let _ = write!(
                html,
                "<div class=\"section-info\"><span class=\"type-label\">Allowed</span> {allowed}</div>"
            );
        }
        html.push_str("</div>");

        if let Some(url) = &self.url {
            let _ = write!(html, "<a href=\"{url}\" class=\"doc-link\">{DOC_LINK_TEXT}</a>");
        }
        html
    }

    /// Markdown for LSP hover content.
    ///
    /// Payload text is HTML-escaped, so it is unescaped first and then
    /// escaped for Markdown instead.
    pub fn to_markdown(&self) -> String {
        let text = |html: &str| escape_markdown(&unescape_html(html));

        let mut md = format!("**{}** _{}_", text(&self.title), self.kind_label);
        if !self.description_html.is_empty() {
            let _ = write!(md, "\n\n{}", text(&self.description_html));
        }

        if let Some(parameters) = &self.parameters {
            md.push_str("\n\n**Parameters**\n");
            for param in parameters {
                let _ = write!(
                    md,
                    "\n- {} {}",
                    code_span(&unescape_html(&param.name)),
                    text(&param.param_type)
                );
                if param.optional {
                    md.push_str(" (Optional)");
                }
                if !param.values.is_empty() {
                    let values: Vec<String> = param.values.iter().map(|v| text(v)).collect();
                    let _ = write!(md, " Values: {}", values.join(", "));
                }
                if !param.description.is_empty() {
                    let _ = write!(md, " - {}", text(&param.description));
                }
            }
        }

        if let Some(allowed) = &self.allowed {
            let _ = write!(md, "\n\n**Allowed:** {}", text(allowed));
        }
        if let Some(url) = &self.url {
            let _ = write!(
                md,
                "\n\n[{DOC_LINK_TEXT}]({})",
                link_destination(&unescape_html(url))
            );
        }
        md
    }
}
