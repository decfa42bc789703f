//! jenkinsdoc - Jenkins Pipeline documentation from the command line

mod output;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use jenkinsdoc_core::context::split_at_cursor;
use jenkinsdoc_core::text::trailing_word;
use jenkinsdoc_core::{DefinitionFile, DocConfig, JenkinsDoc, KnowledgeBase, SearchScope};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jenkinsdoc")]
#[command(about = "Jenkins Pipeline documentation, completion and navigation", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Knowledge base JSON file, replacing the bundled data
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Config file (.jenkinsdoc.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Html,
}

#[derive(Args)]
struct CursorArgs {
    /// Pipeline script to read
    file: PathBuf,

    /// Cursor line (1-based)
    #[arg(long)]
    line: usize,

    /// Cursor column in characters (1-based); defaults to the end of the line
    #[arg(long)]
    column: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show documentation for the word at a position
    Hover(CursorArgs),

    /// List completion candidates at a position
    Complete {
        #[command(flatten)]
        cursor: CursorArgs,

        /// Word being completed; defaults to the identifier left of the cursor
        #[arg(long)]
        prefix: Option<String>,
    },

    /// Find the declaration of the function at a position
    Definition {
        #[command(flatten)]
        cursor: CursorArgs,

        /// Project root to search (repeatable, defaults to the current directory)
        #[arg(long = "root")]
        roots: Vec<PathBuf>,
    },

    /// Print the diagnostics report
    Info {
        /// Report how this file is detected
        file: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let engine = load_engine(cli.config.as_deref(), cli.data.as_deref())?;
    let format = cli.format;

    match cli.command {
        Commands::Hover(cursor) => {
            let text = read_source(&cursor.file)?;
            let offset = cursor_offset(&text, cursor.line, cursor.column);
            match engine.hover(&text, offset) {
                Some(payload) => {
                    print!("{}", with_newline(output::format_doc(&payload, format)?));
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    eprintln!("No documentation at {}", cursor_label(&cursor));
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Commands::Complete { cursor, prefix } => {
            let text = read_source(&cursor.file)?;
            let offset = cursor_offset(&text, cursor.line, cursor.column);
            let prefix = prefix.unwrap_or_else(|| {
                let (_, line) = split_at_cursor(&text, offset);
                trailing_word(line).to_string()
            });
            let list = engine.completions(&text, offset, &prefix);
            print!("{}", output::format_completions(&list, format)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Definition { cursor, roots } => definition(&engine, &cursor, roots, format),
        Commands::Info { file } => {
            let report = engine.diagnostics_report(file.as_deref(), None);
            print!("{}", with_newline(output::format_report(&report, format)?));
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn definition(
    engine: &JenkinsDoc,
    cursor: &CursorArgs,
    roots: Vec<PathBuf>,
    format: OutputFormat,
) -> Result<ExitCode> {
    if !engine.config().enable_goto_definition {
        eprintln!("Go to definition is disabled");
        return Ok(ExitCode::FAILURE);
    }

    let text = read_source(&cursor.file)?;
    let offset = cursor_offset(&text, cursor.line, cursor.column);
    let Some(target) = engine.definition_target_at(&text, offset) else {
        eprintln!("No identifier at {}", cursor_label(cursor));
        return Ok(ExitCode::FAILURE);
    };

    let roots = if roots.is_empty() {
        vec![std::env::current_dir().context("Failed to read the current directory")?]
    } else {
        roots
    };
    let scope = SearchScope {
        current_text: Some(&text),
        roots: &roots,
    };

    match engine.definition(&target, &scope) {
        Ok(location) => {
            let file = match &location.file {
                DefinitionFile::Current => cursor.file.clone(),
                DefinitionFile::Path(path) => path.clone(),
            };
            let line = location.line + 1;
            if format == OutputFormat::Json {
                let json = serde_json::json!({
                    "target": target.to_string(),
                    "file": file,
                    "line": line,
                });
                println!("{}", serde_json::to_string_pretty(&json)?);
            } else {
                println!("{}:{}", file.display(), line);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(miss) => {
            eprintln!("{miss}");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Engine from the given config and data files; bundled data and default
/// settings otherwise. A relative `data_file` in the config resolves
/// against the config file's directory.
fn load_engine(config_path: Option<&Path>, data: Option<&Path>) -> Result<JenkinsDoc> {
    let mut config = match config_path {
        Some(path) => {
            let mut config = DocConfig::load(path)?;
            if let (Some(data_file), Some(dir)) = (&config.data_file, path.parent()) {
                if data_file.is_relative() {
                    config.data_file = Some(dir.join(data_file));
                }
            }
            config
        }
        None => DocConfig::default(),
    };
    if let Some(data) = data {
        config.data_file = Some(data.to_path_buf());
    }

    let kb = match &config.data_file {
        Some(path) => KnowledgeBase::load(path)
            .with_context(|| format!("Failed to load Jenkins data from {}", path.display()))?,
        None => KnowledgeBase::bundled(),
    };
    tracing::debug!(summary = ?kb.summary(), "knowledge base loaded");
    Ok(JenkinsDoc::init(kb, config))
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn cursor_label(cursor: &CursorArgs) -> String {
    match cursor.column {
        Some(column) => format!("{}:{}:{}", cursor.file.display(), cursor.line, column),
        None => format!("{}:{}", cursor.file.display(), cursor.line),
    }
}

fn with_newline(mut text: String) -> String {
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

/// Byte offset for a 1-based line and character column. Lines past the end
/// clamp to the end of the text, columns past the end of a line clamp to the
/// end of that line.
fn cursor_offset(text: &str, line: usize, column: Option<usize>) -> usize {
    let mut line_start = 0;
    for _ in 1..line.max(1) {
        match text[line_start..].find('\n') {
            Some(newline) => line_start += newline + 1,
            None => return text.len(),
        }
    }
    let line_end = text[line_start..]
        .find('\n')
        .map_or(text.len(), |i| line_start + i);

    let Some(column) = column else {
        return line_end;
    };
    text[line_start..line_end]
        .char_indices()
        .nth(column.saturating_sub(1))
        .map_or(line_end, |(i, _)| line_start + i)
}
