//! # jenkinsdoc-lsp
//!
//! Language Server Protocol implementation for jenkinsdoc.
//!
//! Brings Jenkins Pipeline documentation to editors that speak LSP
//! (VS Code, Neovim, Helix, Zed, etc.).
//!
//! ## Features
//!
//! - Hover documentation for steps, sections, directives and `env.*` variables
//! - Context-aware completion (step parameters, `env.`, `post` conditions)
//! - Go to definition for Groovy functions in the workspace
//! - A `jenkinsdoc/status` notification carrying the status indicator text
//!
//! ## Usage
//!
//! ```bash
//! jenkinsdoc-lsp
//! ```
//!
//! The server communicates over stdin/stdout using the LSP protocol.

mod backend;
mod completion_provider;
mod definition_provider;
mod hover_provider;
mod position;

pub use backend::{Backend, RELOAD_COMMAND, DIAGNOSTICS_COMMAND, StatusNotification, StatusParams};

use tower_lsp::{LspService, Server};

/// Start the LSP server.
///
/// This function sets up stdin/stdout communication and runs the server
/// until shutdown is requested.
///
/// # Errors
///
/// Returns an error if the server fails to start or encounters a fatal error.
pub async fn start_server() -> anyhow::Result<()> {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(Backend::new);
    Server::new(stdin, stdout, socket).serve(service).await;
    Ok(())
}
