//! Error types for loading data and configuration

use std::path::PathBuf;
use thiserror::Error;

pub type DocResult<T> = Result<T, DocError>;

/// Failures on the loading paths (knowledge base files, config files,
/// project sources). Resolution and rendering never produce these.
#[derive(Error, Debug)]
pub enum DocError {
    #[error("Failed to read file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration in {path}: {message}")]
    InvalidConfig { path: PathBuf, message: String },
}
