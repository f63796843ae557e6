//! Error types for notebook validation
//!
//! A schema violation is not an error: it is reported as
//! [`ValidationOutcome::Invalid`](crate::validator::ValidationOutcome).
//! Everything here means the check could not be carried out at all.
//!
//! Messages do not repeat their source error; render with `{:#}` through
//! `anyhow` (or walk `source()`) to see the whole chain.

use std::path::PathBuf;

use thiserror::Error;

use crate::version::FormatVersion;

/// Result type for notebook operations
pub type Result<T> = std::result::Result<T, NotebookError>;

/// Notebook validation errors
#[derive(Error, Debug)]
pub enum NotebookError {
    #[error("cannot read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not valid JSON", path.display())]
    NotJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("notebook root must be a JSON object")]
    NotAnObject,

    #[error("notebook has no 'nbformat' version field")]
    MissingVersion,

    #[error("invalid '{field}' value: {value}")]
    InvalidVersion { field: &'static str, value: String },

    #[error("unsupported nbformat version {version} (supported: {})", supported.join(", "))]
    UnsupportedVersion {
        version: FormatVersion,
        supported: Vec<String>,
    },

    #[error("schema {name} could not be loaded: {reason}")]
    SchemaLoad { name: String, reason: String },

    #[error("directory walk failed")]
    Walk(#[from] ignore::Error),

    #[error("configuration error")]
    Config(#[from] config_crate::ConfigError),
}

impl NotebookError {
    /// Wrap an I/O error with the path it happened on
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        NotebookError::Io {
            path: path.into(),
            source,
        }
    }
}
