//! Notebook documents

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{NotebookError, Result};
use crate::version::FormatVersion;

/// Placeholder path used when a notebook does not come from a file
const INLINE_SOURCE: &str = "<input>";

/// A parsed notebook with its declared format version.
///
/// The content is kept as raw JSON: cells and metadata are only
/// interpreted by the schema check.
#[derive(Debug, Clone, PartialEq)]
pub struct Notebook {
    version: FormatVersion,
    content: Value,
}

impl Notebook {
    /// Build a notebook from an already parsed JSON document
    pub fn from_value(content: Value) -> Result<Self> {
        let version = FormatVersion::from_document(&content)?;
        Ok(Self { version, content })
    }

    /// Read and parse a notebook file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| NotebookError::io(path, e))?;
        Self::read(BufReader::new(file), path)
    }

    /// Parse a notebook from any reader
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        Self::read(reader, Path::new(INLINE_SOURCE))
    }

    /// Parse a notebook from a JSON string
    pub fn parse(content: &str) -> Result<Self> {
        let value = serde_json::from_str(content).map_err(|source| NotebookError::NotJson {
            path: PathBuf::from(INLINE_SOURCE),
            source,
        })?;
        Self::from_value(value)
    }

    fn read(reader: impl Read, path: &Path) -> Result<Self> {
        let value: Value = serde_json::from_reader(reader).map_err(|source| {
            // serde_json surfaces read failures as its own error kind
            if source.is_io() {
                NotebookError::io(path, source.into())
            } else {
                NotebookError::NotJson {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        Self::from_value(value)
    }

    /// The declared format version
    pub fn version(&self) -> FormatVersion {
        self.version
    }

    /// The raw JSON document
    pub fn content(&self) -> &Value {
        &self.content
    }

    /// Number of top-level cells (v4) or cells across all worksheets (v3)
    pub fn cell_count(&self) -> usize {
        let count = |cells: Option<&Value>| cells.and_then(Value::as_array).map_or(0, Vec::len);

        match self.content.get("worksheets").and_then(Value::as_array) {
            Some(worksheets) => worksheets.iter().map(|w| count(w.get("cells"))).sum(),
            None => count(self.content.get("cells")),
        }
    }

    /// Consume the notebook, returning the JSON document
    pub fn into_content(self) -> Value {
        self.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"{"nbformat": 4, "nbformat_minor": 5, "cells": [], "metadata": {}}"#;

    #[test]
    fn test_parse_minimal() {
        let nb = Notebook::parse(MINIMAL).unwrap();
        assert_eq!(nb.version(), FormatVersion::new(4, 5));
        assert_eq!(nb.cell_count(), 0);
    }

    #[test]
    fn test_parse_not_json() {
        let err = Notebook::parse("{not json").unwrap_err();
        assert!(matches!(err, NotebookError::NotJson { .. }));
        assert!(err.to_string().starts_with("<input> is not valid JSON"));
    }

    #[test]
    fn test_from_path_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.ipynb");
        match Notebook::from_path(&missing) {
            Err(NotebookError::Io { path, .. }) => assert_eq!(path, missing),
            other => panic!("Expected Io error, got {:?}", other),
        }
    }

    #[test]
    fn test_from_path_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let nb = Notebook::from_path(file.path()).unwrap();
        assert_eq!(nb.content()["metadata"], serde_json::json!({}));
    }

    #[test]
    fn test_v3_cell_count() {
        let nb = Notebook::parse(
            r#"{"nbformat": 3, "nbformat_minor": 0, "metadata": {},
                "worksheets": [{"cells": [{"cell_type": "markdown", "source": "a"}]},
                               {"cells": [{"cell_type": "raw", "source": "b"}]}]}"#,
        )
        .unwrap();
        assert_eq!(nb.cell_count(), 2);
    }
}
