//! Notebook format versioning utilities

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{NotebookError, Result};

/// Root field holding the major format number
pub const MAJOR_FIELD: &str = "nbformat";
/// Root field holding the minor format number
pub const MINOR_FIELD: &str = "nbformat_minor";

/// The (major, minor) format version a notebook declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FormatVersion {
    /// Incremented for backwards incompatible changes
    pub major: u32,
    /// Incremented for backwards compatible changes
    pub minor: u32,
}

impl FormatVersion {
    /// Create a new format version
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse a version string such as "4.5", "v4.5" or "4"
    pub fn parse(version_str: &str) -> Result<Self> {
        // Strip leading 'v' if present
        let trimmed = version_str.strip_prefix('v').unwrap_or(version_str);
        let invalid = || NotebookError::InvalidVersion {
            field: MAJOR_FIELD,
            value: version_str.to_string(),
        };

        let (major, minor) = match trimmed.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (trimmed, "0"),
        };
        let major = major.parse().map_err(|_| invalid())?;
        let minor = minor.parse().map_err(|_| invalid())?;
        Ok(Self::new(major, minor))
    }

    /// Read the declared version from a parsed notebook document.
    ///
    /// A missing minor defaults to 0; a missing major is an error.
    pub fn from_document(document: &Value) -> Result<Self> {
        let root = document.as_object().ok_or(NotebookError::NotAnObject)?;

        let major = root.get(MAJOR_FIELD).ok_or(NotebookError::MissingVersion)?;
        let major = version_number(MAJOR_FIELD, major)?;

        let minor = match root.get(MINOR_FIELD) {
            Some(value) => version_number(MINOR_FIELD, value)?,
            None => 0,
        };

        Ok(Self::new(major, minor))
    }

    /// Schema file name for this version (e.g. "nbformat.v4.5.schema.json")
    pub fn schema_file_name(&self) -> String {
        format!("nbformat.v{}.{}.schema.json", self.major, self.minor)
    }

    /// Parse a schema file name back into a version
    pub fn from_schema_file_name(name: &str) -> Option<Self> {
        let version = name
            .strip_prefix("nbformat.v")?
            .strip_suffix(".schema.json")?;
        Self::parse(version).ok()
    }
}

/// Accepts non-negative integral JSON numbers, including the float spelling `4.0`
fn version_number(field: &'static str, value: &Value) -> Result<u32> {
    let invalid = || NotebookError::InvalidVersion {
        field,
        value: value.to_string(),
    };

    let number = match value {
        Value::Number(n) => n,
        _ => return Err(invalid()),
    };

    if let Some(n) = number.as_u64() {
        return u32::try_from(n).map_err(|_| invalid());
    }

    match number.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= f64::from(u32::MAX) => Ok(f as u32),
        _ => Err(invalid()),
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
