//! Notebook schema conformance checking
//!
//! A notebook is checked against the schema registered for its declared
//! format version. Conformance failures come back as
//! [`ValidationOutcome::Invalid`]; only problems that prevent the check
//! from running are errors.
//!
//! ## Error refinement
//!
//! Cells and outputs are `oneOf` unions in the nbformat schemas, so a bad
//! cell normally yields a single "not valid under any of the given schemas"
//! error. When the failing object names its own variant through
//! `cell_type` or `output_type`, it is re-checked against just that
//! definition and the more specific violations are reported instead.

use std::fmt;
use std::path::Path;

use jsonschema::error::ValidationErrorKind;
use jsonschema::ValidationError;
use serde_json::Value;
use tracing::debug;

use crate::config::ValidationConfig;
use crate::error::Result;
use crate::notebook::Notebook;
use crate::registry::{MinorVersionPolicy, RegisteredSchema, SchemaRegistry};
use crate::version::FormatVersion;

/// A single schema violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON Pointer to the offending value in the notebook
    pub instance_path: String,
    /// JSON Pointer to the schema keyword that rejected it
    pub schema_path: String,
    /// Human-readable description
    pub message: String,
}

impl Violation {
    fn from_error(error: &ValidationError<'_>) -> Self {
        Self {
            instance_path: error.instance_path.to_string(),
            schema_path: error.schema_path.to_string(),
            message: error.to_string(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.instance_path, self.message)
        }
    }
}

/// Why a notebook does not conform to its schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    declared: FormatVersion,
    schema_version: FormatVersion,
    violations: Vec<Violation>,
}

impl ValidationFailure {
    /// Version the notebook declares
    pub fn declared_version(&self) -> FormatVersion {
        self.declared
    }

    /// Version of the schema that was applied
    pub fn schema_version(&self) -> FormatVersion {
        self.schema_version
    }

    /// The first violation found
    pub fn primary(&self) -> &Violation {
        // Constructed only from a non-empty list
        &self.violations[0]
    }

    /// All violations, in discovery order
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.primary())
    }
}

/// Result of a completed schema check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    Invalid(ValidationFailure),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid)
    }

    /// The failure details, if the notebook is invalid
    pub fn failure(&self) -> Option<&ValidationFailure> {
        match self {
            ValidationOutcome::Valid => None,
            ValidationOutcome::Invalid(failure) => Some(failure),
        }
    }
}

/// Checks notebooks against the nbformat schemas
#[derive(Debug)]
pub struct NotebookValidator {
    registry: SchemaRegistry,
    minor_policy: MinorVersionPolicy,
    refine_errors: bool,
}

impl NotebookValidator {
    /// Validator over the embedded schemas
    pub fn new(config: &ValidationConfig) -> Result<Self> {
        Ok(Self::with_registry(SchemaRegistry::embedded()?, config))
    }

    /// Validator over a caller-supplied registry
    pub fn with_registry(registry: SchemaRegistry, config: &ValidationConfig) -> Self {
        let minor_policy = if config.allow_newer_minor {
            MinorVersionPolicy::UseLatest
        } else {
            MinorVersionPolicy::Reject
        };

        Self {
            registry,
            minor_policy,
            refine_errors: config.refine_errors,
        }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Read a notebook file and check it
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<ValidationOutcome> {
        let path = path.as_ref();
        let notebook = Notebook::from_path(path)?;
        let outcome = self.validate(&notebook)?;

        debug!(
            path = %path.display(),
            version = %notebook.version(),
            cells = notebook.cell_count(),
            valid = outcome.is_valid(),
            "validated notebook"
        );
        Ok(outcome)
    }

    /// Check a parsed notebook against the schema for its declared version
    pub fn validate(&self, notebook: &Notebook) -> Result<ValidationOutcome> {
        let schema = self.registry.resolve(notebook.version(), self.minor_policy)?;

        let errors = match schema.compiled().validate(notebook.content()) {
            Ok(()) => return Ok(ValidationOutcome::Valid),
            Err(errors) => errors,
        };

        let mut violations = Vec::new();
        for error in errors {
            violations.extend(self.describe(schema, &error, true)?);
        }

        Ok(ValidationOutcome::Invalid(ValidationFailure {
            declared: notebook.version(),
            schema_version: schema.version(),
            violations,
        }))
    }

    fn describe(
        &self,
        schema: &RegisteredSchema,
        error: &ValidationError<'_>,
        may_refine: bool,
    ) -> Result<Vec<Violation>> {
        let violation = Violation::from_error(error);

        let refinable = self.refine_errors
            && may_refine
            && matches!(error.kind, ValidationErrorKind::OneOfNotValid);
        let Some(definition) = refinable.then(|| variant_definition(&error.instance)).flatten()
        else {
            return Ok(vec![violation]);
        };
        let Some(validator) = schema.definition_validator(&definition) else {
            return Ok(vec![violation]);
        };
        let validator = validator?;

        let inner_errors = match validator.validate(&error.instance) {
            Ok(()) => return Ok(vec![violation]),
            Err(errors) => errors,
        };

        let mut refined = Vec::new();
        for inner in inner_errors {
            // An error on the same object again would refine forever
            let nested = !inner.instance_path.to_string().is_empty();
            for mut v in self.describe(schema, &inner, nested)? {
                v.instance_path = format!("{}{}", violation.instance_path, v.instance_path);
                v.schema_path = format!("/definitions/{}{}", definition, v.schema_path);
                refined.push(v);
            }
        }

        if refined.is_empty() {
            refined.push(violation);
        }
        Ok(refined)
    }
}

/// Name of the schema definition an object claims to be, from its discriminator
fn variant_definition(instance: &Value) -> Option<String> {
    if let Some(cell_type) = instance.get("cell_type").and_then(Value::as_str) {
        return Some(format!("{}_cell", cell_type));
    }
    instance
        .get("output_type")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Check a notebook file with the default configuration
pub fn is_notebook_valid(path: impl AsRef<Path>) -> Result<ValidationOutcome> {
    NotebookValidator::new(&ValidationConfig::default())?.validate_path(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NotebookError;
    use serde_json::json;

    fn validator() -> NotebookValidator {
        NotebookValidator::new(&ValidationConfig::default()).unwrap()
    }

    fn check(doc: Value) -> ValidationOutcome {
        let notebook = Notebook::from_value(doc).unwrap();
        validator().validate(&notebook).unwrap()
    }

    fn code_cell(id: &str) -> Value {
        json!({
            "id": id,
            "cell_type": "code",
            "metadata": {},
            "source": "print('hi')",
            "outputs": [],
            "execution_count": null
        })
    }

    #[test]
    fn test_empty_notebook_is_valid() {
        let outcome = check(json!({"nbformat": 4, "nbformat_minor": 5, "cells": [], "metadata": {}}));
        assert_eq!(outcome, ValidationOutcome::Valid);
    }

    #[test]
    fn test_unknown_cell_type_is_invalid() {
        let outcome = check(json!({
            "nbformat": 4, "nbformat_minor": 5,
            "cells": [{"cell_type": "bogus"}],
            "metadata": {}
        }));
        let failure = outcome.failure().expect("should be invalid");
        assert_eq!(failure.primary().instance_path, "/cells/0");
        assert!(!failure.to_string().is_empty());
    }

    #[test]
    fn test_refined_error_points_at_field() {
        let mut cell = code_cell("a1");
        cell["execution_count"] = json!("one");
        let outcome = check(json!({
            "nbformat": 4, "nbformat_minor": 5, "cells": [cell], "metadata": {}
        }));

        let failure = outcome.failure().expect("should be invalid");
        assert!(failure
            .violations()
            .iter()
            .any(|v| v.instance_path == "/cells/0/execution_count"));
        assert!(failure.primary().schema_path.starts_with("/definitions/code_cell"));
    }

    #[test]
    fn test_refinement_can_be_disabled() {
        let mut cell = code_cell("a1");
        cell["execution_count"] = json!("one");
        let notebook = Notebook::from_value(json!({
            "nbformat": 4, "nbformat_minor": 5, "cells": [cell], "metadata": {}
        }))
        .unwrap();

        let config = ValidationConfig {
            refine_errors: false,
            ..ValidationConfig::default()
        };
        let outcome = NotebookValidator::new(&config).unwrap().validate(&notebook).unwrap();
        let failure = outcome.failure().expect("should be invalid");
        assert_eq!(failure.primary().instance_path, "/cells/0");
    }

    #[test]
    fn test_nested_output_refinement() {
        let mut cell = code_cell("a1");
        cell["outputs"] = json!([{"output_type": "stream", "name": "stdout"}]);
        let outcome = check(json!({
            "nbformat": 4, "nbformat_minor": 5, "cells": [cell], "metadata": {}
        }));

        let failure = outcome.failure().expect("should be invalid");
        assert_eq!(failure.primary().instance_path, "/cells/0/outputs/0");
        assert!(failure.primary().message.contains("text"));
    }

    #[test]
    fn test_cell_id_required_from_4_5() {
        let mut cell = code_cell("unused");
        cell.as_object_mut().unwrap().remove("id");

        let v45 = check(json!({
            "nbformat": 4, "nbformat_minor": 5, "cells": [cell.clone()], "metadata": {}
        }));
        assert!(!v45.is_valid());

        let v44 = check(json!({
            "nbformat": 4, "nbformat_minor": 4, "cells": [cell], "metadata": {}
        }));
        assert!(v44.is_valid());
    }

    #[test]
    fn test_newer_minor_uses_latest_schema() {
        let doc = json!({"nbformat": 4, "nbformat_minor": 9, "cells": [code_cell("x")], "metadata": {}});
        assert!(check(doc.clone()).is_valid());

        let strict = ValidationConfig {
            allow_newer_minor: false,
            ..ValidationConfig::default()
        };
        let notebook = Notebook::from_value(doc).unwrap();
        assert!(matches!(
            NotebookValidator::new(&strict).unwrap().validate(&notebook),
            Err(NotebookError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_unknown_major_is_unsupported() {
        let notebook =
            Notebook::from_value(json!({"nbformat": 5, "nbformat_minor": 0, "cells": []})).unwrap();
        assert!(matches!(
            validator().validate(&notebook),
            Err(NotebookError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_failure_reports_versions() {
        let outcome = check(json!({"nbformat": 4, "nbformat_minor": 2, "cells": "none", "metadata": {}}));
        let failure = outcome.failure().expect("should be invalid");
        assert_eq!(failure.declared_version(), FormatVersion::new(4, 2));
        assert_eq!(failure.schema_version(), FormatVersion::new(4, 4));
        assert_eq!(failure.primary().instance_path, "/cells");
    }

    #[test]
    fn test_violation_display() {
        let root = Violation {
            instance_path: String::new(),
            schema_path: "/required".to_string(),
            message: "\"cells\" is a required property".to_string(),
        };
        assert_eq!(root.to_string(), "(root): \"cells\" is a required property");
    }
}
