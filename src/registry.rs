//! Schema Registry
//!
//! Holds the nbformat JSON schemas, keyed by the format version they
//! describe. The schemas under `schemas/` are compiled into the binary;
//! a registry can also be loaded from a directory on disk.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use include_dir::{include_dir, Dir};
use jsonschema::{Draft, JSONSchema};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{NotebookError, Result};
use crate::version::FormatVersion;

static EMBEDDED_SCHEMAS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/schemas");

/// Value of `$schema` in every nbformat schema
const DRAFT4_META_SCHEMA: &str = "http://json-schema.org/draft-04/schema#";

/// What to do when a notebook declares a minor version newer than any
/// registered schema for its major version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MinorVersionPolicy {
    /// Validate against the newest known minor, as nbformat does
    #[default]
    UseLatest,
    /// Treat the version as unsupported
    Reject,
}

/// A compiled schema together with its source document
pub struct RegisteredSchema {
    version: FormatVersion,
    name: String,
    document: Value,
    compiled: JSONSchema,
    /// One slot per `#/definitions/<name>`, compiled on first use
    definition_validators: HashMap<String, OnceLock<std::result::Result<JSONSchema, String>>>,
}

impl RegisteredSchema {
    fn compile(name: impl Into<String>, version: FormatVersion, document: Value) -> Result<Self> {
        let name = name.into();
        let compiled = compile_draft4(&document).map_err(|reason| NotebookError::SchemaLoad {
            name: name.clone(),
            reason,
        })?;

        let definition_validators = document
            .get("definitions")
            .and_then(Value::as_object)
            .map(|defs| defs.keys().map(|key| (key.clone(), OnceLock::new())).collect())
            .unwrap_or_default();

        Ok(Self {
            version,
            name,
            document,
            compiled,
            definition_validators,
        })
    }

    /// Version this schema describes
    pub fn version(&self) -> FormatVersion {
        self.version
    }

    /// File name the schema was loaded from
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The schema document
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// The compiled validator for the whole notebook
    pub fn compiled(&self) -> &JSONSchema {
        &self.compiled
    }

    /// Whether `#/definitions/<name>` exists in this schema
    pub fn has_definition(&self, name: &str) -> bool {
        self.definition_validators.contains_key(name)
    }

    /// Validator rooted at `#/definitions/<name>`, compiled once and cached.
    ///
    /// Returns `None` if the schema has no such definition.
    pub fn definition_validator(&self, name: &str) -> Option<Result<&JSONSchema>> {
        let slot = self.definition_validators.get(name)?;
        let compiled = slot.get_or_init(|| {
            debug!(schema = %self.name, definition = name, "compiling definition validator");
            self.compile_definition(name)
        });

        Some(compiled.as_ref().map_err(|reason| NotebookError::SchemaLoad {
            name: format!("{}#/definitions/{}", self.name, name),
            reason: reason.clone(),
        }))
    }

    fn compile_definition(&self, name: &str) -> std::result::Result<JSONSchema, String> {
        let definitions = self.document.get("definitions").cloned().unwrap_or_default();

        // Sibling definitions stay reachable so nested $refs keep resolving
        let rooted = json!({
            "$schema": DRAFT4_META_SCHEMA,
            "definitions": definitions,
            "$ref": format!("#/definitions/{}", name),
        });
        compile_draft4(&rooted)
    }
}

impl fmt::Debug for RegisteredSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredSchema")
            .field("version", &self.version)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

fn compile_draft4(document: &Value) -> std::result::Result<JSONSchema, String> {
    JSONSchema::options()
        .with_draft(Draft::Draft4)
        .compile(document)
        .map_err(|e| e.to_string())
}

/// The schema registry
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<FormatVersion, RegisteredSchema>,
}

impl SchemaRegistry {
    /// Registry of the schemas shipped with this crate
    pub fn embedded() -> Result<Self> {
        Self::from_embedded(&EMBEDDED_SCHEMAS)
    }

    /// Load schemas from an embedded directory (compiled via include_dir!)
    pub fn from_embedded(dir: &Dir<'_>) -> Result<Self> {
        let mut registry = Self::default();

        for file in dir.files() {
            let Some(name) = file.path().file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let content = file.contents_utf8().ok_or_else(|| NotebookError::SchemaLoad {
                name: name.to_string(),
                reason: "schema is not valid UTF-8".to_string(),
            })?;
            registry.register_source(name, content)?;
        }

        debug!(schemas = registry.len(), "loaded embedded nbformat schemas");
        Ok(registry)
    }

    /// Load schemas from a directory of `nbformat.v<major>.<minor>.schema.json` files
    pub fn from_directory(schema_dir: &Path) -> Result<Self> {
        let mut registry = Self::default();

        let entries = fs::read_dir(schema_dir).map_err(|e| NotebookError::io(schema_dir, e))?;
        for entry in entries {
            let path = entry.map_err(|e| NotebookError::io(schema_dir, e))?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !path.is_file() {
                continue;
            }
            let content = fs::read_to_string(&path).map_err(|e| NotebookError::io(&path, e))?;
            registry.register_source(name, &content)?;
        }

        debug!(
            schemas = registry.len(),
            dir = %schema_dir.display(),
            "loaded nbformat schemas from directory"
        );
        Ok(registry)
    }

    fn register_source(&mut self, name: &str, content: &str) -> Result<()> {
        let Some(version) = FormatVersion::from_schema_file_name(name) else {
            debug!(file = name, "skipping file without an nbformat schema name");
            return Ok(());
        };

        let document: Value =
            serde_json::from_str(content).map_err(|e| NotebookError::SchemaLoad {
                name: name.to_string(),
                reason: format!("invalid JSON: {}", e),
            })?;

        self.register(name, version, document)
    }

    /// Compile and register a schema document for `version`.
    ///
    /// Replaces any schema already registered for that version.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        version: FormatVersion,
        document: Value,
    ) -> Result<()> {
        let schema = RegisteredSchema::compile(name, version, document)?;
        if let Some(previous) = self.schemas.insert(version, schema) {
            warn!(version = %version, replaced = previous.name(), "schema replaced");
        }
        Ok(())
    }

    /// All registered versions, ascending
    pub fn versions(&self) -> Vec<FormatVersion> {
        self.schemas.keys().copied().collect()
    }

    /// Number of registered schemas
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Whether the registry holds no schemas
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Get the schema registered for exactly this version
    pub fn get(&self, version: FormatVersion) -> Option<&RegisteredSchema> {
        self.schemas.get(&version)
    }

    /// Find the schema that applies to a declared version.
    ///
    /// Picks the lowest registered minor that is at least the declared
    /// one. A minor newer than everything registered is handled by `policy`.
    pub fn resolve(
        &self,
        version: FormatVersion,
        policy: MinorVersionPolicy,
    ) -> Result<&RegisteredSchema> {
        let mut same_major = self
            .schemas
            .range(FormatVersion::new(version.major, 0)..=FormatVersion::new(version.major, u32::MAX))
            .map(|(_, schema)| schema);

        if let Some(schema) = same_major.clone().find(|s| s.version.minor >= version.minor) {
            debug!(declared = %version, schema = schema.name(), "resolved schema");
            return Ok(schema);
        }

        match (same_major.next_back(), policy) {
            (Some(latest), MinorVersionPolicy::UseLatest) => {
                warn!(
                    declared = %version,
                    using = %latest.version,
                    "notebook declares a newer minor version than any known schema"
                );
                Ok(latest)
            }
            _ => Err(NotebookError::UnsupportedVersion {
                version,
                supported: self.versions().iter().map(ToString::to_string).collect(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::embedded().unwrap()
    }

    #[test]
    fn test_embedded_versions() {
        assert_eq!(
            registry().versions(),
            vec![
                FormatVersion::new(3, 0),
                FormatVersion::new(4, 4),
                FormatVersion::new(4, 5),
            ]
        );
    }

    #[test]
    fn test_resolve_exact_and_covering() {
        let registry = registry();
        let policy = MinorVersionPolicy::UseLatest;

        let exact = registry.resolve(FormatVersion::new(4, 5), policy).unwrap();
        assert_eq!(exact.name(), "nbformat.v4.5.schema.json");

        let covering = registry.resolve(FormatVersion::new(4, 1), policy).unwrap();
        assert_eq!(covering.version(), FormatVersion::new(4, 4));
    }

    #[test]
    fn test_resolve_newer_minor() {
        let registry = registry();
        let newer = FormatVersion::new(4, 9);

        let latest = registry.resolve(newer, MinorVersionPolicy::UseLatest).unwrap();
        assert_eq!(latest.version(), FormatVersion::new(4, 5));

        assert!(matches!(
            registry.resolve(newer, MinorVersionPolicy::Reject),
            Err(NotebookError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_resolve_unknown_major() {
        match registry().resolve(FormatVersion::new(5, 0), MinorVersionPolicy::UseLatest) {
            Err(NotebookError::UnsupportedVersion { version, supported }) => {
                assert_eq!(version, FormatVersion::new(5, 0));
                assert_eq!(supported, vec!["3.0", "4.4", "4.5"]);
            }
            other => panic!("Expected UnsupportedVersion, got {:?}", other),
        }
    }

    #[test]
    fn test_definition_validator() {
        let registry = registry();
        let schema = registry.get(FormatVersion::new(4, 5)).unwrap();

        assert!(schema.has_definition("code_cell"));
        assert!(schema.definition_validator("bogus_cell").is_none());

        let validator = schema.definition_validator("stream").unwrap().unwrap();
        assert!(validator.is_valid(&json!({"output_type": "stream", "name": "stdout", "text": ["hi\n"]})));
        assert!(!validator.is_valid(&json!({"output_type": "stream", "name": "stdout"})));
    }

    #[test]
    fn test_definition_validator_is_cached() {
        let registry = registry();
        let schema = registry.get(FormatVersion::new(4, 5)).unwrap();

        let first = schema.definition_validator("code_cell").unwrap().unwrap();
        let second = schema.definition_validator("code_cell").unwrap().unwrap();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn test_from_directory_skips_unrelated_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("README.md"), "not a schema").unwrap();
        fs::write(
            dir.path().join("nbformat.v9.1.schema.json"),
            r#"{"$schema": "http://json-schema.org/draft-04/schema#", "type": "object"}"#,
        )
        .unwrap();

        let registry = SchemaRegistry::from_directory(dir.path()).unwrap();
        assert_eq!(registry.versions(), vec![FormatVersion::new(9, 1)]);
    }

    #[test]
    fn test_from_directory_rejects_broken_schema() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("nbformat.v4.5.schema.json"), "{").unwrap();

        assert!(matches!(
            SchemaRegistry::from_directory(dir.path()),
            Err(NotebookError::SchemaLoad { .. })
        ));
    }
}
