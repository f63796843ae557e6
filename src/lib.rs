//! Notebook Schemas
//!
//! Checks Jupyter notebook files against the nbformat JSON schemas for the
//! format version each file declares.
//!
//! ## Features
//!
//! - **Embedded Schemas**: nbformat v3.0, v4.0-v4.4 and v4.5 schemas ship inside the crate
//! - **Version Resolution**: `nbformat` / `nbformat_minor` select the schema, newer minors fall back
//! - **Explicit Outcomes**: schema violations are a value, not an error
//! - **Refined Errors**: failed cells and outputs are re-checked against their own variant
//!
//! ## Example
//!
//! ```no_run
//! use notebook_schemas::{is_notebook_valid, ValidationOutcome};
//!
//! match is_notebook_valid("analysis.ipynb")? {
//!     ValidationOutcome::Valid => println!("analysis.ipynb is valid"),
//!     ValidationOutcome::Invalid(failure) => println!("analysis.ipynb {}", failure),
//! }
//! # Ok::<(), notebook_schemas::NotebookError>(())
//! ```
//!
//! ## Layout
//!
//! ```text
//! schemas/
//! ├── nbformat.v3.0.schema.json
//! ├── nbformat.v4.4.schema.json   (covers 4.0 - 4.4)
//! └── nbformat.v4.5.schema.json
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod notebook;
pub mod registry;
pub mod validator;
pub mod version;

pub use config::{DiscoveryConfig, ValidationConfig, ValidatorConfig};
pub use discovery::collect_notebooks;
pub use error::{NotebookError, Result};
pub use notebook::Notebook;
pub use registry::{MinorVersionPolicy, RegisteredSchema, SchemaRegistry};
pub use validator::{
    is_notebook_valid, NotebookValidator, ValidationFailure, ValidationOutcome, Violation,
};
pub use version::FormatVersion;
