//! Configuration management for the notebook validator
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (nbvalidate.toml)
//! - Environment variables (NBVALIDATE__*)
//!
//! ## Example config file (nbvalidate.toml):
//! ```toml
//! [validation]
//! allow_newer_minor = true
//! report_all = false
//! refine_errors = true
//!
//! [discovery]
//! extensions = ["ipynb"]
//! respect_gitignore = true
//! include_hidden = false
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Main configuration for the validator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Validation settings
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Directory walking settings
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

/// Validation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Check notebooks with a newer minor version against the newest known schema
    #[serde(default = "default_true")]
    pub allow_newer_minor: bool,

    /// Print every violation instead of only the first
    #[serde(default)]
    pub report_all: bool,

    /// Re-check failed cells and outputs against their declared variant
    #[serde(default = "default_true")]
    pub refine_errors: bool,
}

/// Settings used when the argument is a directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// File extensions treated as notebooks
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Skip files matched by .gitignore and friends
    #[serde(default = "default_true")]
    pub respect_gitignore: bool,

    /// Descend into hidden directories such as .ipynb_checkpoints
    #[serde(default)]
    pub include_hidden: bool,
}

fn default_true() -> bool {
    true
}

fn default_extensions() -> Vec<String> {
    vec!["ipynb".to_string()]
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            allow_newer_minor: true,
            report_all: false,
            refine_errors: true,
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            respect_gitignore: true,
            include_hidden: false,
        }
    }
}

impl ValidatorConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, adding a specific file that must exist
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = ["nbvalidate.toml", ".nbvalidate.toml", "config/nbvalidate.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("org", "jupyter", "nbvalidate") {
            let xdg_config = config_dir.config_dir().join("nbvalidate.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (NBVALIDATE__*)
        // NBVALIDATE__DISCOVERY__EXTENSIONS takes a comma-separated list
        builder = builder.add_source(
            Environment::with_prefix("NBVALIDATE")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("discovery.extensions"),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
