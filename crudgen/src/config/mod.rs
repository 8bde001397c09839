//! Configuration management for crudgen
//!
//! Configuration is loaded from multiple sources with clear precedence:
//!
//! 1. Environment variables (highest priority, `CRUDGEN_` prefix)
//! 2. `<project>/crudgen.toml`, or an explicit file
//! 3. Hardcoded defaults (fallback)
//!
//! Command-line flags are applied by the caller on top of the loaded value.
//!
//! # Example Configuration
//!
//! ```toml
//! # crudgen.toml
//! models_dir = "models"
//! services_dir = "services"
//! models_module = "models"
//! header = "//! Service layer."
//! imports = ["crate::dal", "crate::dal::field", "crate::models"]
//! operations = ["create", "get_all", "get_by_id", "update", "delete", "count", "search"]
//! post_hook = "cargo check"
//! ```

use crate::error::{Error, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the per-project configuration file
pub const CONFIG_FILE_NAME: &str = "crudgen.toml";

/// Operations applied to every target unless configured otherwise
pub const DEFAULT_OPERATIONS: &[&str] = &["create", "get_all", "get_by_id", "update", "delete", "count"];

/// Import paths every service file needs unless configured otherwise
pub const DEFAULT_IMPORTS: &[&str] = &["crate::dal", "crate::dal::field", "crate::models"];

/// Header written at the top of every new service file
pub const DEFAULT_HEADER: &str = "//! Service layer.";

/// Complete crudgen configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrudgenConfig {
    /// Directory (relative to the project) holding model definitions
    pub models_dir: PathBuf,

    /// Directory (relative to the project) receiving service files
    pub services_dir: PathBuf,

    /// Module that qualifies the external model types in aliases
    pub models_module: String,

    /// Inner-attribute header of every service file
    pub header: String,

    /// Import paths every service file must bind
    pub imports: Vec<String>,

    /// Catalog operations applied to every target, in order
    pub operations: Vec<String>,

    /// Shell command run after a batch that modified at least one file
    pub post_hook: Option<String>,
}

impl Default for CrudgenConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
            services_dir: PathBuf::from("services"),
            models_module: "models".to_string(),
            header: DEFAULT_HEADER.to_string(),
            imports: DEFAULT_IMPORTS.iter().map(ToString::to_string).collect(),
            operations: DEFAULT_OPERATIONS.iter().map(ToString::to_string).collect(),
            post_hook: None,
        }
    }
}

impl CrudgenConfig {
    /// Load configuration for a project directory
    ///
    /// Reads `<project>/crudgen.toml` when it exists, then applies `CRUDGEN_*`
    /// environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the file contains invalid TOML or values of the
    /// wrong type.
    pub fn load_for_project(project: &Path) -> Result<Self> {
        Self::figment(Some(&project.join(CONFIG_FILE_NAME))).extract().map_err(Error::from)
    }

    /// Load configuration from a specific file
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or cannot be parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Config(format!(
                "configuration file not found: {}",
                path.display()
            )));
        }
        Self::figment(Some(path)).extract().map_err(Error::from)
    }

    fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));
        if let Some(file) = file.filter(|file| file.exists()) {
            figment = figment.merge(Toml::file(file));
        }
        figment.merge(Env::prefixed("CRUDGEN_"))
    }

    /// Path of the service file for a target inside `project`
    #[must_use]
    pub fn service_path(&self, project: &Path, target: &str) -> PathBuf {
        project
            .join(&self.services_dir)
            .join(format!("{}.rs", target.to_lowercase()))
    }

    /// Models directory inside `project`
    #[must_use]
    pub fn models_path(&self, project: &Path) -> PathBuf {
        project.join(&self.models_dir)
    }

    /// Render the configuration as TOML
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|err| Error::Config(err.to_string()))
    }
}
