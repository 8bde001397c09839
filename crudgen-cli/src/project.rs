//! Project configuration and target selection

use anyhow::{bail, Context, Result};
use crudgen::config::CrudgenConfig;
use crudgen::discovery::discover_targets;
use crudgen::naming::is_valid_target;
use std::path::{Path, PathBuf};

/// Command-line values that take precedence over the configuration file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Configuration file to read instead of `<project>/crudgen.toml`
    pub config_file: Option<PathBuf>,
    /// Post-hook command replacing the configured one
    pub post_hook: Option<String>,
}

/// Load the effective configuration for `project`
///
/// # Errors
///
/// Returns an error if the configuration file is missing (when given
/// explicitly) or invalid.
pub fn load_config(project: &Path, overrides: &ConfigOverrides) -> Result<CrudgenConfig> {
    let mut config = match &overrides.config_file {
        Some(file) => CrudgenConfig::load_from(file)
            .with_context(|| format!("Failed to load configuration from {}", file.display()))?,
        None => CrudgenConfig::load_for_project(project)
            .with_context(|| format!("Failed to load configuration for {}", project.display()))?,
    };
    if let Some(hook) = &overrides.post_hook {
        config.post_hook = Some(hook.clone());
    }
    Ok(config)
}

/// Targets for a run
///
/// With `only` empty, every struct of the models directory; otherwise the
/// named models, in the given order, without duplicates.
///
/// # Errors
///
/// Returns an error if a name in `only` is not a valid model name or if the
/// models directory cannot be scanned.
pub fn resolve_targets(project: &Path, config: &CrudgenConfig, only: &[String]) -> Result<Vec<String>> {
    if only.is_empty() {
        let models = config.models_path(project);
        return discover_targets(&models)
            .with_context(|| format!("Failed to discover models in {}", models.display()));
    }

    let mut targets: Vec<String> = Vec::with_capacity(only.len());
    for name in only {
        if !is_valid_target(name) {
            bail!("`{name}` is not a valid model name (expected a PascalCase identifier)");
        }
        if !targets.contains(name) {
            targets.push(name.clone());
        }
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_hook_override_wins() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("crudgen.toml"), "post_hook = \"cargo fmt\"\n").unwrap();

        let config = load_config(project.path(), &ConfigOverrides::default()).unwrap();
        assert_eq!(config.post_hook.as_deref(), Some("cargo fmt"));

        let overrides = ConfigOverrides {
            post_hook: Some("true".to_string()),
            ..ConfigOverrides::default()
        };
        let config = load_config(project.path(), &overrides).unwrap();
        assert_eq!(config.post_hook.as_deref(), Some("true"));
    }

    #[test]
    fn test_missing_explicit_config_fails() {
        let project = TempDir::new().unwrap();
        let overrides = ConfigOverrides {
            config_file: Some(project.path().join("absent.toml")),
            ..ConfigOverrides::default()
        };
        assert!(load_config(project.path(), &overrides).is_err());
    }

    #[test]
    fn test_only_is_validated_and_deduplicated() {
        let project = TempDir::new().unwrap();
        let config = CrudgenConfig::default();

        let only = vec!["Tag".to_string(), "Invoice".to_string(), "Tag".to_string()];
        assert_eq!(resolve_targets(project.path(), &config, &only).unwrap(), vec!["Tag", "Invoice"]);

        let only = vec!["invoice".to_string()];
        assert!(resolve_targets(project.path(), &config, &only).is_err());
    }

    #[test]
    fn test_targets_are_discovered_without_only() {
        let project = TempDir::new().unwrap();
        fs::create_dir(project.path().join("models")).unwrap();
        fs::write(project.path().join("models/tag.rs"), "pub struct Tag;\n").unwrap();

        let targets = resolve_targets(project.path(), &CrudgenConfig::default(), &[]).unwrap();
        assert_eq!(targets, vec!["Tag"]);
    }
}
