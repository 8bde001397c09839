//! Configuration display command

use anyhow::{Context, Result};
use crudgen_cli_lib::{load_config, ConfigOverrides};
use std::path::PathBuf;

/// Print the effective configuration as TOML
pub struct ConfigCommand {
    project: PathBuf,
}

impl ConfigCommand {
    /// Create a new command instance
    pub const fn new(project: PathBuf) -> Self {
        Self { project }
    }

    /// Execute the command
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn execute(&self) -> Result<()> {
        let config = load_config(&self.project, &ConfigOverrides::default())?;
        let rendered = config.to_toml().context("Failed to render configuration")?;
        print!("{rendered}");
        Ok(())
    }
}
