//! Model listing command

use anyhow::Result;
use console::style;
use crudgen_cli_lib::{load_config, resolve_targets, ConfigOverrides};
use std::path::PathBuf;

/// List the models services are generated for
pub struct ModelsCommand {
    project: PathBuf,
}

impl ModelsCommand {
    /// Create a new command instance
    pub const fn new(project: PathBuf) -> Self {
        Self { project }
    }

    /// Execute the command
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the models
    /// directory cannot be scanned.
    pub fn execute(&self) -> Result<()> {
        let config = load_config(&self.project, &ConfigOverrides::default())?;
        let targets = resolve_targets(&self.project, &config, &[])?;

        println!(
            "{} {}",
            style("Models in").bold(),
            style(config.models_path(&self.project).display()).cyan()
        );
        for target in &targets {
            println!(
                "  {} {}",
                style(target).green(),
                style(config.service_path(&self.project, target).display()).dim()
            );
        }
        if targets.is_empty() {
            println!("  {}", style("(none)").dim());
        }
        Ok(())
    }
}
