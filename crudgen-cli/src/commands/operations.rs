//! Operation listing command

use anyhow::Result;
use console::style;
use crudgen::catalog::Catalog;
use crudgen_cli_lib::{load_config, ConfigOverrides};
use std::path::PathBuf;

/// List catalog operations and whether the project enables them
pub struct OperationsCommand {
    project: PathBuf,
}

impl OperationsCommand {
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
        let catalog = Catalog::builtin();

        println!("{}", style("Operations").bold());
        for name in catalog.names() {
            let enabled = config.operations.iter().any(|operation| operation == name);
            if enabled {
                println!("  {} {}", style("[x]").green(), name);
            } else {
                println!("  {} {}", style("[ ]").dim(), style(name).dim());
            }
        }

        for unknown in config
            .operations
            .iter()
            .filter(|operation| catalog.lookup(operation).is_err())
        {
            println!("  {} {} (not in catalog)", style("[!]").red(), style(unknown).red());
        }
        Ok(())
    }
}
