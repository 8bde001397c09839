//! crudgen CLI tool

#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

mod commands;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use commands::{ConfigCommand, GenerateCommand, ModelsCommand, OperationsCommand};
use crudgen::observability::{self, ObservabilityConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "crudgen")]
#[command(version)]
#[command(about = "Generate and maintain CRUD service files for model structs", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update the service file of every model
    Generate {
        /// Project root
        #[arg(short, long, default_value = ".")]
        path: PathBuf,
        /// Replace existing service structs and methods
        #[arg(short, long)]
        force: bool,
        /// Command run in the project root after files changed
        #[arg(long, value_name = "CMD")]
        hook: Option<String>,
        /// Configuration file (default: <path>/crudgen.toml)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Show what would change without writing anything
        #[arg(long)]
        dry_run: bool,
        /// Only process these models
        #[arg(long, value_name = "NAME", num_args = 1..)]
        only: Vec<String>,
    },
    /// List the models that services are generated for
    Models {
        /// Project root
        #[arg(short, long, default_value = ".")]
        path: PathBuf,
    },
    /// List the available operations and whether they are enabled
    Operations {
        /// Project root
        #[arg(short, long, default_value = ".")]
        path: PathBuf,
    },
    /// Print the effective configuration as TOML
    Config {
        /// Project root
        #[arg(short, long, default_value = ".")]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logging = ObservabilityConfig::new(cli.verbose);
    if cli.json_logs {
        logging = logging.with_json();
    }
    if let Err(err) = observability::init(&logging) {
        eprintln!("Failed to initialize logging: {err}");
    }

    match cli.command {
        Commands::Generate {
            path,
            force,
            hook,
            config,
            dry_run,
            only,
        } => {
            let cmd = GenerateCommand {
                project: path,
                overwrite: force,
                hook,
                config_file: config,
                dry_run,
                only,
            };
            cmd.execute()?;
        }
        Commands::Models { path } => {
            ModelsCommand::new(path).execute()?;
        }
        Commands::Operations { path } => {
            OperationsCommand::new(path).execute()?;
        }
        Commands::Config { path } => {
            ConfigCommand::new(path).execute()?;
        }
    }

    Ok(())
}
