//! Service generation command

use anyhow::{Context, Result};
use console::{style, Emoji};
use crudgen::batch::{BatchDriver, BatchReport, ShellHook};
use crudgen::synth::{ServiceSynthesizer, Synthesis, SynthesisOptions};
use crudgen_cli_lib::{load_config, render_diff, resolve_targets, ConfigOverrides};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

static CHECK: Emoji<'_, '_> = Emoji("✓ ", "");
static CROSS: Emoji<'_, '_> = Emoji("✗ ", "x ");

/// Create or update the service files of a project
pub struct GenerateCommand {
    /// Project root
    pub project: PathBuf,
    /// Replace existing service structs and methods
    pub overwrite: bool,
    /// Post-hook overriding the configured one
    pub hook: Option<String>,
    /// Explicit configuration file
    pub config_file: Option<PathBuf>,
    /// Compute changes without writing
    pub dry_run: bool,
    /// Restrict the run to these models
    pub only: Vec<String>,
}

impl GenerateCommand {
    /// Execute the command
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration or the models cannot be loaded,
    /// if a template is broken, or if the post-hook fails. Failures of single
    /// models are reported and do not fail the command.
    pub fn execute(&self) -> Result<()> {
        let overrides = ConfigOverrides {
            config_file: self.config_file.clone(),
            post_hook: self.hook.clone(),
        };
        let config = load_config(&self.project, &overrides)?;
        let targets = resolve_targets(&self.project, &config, &self.only)?;

        if targets.is_empty() {
            println!(
                "{} {}",
                style("No models found in").yellow(),
                style(config.models_path(&self.project).display()).bold()
            );
            return Ok(());
        }

        println!(
            "\n{} {} {}",
            style("Generating services for").cyan().bold(),
            style(targets.len()).green().bold(),
            style(if targets.len() == 1 { "model" } else { "models" }).cyan().bold()
        );

        let post_hook = config.post_hook.clone();
        let synthesizer =
            ServiceSynthesizer::new(&self.project, config).context("Failed to prepare service templates")?;
        let options = SynthesisOptions {
            overwrite: self.overwrite,
            dry_run: self.dry_run,
        };
        let mut driver = BatchDriver::new(&synthesizer, options);
        if let Some(command) = post_hook {
            driver = driver.with_hook(ShellHook::new(command));
        }

        let progress = ProgressBar::new(u64::try_from(targets.len()).unwrap_or(u64::MAX));
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .context("Failed to set progress style")?,
        );
        let report = driver.run_with(&targets, |result| {
            progress.set_message(result.target.clone());
            progress.inc(1);
        });
        progress.finish_and_clear();
        let report = report.context("Post-hook failed")?;

        self.print_report(&report);
        Ok(())
    }

    fn print_report(&self, report: &BatchReport) {
        println!();
        for result in &report.results {
            match &result.outcome {
                Ok(synthesis) => self.print_synthesis(synthesis),
                Err(err) => println!(
                    "  {}{} {}",
                    style(CROSS).red(),
                    style(&result.target).red().bold(),
                    style(err).red()
                ),
            }
        }

        println!();
        println!(
            "{} modified, {} unchanged, {} failed{}",
            style(report.modified_count()).green().bold(),
            report.unchanged_count(),
            style(report.failure_count()).red().bold(),
            if self.dry_run { " (dry run, nothing written)" } else { "" }
        );
        if report.hook_ran {
            println!("{}{}", style(CHECK).green(), style("Post-hook completed").dim());
        }
    }

    fn print_synthesis(&self, synthesis: &Synthesis) {
        let status = if synthesis.created {
            style("created").green()
        } else if synthesis.modified {
            style("updated").green()
        } else {
            style("unchanged").dim()
        };
        println!(
            "  {}{} {} ({})",
            style(CHECK).green(),
            style(&synthesis.target).bold(),
            status,
            synthesis.path.display()
        );

        if self.dry_run && synthesis.modified {
            print!("{}", render_diff(&synthesis.original, &synthesis.rendered, true));
        }
    }
}
