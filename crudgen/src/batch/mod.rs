//! Batch driver
//!
//! Runs the synthesizer over every target, collects the results, and runs a
//! post-processing hook once when at least one file changed. A failing target
//! is logged and recorded; only a failing hook ends the run with an error.

use crate::error::{Error, Result};
use crate::synth::{ServiceSynthesizer, Synthesis, SynthesisOptions};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{error, info};

/// Command run after a batch that changed files
pub trait PostHook {
    /// Run the hook with `project` as working directory
    ///
    /// # Errors
    ///
    /// Returns [`Error::PostHook`] if the hook cannot be started or fails.
    fn run(&mut self, project: &Path) -> Result<()>;

    /// Human-readable description, used in logs
    fn describe(&self) -> String;
}

/// Shell command hook (`sh -c <command>`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellHook {
    command: String,
}

impl ShellHook {
    /// Create a hook for a shell command line
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl PostHook for ShellHook {
    fn run(&mut self, project: &Path) -> Result<()> {
        let status = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .current_dir(project)
            .stdin(Stdio::null())
            .status()
            .map_err(|err| Error::PostHook {
                command: self.command.clone(),
                message: format!("failed to start: {err}"),
            })?;

        if !status.success() {
            return Err(Error::PostHook {
                command: self.command.clone(),
                message: status.code().map_or_else(
                    || "terminated by signal".to_string(),
                    |code| format!("exited with status {code}"),
                ),
            });
        }
        Ok(())
    }

    fn describe(&self) -> String {
        self.command.clone()
    }
}

/// Outcome of one target within a batch
#[derive(Debug)]
pub struct TargetResult {
    /// Target model name
    pub target: String,
    /// Synthesis result or the error that stopped it
    pub outcome: Result<Synthesis>,
}

impl TargetResult {
    /// Whether the target's file changed
    #[must_use]
    pub fn modified(&self) -> bool {
        self.outcome.as_ref().is_ok_and(|synthesis| synthesis.modified)
    }
}

/// Outcome of a whole batch
#[derive(Debug, Default)]
pub struct BatchReport {
    /// One entry per target, in input order
    pub results: Vec<TargetResult>,
    /// Whether any file changed
    pub modified: bool,
    /// Whether the post-hook ran
    pub hook_ran: bool,
}

impl BatchReport {
    /// Targets that failed, with their errors
    pub fn failures(&self) -> impl Iterator<Item = (&str, &Error)> {
        self.results.iter().filter_map(|result| match &result.outcome {
            Ok(_) => None,
            Err(err) => Some((result.target.as_str(), err)),
        })
    }

    /// Number of targets whose file changed
    #[must_use]
    pub fn modified_count(&self) -> usize {
        self.results.iter().filter(|result| result.modified()).count()
    }

    /// Number of targets that succeeded without changes
    #[must_use]
    pub fn unchanged_count(&self) -> usize {
        self.results
            .iter()
            .filter(|result| matches!(&result.outcome, Ok(synthesis) if !synthesis.modified))
            .count()
    }

    /// Number of failed targets
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }
}

/// Runs a [`ServiceSynthesizer`] over many targets
pub struct BatchDriver<'a> {
    synthesizer: &'a ServiceSynthesizer,
    options: SynthesisOptions,
    hook: Option<Box<dyn PostHook + 'a>>,
}

impl std::fmt::Debug for BatchDriver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchDriver")
            .field("options", &self.options)
            .field("hook", &self.hook.as_ref().map(|hook| hook.describe()))
            .finish_non_exhaustive()
    }
}

impl<'a> BatchDriver<'a> {
    /// Create a driver without a post-hook
    #[must_use]
    pub const fn new(synthesizer: &'a ServiceSynthesizer, options: SynthesisOptions) -> Self {
        Self {
            synthesizer,
            options,
            hook: None,
        }
    }

    /// Run `hook` after a batch that changed files
    #[must_use]
    pub fn with_hook(mut self, hook: impl PostHook + 'a) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Synthesize every target
    ///
    /// # Errors
    ///
    /// Returns [`Error::PostHook`] if the hook fails. Target failures are
    /// recorded in the report instead.
    pub fn run(&mut self, targets: &[String]) -> Result<BatchReport> {
        self.run_with(targets, |_| {})
    }

    /// Synthesize every target, calling `on_result` after each one
    ///
    /// # Errors
    ///
    /// Returns [`Error::PostHook`] if the hook fails. Target failures are
    /// recorded in the report instead.
    pub fn run_with(&mut self, targets: &[String], mut on_result: impl FnMut(&TargetResult)) -> Result<BatchReport> {
        let mut report = BatchReport::default();

        for target in targets {
            let outcome = self.synthesizer.synthesize(target, self.options);
            if let Err(err) = &outcome {
                if err.is_defect() {
                    error!(model = %target, error = %err, "generator defect");
                } else {
                    error!(model = %target, error = %err, "failed to synthesize service");
                }
            }

            let result = TargetResult {
                target: target.clone(),
                outcome,
            };
            report.modified |= result.modified();
            on_result(&result);
            report.results.push(result);
        }

        if report.modified && !self.options.dry_run {
            if let Some(hook) = self.hook.as_mut() {
                info!(hook = %hook.describe(), "running post-hook");
                hook.run(self.synthesizer.project())?;
                report.hook_ran = true;
            }
        }

        info!(
            modified = report.modified_count(),
            unchanged = report.unchanged_count(),
            failed = report.failure_count(),
            "batch finished"
        );
        Ok(report)
    }
}
