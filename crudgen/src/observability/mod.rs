//! Observability (logging)
//!
//! Structured logging through `tracing`, filtered by `RUST_LOG` or by the
//! verbosity requested on the command line.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Observability configuration
#[derive(Debug, Clone, Default)]
pub struct ObservabilityConfig {
    /// Number of `-v` flags given on the command line
    pub verbosity: u8,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl ObservabilityConfig {
    /// Create new observability config
    #[must_use]
    pub const fn new(verbosity: u8) -> Self {
        Self {
            verbosity,
            json: false,
        }
    }

    /// Switch to JSON output
    #[must_use]
    pub const fn with_json(mut self) -> Self {
        self.json = true;
        self
    }

    /// Filter directive used when `RUST_LOG` is not set
    #[must_use]
    pub const fn default_directive(&self) -> &'static str {
        match self.verbosity {
            0 => "warn",
            1 => "info,crudgen=info",
            2 => "info,crudgen=debug",
            _ => "debug,crudgen=trace",
        }
    }
}

/// Initialize the logging stack
///
/// Logs go to stderr so that command output on stdout stays clean.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init(config: &ObservabilityConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directive()));

    if config.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .without_time()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    }
}
