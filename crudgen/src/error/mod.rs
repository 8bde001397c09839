//! Error types and error handling

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Engine error type
#[derive(Debug, Error)]
pub enum Error {
    /// Service file is missing and could not be created
    #[error("File not found: {}", path.display())]
    NotFound {
        /// Path that was looked up
        path: PathBuf,
    },

    /// Filesystem failure while reading or writing a file
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path of the failing operation
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Existing source is not syntactically valid
    #[error("Parse error in {}:{line}:{column}: {message}", path.display())]
    ParseError {
        /// File that failed to parse
        path: PathBuf,
        /// 1-based line of the first error
        line: usize,
        /// 0-based column of the first error
        column: usize,
        /// Parser message
        message: String,
    },

    /// A catalog template rendered to text that is not a single valid declaration
    #[error("Generated code for `{template}` is malformed: {message}")]
    MalformedGeneratedCode {
        /// Template name
        template: String,
        /// What was wrong with the rendered text
        message: String,
    },

    /// Existing file declares the same method twice for one receiver
    #[error("`{method}` method redeclared for struct `{receiver}` ({count} definitions)")]
    DuplicateMethodConflict {
        /// Receiver type name
        receiver: String,
        /// Method name
        method: String,
        /// Number of definitions found
        count: usize,
    },

    /// Existing file declares the service type more than once
    #[error("type `{name}` declared {count} times")]
    DuplicateTypeConflict {
        /// Type name
        name: String,
        /// Number of declarations found
        count: usize,
    },

    /// Existing file uses the service name for something other than a struct
    #[error("`{name}` is declared as {found}, expected a struct")]
    HolderShapeConflict {
        /// Service name
        name: String,
        /// What the existing declaration is
        found: String,
    },

    /// Rendered output failed to re-parse; nothing was written
    #[error("Refusing to write {}: rendered output is invalid: {message}", path.display())]
    SerializationInvariantViolation {
        /// Target file
        path: PathBuf,
        /// Why the self-check failed
        message: String,
    },

    /// Operation name is not registered in the catalog
    #[error("Template doesn't exist: {0}")]
    UnknownOperation(String),

    /// A template body could not be compiled
    #[error("Template `{name}` is malformed: {message}")]
    TemplateSyntax {
        /// Template name
        name: String,
        /// Compiler message
        message: String,
    },

    /// A template failed to render against its context
    #[error("Failed to render template `{name}`: {message}")]
    TemplateRender {
        /// Template name
        name: String,
        /// Renderer message
        message: String,
    },

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// Post-processing hook failed
    #[error("Post-hook `{command}` failed: {message}")]
    PostHook {
        /// Command line of the hook
        command: String,
        /// Exit status or spawn failure
        message: String,
    },
}

impl Error {
    /// Build an [`Error::Io`] for `path`
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Build an [`Error::ParseError`] from a `syn` error
    pub fn parse(path: impl Into<PathBuf>, err: &syn::Error) -> Self {
        let start = err.span().start();
        Self::ParseError {
            path: path.into(),
            line: start.line,
            column: start.column,
            message: err.to_string(),
        }
    }

    /// Whether the error points at a bug in the generator rather than in the input
    #[must_use]
    pub const fn is_defect(&self) -> bool {
        matches!(
            self,
            Self::MalformedGeneratedCode { .. }
                | Self::UnknownOperation(_)
                | Self::TemplateSyntax { .. }
                | Self::TemplateRender { .. }
        )
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::Config(err.to_string())
    }
}
