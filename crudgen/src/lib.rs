//! crudgen: idempotent service-layer generation for Rust model types
//!
//! For every model struct of a project, crudgen keeps a service file
//! (`services/<model>.rs`) holding:
//!
//! - a header of inner attributes,
//! - the `use` items the generated code needs,
//! - an alias of the model type (`pub type Invoice = models::Invoice;`),
//! - a field-less service struct (`pub struct InvoiceService;`),
//! - one CRUD method per enabled operation.
//!
//! Running the generator again never duplicates anything and never touches
//! code it does not own: hand-written items keep their text and comments byte
//! for byte. Existing service structs and methods are only replaced in
//! overwrite mode.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use crudgen::prelude::*;
//! use std::path::Path;
//!
//! fn main() -> crudgen::Result<()> {
//!     let project = Path::new(".");
//!     let config = CrudgenConfig::load_for_project(project)?;
//!     let targets = discover_targets(&config.models_path(project))?;
//!
//!     let synthesizer = ServiceSynthesizer::new(project, config)?;
//!     let report = BatchDriver::new(&synthesizer, SynthesisOptions::default())
//!         .with_hook(ShellHook::new("cargo fmt"))
//!         .run(&targets)?;
//!
//!     println!("{} services updated", report.modified_count());
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`catalog`]: operation name to method template
//! - [`render`]: template expansion and validation of the rendered code
//! - [`document`]: lossless model of one service file
//! - [`merge`]: the idempotent merge passes
//! - [`synth`]: one target, from rendering to writing the file
//! - [`batch`]: many targets plus the post-hook

pub mod batch;
pub mod catalog;
pub mod config;
pub mod discovery;
pub mod document;
pub mod error;
pub mod merge;
pub mod naming;
pub mod observability;
pub mod render;
pub mod synth;

pub use error::{Error, Result};

pub mod prelude {
    //! Convenience re-exports for common types and traits
    //!
    //! ```rust
    //! use crudgen::prelude::*;
    //! ```

    pub use crate::batch::{BatchDriver, BatchReport, PostHook, ShellHook, TargetResult};
    pub use crate::catalog::{Catalog, DeclarationTemplate};
    pub use crate::config::CrudgenConfig;
    pub use crate::discovery::discover_targets;
    pub use crate::document::Document;
    pub use crate::error::{Error, Result};
    pub use crate::merge::{DeclarationKind, MergeEngine, MergeOutcome, MergeReport};
    pub use crate::naming::NamingContext;
    pub use crate::render::TemplateRenderer;
    pub use crate::synth::{ServiceSynthesizer, Synthesis, SynthesisOptions};
}
