//! crudgen CLI library
//!
//! Pieces of the command-line tool that do not print: configuration
//! resolution, target selection, and diff rendering.

#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

pub mod diff;
pub mod project;

pub use diff::render_diff;
pub use project::{load_config, resolve_targets, ConfigOverrides};
