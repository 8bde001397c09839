//! Per-target service synthesis
//!
//! Renders every declaration a target needs, loads (or creates) its service
//! file, runs the merge passes and writes the result back when something
//! changed.

use crate::catalog::{Catalog, DeclarationTemplate};
use crate::config::CrudgenConfig;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::merge::{MergeEngine, MergeReport};
use crate::naming::NamingContext;
use crate::render::TemplateRenderer;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Switches for one synthesis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SynthesisOptions {
    /// Replace existing service structs and methods
    pub overwrite: bool,
    /// Compute the result without touching the filesystem
    pub dry_run: bool,
}

/// Result of synthesizing one target
#[derive(Debug, Clone)]
pub struct Synthesis {
    /// Target model name
    pub target: String,
    /// Service file path
    pub path: PathBuf,
    /// Whether the file did not exist beforehand
    pub created: bool,
    /// Whether the file content changed
    pub modified: bool,
    /// Outcome of every merge
    pub report: MergeReport,
    /// File content before synthesis (empty for a new file)
    pub original: String,
    /// File content after synthesis
    pub rendered: String,
}

/// Builds service files for targets of one project
#[derive(Debug)]
pub struct ServiceSynthesizer {
    project: PathBuf,
    config: CrudgenConfig,
    operations: Vec<DeclarationTemplate>,
    renderer: TemplateRenderer,
}

impl ServiceSynthesizer {
    /// Synthesizer using the built-in catalog
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownOperation`] if the configuration enables an
    /// operation the catalog lacks, or a template error.
    pub fn new(project: impl Into<PathBuf>, config: CrudgenConfig) -> Result<Self> {
        Self::with_catalog(project, config, &Catalog::builtin())
    }

    /// Synthesizer using a custom catalog
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownOperation`] if the configuration enables an
    /// operation the catalog lacks, or a template error.
    pub fn with_catalog(project: impl Into<PathBuf>, config: CrudgenConfig, catalog: &Catalog) -> Result<Self> {
        let operations = catalog.resolve(&config.operations)?;
        let renderer = TemplateRenderer::new(catalog)?;
        Ok(Self {
            project: project.into(),
            config,
            operations,
            renderer,
        })
    }

    /// Project root
    #[must_use]
    pub fn project(&self) -> &Path {
        &self.project
    }

    /// Effective configuration
    #[must_use]
    pub const fn config(&self) -> &CrudgenConfig {
        &self.config
    }

    /// Operations applied to every target, in merge order
    #[must_use]
    pub fn operations(&self) -> &[DeclarationTemplate] {
        &self.operations
    }

    /// Service file path for a target
    #[must_use]
    pub fn service_path(&self, target: &str) -> PathBuf {
        self.config.service_path(&self.project, target)
    }

    /// Bring the service file of `target` up to date
    ///
    /// # Errors
    ///
    /// Rendering errors are returned before the filesystem is touched. After
    /// that: [`Error::Io`] if the file cannot be created or written,
    /// [`Error::ParseError`] if it is not valid Rust, a conflict error if it
    /// holds duplicate declarations, and
    /// [`Error::SerializationInvariantViolation`] if the merged text fails its
    /// self-check. The file is left untouched on error.
    pub fn synthesize(&self, target: &str, options: SynthesisOptions) -> Result<Synthesis> {
        let naming = NamingContext::for_target(target);
        let service = self
            .renderer
            .render_service(&naming, &self.config, &self.operations)?;

        let path = self.service_path(target);
        let created = !path.exists();
        let original = if created {
            let stub = format!("{}\n", service.header);
            if !options.dry_run {
                create_file(&path, &stub)?;
                debug!(path = %path.display(), "created service file");
            }
            stub
        } else {
            read_file(&path)?
        };

        let mut document = Document::parse(&path, &original)?;
        let report = MergeEngine::new(options.overwrite).merge_all(&mut document, &service)?;
        let modified = created || report.modified();
        let rendered = commit(&path, &document, modified && !options.dry_run)?;
        let rendered = if modified { rendered } else { original.clone() };
        info!(
            model = %target,
            path = %path.display(),
            created,
            modified,
            dry_run = options.dry_run,
            "synthesized service"
        );

        Ok(Synthesis {
            target: target.to_string(),
            path,
            created,
            modified,
            report,
            original: if created { String::new() } else { original },
            rendered,
        })
    }
}

/// Serialize `document`, then write it to `path` if `write` is set
///
/// The self-check runs first; a document that fails it never reaches disk.
fn commit(path: &Path, document: &Document, write: bool) -> Result<String> {
    let rendered = document.serialize()?;
    if write {
        fs::write(path, &rendered).map_err(|err| Error::io(path, err))?;
    }
    Ok(rendered)
}

fn create_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
    }
    fs::write(path, contents).map_err(|err| Error::io(path, err))
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            Error::io(path, err)
        }
    })
}
