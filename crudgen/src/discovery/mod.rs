//! Target discovery
//!
//! Every top-level struct in the models directory is a target.

use crate::document::Document;
use crate::error::{Error, Result};
use std::collections::HashSet;
use std::path::Path;
use syn::Item;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Collect target names from the `*.rs` files directly inside `models_dir`
///
/// Files are visited in file-name order and structs in declaration order.
/// A name seen twice is reported and kept only once.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if the directory does not exist,
/// [`Error::Io`] if it cannot be read, and [`Error::ParseError`] for the
/// first model file that is not valid Rust.
pub fn discover_targets(models_dir: &Path) -> Result<Vec<String>> {
    if !models_dir.is_dir() {
        return Err(Error::NotFound {
            path: models_dir.to_path_buf(),
        });
    }

    let mut seen = HashSet::new();
    let mut targets = Vec::new();
    let walker = WalkDir::new(models_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(models_dir).to_path_buf();
            let source = err
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
            Error::io(path, source)
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "rs") {
            continue;
        }

        let document = Document::load(path)?;
        for name in struct_names(&document) {
            if seen.insert(name.clone()) {
                debug!(model = %name, file = %path.display(), "discovered target");
                targets.push(name);
            } else {
                warn!(model = %name, file = %path.display(), "struct declared more than once, skipping");
            }
        }
    }

    Ok(targets)
}

fn struct_names(document: &Document) -> impl Iterator<Item = String> + '_ {
    document.decls().iter().filter_map(|decl| match decl.item() {
        Item::Struct(item) => Some(item.ident.to_string()),
        _ => None,
    })
}
