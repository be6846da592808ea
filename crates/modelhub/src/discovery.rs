//! Model definition discovery.
//!
//! Walks a directory tree and lists definition files without reading them.

use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::error::Error;

/// File extension of model definition files.
pub const DEFINITION_EXTENSION: &str = "json";

/// A definition file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredModel {
    /// Model name (file name without extension).
    pub name: String,
    /// Path of the definition file.
    pub path: PathBuf,
}

/// Derive the model name for a file, if it is a definition file.
///
/// Qualifying names have exactly one dot, followed by the definition
/// extension: `User.json` qualifies, `User.test.json` and `.User.json` do not.
pub fn model_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    if file_name.starts_with('.') {
        return None;
    }
    let (stem, ext) = file_name.split_once('.')?;
    if stem.is_empty() || ext != DEFINITION_EXTENSION {
        return None;
    }
    Some(stem.to_string())
}

/// Recursively list definition files under `root`, skipping hidden entries.
///
/// Results are sorted by path.
pub fn scan(root: &Path) -> Result<Vec<DiscoveredModel>, Error> {
    let mut found = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

    for entry in walker {
        let entry = entry.map_err(|e| walk_error(root, e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(name) = model_name(entry.path()) {
            tracing::trace!(model = %name, path = %entry.path().display(), "found definition");
            found.push(DiscoveredModel {
                name,
                path: entry.into_path(),
            });
        }
    }

    found.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(found)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

fn walk_error(root: &Path, err: walkdir::Error) -> Error {
    let path = err.path().unwrap_or(root).to_path_buf();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
    Error::io(path, source)
}
