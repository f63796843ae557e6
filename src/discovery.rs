//! Expands a command-line path into the notebooks to check

use std::fs;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::debug;

use crate::config::DiscoveryConfig;
use crate::error::{NotebookError, Result};

/// Resolve `path` into a list of notebook files.
///
/// A file is returned as-is, whatever its extension. A directory is
/// walked and every file with a configured extension is returned in
/// sorted order.
pub fn collect_notebooks(path: &Path, config: &DiscoveryConfig) -> Result<Vec<PathBuf>> {
    let metadata = fs::metadata(path).map_err(|e| NotebookError::io(path, e))?;
    if !metadata.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let walker = WalkBuilder::new(path)
        .hidden(!config.include_hidden)
        .git_ignore(config.respect_gitignore)
        .git_exclude(config.respect_gitignore)
        .ignore(config.respect_gitignore)
        .require_git(false)
        .build();

    let mut notebooks = Vec::new();
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }

        let path = entry.into_path();
        if has_notebook_extension(&path, &config.extensions) {
            notebooks.push(path);
        }
    }

    notebooks.sort();
    debug!(root = %path.display(), found = notebooks.len(), "collected notebooks");
    Ok(notebooks)
}

fn has_notebook_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}
