// src/cleanup.rs

use anyhow::{Context, Result};
use glob::glob;
use std::{fs, path::Path};
use tracing::{debug, warn};

/// Delete every file directly inside each of `dirs` whose lowercased name
/// ends with `ext` (e.g. ".txt"). An empty `ext` deletes all files.
/// Returns how many files were removed.
pub fn delete_files(dirs: &[&Path], ext: &str) -> Result<usize> {
    let ext = ext.to_lowercase();
    let mut deleted = 0;
    for dir in dirs {
        let pattern = format!("{}/*", glob::Pattern::escape(&dir.display().to_string()));
        for entry in glob(&pattern).context("invalid glob pattern for cleanup")? {
            let path = match entry {
                Ok(p) => p,
                Err(e) => {
                    warn!(error = %e, "cannot read glob entry");
                    continue;
                }
            };
            if !path.is_file() {
                continue;
            }
            let matches = path
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase().ends_with(&ext))
                .unwrap_or(false);
            if !matches {
                continue;
            }
            fs::remove_file(&path).with_context(|| format!("deleting {}", path.display()))?;
            debug!(path = %path.display(), "deleted");
            deleted += 1;
        }
    }
    Ok(deleted)
}
