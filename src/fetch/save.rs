// src/fetch/save.rs

use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;
use tracing::info;

/// Write `bytes` to `dest` unless a file is already there.
/// Returns whether anything was written.
pub async fn save_if_absent(dest: impl AsRef<Path>, bytes: &[u8]) -> Result<bool> {
    let dest = dest.as_ref();
    let exists = fs::try_exists(dest)
        .await
        .with_context(|| format!("checking {}", dest.display()))?;
    if exists {
        info!(path = %dest.display(), "file already exists, no need to overwrite");
        return Ok(false);
    }
    save(dest, bytes).await?;
    Ok(true)
}

/// Write `bytes` to `dest`, creating parent folders and replacing any
/// existing file.
pub async fn save(dest: impl AsRef<Path>, bytes: &[u8]) -> Result<()> {
    let dest = dest.as_ref();
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(dest, bytes)
        .await
        .with_context(|| format!("writing {}", dest.display()))?;
    info!(path = %dest.display(), bytes = bytes.len(), "saved");
    Ok(())
}
