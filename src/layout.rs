// src/layout.rs

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

/// Today's local date as used in every folder and file name.
pub fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Where one harvest run puts its files: `<root>/<date>` for data and
/// `<root>/<date>/log` for download metadata.
#[derive(Debug, Clone)]
pub struct RunLayout {
    date: String,
    data_dir: PathBuf,
    log_dir: PathBuf,
}

impl RunLayout {
    /// Create the run folders if needed. `date` must be `YYYY-MM-DD`.
    pub fn prepare(root: impl AsRef<Path>, date: &str) -> Result<Self> {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .with_context(|| format!("run date {date:?} is not YYYY-MM-DD"))?;

        let data_dir = root.as_ref().join(date);
        let log_dir = data_dir.join("log");
        for d in [&data_dir, &log_dir] {
            ensure_dir(d)?;
        }
        Ok(Self {
            date: date.to_string(),
            data_dir,
            log_dir,
        })
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// `<root>/<date>/<code>`, created on first use.
    pub fn jurisdiction_dir(&self, code: &str) -> Result<PathBuf> {
        let dir = self.data_dir.join(code);
        ensure_dir(&dir)?;
        Ok(dir)
    }

    /// `<log>/<prefix>-metadata-<date>.json`
    pub fn metadata_path(&self, prefix: &str) -> PathBuf {
        self.log_dir
            .join(format!("{}-metadata-{}.json", prefix, self.date))
    }

    /// `<dir>/<stem>-<date>.<ext>`
    pub fn dated_file(&self, dir: &Path, stem: &str, ext: &str) -> PathBuf {
        dir.join(format!("{}-{}.{}", stem, self.date, ext))
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        debug!(dir = %dir.display(), "folder already exists");
        return Ok(());
    }
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))
}
