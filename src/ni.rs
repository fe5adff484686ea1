// src/ni.rs
//
// Northern Ireland: the register export says which charities are removed,
// but only the charity's own detail page says when.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use encoding_rs::WINDOWS_1252;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

pub const REGID_COLUMN: &str = "Reg charity number";
pub const STATUS_COLUMN: &str = "Status";
pub const REMOVALS_HEADER: [&str; 3] = ["regid", "removed", "removed_date"];

static REMOVED_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("div.pcg-charity-details__purpose--removed").expect("valid removed selector")
});

static REMOVAL_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})\s*([A-Za-z]{3})[A-Za-z]*\.?\s*(\d{4})").expect("valid date regex"));

static PAGE_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ni-charity-(\d+)-.*\.txt$").expect("valid page regex"));

/// One charity on the register export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterEntry {
    pub regid: u64,
    pub status: String,
}

impl RegisterEntry {
    pub fn is_removed(&self) -> bool {
        self.status.trim() == "Removed"
    }
}

/// One output row of the removals file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    pub regid: u64,
    pub removed: bool,
    pub removed_date: Option<NaiveDate>,
}

/// Parse the register export. The file is Windows-1252, not UTF-8.
pub fn parse_register(bytes: &[u8]) -> Result<Vec<RegisterEntry>> {
    let (text, _, had_errors) = WINDOWS_1252.decode(bytes);
    if had_errors {
        warn!("register contained undecodable bytes");
    }
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = rdr.headers().context("reading register header")?.clone();
    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .with_context(|| format!("register has no {name:?} column"))
    };
    let regid_idx = find(REGID_COLUMN)?;
    let status_idx = find(STATUS_COLUMN)?;

    let mut entries = Vec::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("register row {}", line + 2))?;
        let raw = record.get(regid_idx).unwrap_or("").trim();
        let regid = match raw.parse::<u64>() {
            Ok(id) => id,
            Err(_) => {
                warn!(row = line + 2, value = raw, "skipping row without charity number");
                continue;
            }
        };
        entries.push(RegisterEntry {
            regid,
            status: record.get(status_idx).unwrap_or("").to_string(),
        });
    }
    debug!(entries = entries.len(), "parsed register");
    Ok(entries)
}

pub fn removed_ids(entries: &[RegisterEntry]) -> BTreeSet<u64> {
    entries
        .iter()
        .filter(|e| e.is_removed())
        .map(|e| e.regid)
        .collect()
}

/// Removal date from a charity detail page, if the page carries one.
pub fn extract_removal_date(html: &str) -> Option<NaiveDate> {
    let doc = Html::parse_document(html);
    let sentence: String = doc.select(&REMOVED_SELECTOR).next()?.text().collect();
    parse_removal_sentence(&sentence)
}

/// "This charity was removed from the register on 1 Jan 2020" → 2020-01-01.
/// The last date in the sentence wins.
pub fn parse_removal_sentence(sentence: &str) -> Option<NaiveDate> {
    let caps = REMOVAL_DATE.captures_iter(sentence).last()?;
    let normalized = format!("{:0>2} {} {}", &caps[1], &caps[2], &caps[3]);
    NaiveDate::parse_from_str(&normalized, "%d %b %Y").ok()
}

/// `ni-charity-<regid>-<date>.txt` → regid
pub fn regid_from_page_name(name: &str) -> Option<u64> {
    PAGE_FILE.captures(name)?.get(1)?.as_str().parse().ok()
}

/// Page file name for a charity on a given run date.
pub fn page_file_name(regid: u64, date: &str) -> String {
    format!("ni-charity-{regid}-{date}.txt")
}

/// Classify every saved detail page in `webpage_dir` against the removed set.
#[instrument(level = "info", skip(removed, webpage_dir), fields(dir = %webpage_dir.display()))]
pub fn scan_removals(removed: &BTreeSet<u64>, webpage_dir: &Path) -> Result<Vec<Removal>> {
    let mut pages: Vec<(u64, PathBuf)> = fs::read_dir(webpage_dir)
        .with_context(|| format!("listing {}", webpage_dir.display()))?
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().to_string();
            regid_from_page_name(&name).map(|id| (id, e.path()))
        })
        .collect();
    pages.sort();

    let mut rows = Vec::with_capacity(pages.len());
    for (regid, path) in pages {
        if !removed.contains(&regid) {
            rows.push(Removal {
                regid,
                removed: false,
                removed_date: None,
            });
            continue;
        }
        let bytes = fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
        let (html, _, _) = WINDOWS_1252.decode(&bytes);
        let removed_date = extract_removal_date(&html);
        if removed_date.is_none() {
            warn!(regid, "removed charity page has no readable removal date");
        }
        rows.push(Removal {
            regid,
            removed: true,
            removed_date,
        });
    }
    Ok(rows)
}

pub fn write_removals(path: impl AsRef<Path>, rows: &[Removal]) -> Result<()> {
    let path = path.as_ref();
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    wtr.write_record(REMOVALS_HEADER)?;
    for row in rows {
        let date = row
            .removed_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        wtr.write_record([
            row.regid.to_string(),
            u8::from(row.removed).to_string(),
            date,
        ])?;
    }
    wtr.flush()?;
    info!(path = %path.display(), rows = rows.len(), "wrote removals");
    Ok(())
}

/// Register CSV + folder of detail pages → `<out_dir>/ni-removals-<date>.csv`.
pub fn extract_removals(
    register: &Path,
    webpage_dir: &Path,
    out_dir: &Path,
    date: &str,
) -> Result<PathBuf> {
    let bytes = fs::read(register).with_context(|| format!("reading {}", register.display()))?;
    let entries = parse_register(&bytes)?;
    let removed = removed_ids(&entries);
    info!(removed = removed.len(), total = entries.len(), "register loaded");

    let rows = scan_removals(&removed, webpage_dir)?;
    let out = out_dir.join(format!("ni-removals-{date}.csv"));
    write_removals(&out, &rows)?;
    Ok(out)
}
