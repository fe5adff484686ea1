// src/sources/aus.rs

use anyhow::Result;
use tracing::instrument;

use super::{download_register, RegisterDownload, SourceOutput};
use crate::{fetch::Fetch, layout::RunLayout};

/// ACNC register as published on data.gov.au.
pub const REGISTER_URL: &str = "https://data.gov.au/data/dataset/b050b242-4487-4306-abf5-07ca073e5594/resource/eb1e6be4-5b13-4feb-b28e-388bf7c26f93/download/datadotgov_main.xlsx";

#[instrument(level = "info", skip_all, fields(date = layout.date()))]
pub async fn download<F: Fetch>(fetcher: &F, layout: &RunLayout) -> Result<SourceOutput> {
    let mut out = SourceOutput::default();
    let (saved, _) = download_register(
        fetcher,
        layout,
        RegisterDownload {
            code: "aus",
            prefix: "aus-roc",
            url: REGISTER_URL,
            ext: "xlsx",
            description: "Register of Charities",
        },
    )
    .await?;
    out.files.extend(saved);
    Ok(out)
}
