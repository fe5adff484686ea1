// src/sources/nz.rs

use anyhow::Result;
use tracing::instrument;

use super::{download_register, RegisterDownload, SourceOutput};
use crate::{fetch::Fetch, layout::RunLayout};

pub const REGISTER_URL: &str =
    "http://www.odata.charities.govt.nz/vOrganisations?$returnall=true&$format=csv";

#[instrument(level = "info", skip_all, fields(date = layout.date()))]
pub async fn download<F: Fetch>(fetcher: &F, layout: &RunLayout) -> Result<SourceOutput> {
    let mut out = SourceOutput::default();
    let (saved, _) = download_register(
        fetcher,
        layout,
        RegisterDownload {
            code: "nz",
            prefix: "nz-roc",
            url: REGISTER_URL,
            ext: "csv",
            description: "Register of Charities",
        },
    )
    .await?;
    out.files.extend(saved);
    Ok(out)
}
