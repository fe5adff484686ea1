// src/sources/usa.rs

use anyhow::{bail, Result};
use std::{
    fs::File,
    io::{BufWriter, Write},
};
use tracing::{info, instrument, warn};

use super::SourceOutput;
use crate::{
    fetch::{save, Fetch, FetchRequest},
    layout::RunLayout,
    metadata::DownloadMetadata,
    usa,
};

/// IRS exempt organizations business master file, split by region.
pub const BUSINESS_FILES: [&str; 4] = [
    "https://www.irs.gov/pub/irs-soi/eo1.csv",
    "https://www.irs.gov/pub/irs-soi/eo2.csv",
    "https://www.irs.gov/pub/irs-soi/eo3.csv",
    "https://www.irs.gov/pub/irs-soi/eo4.csv",
];
pub const REVOCATION_URL: &str = "https://apps.irs.gov/pub/epostcard/data-download-revocation.zip";

#[instrument(level = "info", skip_all, fields(date = layout.date()))]
pub async fn download<F: Fetch>(fetcher: &F, layout: &RunLayout) -> Result<SourceOutput> {
    let dir = layout.jurisdiction_dir("usa")?;
    let mut out = SourceOutput::default();

    // exempt organisations
    let mut parts = Vec::with_capacity(BUSINESS_FILES.len());
    let mut last = None;
    let mut failed = None;
    for url in BUSINESS_FILES {
        let resp = fetcher.fetch(&FetchRequest::get(url)).await?;
        if !resp.is_ok() {
            failed = Some((url, resp.status));
            last = Some(resp);
            break;
        }
        parts.push(resp.body.clone());
        last = Some(resp);
    }
    // headers of the last response seen, success or not
    if let Some(resp) = &last {
        DownloadMetadata::from_response(resp)
            .with("file", "Exempt Organisations - Business Files")
            .with("data_link", BUSINESS_FILES.to_vec())
            .write(layout.metadata_path("usa-exempt"))?;
    }
    if let Some((url, status)) = failed {
        bail!("{} answered {}", url, status);
    }

    let master = dir.join(format!("irs_businessfile_master_{}.csv", layout.date()));
    let mut wtr = BufWriter::new(File::create(&master)?);
    let bytes = usa::concat_business_files(&parts, &mut wtr)?;
    wtr.flush()?;
    info!(path = %master.display(), bytes, "wrote business master file");
    out.push(master);

    // revoked organisations
    let resp = fetcher.fetch(&FetchRequest::get(REVOCATION_URL)).await?;
    DownloadMetadata::from_response(&resp)
        .with("file", "Revoked Organisations")
        .with("data_link", REVOCATION_URL)
        .write(layout.metadata_path("usa-revoked"))?;
    if !resp.is_ok() {
        warn!(status = resp.status, "unable to download revocation list");
        return Ok(out);
    }
    save::save(dir.join("data-download-revocation.zip"), &resp.body).await?;

    let revoked = dir.join(format!("irs_revoked_exemp_orgs_{}.csv", layout.date()));
    usa::write_revocations(&resp.body, &revoked)?;
    out.push(revoked);
    Ok(out)
}
