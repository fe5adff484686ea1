// src/sources/ni.rs

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use super::{download_register, RegisterDownload, SourceOutput};
use crate::{
    cleanup,
    fetch::{save, Fetch, FetchRequest},
    layout::RunLayout,
    metadata::DownloadMetadata,
    ni,
};

pub const REGISTER_URL: &str = "https://www.charitycommissionni.org.uk/umbraco/api/charityApi/ExportSearchResultsToCsv/?include=Removed";

pub fn detail_page_url(regid: u64) -> String {
    format!("https://www.charitycommissionni.org.uk/charity-details/?regId={regid}&subId=0")
}

/// Register export, then every charity's detail page, then the removals
/// table scraped from those pages.
#[instrument(level = "info", skip_all, fields(date = layout.date()))]
pub async fn download<F: Fetch>(
    fetcher: &F,
    layout: &RunLayout,
    keep_webpages: bool,
) -> Result<SourceOutput> {
    let mut out = SourceOutput::default();
    let (saved, _) = download_register(
        fetcher,
        layout,
        RegisterDownload {
            code: "ni",
            prefix: "ni-roc",
            url: REGISTER_URL,
            ext: "csv",
            description: "Register of Charities",
        },
    )
    .await?;
    let Some(register) = saved else {
        return Ok(out);
    };
    out.push(register.clone());

    let dir = layout.jurisdiction_dir("ni")?;
    let webpage_dir = dir.join("webpages");
    std::fs::create_dir_all(&webpage_dir)
        .with_context(|| format!("creating {}", webpage_dir.display()))?;

    let entries = ni::parse_register(&std::fs::read(&register)?)?;
    info!(charities = entries.len(), "downloading charity web pages");
    for entry in &entries {
        download_page(fetcher, layout, entry.regid, &webpage_dir).await?;
    }

    let removals = ni::extract_removals(&register, &webpage_dir, &dir, layout.date())?;
    out.push(removals);

    if !keep_webpages {
        let deleted = cleanup::delete_files(&[webpage_dir.as_path()], ".txt")?;
        info!(deleted, "removed charity web pages");
    }
    Ok(out)
}

async fn download_page<F: Fetch>(
    fetcher: &F,
    layout: &RunLayout,
    regid: u64,
    webpage_dir: &std::path::Path,
) -> Result<()> {
    let url = detail_page_url(regid);
    let resp = fetcher.fetch(&FetchRequest::get(&url)).await?;
    DownloadMetadata::from_response(&resp)
        .with("registered_charity_number", regid.to_string())
        .with("url", url.as_str())
        .write(layout.log_dir().join(format!(
            "ni-webpages-metadata-{}-{}.json",
            regid,
            layout.date()
        )))?;

    if !resp.is_ok() {
        warn!(regid, status = resp.status, "could not download web page of charity");
        return Ok(());
    }
    let path = webpage_dir.join(ni::page_file_name(regid, layout.date()));
    save::save(&path, &resp.body).await
}
