// src/sources/can.rs

use anyhow::Result;
use tracing::{info, instrument, warn};

use super::SourceOutput;
use crate::{
    fetch::{save, Fetch, FetchRequest},
    layout::RunLayout,
    metadata::DownloadMetadata,
};

/// CRA "download list of charities" form target.
pub const DOWNLOAD_URL: &str = "https://apps.cra-arc.gc.ca/ebci/hacc/srch/pub/dwnldZp";
/// The form only answers when posted from the basic search page.
pub const REFERER: &str =
    "https://apps.cra-arc.gc.ca/ebci/hacc/srch/pub/bscSrch?q.srchNm=&q.stts=&p=1";

#[instrument(level = "info", skip_all, fields(date = layout.date()))]
pub async fn download<F: Fetch>(fetcher: &F, layout: &RunLayout) -> Result<SourceOutput> {
    let dir = layout.jurisdiction_dir("can")?;
    let mut out = SourceOutput::default();

    let req = FetchRequest::post(DOWNLOAD_URL).header("Referer", REFERER);
    let resp = fetcher.fetch(&req).await?;
    DownloadMetadata::from_response(&resp)
        .with("file", "List of Charities")
        .with("url", DOWNLOAD_URL)
        .write(layout.metadata_path("can-roc"))?;

    if !resp.is_ok() {
        warn!(status = resp.status, "unable to download List of Charities");
        return Ok(out);
    }
    let path = layout.dated_file(&dir, "can-roc", "zip");
    if save::save_if_absent(&path, &resp.body).await? {
        info!(path = %path.display(), "downloaded List of Charities");
    }
    out.push(path);
    Ok(out)
}
