// src/sources/sco.rs

use anyhow::Result;
use tracing::{info, instrument, warn};

use super::SourceOutput;
use crate::{
    fetch::{save, Fetch, FetchRequest},
    layout::RunLayout,
    metadata::DownloadMetadata,
};

pub const REGISTER_URL: &str =
    "https://www.oscr.org.uk/umbraco/Surface/FormsSurface/CharityRegDownload";
pub const REMOVED_URL: &str =
    "https://www.oscr.org.uk/umbraco/Surface/FormsSurface/CharityFormerRegDownload";

/// (metadata/file prefix, url, description)
const DOWNLOADS: [(&str, &str, &str); 2] = [
    ("sco-roc", REGISTER_URL, "Register of Charities"),
    ("sco-rem", REMOVED_URL, "Removed Organisations"),
];

/// OSCR register and former-register ZIPs. OSCR answers with the file
/// itself, so the body is always kept even on a non-200 status for later
/// inspection.
#[instrument(level = "info", skip_all, fields(date = layout.date()))]
pub async fn download<F: Fetch>(fetcher: &F, layout: &RunLayout) -> Result<SourceOutput> {
    let dir = layout.jurisdiction_dir("sco")?;
    let mut out = SourceOutput::default();

    for (prefix, url, description) in DOWNLOADS {
        let resp = fetcher.fetch(&FetchRequest::get(url)).await?;
        DownloadMetadata::from_response(&resp)
            .with("file", description)
            .with("url", url)
            .write(layout.metadata_path(prefix))?;

        if !resp.is_ok() {
            warn!(url, status = resp.status, "unexpected status for {}", description);
        }
        let path = layout.dated_file(&dir, prefix, "zip");
        save::save(&path, &resp.body).await?;
        info!(path = %path.display(), "downloaded {}", description);
        out.push(path);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::stub::StubFetcher;
    use tempfile::tempdir;

    #[tokio::test]
    async fn both_zips_written() -> Result<()> {
        let root = tempdir()?;
        let layout = RunLayout::prepare(root.path(), "2020-09-03")?;
        let fetcher = StubFetcher::new()
            .route(REGISTER_URL, 200, "PK-register")
            .route(REMOVED_URL, 200, "PK-removed");

        let out = download(&fetcher, &layout).await?;
        assert_eq!(out.files.len(), 2);
        assert_eq!(
            std::fs::read(layout.data_dir().join("sco/sco-rem-2020-09-03.zip"))?,
            b"PK-removed"
        );
        assert!(layout.metadata_path("sco-roc").is_file());
        assert!(layout.metadata_path("sco-rem").is_file());
        Ok(())
    }
}
