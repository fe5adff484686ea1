// src/sources/ew.rs

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{info, instrument, warn};
use url::Url;

use super::SourceOutput;
use crate::{
    bcp,
    fetch::{links, save, Fetch, FetchRequest},
    layout::RunLayout,
    metadata::DownloadMetadata,
};

pub const PORTAL_URL: &str =
    "https://register-of-charities.charitycommission.gov.uk/register/full-register-download";
pub const BASE_URL: &str = "https://register-of-charities.charitycommission.gov.uk";
pub const EXTRACT_LINK: &str = "a[href*=Extract]";

/// Charity Commission data extract: find the ZIP on the download page, keep
/// it, and decode its BCP tables into CSVs beside it.
#[instrument(level = "info", skip_all, fields(date = layout.date()))]
pub async fn download<F: Fetch>(fetcher: &F, layout: &RunLayout) -> Result<SourceOutput> {
    let dir = layout.jurisdiction_dir("ew")?;
    let mut out = SourceOutput::default();

    let portal = fetcher.fetch(&FetchRequest::get(PORTAL_URL)).await?;
    if !portal.is_ok() {
        warn!(status = portal.status, "unable to request data extract page");
        DownloadMetadata::from_response(&portal)
            .with("file", "Data Extract")
            .with("data_portal_link", PORTAL_URL)
            .write(layout.metadata_path("ew-download"))?;
        return Ok(out);
    }

    let file_url = links::first_link(&portal.text(), EXTRACT_LINK, &Url::parse(BASE_URL)?)?;
    info!(url = %file_url, "found data extract link");
    let file = fetcher.fetch(&FetchRequest::get(file_url.as_str())).await?;
    DownloadMetadata::from_response(&file)
        .with("file", "Data Extract")
        .with("data_portal_link", PORTAL_URL)
        .with("data_extract_link", file_url.as_str())
        .with("data_extract_final_url", file.url.as_str())
        .with(
            "data_extract_last_modified",
            file.header("last-modified").unwrap_or_default(),
        )
        .write(layout.metadata_path("ew-download"))?;

    if !file.is_ok() {
        warn!(url = %file_url, status = file.status, "unable to download data extract");
        return Ok(out);
    }

    let zip_path = layout.dated_file(&dir, "ccew-data-extract", "zip");
    save::save_if_absent(&zip_path, &file.body).await?;
    out.push(zip_path.clone());

    out.files.extend(decode_extract(zip_path, dir).await?);
    Ok(out)
}

/// Run the BCP decoder off the async runtime.
async fn decode_extract(zip_path: PathBuf, dest: PathBuf) -> Result<Vec<PathBuf>> {
    let report = tokio::task::spawn_blocking(move || bcp::import_zip(&zip_path, &dest))
        .await
        .context("extract decoder panicked")??;

    if !report.missing.is_empty() {
        warn!(tables = ?report.missing, "tables missing from extract");
    }
    for (table, err) in &report.failed {
        warn!(table, error = %err, "table not converted");
    }
    Ok(report.converted.into_iter().map(|t| t.path).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::stub::StubFetcher;
    use serde_json::Value;
    use std::io::{Cursor, Write};
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;

    fn extract_zip() -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            zip.start_file("extract_class_ref.bcp", SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"101@**@General Charitable Purposes*@@*").unwrap();
            zip.finish().unwrap();
        }
        buf
    }

    #[tokio::test]
    async fn downloads_and_decodes() -> Result<()> {
        let root = tempdir()?;
        let layout = RunLayout::prepare(root.path(), "2020-09-03")?;
        let portal = r#"<a href="/documents/help.pdf">Help</a>
            <a href="/Extract/RegPlusExtract_September_2020.zip">Data extract</a>"#;
        let fetcher = StubFetcher::new().route(PORTAL_URL, 200, portal).route(
            "https://register-of-charities.charitycommission.gov.uk/Extract/RegPlusExtract_September_2020.zip",
            200,
            extract_zip(),
        );

        let out = download(&fetcher, &layout).await?;
        let ew = layout.data_dir().join("ew");
        assert_eq!(
            out.files,
            vec![
                ew.join("ccew-data-extract-2020-09-03.zip"),
                ew.join("extract_class_ref.csv")
            ]
        );
        assert_eq!(
            std::fs::read_to_string(ew.join("extract_class_ref.csv"))?,
            "classno,classtext\n\"101\",\"General Charitable Purposes\"\n\"\""
        );

        let meta: Value = serde_json::from_str(&std::fs::read_to_string(
            layout.metadata_path("ew-download"),
        )?)?;
        assert_eq!(meta["file"], "Data Extract");
        assert_eq!(meta["data_extract_last_modified"], "Tue, 01 Sep 2020 08:00:00 GMT");
        assert_eq!(
            meta["data_extract_final_url"],
            "https://register-of-charities.charitycommission.gov.uk/Extract/RegPlusExtract_September_2020.zip"
        );
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_extract_fails_source() -> Result<()> {
        let root = tempdir()?;
        let layout = RunLayout::prepare(root.path(), "2020-09-03")?;
        let fetcher = StubFetcher::new()
            .route(PORTAL_URL, 200, r#"<a href="/Extract/x.zip">x</a>"#)
            .route(
                "https://register-of-charities.charitycommission.gov.uk/Extract/x.zip",
                200,
                "<html>not a zip</html>",
            );
        let err = download(&fetcher, &layout).await.unwrap_err();
        assert!(err.downcast_ref::<bcp::BcpError>().is_some());
        Ok(())
    }
}
