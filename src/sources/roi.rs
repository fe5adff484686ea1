// src/sources/roi.rs

use anyhow::Result;
use tracing::{info, instrument, warn};
use url::Url;

use super::SourceOutput;
use crate::{
    fetch::{links, save, Fetch, FetchRequest},
    layout::RunLayout,
    metadata::DownloadMetadata,
};

pub const SEARCH_PAGE_URL: &str =
    "https://www.charitiesregulator.ie/en/information-for-the-public/search-the-register-of-charities";
/// Register links on the search page are site-relative.
pub const BASE_URL: &str = "http://www.charitiesregulator.ie";
pub const REGISTER_LINK: &str = "a[href*=public-register]";

#[instrument(level = "info", skip_all, fields(date = layout.date()))]
pub async fn download<F: Fetch>(fetcher: &F, layout: &RunLayout) -> Result<SourceOutput> {
    let dir = layout.jurisdiction_dir("roi")?;
    let mut out = SourceOutput::default();

    let page = fetcher.fetch(&FetchRequest::get(SEARCH_PAGE_URL)).await?;
    DownloadMetadata::from_response(&page)
        .with("file", "Register of Charities")
        .with("url", SEARCH_PAGE_URL)
        .write(layout.metadata_path("roi-roc"))?;

    if !page.is_ok() {
        warn!(status = page.status, "unable to request register search page");
        return Ok(out);
    }

    let file_url = links::first_link(&page.text(), REGISTER_LINK, &Url::parse(BASE_URL)?)?;
    info!(url = %file_url, "found register link");
    let file = fetcher.fetch(&FetchRequest::get(file_url.as_str())).await?;
    if !file.is_ok() {
        warn!(url = %file_url, status = file.status, "unable to download Register of Charities");
        return Ok(out);
    }

    let path = layout.dated_file(&dir, "roi-roc", "xlsx");
    save::save_if_absent(&path, &file.body).await?;
    out.push(path);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::stub::StubFetcher;
    use tempfile::tempdir;

    #[tokio::test]
    async fn follows_register_link() -> Result<()> {
        let root = tempdir()?;
        let layout = RunLayout::prepare(root.path(), "2020-09-03")?;
        let page = r#"<a href="/CharitiesRegulatorDocs/public-register 03092020.xlsx">Register</a>"#;
        let fetcher = StubFetcher::new()
            .route(SEARCH_PAGE_URL, 200, page)
            .route(
                "http://www.charitiesregulator.ie/CharitiesRegulatorDocs/public-register%2003092020.xlsx",
                200,
                "xlsx-bytes",
            );

        let out = download(&fetcher, &layout).await?;
        assert_eq!(out.files.len(), 1);
        assert_eq!(std::fs::read(&out.files[0])?, b"xlsx-bytes");
        Ok(())
    }

    #[tokio::test]
    async fn page_without_link_fails() -> Result<()> {
        let root = tempdir()?;
        let layout = RunLayout::prepare(root.path(), "2020-09-03")?;
        let fetcher = StubFetcher::new().route(SEARCH_PAGE_URL, 200, "<p>maintenance</p>");
        assert!(download(&fetcher, &layout).await.is_err());
        Ok(())
    }
}
