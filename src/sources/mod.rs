// src/sources/mod.rs
//
// One module per regulator. Each source downloads into
// `<data>/<code>/`, writes its metadata into the run's log folder, and
// returns the files it produced.

pub mod aus;
pub mod can;
pub mod ew;
pub mod ni;
pub mod nz;
pub mod roi;
pub mod sco;
pub mod usa;

use anyhow::{bail, Result};
use std::{fmt, path::PathBuf, str::FromStr};
use tracing::{info, warn};

use crate::{
    fetch::{save, Fetch, FetchRequest, FetchResponse},
    layout::RunLayout,
    metadata::DownloadMetadata,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Jurisdiction {
    Scotland,
    Australia,
    EnglandWales,
    RepublicOfIreland,
    NorthernIreland,
    Usa,
    NewZealand,
    Canada,
}

impl Jurisdiction {
    /// Run order of a full harvest.
    pub const ALL: [Jurisdiction; 8] = [
        Jurisdiction::Scotland,
        Jurisdiction::Australia,
        Jurisdiction::EnglandWales,
        Jurisdiction::RepublicOfIreland,
        Jurisdiction::NorthernIreland,
        Jurisdiction::Usa,
        Jurisdiction::NewZealand,
        Jurisdiction::Canada,
    ];

    /// Folder and file-name prefix.
    pub fn code(self) -> &'static str {
        match self {
            Jurisdiction::Scotland => "sco",
            Jurisdiction::Australia => "aus",
            Jurisdiction::EnglandWales => "ew",
            Jurisdiction::RepublicOfIreland => "roi",
            Jurisdiction::NorthernIreland => "ni",
            Jurisdiction::Usa => "usa",
            Jurisdiction::NewZealand => "nz",
            Jurisdiction::Canada => "can",
        }
    }
}

impl fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Jurisdiction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        match Self::ALL.iter().find(|j| j.code() == wanted) {
            Some(j) => Ok(*j),
            None => bail!(
                "unknown jurisdiction {s:?}; expected one of {}",
                Self::ALL.map(|j| j.code()).join(", ")
            ),
        }
    }
}

/// Files written by one source.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SourceOutput {
    pub files: Vec<PathBuf>,
}

impl SourceOutput {
    pub fn push(&mut self, path: PathBuf) {
        self.files.push(path);
    }
}

/// A single-file register download: GET `url`, record metadata, keep the
/// body as `<code>/<prefix>-<date>.<ext>` if the request succeeded.
#[derive(Debug, Clone, Copy)]
pub struct RegisterDownload<'a> {
    pub code: &'a str,
    pub prefix: &'a str,
    pub url: &'a str,
    pub ext: &'a str,
    pub description: &'a str,
}

/// Returns the saved path, or `None` when the server did not answer 200.
pub async fn download_register<F: Fetch>(
    fetcher: &F,
    layout: &RunLayout,
    reg: RegisterDownload<'_>,
) -> Result<(Option<PathBuf>, FetchResponse)> {
    let dir = layout.jurisdiction_dir(reg.code)?;
    let outfile = layout.dated_file(&dir, reg.prefix, reg.ext);

    let resp = fetcher.fetch(&FetchRequest::get(reg.url)).await?;
    DownloadMetadata::from_response(&resp)
        .with("file", reg.description)
        .with("url", reg.url)
        .write(layout.metadata_path(reg.prefix))?;

    if !resp.is_ok() {
        warn!(url = reg.url, status = resp.status, "unable to download {}", reg.description);
        return Ok((None, resp));
    }
    save::save_if_absent(&outfile, &resp.body).await?;
    info!(path = %outfile.display(), "downloaded {}", reg.description);
    Ok((Some(outfile), resp))
}

/// Run one jurisdiction.
pub async fn run<F: Fetch>(
    jurisdiction: Jurisdiction,
    fetcher: &F,
    layout: &RunLayout,
    opts: &SourceOptions,
) -> Result<SourceOutput> {
    match jurisdiction {
        Jurisdiction::Scotland => sco::download(fetcher, layout).await,
        Jurisdiction::Australia => aus::download(fetcher, layout).await,
        Jurisdiction::EnglandWales => ew::download(fetcher, layout).await,
        Jurisdiction::RepublicOfIreland => roi::download(fetcher, layout).await,
        Jurisdiction::NorthernIreland => ni::download(fetcher, layout, opts.keep_webpages).await,
        Jurisdiction::Usa => usa::download(fetcher, layout).await,
        Jurisdiction::NewZealand => nz::download(fetcher, layout).await,
        Jurisdiction::Canada => can::download(fetcher, layout).await,
    }
}

/// Knobs that only some sources look at.
#[derive(Debug, Clone, Default)]
pub struct SourceOptions {
    /// Leave NI detail pages on disk after the removal scrape.
    pub keep_webpages: bool,
}
