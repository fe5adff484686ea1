// src/harvest.rs

use std::{path::PathBuf, time::Instant};
use tracing::{error, info};

use crate::{
    fetch::Fetch,
    layout::RunLayout,
    sources::{self, Jurisdiction, SourceOptions},
};

/// Result of a harvest run, one entry per jurisdiction attempted.
#[derive(Debug, Default)]
pub struct HarvestSummary {
    pub succeeded: Vec<(Jurisdiction, Vec<PathBuf>)>,
    pub failed: Vec<(Jurisdiction, String)>,
}

impl HarvestSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Run `selected` jurisdictions one after another in harvest order. A
/// failing jurisdiction is logged and recorded; the rest still run.
pub async fn harvest<F: Fetch>(
    fetcher: &F,
    layout: &RunLayout,
    selected: &[Jurisdiction],
    opts: &SourceOptions,
) -> HarvestSummary {
    let mut summary = HarvestSummary::default();
    for jurisdiction in Jurisdiction::ALL {
        if !selected.contains(&jurisdiction) {
            continue;
        }
        info!(%jurisdiction, "downloading");
        let start = Instant::now();
        match sources::run(jurisdiction, fetcher, layout, opts).await {
            Ok(out) => {
                info!(%jurisdiction, files = out.files.len(), elapsed = ?start.elapsed(), "done");
                summary.succeeded.push((jurisdiction, out.files));
            }
            Err(e) => {
                error!(%jurisdiction, error = ?e, "could not download");
                summary.failed.push((jurisdiction, format!("{e:#}")));
            }
        }
    }
    summary
}
