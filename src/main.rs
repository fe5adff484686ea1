use anyhow::{bail, Result};
use charityscraper::{
    bcp,
    fetch::HttpFetcher,
    harvest::harvest,
    layout::{self, RunLayout},
    ni,
    sources::{Jurisdiction, SourceOptions},
};
use clap::{Args, Parser, Subcommand};
use std::{fs, path::PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(author, version, about = "Download public charity registers into dated folders")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download registers for every (or the selected) jurisdiction
    Harvest(HarvestArgs),

    /// Decode a local Charity Commission extract ZIP into CSVs
    Convert {
        /// Extract ZIP containing `<table>.bcp` members
        zip: PathBuf,
        /// Folder to write `<table>.csv` files into
        dest: PathBuf,
    },

    /// Rebuild the NI removals file from an existing register and web pages
    NiRemovals {
        #[arg(long)]
        register: PathBuf,
        #[arg(long)]
        webpages: PathBuf,
        #[arg(long)]
        out: PathBuf,
        /// Date stamp for the output name (default: today)
        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(Args)]
struct HarvestArgs {
    /// Root folder; each run writes to `<root>/<date>`
    #[arg(long, default_value = "data")]
    root: PathBuf,

    /// Run date (default: today)
    #[arg(long)]
    date: Option<String>,

    /// Comma-separated jurisdiction codes: sco,aus,ew,roi,ni,usa,nz,can
    #[arg(long, value_delimiter = ',')]
    only: Vec<Jurisdiction>,

    /// Keep NI charity web pages after extracting removal dates
    #[arg(long)]
    keep_webpages: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Harvest(args) => run_harvest(args).await,
        Command::Convert { zip, dest } => {
            let report = tokio::task::spawn_blocking(move || bcp::import_zip(&zip, &dest)).await??;
            for (table, err) in &report.failed {
                error!(table, error = %err, "table not converted");
            }
            info!(
                converted = report.converted.len(),
                missing = report.missing.len(),
                "conversion finished"
            );
            if !report.failed.is_empty() {
                bail!("{} tables failed to convert", report.failed.len());
            }
            Ok(())
        }
        Command::NiRemovals {
            register,
            webpages,
            out,
            date,
        } => {
            let date = date.unwrap_or_else(layout::today);
            fs::create_dir_all(&out)?;
            let path = ni::extract_removals(&register, &webpages, &out, &date)?;
            info!(path = %path.display(), "removals written");
            Ok(())
        }
    }
}

async fn run_harvest(args: HarvestArgs) -> Result<()> {
    // ─── 2) configure dirs ───────────────────────────────────────────
    let date = args.date.unwrap_or_else(layout::today);
    let layout = RunLayout::prepare(&args.root, &date)?;
    info!(dir = %layout.data_dir().display(), "startup");

    let selected = if args.only.is_empty() {
        Jurisdiction::ALL.to_vec()
    } else {
        args.only
    };

    // ─── 3) download, one jurisdiction at a time ─────────────────────
    let fetcher = HttpFetcher::new()?;
    let opts = SourceOptions {
        keep_webpages: args.keep_webpages,
    };
    let summary = harvest(&fetcher, &layout, &selected, &opts).await;

    // ─── 4) report ───────────────────────────────────────────────────
    for (jurisdiction, files) in &summary.succeeded {
        info!(%jurisdiction, files = files.len(), "downloaded");
    }
    for (jurisdiction, reason) in &summary.failed {
        warn!(%jurisdiction, %reason, "not downloaded");
    }
    if !summary.is_success() {
        bail!(
            "{} of {} jurisdictions failed",
            summary.failed.len(),
            selected.len()
        );
    }
    info!("all done");
    Ok(())
}
