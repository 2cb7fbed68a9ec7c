use anyhow::Result;
use cabinetscraper::{
    config::Config,
    fetch::HtmlFetcher,
    merge::combine_cabinets,
    process::{build_cabinet, CabinetReport},
    store::CsvStore,
};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "cabinetscraper")]
#[command(about = "Scrape cabinet member tables into per-administration CSV files")]
struct Args {
    /// YAML config file; built-in defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory for the CSV files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Only process these administrations (repeatable)
    #[arg(short, long = "source")]
    sources: Vec<String>,

    /// File name for the merged dataset
    #[arg(long)]
    combined: Option<String>,

    /// Write the per-administration files only
    #[arg(long)]
    skip_merge: bool,

    /// Re-merge existing per-administration files without scraping
    #[arg(long, conflicts_with = "skip_merge")]
    merge_only: bool,
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cabinetscraper=info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    // ─── 2) configuration ────────────────────────────────────────────
    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    if let Some(name) = args.combined {
        config.combined_file = name;
    }

    for name in &args.sources {
        if !config
            .sources
            .iter()
            .any(|s| s.administration.eq_ignore_ascii_case(name))
        {
            warn!(source = %name, "no configured source with this administration");
        }
    }
    let sources = config.selected_sources(&args.sources);
    let store = CsvStore::new(&config.data_dir);
    info!(
        sources = sources.len(),
        data_dir = %config.data_dir.display(),
        "startup"
    );

    // ─── 3) scrape each administration ───────────────────────────────
    if !args.merge_only {
        let fetcher = HtmlFetcher::new(&config.http)?;
        let reports: Vec<CabinetReport> = sources
            .iter()
            .map(|source| {
                info!("Processing {} cabinet", source.administration);
                build_cabinet(&fetcher, &store, source, &config)
            })
            .collect();

        info!("Summary:");
        for r in &reports {
            info!(
                administration = %r.administration,
                tables = r.tables_used,
                skipped = r.tables_skipped,
                "{}: {} members",
                r.administration,
                r.members
            );
        }
    }

    // ─── 4) merge ────────────────────────────────────────────────────
    if args.skip_merge {
        return Ok(());
    }
    let names: Vec<String> = sources.iter().map(|s| s.output_name()).collect();
    let (combined, report) = combine_cabinets(&store, &names, &config.combined_file);
    match report.output {
        Some(path) => info!(
            members = combined.len(),
            path = %path.display(),
            "Total cabinet members across all administrations: {}",
            combined.len()
        ),
        None => warn!(
            read = report.datasets_read,
            skipped = report.datasets_skipped,
            "combined dataset not written"
        ),
    }

    Ok(())
}
