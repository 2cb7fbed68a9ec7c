// src/process/mod.rs

use rayon::prelude::*;
use std::path::PathBuf;
use tracing::{error, info, instrument, warn};

use crate::config::{Config, Source};
use crate::fetch::TableFetcher;
use crate::store::DatasetStore;
use crate::table::{Dataset, RawTable};

pub mod columns;
pub mod date_parser;
pub mod derive;
pub mod normalize;
pub mod utils;

pub use columns::DeriveConfig;
pub use derive::derive_fields;
pub use normalize::{normalize_table, TableOutcome};

/// Summary of one source's run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CabinetReport {
    pub administration: String,
    pub tables_found: usize,
    pub tables_used: usize,
    pub tables_skipped: usize,
    pub members: usize,
    pub output: Option<PathBuf>,
}

/// Normalize every table (in parallel) and stack the survivors in page order.
/// Returns the combined rows plus (used, skipped) table counts.
pub fn normalize_tables(
    tables: &[RawTable],
    administration: Option<&str>,
) -> (Dataset, usize, usize) {
    let outcomes: Vec<TableOutcome> = tables
        .par_iter()
        .map(|t| normalize_table(t, administration))
        .collect();

    let mut parts = Vec::with_capacity(outcomes.len());
    let mut skipped = 0;
    for (i, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            TableOutcome::Normalized(ds) => {
                info!(table = i + 1, rows = ds.len(), "processed table");
                parts.push(ds);
            }
            TableOutcome::Skipped { reason } => {
                warn!(table = i + 1, %reason, "skipping table");
                skipped += 1;
            }
        }
    }

    let used = parts.len();
    (Dataset::concat(parts), used, skipped)
}

/// Fetch, normalize and enrich one source in memory. Fetch or derivation
/// failures are logged and give an empty dataset.
#[instrument(level = "info", skip_all, fields(administration = %source.administration))]
pub fn create_cabinet<F: TableFetcher>(
    fetcher: &F,
    source: &Source,
    config: &Config,
) -> (Dataset, CabinetReport) {
    let mut report = CabinetReport {
        administration: source.administration.clone(),
        ..CabinetReport::default()
    };

    info!("fetching tables from {}", source.cabinet_name());
    let tables = match fetcher.fetch_tables(&source.url, &config.marker) {
        Ok(t) => t,
        Err(e) => {
            error!(url = %source.url, error = %format!("{:#}", e), "fetch failed");
            return (Dataset::default(), report);
        }
    };
    report.tables_found = tables.len();
    info!("found {} tables", tables.len());

    let (combined, used, skipped) = normalize_tables(&tables, Some(&source.administration));
    report.tables_used = used;
    report.tables_skipped = skipped;
    if used == 0 {
        warn!("no tables were processed successfully");
        return (Dataset::default(), report);
    }

    match derive_fields(combined, &config.derive) {
        Ok(ds) => {
            report.members = ds.len();
            (ds, report)
        }
        Err(e) => {
            error!(error = %format!("{:#}", e), "deriving fields failed");
            (Dataset::default(), report)
        }
    }
}

/// [`create_cabinet`] followed by writing the dataset under the source's
/// output name. Empty results are reported, not written.
pub fn build_cabinet<F: TableFetcher, S: DatasetStore>(
    fetcher: &F,
    store: &S,
    source: &Source,
    config: &Config,
) -> CabinetReport {
    let (ds, mut report) = create_cabinet(fetcher, source, config);
    if ds.is_empty() {
        return report;
    }

    let name = source.output_name();
    match store.write(&ds, &name) {
        Ok(path) => {
            info!(path = %path.display(), members = ds.len(), "CSV file saved");
            report.output = Some(path);
        }
        Err(e) => error!(file = %name, error = %format!("{:#}", e), "saving failed"),
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{parse_tables, HtmlFetcher};
    use crate::store::CsvStore;
    use crate::table::Cell;
    use anyhow::{anyhow, Result};
    use chrono::NaiveDate;
    use regex::Regex;
    use std::fs;
    use tempfile::tempdir;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,cabinetscraper=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    const CABINET_PAGE: &str = r#"
<html><body>
<table class="wikitable"><tbody>
  <tr><th colspan="6">Secretary of State</th></tr>
  <tr><th></th><th>Name</th><th>Date of birth</th><th>Background</th><th>Years</th><th>Refs</th></tr>
  <tr><td></td><th><a href="/wiki/Marco_Rubio">Marco Rubio</a></th>
      <td>May 28, 1971 (age 53)</td><td>U.S. Senator from Florida (2011–2025)</td>
      <td>2025–present</td><td>[1]</td></tr>
</tbody></table>
<table class="wikitable"><tbody>
  <tr><th colspan="5">Secretary of the Treasury</th></tr>
  <tr><th>Name</th><th>Date of birth</th><th>Background</th><th>Years</th><th>Name</th></tr>
  <tr><th>Scott Bessent</th><td>c. 1962</td><td>Investor</td><td>2025–present</td><td>x</td></tr>
  <tr><th>Name</th><th>Date of birth</th><th>Background</th><th>Years</th><th>Name</th></tr>
</tbody></table>
<table><tr><th>Date of birth</th></tr><tr><td>flat table</td></tr></table>
</body></html>
"#;

    struct FailingFetcher;

    impl TableFetcher for FailingFetcher {
        fn fetch_tables(&self, locator: &str, _marker: &str) -> Result<Vec<RawTable>> {
            Err(anyhow!("connection refused: {}", locator))
        }
    }

    fn page_source(dir: &std::path::Path) -> Result<Source> {
        let page = dir.join("Second_cabinet_of_Donald_Trump.html");
        fs::write(&page, CABINET_PAGE)?;
        Ok(Source {
            url: page.to_string_lossy().into_owned(),
            administration: "Trump 2nd".into(),
            output_file: Some("trump_second_cabinet.csv".into()),
        })
    }

    #[test]
    fn tables_are_normalized_in_page_order() {
        let tables = parse_tables(CABINET_PAGE, &Regex::new("Date of birth").unwrap());
        assert_eq!(tables.len(), 3);

        let (ds, used, skipped) = normalize_tables(&tables, Some("Trump 2nd"));
        assert_eq!((used, skipped), (2, 1));
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.get(0, "Name"), Some(&Cell::text("Marco Rubio")));
        assert_eq!(ds.get(1, "Name"), Some(&Cell::text("Scott Bessent")));
        assert_eq!(ds.get(1, "Name_1"), Some(&Cell::text("x")));
        assert_eq!(ds.get(0, "Name_1"), Some(&Cell::Absent));
    }

    #[test]
    fn build_cabinet_end_to_end() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        let source = page_source(dir.path())?;
        let config = Config {
            data_dir: dir.path().join("data"),
            ..Config::default()
        };
        let store = CsvStore::new(&config.data_dir);
        let fetcher = HtmlFetcher::new(&config.http)?;

        let report = build_cabinet(&fetcher, &store, &source, &config);
        assert_eq!(report.tables_found, 3);
        assert_eq!(report.tables_used, 2);
        assert_eq!(report.tables_skipped, 1);
        assert_eq!(report.members, 2);
        assert_eq!(
            report.output,
            Some(config.data_dir.join("trump_second_cabinet.csv"))
        );

        let ds = store.read("trump_second_cabinet.csv")?;
        assert_eq!(
            ds.columns(),
            &[
                "Administration",
                "Position",
                "Name",
                "Age",
                "State",
                "Date of birth",
                "Birth Year",
                "Background",
                "Years",
                "Name_1",
                "Birth Date",
                "Start year",
                "Current",
            ]
        );
        assert_eq!(ds.get(0, "Position"), Some(&Cell::text("Secretary of State")));
        assert_eq!(ds.get(0, "State"), Some(&Cell::text("Florida")));
        assert_eq!(ds.get(0, "Age"), Some(&Cell::Integer(53)));
        assert_eq!(
            ds.get(0, "Birth Date"),
            Some(&Cell::Date(NaiveDate::from_ymd_opt(1971, 5, 28).unwrap()))
        );
        assert_eq!(ds.get(1, "Birth Date"), Some(&Cell::Absent));
        assert_eq!(ds.get(1, "Birth Year"), Some(&Cell::Integer(1962)));
        assert_eq!(ds.get(1, "Current"), Some(&Cell::Boolean(true)));
        assert_eq!(ds.get(1, "Start year"), Some(&Cell::Integer(2025)));
        Ok(())
    }

    #[test]
    fn fetch_failure_gives_empty_report() -> Result<()> {
        let dir = tempdir()?;
        let store = CsvStore::new(dir.path());
        let source = Source::new("https://example.invalid/wiki/Nope", "Nobody", None);

        let report = build_cabinet(&FailingFetcher, &store, &source, &Config::default());
        assert_eq!(report.members, 0);
        assert_eq!(report.output, None);
        assert!(!dir.path().join("nope.csv").exists());
        Ok(())
    }
}
