// src/merge.rs

use std::path::PathBuf;
use tracing::{error, info, instrument, warn};

use crate::store::DatasetStore;
use crate::table::Dataset;

/// What a merge run read, skipped and produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub datasets_read: usize,
    pub datasets_skipped: usize,
    pub rows: usize,
    pub columns: usize,
    pub output: Option<PathBuf>,
}

/// Read each named dataset and stack them in the given order. Unreadable
/// datasets are logged and left out.
pub fn merge_datasets<S: DatasetStore>(store: &S, names: &[String]) -> (Dataset, MergeReport) {
    let mut parts = Vec::with_capacity(names.len());
    let mut report = MergeReport::default();

    for name in names {
        match store.read(name) {
            Ok(ds) => {
                info!(
                    file = %name,
                    rows = ds.len(),
                    columns = ds.columns().len(),
                    "read dataset"
                );
                parts.push(ds);
                report.datasets_read += 1;
            }
            Err(e) => {
                let reason = format!("{:#}", e);
                error!(file = %name, error = %reason, "error reading dataset");
                report.datasets_skipped += 1;
            }
        }
    }

    let combined = Dataset::concat(parts);
    report.rows = combined.len();
    report.columns = combined.columns().len();
    (combined, report)
}

/// Merge `names` and write the result under `target`. Nothing is written when
/// no dataset could be read; a failed write is logged and leaves `output` unset.
#[instrument(level = "info", skip(store, names), fields(count = names.len()))]
pub fn combine_cabinets<S: DatasetStore>(
    store: &S,
    names: &[String],
    target: &str,
) -> (Dataset, MergeReport) {
    let (combined, mut report) = merge_datasets(store, names);

    if report.datasets_read == 0 {
        warn!("no datasets were read successfully");
        return (combined, report);
    }
    info!(rows = combined.len(), "combined data");

    match store.write(&combined, target) {
        Ok(path) => {
            info!(path = %path.display(), "combined dataset saved");
            report.output = Some(path);
        }
        Err(e) => {
            let reason = format!("{:#}", e);
            error!(file = %target, error = %reason, "saving combined dataset failed");
        }
    }
    (combined, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CsvStore;
    use crate::table::Cell;
    use anyhow::Result;
    use tempfile::tempdir;

    fn ds(cols: &[&str], rows: Vec<Vec<Cell>>) -> Dataset {
        Dataset::from_rows(cols.iter().map(|s| s.to_string()).collect(), rows).unwrap()
    }

    #[test]
    fn disjoint_schemas_merge_to_union() -> Result<()> {
        let dir = tempdir()?;
        let store = CsvStore::new(dir.path());
        store.write(
            &ds(
                &["A", "B"],
                vec![
                    vec![Cell::text("a1"), Cell::text("b1")],
                    vec![Cell::text("a2"), Cell::text("b2")],
                ],
            ),
            "first.csv",
        )?;
        store.write(
            &ds(&["B", "C"], vec![vec![Cell::text("b3"), Cell::text("c3")]]),
            "second.csv",
        )?;

        let names = vec!["first.csv".to_string(), "second.csv".to_string()];
        let (merged, report) = combine_cabinets(&store, &names, "all.csv");

        assert_eq!(merged.columns(), &["A", "B", "C"]);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.get(0, "B"), Some(&Cell::text("b1")));
        assert_eq!(merged.get(1, "C"), Some(&Cell::Absent));
        assert_eq!(merged.get(2, "A"), Some(&Cell::Absent));
        assert_eq!(merged.get(2, "C"), Some(&Cell::text("c3")));
        assert_eq!(report.datasets_read, 2);
        assert_eq!(report.output, Some(dir.path().join("all.csv")));

        // what landed on disk matches what was returned
        assert_eq!(store.read("all.csv")?, merged);
        Ok(())
    }

    #[test]
    fn unreadable_dataset_is_skipped() -> Result<()> {
        let dir = tempdir()?;
        let store = CsvStore::new(dir.path());
        store.write(&ds(&["A"], vec![vec![Cell::text("x")]]), "ok.csv")?;

        let names = vec!["missing.csv".to_string(), "ok.csv".to_string()];
        let (merged, report) = merge_datasets(&store, &names);
        assert_eq!(merged.len(), 1);
        assert_eq!(report.datasets_read, 1);
        assert_eq!(report.datasets_skipped, 1);
        Ok(())
    }

    #[test]
    fn nothing_readable_yields_empty_result() -> Result<()> {
        let dir = tempdir()?;
        let store = CsvStore::new(dir.path());
        let (merged, report) = combine_cabinets(&store, &["gone.csv".to_string()], "all.csv");
        assert!(merged.is_empty());
        assert_eq!(report.output, None);
        assert!(!dir.path().join("all.csv").exists());
        Ok(())
    }

    #[test]
    fn failed_target_write_still_returns_merge() -> Result<()> {
        let dir = tempdir()?;
        let store = CsvStore::new(dir.path());
        store.write(&ds(&["A"], vec![vec![Cell::text("x")]]), "ok.csv")?;

        // parent directory of the target does not exist
        let (merged, report) =
            combine_cabinets(&store, &["ok.csv".to_string()], "missing_dir/all.csv");
        assert_eq!(merged.len(), 1);
        assert_eq!(report.datasets_read, 1);
        assert_eq!(report.rows, 1);
        assert_eq!(report.output, None);
        Ok(())
    }
}
