use anyhow::{ensure, Result};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::process::columns::{ADMINISTRATION, NAME, POSITION};
use crate::process::utils::clean_name;
use crate::table::{Cell, ColumnPath, Dataset, RawTable};

/// Literal that marks a column the page never named.
pub const PLACEHOLDER_MARKER: &str = "Unnamed";

/// Result of normalizing one table. Nothing else leaves the table boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum TableOutcome {
    Normalized(Dataset),
    Skipped { reason: String },
}

impl TableOutcome {
    fn skipped(reason: impl Into<String>) -> Self {
        TableOutcome::Skipped {
            reason: reason.into(),
        }
    }
}

/// Turn one raw table into flat per-person rows tagged with its position
/// (and `administration`, when given).
///
/// Tables that are not two-level personnel tables, and any table that fails
/// along the way, come back as [`TableOutcome::Skipped`].
pub fn normalize_table(raw: &RawTable, administration: Option<&str>) -> TableOutcome {
    match try_normalize(raw, administration) {
        Ok(outcome) => outcome,
        Err(e) => TableOutcome::skipped(format!("{:#}", e)),
    }
}

fn try_normalize(raw: &RawTable, administration: Option<&str>) -> Result<TableOutcome> {
    match raw.header_depth() {
        0 => return Ok(TableOutcome::skipped("table has no header")),
        1 => return Ok(TableOutcome::skipped("header has a single level")),
        2 => {}
        n => return Ok(TableOutcome::skipped(format!("header has {} levels", n))),
    }

    let position = raw
        .columns
        .first()
        .and_then(|p| p.first())
        .cloned()
        .unwrap_or_default();

    let names = dedupe_names(flatten_headers(&raw.columns));
    let keep: Vec<usize> = names
        .iter()
        .enumerate()
        .filter(|(_, n)| !is_placeholder(n))
        .map(|(i, _)| i)
        .collect();
    debug!(
        position = %position,
        kept = keep.len(),
        dropped = names.len() - keep.len(),
        "flattened header"
    );

    let mut ds = Dataset::new(keep.iter().map(|&i| names[i].clone()).collect());
    for (r, row) in raw.rows.iter().enumerate() {
        ensure!(
            row.len() <= names.len(),
            "row {} has {} cells for {} columns",
            r,
            row.len(),
            names.len()
        );
        let cells: Vec<Cell> = keep
            .iter()
            .map(|&i| row.get(i).cloned().unwrap_or(Cell::Absent))
            .collect();
        if cells.iter().all(Cell::is_absent) {
            continue;
        }
        ds.push_row(cells)?;
    }

    ds.set_constant(POSITION, Cell::Text(position));
    if let Some(admin) = administration {
        ds.set_constant(ADMINISTRATION, Cell::Text(admin.to_string()));
    }

    if ds.has_column(NAME) {
        ds.retain_rows(|r| match r.get(NAME) {
            None | Some(Cell::Absent) => false,
            Some(Cell::Text(s)) => s != NAME,
            Some(_) => true,
        });
        ds.map_column(NAME, |cell| match cell {
            Cell::Text(s) => Cell::text(clean_name(&s)),
            other => other,
        });
        ds.retain_rows(|r| !r.get(NAME).map_or(true, Cell::is_absent));
    }

    Ok(TableOutcome::Normalized(ds))
}

/// Flatten two-level paths: the sub-label when it has content, else the top label.
pub fn flatten_headers(columns: &[ColumnPath]) -> Vec<String> {
    columns
        .iter()
        .map(|path| {
            let top = path.first().map(String::as_str).unwrap_or("");
            match path.get(1) {
                Some(sub) if !sub.trim().is_empty() => sub.clone(),
                _ => top.to_string(),
            }
        })
        .collect()
}

/// Give repeated names `_1`, `_2`, … in left-to-right order; the first keeps
/// the bare name. A suffix already used by another column is skipped, so the
/// output never repeats. Empty names are left alone.
pub fn dedupe_names(names: Vec<String>) -> Vec<String> {
    let mut taken: HashSet<String> = names.iter().cloned().collect();
    let mut seen: HashSet<String> = HashSet::with_capacity(names.len());
    let mut next: HashMap<String, usize> = HashMap::new();

    names
        .into_iter()
        .map(|name| {
            if name.is_empty() || seen.insert(name.clone()) {
                return name;
            }
            let k = next.entry(name.clone()).or_insert(1);
            loop {
                let candidate = format!("{}_{}", name, k);
                *k += 1;
                if taken.insert(candidate.clone()) {
                    return candidate;
                }
            }
        })
        .collect()
}

pub fn is_placeholder(name: &str) -> bool {
    name.is_empty() || name.contains(PLACEHOLDER_MARKER)
}
