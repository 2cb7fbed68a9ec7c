use serde::{Deserialize, Serialize};

use crate::table::Dataset;

pub const ADMINISTRATION: &str = "Administration";
pub const POSITION: &str = "Position";
pub const NAME: &str = "Name";
pub const AGE: &str = "Age";
pub const STATE: &str = "State";
pub const DATE_OF_BIRTH: &str = "Date of birth";
pub const BIRTH_DATE: &str = "Birth Date";
pub const BIRTH_YEAR: &str = "Birth Year";
pub const BACKGROUND: &str = "Background";
pub const YEARS: &str = "Years";
pub const START_YEAR: &str = "Start year";
pub const END_YEAR: &str = "End year";
pub const CURRENT: &str = "Current";

/// Columns that lead every output file, in this order.
pub const PRIORITY_COLUMNS: &[&str] = &[
    ADMINISTRATION,
    POSITION,
    NAME,
    AGE,
    STATE,
    DATE_OF_BIRTH,
    BIRTH_YEAR,
    BACKGROUND,
];

/// Citation columns that carry nothing worth keeping.
pub const DROP_COLUMNS: &[&str] = &["Reference", "Refs", "Notes"];

/// Year-valued columns that must serialize as whole numbers.
pub const WHOLE_NUMBER_COLUMNS: &[&str] = &[BIRTH_YEAR, START_YEAR, END_YEAR];

/// Pruning and ordering rules applied after derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeriveConfig {
    pub priority_columns: Vec<String>,
    pub drop_columns: Vec<String>,
}

impl Default for DeriveConfig {
    fn default() -> Self {
        Self {
            priority_columns: PRIORITY_COLUMNS.iter().map(|s| s.to_string()).collect(),
            drop_columns: DROP_COLUMNS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Drop columns with no value in any row, then the configured drop list.
pub fn prune_columns(ds: &mut Dataset, config: &DeriveConfig) {
    let empty: Vec<String> = ds
        .columns()
        .iter()
        .filter(|c| {
            ds.column(c)
                .map_or(true, |cells| cells.iter().all(|cell| cell.is_absent()))
        })
        .cloned()
        .collect();
    for c in empty.iter().chain(config.drop_columns.iter()) {
        ds.drop_column(c);
    }
}

/// Priority columns first (missing ones skipped), everything else after in its
/// current order.
pub fn order_columns(ds: &mut Dataset, config: &DeriveConfig) {
    let mut order: Vec<String> = config
        .priority_columns
        .iter()
        .filter(|c| ds.has_column(c))
        .cloned()
        .collect();
    order.extend(
        ds.columns()
            .iter()
            .filter(|c| !config.priority_columns.contains(*c))
            .cloned(),
    );
    ds.select(&order);
}
