// src/table/cell.rs

use chrono::NaiveDate;
use std::fmt;

/// Tokens that mean "no value" wherever they appear as a whole cell.
pub const ABSENT_TOKENS: &[&str] = &["", "N/A"];

/// One tabular value. Columns freely mix variants; `Absent` is distinct from empty text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Cell {
    Text(String),
    Integer(i64),
    Date(NaiveDate),
    Boolean(bool),
    Absent,
}

impl Cell {
    /// Text cell, already passed through [`normalize_absent`].
    pub fn text(s: impl Into<String>) -> Self {
        normalize_absent(Cell::Text(s.into()))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Cell::Absent)
    }
}

impl From<Option<i64>> for Cell {
    fn from(v: Option<i64>) -> Self {
        v.map_or(Cell::Absent, Cell::Integer)
    }
}

impl From<Option<NaiveDate>> for Cell {
    fn from(v: Option<NaiveDate>) -> Self {
        v.map_or(Cell::Absent, Cell::Date)
    }
}

impl From<Option<String>> for Cell {
    fn from(v: Option<String>) -> Self {
        v.map_or(Cell::Absent, Cell::text)
    }
}

/// Serialized form: dates as `YYYY-MM-DD`, booleans as `True`/`False`, absent as nothing.
impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            Cell::Integer(n) => write!(f, "{}", n),
            Cell::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Cell::Boolean(true) => f.write_str("True"),
            Cell::Boolean(false) => f.write_str("False"),
            Cell::Absent => Ok(()),
        }
    }
}

/// Map the absent tokens (`""`, `"N/A"`) to [`Cell::Absent`]; every other cell is untouched.
pub fn normalize_absent(cell: Cell) -> Cell {
    match cell {
        Cell::Text(s) if ABSENT_TOKENS.contains(&s.as_str()) => Cell::Absent,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_tokens_become_absent() {
        assert_eq!(normalize_absent(Cell::Text(String::new())), Cell::Absent);
        assert_eq!(normalize_absent(Cell::Text("N/A".into())), Cell::Absent);
        assert_eq!(
            normalize_absent(Cell::Text("n/a".into())),
            Cell::Text("n/a".into())
        );
        assert_eq!(normalize_absent(Cell::Integer(0)), Cell::Integer(0));
    }

    #[test]
    fn display_matches_csv_form() {
        let d = NaiveDate::from_ymd_opt(1950, 1, 1).unwrap();
        assert_eq!(Cell::Date(d).to_string(), "1950-01-01");
        assert_eq!(Cell::Boolean(true).to_string(), "True");
        assert_eq!(Cell::Integer(2021).to_string(), "2021");
        assert_eq!(Cell::Absent.to_string(), "");
    }
}
