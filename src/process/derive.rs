use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use tracing::{debug, instrument};

use crate::process::columns::{
    order_columns, prune_columns, DeriveConfig, AGE, BACKGROUND, BIRTH_DATE, BIRTH_YEAR,
    CURRENT, DATE_OF_BIRTH, END_YEAR, START_YEAR, STATE, WHOLE_NUMBER_COLUMNS, YEARS,
};
use crate::process::date_parser::parse_birth_date;
use crate::table::{Cell, Dataset};

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{4})").expect("year regex"));
static AGE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)age\s*(\d+)").expect("age regex"));
static TENURE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4})(?:\s*[–—-]\s*(?:present|(\d{4})))?").expect("tenure regex")
});
static STATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:senator|representative|governor)(?:\s+from|\s+of)\s+([A-Za-z\s]+)")
        .expect("state regex")
});

/// Birth fields pulled out of one `Date of birth` cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BirthFields {
    pub date: Option<NaiveDate>,
    pub year: Option<i64>,
    pub age: Option<i64>,
}

/// Tenure fields pulled out of one `Years` cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tenure {
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub current: bool,
}

/// Text a pattern can run against. Numbers read back from disk count as text.
fn source_text(cell: &Cell) -> Option<Cow<'_, str>> {
    match cell {
        Cell::Text(s) => Some(Cow::Borrowed(s)),
        Cell::Integer(n) => Some(Cow::Owned(n.to_string())),
        Cell::Date(_) | Cell::Boolean(_) | Cell::Absent => None,
    }
}

fn capture_number(re: &Regex, text: &str, group: usize) -> Option<i64> {
    re.captures(text)?.get(group)?.as_str().parse().ok()
}

pub fn birth_fields(cell: &Cell) -> BirthFields {
    let text = match cell {
        Cell::Date(d) => {
            return BirthFields {
                date: Some(*d),
                year: Some(i64::from(d.year())),
                age: None,
            }
        }
        other => match source_text(other) {
            Some(t) => t,
            None => return BirthFields::default(),
        },
    };

    let date_part = match text.split_once('(') {
        Some((before, _)) => before.trim(),
        None => text.trim(),
    };
    let date = parse_birth_date(date_part);
    let year = date
        .map(|d| i64::from(d.year()))
        .or_else(|| capture_number(&YEAR_RE, &text, 1));
    let age = capture_number(&AGE_RE, &text, 1);

    BirthFields { date, year, age }
}

pub fn tenure(cell: &Cell) -> Tenure {
    let Some(text) = source_text(cell) else {
        return Tenure::default();
    };
    let caps = TENURE_RE.captures(&text);
    let group = |i: usize| -> Option<i64> {
        caps.as_ref()
            .and_then(|c| c.get(i))
            .and_then(|m| m.as_str().parse().ok())
    };
    Tenure {
        start: group(1),
        end: group(2),
        current: text.to_lowercase().contains("present"),
    }
}

/// State named after the first senator/representative/governor mention.
pub fn state_from_background(cell: &Cell) -> Option<String> {
    let text = source_text(cell)?;
    let caps = STATE_RE.captures(&text)?;
    let state = caps.get(1)?.as_str().trim();
    (!state.is_empty()).then(|| state.to_string())
}

/// Accept `1950` and fractional spellings of whole numbers such as `1950.0`.
pub fn parse_whole_number(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(n) = s.parse::<i64>() {
        return Some(n);
    }
    let (int, frac) = s.split_once('.')?;
    if !frac.is_empty() && frac.bytes().all(|b| b == b'0') {
        int.parse().ok()
    } else {
        None
    }
}

/// Coerce year columns to whole numbers; absent stays absent.
pub fn fix_whole_numbers(ds: &mut Dataset) {
    for col in WHOLE_NUMBER_COLUMNS {
        ds.map_column(col, |cell| match cell {
            Cell::Text(s) => match parse_whole_number(&s) {
                Some(n) => Cell::Integer(n),
                None => Cell::Text(s),
            },
            other => other,
        });
    }
}

/// Add birth, age, tenure and state columns to a concatenated source, then
/// prune, order and type-fix the result for serialization.
#[instrument(level = "info", skip_all, fields(rows = ds.len()))]
pub fn derive_fields(mut ds: Dataset, config: &DeriveConfig) -> Result<Dataset> {
    ds.normalize_absent();

    let births: Option<Vec<BirthFields>> = ds
        .column(DATE_OF_BIRTH)
        .map(|cells| cells.into_iter().map(birth_fields).collect());
    if let Some(births) = births {
        let dates = births.iter().map(|b| Cell::from(b.date)).collect();
        let years = births.iter().map(|b| Cell::from(b.year)).collect();
        let ages = births.iter().map(|b| Cell::from(b.age)).collect();
        ds.set_column(BIRTH_DATE, dates)?;
        ds.set_column(BIRTH_YEAR, years)?;
        ds.set_column(AGE, ages)?;
        debug!(
            parsed = births.iter().filter(|b| b.date.is_some()).count(),
            "derived birth fields"
        );
    }

    let tenures: Option<Vec<Tenure>> = ds
        .column(YEARS)
        .map(|cells| cells.into_iter().map(tenure).collect());
    if let Some(tenures) = tenures {
        let starts = tenures.iter().map(|t| Cell::from(t.start)).collect();
        let ends = tenures.iter().map(|t| Cell::from(t.end)).collect();
        let current = tenures.iter().map(|t| Cell::Boolean(t.current)).collect();
        ds.set_column(START_YEAR, starts)?;
        ds.set_column(END_YEAR, ends)?;
        ds.set_column(CURRENT, current)?;
    }

    if !ds.has_column(STATE) {
        let states: Option<Vec<Cell>> = ds.column(BACKGROUND).map(|cells| {
            cells
                .into_iter()
                .map(|c| Cell::from(state_from_background(c)))
                .collect()
        });
        if let Some(states) = states {
            ds.set_column(STATE, states)?;
        }
    }

    prune_columns(&mut ds, config);
    order_columns(&mut ds, config);
    fix_whole_numbers(&mut ds);
    Ok(ds)
}
