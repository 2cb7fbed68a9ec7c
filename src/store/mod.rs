// src/store/mod.rs

use anyhow::{ensure, Context, Result};
use chrono::NaiveDate;
use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};
use std::{
    borrow::Cow,
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::process::columns::{AGE, BIRTH_DATE, BIRTH_YEAR, CURRENT, END_YEAR, START_YEAR};
use crate::process::derive::parse_whole_number;
use crate::table::{Cell, Dataset};

/// Named persistence for datasets.
pub trait DatasetStore {
    /// Persist `dataset` under `name`, returning where it went.
    fn write(&self, dataset: &Dataset, name: &str) -> Result<PathBuf>;
    /// Inverse of [`DatasetStore::write`].
    fn read(&self, name: &str) -> Result<Dataset>;
}

/// Datasets as quoted CSV files in one directory.
#[derive(Debug, Clone)]
pub struct CsvStore {
    dir: PathBuf,
}

impl CsvStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

/// Backslash-escape a field: every `\` is written as `\\`. Quotes are left to
/// the writer, which doubles them.
pub fn escape_field(raw: &str) -> Cow<'_, str> {
    if raw.contains('\\') {
        Cow::Owned(raw.replace('\\', "\\\\"))
    } else {
        Cow::Borrowed(raw)
    }
}

/// Inverse of [`escape_field`]: a backslash takes the next character literally.
/// A trailing lone backslash is kept.
pub fn unescape_field(raw: &str) -> Cow<'_, str> {
    if !raw.contains('\\') {
        return Cow::Borrowed(raw);
    }
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push(chars.next().unwrap_or('\\')),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}

/// Re-type a stored value using what the column is known to hold. Unknown
/// columns, and values that do not fit, stay text.
pub fn typed_cell(column: &str, raw: &str) -> Cell {
    let text = match Cell::text(raw) {
        Cell::Text(t) => t,
        other => return other,
    };
    match column {
        BIRTH_YEAR | AGE | START_YEAR | END_YEAR => match parse_whole_number(&text) {
            Some(n) => Cell::Integer(n),
            None => Cell::Text(text),
        },
        CURRENT => match text.as_str() {
            "True" | "true" => Cell::Boolean(true),
            "False" | "false" => Cell::Boolean(false),
            _ => Cell::Text(text),
        },
        BIRTH_DATE => match NaiveDate::parse_from_str(&text, "%Y-%m-%d") {
            Ok(d) => Cell::Date(d),
            Err(_) => Cell::Text(text),
        },
        _ => Cell::Text(text),
    }
}

impl DatasetStore for CsvStore {
    fn write(&self, dataset: &Dataset, name: &str) -> Result<PathBuf> {
        ensure!(
            !dataset.columns().is_empty(),
            "refusing to write {}: dataset has no columns",
            name
        );
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating data directory {:?}", self.dir))?;

        let path = self.path(name);
        let mut wtr = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .double_quote(true)
            .from_path(&path)
            .with_context(|| format!("creating {}", path.display()))?;

        wtr.write_record(dataset.columns().iter().map(|c| escape_field(c).into_owned()))
            .with_context(|| format!("writing header to {}", path.display()))?;
        for row in dataset.rows() {
            wtr.write_record(row.iter().map(|c| escape_field(&c.to_string()).into_owned()))
                .with_context(|| format!("writing row to {}", path.display()))?;
        }
        wtr.flush()
            .with_context(|| format!("flushing {}", path.display()))?;

        debug!(path = %path.display(), rows = dataset.len(), "wrote dataset");
        Ok(path)
    }

    fn read(&self, name: &str) -> Result<Dataset> {
        let path = self.path(name);
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .from_path(&path)
            .with_context(|| format!("opening {}", path.display()))?;

        let columns: Vec<String> = rdr
            .headers()
            .with_context(|| format!("reading header of {}", path.display()))?
            .iter()
            .map(|h| unescape_field(h).into_owned())
            .collect();

        let mut ds = Dataset::new(columns.clone());
        for (idx, result) in rdr.records().enumerate() {
            let record = result
                .with_context(|| format!("CSV parse error in {} at record {}", name, idx))?;
            let row = columns
                .iter()
                .zip(record.iter())
                .map(|(col, raw)| typed_cell(col, &unescape_field(raw)))
                .collect();
            ds.push_row(row)
                .with_context(|| format!("record {} of {}", idx, name))?;
        }
        Ok(ds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Result<Dataset> {
        Dataset::from_rows(
            vec![
                "Administration".into(),
                "Name".into(),
                "Age".into(),
                "Birth Date".into(),
                "Background".into(),
                "End year".into(),
                "Current".into(),
            ],
            vec![
                vec![
                    Cell::text("Biden"),
                    Cell::text("Lloyd \"Lloyd\" Austin"),
                    Cell::Integer(71),
                    Cell::Date(NaiveDate::from_ymd_opt(1953, 8, 8).unwrap()),
                    Cell::text("General, C:\\Army\nretired"),
                    Cell::Absent,
                    Cell::Boolean(false),
                ],
                vec![
                    Cell::text("Biden"),
                    Cell::text("Gina Raimondo"),
                    Cell::Absent,
                    Cell::Absent,
                    Cell::Absent,
                    Cell::Integer(2025),
                    Cell::Boolean(true),
                ],
            ],
        )
    }

    #[test]
    fn write_then_read_round_trips() -> Result<()> {
        let dir = tempdir()?;
        let store = CsvStore::new(dir.path().join("data"));
        let ds = sample()?;

        store.write(&ds, "biden.csv")?;
        let back = store.read("biden.csv")?;
        assert_eq!(back, ds);
        Ok(())
    }

    #[test]
    fn every_field_is_quoted_and_absent_is_empty() -> Result<()> {
        let dir = tempdir()?;
        let store = CsvStore::new(dir.path());
        let path = store.write(&sample()?, "out.csv")?;
        let text = fs::read_to_string(path)?;
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some(r#""Administration","Name","Age","Birth Date","Background","End year","Current""#)
        );
        assert!(text.contains(r#""Lloyd ""Lloyd"" Austin""#));
        assert!(text.contains(r#""Gina Raimondo","","","","2025","True""#));
        Ok(())
    }

    #[test]
    fn backslashes_are_escaped_on_disk() -> Result<()> {
        let dir = tempdir()?;
        let store = CsvStore::new(dir.path());
        let ds = Dataset::from_rows(
            vec!["Background".into()],
            vec![vec![Cell::text("C:\\Army")], vec![Cell::text("a\"b\\")]],
        )?;
        let path = store.write(&ds, "slashes.csv")?;

        let text = fs::read_to_string(path)?;
        assert_eq!(text, "\"Background\"\n\"C:\\\\Army\"\n\"a\"\"b\\\\\"\n");
        assert_eq!(store.read("slashes.csv")?, ds);
        Ok(())
    }

    #[test]
    fn unescape_takes_next_char_literally() {
        assert_eq!(unescape_field(r"C:\\Army"), r"C:\Army");
        assert_eq!(unescape_field(r"plain"), "plain");
        assert_eq!(unescape_field("end\\"), "end\\");
        assert_eq!(escape_field(r"a\b"), r"a\\b");
    }

    #[test]
    fn read_treats_na_as_absent_and_fixes_fractional_years() -> Result<()> {
        let dir = tempdir()?;
        fs::write(
            dir.path().join("legacy.csv"),
            "\"Name\",\"Birth Year\",\"State\"\n\"Ada\",\"1950.0\",\"N/A\"\n",
        )?;
        let ds = CsvStore::new(dir.path()).read("legacy.csv")?;
        assert_eq!(ds.get(0, "Birth Year"), Some(&Cell::Integer(1950)));
        assert_eq!(ds.get(0, "State"), Some(&Cell::Absent));
        Ok(())
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(CsvStore::new(dir.path()).read("nope.csv").is_err());
    }
}
