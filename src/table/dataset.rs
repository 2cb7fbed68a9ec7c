// src/table/dataset.rs

use anyhow::{ensure, Result};

use super::cell::{normalize_absent, Cell};

/// Ordered rows sharing one column schema. Every row is exactly `columns.len()` wide.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

/// Borrowed view of one row, addressable by column name.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    columns: &'a [String],
    cells: &'a [Cell],
}

impl<'a> Record<'a> {
    pub fn get(&self, name: &str) -> Option<&'a Cell> {
        let idx = self.columns.iter().position(|c| c == name)?;
        self.cells.get(idx)
    }
}

impl Dataset {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        let mut ds = Self::new(columns);
        for row in rows {
            ds.push_row(row)?;
        }
        Ok(ds)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn get(&self, row: usize, name: &str) -> Option<&Cell> {
        let idx = self.column_index(name)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Cells of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }

    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<()> {
        ensure!(
            row.len() == self.columns.len(),
            "row has {} cells but dataset has {} columns",
            row.len(),
            self.columns.len()
        );
        self.rows.push(row);
        Ok(())
    }

    /// Replace the column if it exists, otherwise append it.
    pub fn set_column(&mut self, name: &str, values: Vec<Cell>) -> Result<()> {
        ensure!(
            values.len() == self.rows.len(),
            "column `{}` has {} values for {} rows",
            name,
            values.len(),
            self.rows.len()
        );
        match self.column_index(name) {
            Some(idx) => {
                for (row, v) in self.rows.iter_mut().zip(values) {
                    row[idx] = v;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, v) in self.rows.iter_mut().zip(values) {
                    row.push(v);
                }
            }
        }
        Ok(())
    }

    /// Same value in every row; replaces the column if it exists.
    pub fn set_constant(&mut self, name: &str, value: Cell) {
        match self.column_index(name) {
            Some(idx) => {
                for row in &mut self.rows {
                    row[idx] = value.clone();
                }
            }
            None => {
                self.columns.push(name.to_string());
                for row in &mut self.rows {
                    row.push(value.clone());
                }
            }
        }
    }

    pub fn drop_column(&mut self, name: &str) -> bool {
        match self.column_index(name) {
            Some(idx) => {
                self.columns.remove(idx);
                for row in &mut self.rows {
                    row.remove(idx);
                }
                true
            }
            None => false,
        }
    }

    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(Record<'_>) -> bool,
    {
        let columns = &self.columns;
        self.rows.retain(|cells| keep(Record { columns, cells }));
    }

    pub fn map_column<F>(&mut self, name: &str, mut f: F) -> bool
    where
        F: FnMut(Cell) -> Cell,
    {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        for row in &mut self.rows {
            let cell = std::mem::replace(&mut row[idx], Cell::Absent);
            row[idx] = f(cell);
        }
        true
    }

    /// Apply [`normalize_absent`] to every cell.
    pub fn normalize_absent(&mut self) {
        for row in &mut self.rows {
            for cell in row.iter_mut() {
                let c = std::mem::replace(cell, Cell::Absent);
                *cell = normalize_absent(c);
            }
        }
    }

    /// Rearrange columns into `order`. Names not present are ignored; columns not
    /// named in `order` are dropped.
    pub fn select(&mut self, order: &[String]) {
        let picks: Vec<usize> = order
            .iter()
            .filter_map(|name| self.column_index(name))
            .collect();
        self.columns = picks.iter().map(|&i| self.columns[i].clone()).collect();
        for row in &mut self.rows {
            let old = std::mem::take(row);
            *row = picks.iter().map(|&i| old[i].clone()).collect();
        }
    }

    /// Stack datasets in order. The schema is the union of all input columns in
    /// first-appearance order; rows missing a column get [`Cell::Absent`].
    pub fn concat<I>(parts: I) -> Dataset
    where
        I: IntoIterator<Item = Dataset>,
    {
        let parts: Vec<Dataset> = parts.into_iter().collect();

        let mut columns: Vec<String> = Vec::new();
        for part in &parts {
            for c in &part.columns {
                if !columns.contains(c) {
                    columns.push(c.clone());
                }
            }
        }

        let total = parts.iter().map(Dataset::len).sum();
        let mut rows = Vec::with_capacity(total);
        for part in parts {
            let mapping: Vec<Option<usize>> =
                columns.iter().map(|c| part.column_index(c)).collect();
            for mut old in part.rows {
                let row = mapping
                    .iter()
                    .map(|slot| match slot {
                        Some(i) => std::mem::replace(&mut old[*i], Cell::Absent),
                        None => Cell::Absent,
                    })
                    .collect();
                rows.push(row);
            }
        }

        Dataset { columns, rows }
    }
}
