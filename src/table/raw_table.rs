use super::cell::Cell;

/// Header path of one column, top level first. One entry per header row.
pub type ColumnPath = Vec<String>;

/// A table as lifted off the page, before any normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    /// One path per column, in left-to-right order.
    pub columns: Vec<ColumnPath>,
    /// Each body row, padded to `columns.len()` cells.
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    /// Number of header levels (rows of `<th>` cells the table was built from).
    pub fn header_depth(&self) -> usize {
        self.columns.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }
}
