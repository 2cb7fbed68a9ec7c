pub mod cell;
pub mod dataset;
pub mod raw_table;

pub use cell::{normalize_absent, Cell, ABSENT_TOKENS};
pub use dataset::{Dataset, Record};
pub use raw_table::{ColumnPath, RawTable};
