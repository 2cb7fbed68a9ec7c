pub mod config;
pub mod fetch;
pub mod merge;
pub mod process;
pub mod store;
pub mod table;
