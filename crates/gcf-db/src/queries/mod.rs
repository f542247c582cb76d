//! Read queries used by the graph synchronizers and the CLI.

pub mod rows;

pub use rows::{count_rows, fetch_rows, table_counts};
