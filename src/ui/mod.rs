//! Terminal output

pub mod progress;
pub mod table;

pub use progress::TransferReporter;
pub use table::{files_table, time_ago, versions_table};
