mod sqlite;
mod tables;

pub use sqlite::{Database, is_unique_violation};
pub use tables::ContactTable;
pub(crate) use sqlite::{NAIVE_FORMAT, row_datetime, row_opt_datetime, row_opt_naive};
