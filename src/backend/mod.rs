//! Thin facade over the SQLite backend: the handful of connection-level
//! operations the virtual file system builds on, plus the glue wiring
//! SQLite's incremental blob API into [`crate::range_reader`].

mod blob_reader;
mod database;
mod status;

pub use blob_reader::DataBlobSource;
pub use database::DatabaseExt;
pub use status::is_constraint_violation;
