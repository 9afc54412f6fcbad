//! SQLite search implementation.
//!
//! - [`query_builder`] - Translates resolved filters into SQL
//! - [`writer`] - Maintains the per-type index tables

pub mod query_builder;
pub mod writer;

pub use query_builder::{PAGE_COLUMNS, QueryBuilder, SqlFragment, SqlParam};
pub use writer::write_index;
