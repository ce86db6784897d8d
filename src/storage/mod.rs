//! Row source implementations
//!
//! - [`sqlite`]: read-only SQLite registry database
//! - [`memory`]: in-process tables with the same ordering guarantees
//! - [`schema`]: the SQLite schema the queries are written against

pub mod memory;
pub mod schema;
pub mod sqlite;
