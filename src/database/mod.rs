//! Database connection and schema management

pub mod migrations;
pub mod pool;

pub use pool::Database;
