//! # quarry-sqlite
//!
//! SQLite support for quarry: a [`SqliteDialect`] for the statement compiler
//! and a [`SqliteDriver`] that executes compiled queries through sqlx.
//!
//! SQLite has no `DEFAULT` keyword inside `VALUES`, so missing insert values
//! fall back to the column's static default or `NULL`. Relational queries
//! need `json_agg` and are rejected by this dialect.

pub mod dialect;
pub mod driver;

pub use dialect::SqliteDialect;
pub use driver::SqliteDriver;
