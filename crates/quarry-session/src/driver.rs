//! Driver contract.
//!
//! A driver owns the connections and executes compiled queries. It is the
//! only component that talks to the database.

use async_trait::async_trait;
use quarry_core::{Dialect, Query, SqlValue};
use serde::Serialize;

/// Error returned by drivers.
pub type DriverError = Box<dyn std::error::Error + Send + Sync>;

/// A result row, positional.
pub type Row = Vec<SqlValue>;

/// The result of executing a query.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct QueryOutput {
    /// Result column names.
    pub columns: Vec<String>,
    /// Result rows.
    pub rows: Vec<Row>,
    /// Rows written, for statements without a result set.
    pub rows_affected: u64,
}

impl QueryOutput {
    /// Creates an output holding rows.
    #[must_use]
    pub const fn from_rows(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows,
            rows_affected: 0,
        }
    }

    /// Creates an output for a write without a result set.
    #[must_use]
    pub const fn affected(rows_affected: u64) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            rows_affected,
        }
    }
}

/// Executes compiled queries against a database.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Returns the dialect queries must be compiled for.
    fn dialect(&self) -> &dyn Dialect;

    /// Executes a query. `returns_rows` tells whether a result set is expected.
    async fn execute(&self, query: &Query, returns_rows: bool) -> Result<QueryOutput, DriverError>;
}
