//! Error types for query execution.

use quarry_core::{BuildError, MappingError, SqlValue};
use thiserror::Error;

use crate::cache::CacheError;
use crate::driver::DriverError;

/// Errors that can occur while executing queries through a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The driver failed to execute a query.
    #[error("failed query: {sql}\nparams: {params:?}")]
    Query {
        /// SQL text that was executed.
        sql: String,
        /// Parameters it was executed with.
        params: Vec<SqlValue>,
        /// Driver error.
        #[source]
        source: DriverError,
    },

    /// The cache backend failed.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// The statement could not be compiled.
    #[error("build error: {0}")]
    Build(#[from] BuildError),

    /// A relational row could not be mapped.
    #[error("failed to map relational row: {0}")]
    Mapping(#[from] MappingError),

    /// A prepared query was rebound with the wrong number of parameters.
    #[error("expected {expected} parameters, got {actual}")]
    ParamCount {
        /// Parameters in the query.
        expected: usize,
        /// Parameters supplied.
        actual: usize,
    },

    /// Several failures at once, e.g. a mutation and its cache invalidation.
    #[error("multiple errors occurred: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<SessionError>),
}

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
