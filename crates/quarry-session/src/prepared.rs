//! Prepared queries.

use quarry_core::{Dialect, Query, SqlValue, StatementKind, ToQuery};

use crate::cache::CacheConfig;
use crate::error::{Result, SessionError};

/// What the session needs to know about a query besides its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryMetadata {
    /// Statement kind.
    pub kind: StatementKind,
    /// Physical tables read or written.
    pub tables: Vec<String>,
    /// Whether executing yields rows.
    pub returns_rows: bool,
}

/// A compiled query with its metadata and optional cache settings.
///
/// Preparing is pure: it compiles once and can be executed any number of
/// times.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedQuery {
    query: Query,
    metadata: QueryMetadata,
    cache: Option<CacheConfig>,
}

impl PreparedQuery {
    /// Compiles a statement for a dialect.
    pub fn new(statement: &impl ToQuery, dialect: &dyn Dialect) -> Result<Self> {
        let query = statement.to_query(dialect)?;
        Ok(Self::from_parts(
            query,
            QueryMetadata {
                kind: statement.kind(),
                tables: statement.tables(),
                returns_rows: statement.returns_rows(),
            },
        ))
    }

    /// Wraps an already rendered query.
    #[must_use]
    pub const fn from_parts(query: Query, metadata: QueryMetadata) -> Self {
        Self {
            query,
            metadata,
            cache: None,
        }
    }

    /// Opts the query into the cache.
    #[must_use]
    pub fn with_cache(mut self, config: CacheConfig) -> Self {
        self.cache = Some(config);
        self
    }

    /// Keeps the query out of the cache even under the `all` strategy.
    #[must_use]
    pub fn without_cache(mut self) -> Self {
        self.cache = Some(CacheConfig::disabled());
        self
    }

    /// Returns a copy with new parameter values.
    ///
    /// # Errors
    /// Returns [`SessionError::ParamCount`] if the number of values differs.
    pub fn rebind(&self, params: Vec<SqlValue>) -> Result<Self> {
        if params.len() != self.query.params.len() {
            return Err(SessionError::ParamCount {
                expected: self.query.params.len(),
                actual: params.len(),
            });
        }
        let mut rebound = self.clone();
        rebound.query.params = params;
        Ok(rebound)
    }

    /// Returns the rendered query.
    #[must_use]
    pub const fn query(&self) -> &Query {
        &self.query
    }

    /// Returns the metadata.
    #[must_use]
    pub const fn metadata(&self) -> &QueryMetadata {
        &self.metadata
    }

    /// Returns the cache settings, if any were given.
    #[must_use]
    pub const fn cache_config(&self) -> Option<&CacheConfig> {
        self.cache.as_ref()
    }
}
