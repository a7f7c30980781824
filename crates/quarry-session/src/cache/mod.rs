//! Result cache contract.
//!
//! A cache backend stores query outputs under a key (a content hash of the
//! query, or a user tag) and indexes them by the tables they read, so that a
//! write to a table can drop every dependent entry.

mod hash;
mod memory;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::driver::QueryOutput;

pub use hash::query_hash;
pub use memory::MemoryCache;

/// Which reads a backend caches when a query does not say.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStrategy {
    /// Only queries that opt in with a cache config.
    #[default]
    Explicit,
    /// Every read, with auto-invalidation.
    All,
}

/// Per-query cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether the query may be served from or stored in the cache.
    pub enable: bool,
    /// Stable key replacing the content hash.
    pub tag: Option<String>,
    /// Whether writes to the query's tables drop the entry.
    pub auto_invalidate: bool,
    /// Time to live of the stored entry.
    pub ttl: Option<Duration>,
}

impl CacheConfig {
    /// Enables caching with auto-invalidation.
    #[must_use]
    pub const fn enabled() -> Self {
        Self {
            enable: true,
            tag: None,
            auto_invalidate: true,
            ttl: None,
        }
    }

    /// Disables caching for the query, whatever the backend strategy.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            enable: false,
            tag: None,
            auto_invalidate: false,
            ttl: None,
        }
    }

    /// Stores the entry under a tag instead of the content hash.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Sets whether table writes drop the entry.
    #[must_use]
    pub const fn auto_invalidate(mut self, auto_invalidate: bool) -> Self {
        self.auto_invalidate = auto_invalidate;
        self
    }

    /// Sets the time to live.
    #[must_use]
    pub const fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// Tables and tags touched by a write.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Mutation {
    /// Tables written.
    pub tables: Vec<String>,
    /// Tags to drop.
    pub tags: Vec<String>,
}

/// Errors raised by cache backends.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backend failed.
    #[error("cache backend error: {0}")]
    Backend(String),

    /// A key or value could not be serialized.
    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A query result cache backend.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Returns the backend strategy.
    fn strategy(&self) -> CacheStrategy;

    /// Looks up an entry.
    ///
    /// `tables` are the tables the query reads; `is_tag` tells whether `key`
    /// is a user tag rather than a content hash.
    async fn get(
        &self,
        key: &str,
        tables: &[String],
        is_tag: bool,
        auto_invalidate: bool,
    ) -> Result<Option<QueryOutput>, CacheError>;

    /// Stores an entry. `tables` is empty when the entry must survive writes.
    async fn put(
        &self,
        key: &str,
        value: &QueryOutput,
        tables: &[String],
        is_tag: bool,
        config: &CacheConfig,
    ) -> Result<(), CacheError>;

    /// Drops every entry depending on the written tables or carrying the tags.
    async fn on_mutate(&self, mutation: &Mutation) -> Result<(), CacheError>;
}
