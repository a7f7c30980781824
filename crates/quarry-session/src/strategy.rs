//! Cache decision per execution.

use std::time::Duration;

use crate::cache::{query_hash, CacheConfig, CacheError, CacheStrategy};
use crate::prepared::PreparedQuery;

/// What the session does with the cache for one execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachePlan {
    /// Run the query, leave the cache alone.
    Skip,
    /// Run the write and drop entries of these tables concurrently.
    Invalidate {
        /// Written tables.
        tables: Vec<String>,
    },
    /// Serve from the cache or run and store.
    Try {
        /// Tag or content hash.
        key: String,
        /// Whether `key` is a tag.
        is_tag: bool,
        /// Whether writes drop the entry.
        auto_invalidate: bool,
        /// Tables the query reads.
        tables: Vec<String>,
        /// Effective settings, TTL filled in.
        config: CacheConfig,
    },
}

impl CachePlan {
    /// Returns the lowercase name of the plan.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Invalidate { .. } => "invalidate",
            Self::Try { .. } => "try",
        }
    }
}

/// Decides the cache plan of a prepared query.
///
/// `strategy` is `None` when the session has no cache backend. Rules apply
/// in order:
/// 1. no backend: skip;
/// 2. an explicitly disabled query: skip;
/// 3. a write touching tables: invalidate, with or without a query config;
/// 4. a read with a config, or any read under the `all` strategy: try;
/// 5. anything else: skip.
///
/// # Errors
/// Returns an error if the content hash cannot be computed.
pub fn plan_for(
    strategy: Option<CacheStrategy>,
    prepared: &PreparedQuery,
    default_ttl: Option<Duration>,
) -> Result<CachePlan, CacheError> {
    let Some(strategy) = strategy else {
        return Ok(CachePlan::Skip);
    };

    let config = match (prepared.cache_config(), strategy) {
        (Some(config), _) => Some(config.clone()),
        (None, CacheStrategy::All) => Some(CacheConfig::enabled()),
        (None, CacheStrategy::Explicit) => None,
    };
    if config.as_ref().is_some_and(|c| !c.enable) {
        return Ok(CachePlan::Skip);
    }

    let metadata = prepared.metadata();
    if metadata.kind.is_mutation() {
        if metadata.tables.is_empty() {
            return Ok(CachePlan::Skip);
        }
        return Ok(CachePlan::Invalidate {
            tables: metadata.tables.clone(),
        });
    }

    let Some(mut config) = config else {
        return Ok(CachePlan::Skip);
    };
    if config.ttl.is_none() {
        config.ttl = default_ttl;
    }

    let (key, is_tag) = match &config.tag {
        Some(tag) => (tag.clone(), true),
        None => (query_hash(prepared.query())?, false),
    };
    Ok(CachePlan::Try {
        key,
        is_tag,
        auto_invalidate: config.auto_invalidate,
        tables: metadata.tables.clone(),
        config,
    })
}
