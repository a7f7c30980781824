//! In-process cache backend.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::trace;

use super::{Cache, CacheConfig, CacheError, CacheStrategy, Mutation};
use crate::driver::QueryOutput;

#[derive(Debug)]
struct Entry {
    value: QueryOutput,
    expires_at: Option<Instant>,
    tables: Vec<String>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// A cache held in process memory.
///
/// Entries are indexed by the tables they read. Expired entries are swept on
/// the first lookup or store after the earliest pending expiry.
#[derive(Debug, Default)]
pub struct MemoryCache {
    strategy: CacheStrategy,
    entries: DashMap<String, Entry>,
    by_table: DashMap<String, HashSet<String>>,
    next_expiry: Mutex<Option<Instant>>,
}

impl MemoryCache {
    /// Creates an empty cache with a strategy.
    #[must_use]
    pub fn new(strategy: CacheStrategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    /// Returns the number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry.
    pub fn clear(&self) {
        let mut next = self.next_expiry.lock().unwrap_or_else(PoisonError::into_inner);
        self.entries.clear();
        self.by_table.clear();
        *next = None;
    }

    fn sweep(&self, now: Instant) {
        let mut next = self.next_expiry.lock().unwrap_or_else(PoisonError::into_inner);
        if !matches!(*next, Some(at) if at <= now) {
            return;
        }
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.is_expired(now))
            .map(|entry| entry.key().clone())
            .collect();
        for key in &expired {
            if let Some((key, entry)) = self.entries.remove_if(key, |_, e| e.is_expired(now)) {
                self.unindex(&key, &entry.tables);
            }
        }
        *next = self.entries.iter().filter_map(|entry| entry.expires_at).min();
        trace!(expired = expired.len(), "swept expired cache entries");
    }

    fn note_expiry(&self, at: Instant) {
        let mut next = self.next_expiry.lock().unwrap_or_else(PoisonError::into_inner);
        if !matches!(*next, Some(current) if current <= at) {
            *next = Some(at);
        }
    }

    fn remove_entry(&self, key: &str) {
        if let Some((key, entry)) = self.entries.remove(key) {
            self.unindex(&key, &entry.tables);
        }
    }

    fn unindex(&self, key: &str, tables: &[String]) {
        for table in tables {
            if let Some(mut keys) = self.by_table.get_mut(table) {
                keys.remove(key);
            }
            self.by_table.remove_if(table, |_, keys| keys.is_empty());
        }
    }

    fn evict_table(&self, table: &str) {
        if let Some((_, keys)) = self.by_table.remove(table) {
            trace!(table, entries = keys.len(), "evicting cache entries");
            for key in keys {
                self.remove_entry(&key);
            }
        }
    }
}

#[async_trait]
impl Cache for MemoryCache {
    fn strategy(&self) -> CacheStrategy {
        self.strategy
    }

    async fn get(
        &self,
        key: &str,
        _tables: &[String],
        _is_tag: bool,
        _auto_invalidate: bool,
    ) -> Result<Option<QueryOutput>, CacheError> {
        let now = Instant::now();
        self.sweep(now);
        Ok(self
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone()))
    }

    async fn put(
        &self,
        key: &str,
        value: &QueryOutput,
        tables: &[String],
        _is_tag: bool,
        config: &CacheConfig,
    ) -> Result<(), CacheError> {
        let now = Instant::now();
        self.sweep(now);

        let expires_at = config.ttl.map(|ttl| now + ttl);
        let previous = self.entries.insert(
            key.to_owned(),
            Entry {
                value: value.clone(),
                expires_at,
                tables: tables.to_vec(),
            },
        );
        if let Some(previous) = previous {
            self.unindex(key, &previous.tables);
        }
        for table in tables {
            self.by_table
                .entry(table.clone())
                .or_default()
                .insert(key.to_owned());
        }
        if let Some(at) = expires_at {
            self.note_expiry(at);
        }
        Ok(())
    }

    async fn on_mutate(&self, mutation: &Mutation) -> Result<(), CacheError> {
        for table in &mutation.tables {
            self.evict_table(table);
        }
        for tag in &mutation.tags {
            self.remove_entry(tag);
        }
        Ok(())
    }
}
