//! Query execution with caching.

use std::sync::Arc;

use dashmap::DashMap;
use quarry_core::{Dialect, RelationalQuery, ToQuery};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use crate::cache::{Cache, CacheConfig, CacheError, Mutation};
use crate::config::SessionConfig;
use crate::driver::{Driver, QueryOutput};
use crate::error::{Result, SessionError};
use crate::prepared::PreparedQuery;
use crate::strategy::{plan_for, CachePlan};

/// A cache lookup or population request.
struct CacheRequest<'a> {
    key: &'a str,
    is_tag: bool,
    auto_invalidate: bool,
    tables: &'a [String],
    config: &'a CacheConfig,
}

/// Executes statements through a driver, consulting an optional cache.
pub struct Session<D> {
    driver: D,
    cache: Option<Arc<dyn Cache>>,
    config: SessionConfig,
    in_flight: DashMap<String, Arc<Mutex<()>>>,
}

impl<D: Driver> Session<D> {
    /// Creates a session without a cache.
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            cache: None,
            config: SessionConfig::default(),
            in_flight: DashMap::new(),
        }
    }

    /// Attaches a cache backend.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replaces the session configuration.
    #[must_use]
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the driver.
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// Returns the dialect of the driver.
    pub fn dialect(&self) -> &dyn Dialect {
        self.driver.dialect()
    }

    /// Compiles a statement for the driver's dialect.
    pub fn prepare(&self, statement: &impl ToQuery) -> Result<PreparedQuery> {
        PreparedQuery::new(statement, self.dialect())
    }

    /// Compiles and executes a statement.
    pub async fn run(&self, statement: &impl ToQuery) -> Result<QueryOutput> {
        let prepared = self.prepare(statement)?;
        self.execute(&prepared).await
    }

    /// Executes a prepared query, applying its cache plan.
    pub async fn execute(&self, prepared: &PreparedQuery) -> Result<QueryOutput> {
        let strategy = self.cache.as_ref().map(|cache| cache.strategy());
        let plan = plan_for(strategy, prepared, self.config.default_ttl())?;
        debug!(
            kind = prepared.metadata().kind.as_str(),
            plan = plan.name(),
            sql = %prepared.query().sql,
            "executing query"
        );

        match (plan, self.cache.as_deref()) {
            (CachePlan::Invalidate { tables }, Some(cache)) => {
                let mutation = Mutation {
                    tables,
                    tags: Vec::new(),
                };
                let (result, invalidated) =
                    futures::join!(self.query(prepared), cache.on_mutate(&mutation));
                combine(result, invalidated)
            }
            (
                CachePlan::Try {
                    key,
                    is_tag,
                    auto_invalidate,
                    tables,
                    config,
                },
                Some(cache),
            ) => {
                let request = CacheRequest {
                    key: &key,
                    is_tag,
                    auto_invalidate,
                    tables: &tables,
                    config: &config,
                };
                self.read_through(cache, prepared, &request).await
            }
            _ => self.query(prepared).await,
        }
    }

    /// Drops cached entries of tables and tags.
    pub async fn invalidate(&self, tables: &[String], tags: &[String]) -> Result<()> {
        let Some(cache) = self.cache.as_deref() else {
            return Ok(());
        };
        cache
            .on_mutate(&Mutation {
                tables: tables.to_vec(),
                tags: tags.to_vec(),
            })
            .await?;
        Ok(())
    }

    /// Executes a relational query and maps every row to a JSON object.
    pub async fn fetch_relational(
        &self,
        query: &RelationalQuery,
        cache: Option<CacheConfig>,
    ) -> Result<Vec<Value>> {
        let mut prepared = self.prepare(query)?;
        if let Some(config) = cache {
            prepared = prepared.with_cache(config);
        }
        let output = self.execute(&prepared).await?;
        output
            .rows
            .iter()
            .map(|row| query.map_row(row).map_err(SessionError::from))
            .collect()
    }

    async fn query(&self, prepared: &PreparedQuery) -> Result<QueryOutput> {
        let query = prepared.query();
        self.driver
            .execute(query, prepared.metadata().returns_rows)
            .await
            .map_err(|source| SessionError::Query {
                sql: query.sql.clone(),
                params: query.params.clone(),
                source,
            })
    }

    async fn read_through(
        &self,
        cache: &dyn Cache,
        prepared: &PreparedQuery,
        request: &CacheRequest<'_>,
    ) -> Result<QueryOutput> {
        if let Some(hit) = lookup(cache, request).await {
            return Ok(hit);
        }
        if !self.config.single_flight {
            return self.populate(cache, prepared, request).await;
        }

        let lock = self
            .in_flight
            .entry(request.key.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();
        let result = {
            let _guard = lock.lock().await;
            match lookup(cache, request).await {
                Some(hit) => Ok(hit),
                None => self.populate(cache, prepared, request).await,
            }
        };
        drop(lock);
        self.in_flight
            .remove_if(request.key, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    async fn populate(
        &self,
        cache: &dyn Cache,
        prepared: &PreparedQuery,
        request: &CacheRequest<'_>,
    ) -> Result<QueryOutput> {
        let output = self.query(prepared).await?;
        let tables: &[String] = if request.auto_invalidate {
            request.tables
        } else {
            &[]
        };
        if let Err(e) = cache
            .put(request.key, &output, tables, request.is_tag, request.config)
            .await
        {
            warn!(key = request.key, error = %e, "failed to store query result in cache");
        }
        Ok(output)
    }
}

async fn lookup(cache: &dyn Cache, request: &CacheRequest<'_>) -> Option<QueryOutput> {
    match cache
        .get(
            request.key,
            request.tables,
            request.is_tag,
            request.auto_invalidate,
        )
        .await
    {
        Ok(Some(hit)) => {
            trace!(key = request.key, "cache hit");
            Some(hit)
        }
        Ok(None) => None,
        Err(e) => {
            warn!(key = request.key, error = %e, "cache lookup failed, running query");
            None
        }
    }
}

fn combine(
    result: Result<QueryOutput>,
    invalidated: std::result::Result<(), CacheError>,
) -> Result<QueryOutput> {
    match (result, invalidated) {
        (Ok(output), Ok(())) => Ok(output),
        (Err(e), Ok(())) => Err(e),
        (Ok(_), Err(e)) => Err(SessionError::Cache(e)),
        (Err(query), Err(cache)) => Err(SessionError::Multiple(vec![
            query,
            SessionError::Cache(cache),
        ])),
    }
}
