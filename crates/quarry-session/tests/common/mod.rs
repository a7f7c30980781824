#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use quarry_core::{
    ColumnDef, Dialect, PostgresDialect, Query, Relation, RelationRegistry, SqlValue, Table,
};
use quarry_session::{
    Cache, CacheConfig, CacheError, CacheStrategy, Driver, DriverError, Mutation, QueryOutput,
};

/// Counts executions and answers every query with the same output.
pub struct MockDriver {
    dialect: PostgresDialect,
    calls: AtomicUsize,
    delay: Duration,
    fail: bool,
    output: QueryOutput,
}

impl MockDriver {
    pub fn new(output: QueryOutput) -> Self {
        Self {
            dialect: PostgresDialect::new(),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            fail: false,
            output,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Driver for MockDriver {
    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    async fn execute(&self, _query: &Query, _returns_rows: bool) -> Result<QueryOutput, DriverError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err("connection reset".into());
        }
        Ok(self.output.clone())
    }
}

/// A backend that misses every lookup and fails every write.
pub struct FailingCache;

#[async_trait]
impl Cache for FailingCache {
    fn strategy(&self) -> CacheStrategy {
        CacheStrategy::All
    }

    async fn get(
        &self,
        _key: &str,
        _tables: &[String],
        _is_tag: bool,
        _auto_invalidate: bool,
    ) -> Result<Option<QueryOutput>, CacheError> {
        Ok(None)
    }

    async fn put(
        &self,
        _key: &str,
        _value: &QueryOutput,
        _tables: &[String],
        _is_tag: bool,
        _config: &CacheConfig,
    ) -> Result<(), CacheError> {
        Err(CacheError::Backend(String::from("put refused")))
    }

    async fn on_mutate(&self, _mutation: &Mutation) -> Result<(), CacheError> {
        Err(CacheError::Backend(String::from("invalidation refused")))
    }
}

pub fn users() -> Table {
    Table::new("users")
        .column(ColumnDef::new("id", "integer").primary_key())
        .column(ColumnDef::new("name", "text").not_null())
        .build()
}

pub fn posts() -> Table {
    Table::new("posts")
        .column(ColumnDef::new("id", "integer").primary_key())
        .column(ColumnDef::new("author_id", "integer").not_null())
        .column(ColumnDef::new("title", "text").not_null())
        .build()
}

pub fn registry() -> RelationRegistry {
    RelationRegistry::new()
        .register_table("users", &users())
        .register_table("posts", &posts())
        .register_relation("users", "posts", Relation::many("posts"))
        .register_relation(
            "posts",
            "author",
            Relation::one("users").on(&["author_id"], &["id"]),
        )
}

pub fn one_user() -> QueryOutput {
    QueryOutput::from_rows(
        vec![String::from("id"), String::from("name")],
        vec![vec![SqlValue::Int(1), SqlValue::Text(String::from("alice"))]],
    )
}
