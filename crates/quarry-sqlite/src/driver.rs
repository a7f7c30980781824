//! sqlx-backed SQLite driver.

use async_trait::async_trait;
use quarry_core::{Dialect, Query, SqlValue};
use quarry_session::{Driver, DriverError, QueryOutput, Row as OutputRow};
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, Row, Sqlite, SqlitePool, TypeInfo, ValueRef};
use tracing::debug;

use crate::dialect::SqliteDialect;

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// Executes queries on a SQLite connection pool.
#[derive(Debug, Clone)]
pub struct SqliteDriver {
    pool: SqlitePool,
    dialect: SqliteDialect,
}

impl SqliteDriver {
    /// Creates a driver over a pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            dialect: SqliteDialect::new(),
        }
    }

    /// Returns the pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Driver for SqliteDriver {
    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    async fn execute(&self, query: &Query, returns_rows: bool) -> Result<QueryOutput, DriverError> {
        let mut statement = sqlx::query(&query.sql);
        for param in &query.params {
            statement = bind_param(statement, param);
        }

        if !returns_rows {
            let result = statement.execute(&self.pool).await?;
            debug!(rows_affected = result.rows_affected(), "executed statement");
            return Ok(QueryOutput::affected(result.rows_affected()));
        }

        let rows = statement.fetch_all(&self.pool).await?;
        let columns = rows.first().map_or_else(Vec::new, |row| {
            row.columns()
                .iter()
                .map(|column| column.name().to_owned())
                .collect()
        });
        let rows = rows
            .iter()
            .map(decode_row)
            .collect::<Result<Vec<_>, sqlx::Error>>()?;
        debug!(rows = rows.len(), "fetched rows");
        Ok(QueryOutput::from_rows(columns, rows))
    }
}

/// Binds a SqlValue parameter to a raw query.
fn bind_param<'q>(query: SqliteQuery<'q>, value: &SqlValue) -> SqliteQuery<'q> {
    match value {
        SqlValue::Null => query.bind(Option::<i64>::None),
        SqlValue::Bool(b) => query.bind(*b),
        SqlValue::Int(i) => query.bind(*i),
        SqlValue::Float(f) => query.bind(*f),
        SqlValue::Text(s) => query.bind(s.clone()),
        SqlValue::Blob(b) => query.bind(b.clone()),
        SqlValue::Json(json) => query.bind(json.to_string()),
        SqlValue::Timestamp(ts) => query.bind(*ts),
        SqlValue::Date(d) => query.bind(*d),
    }
}

fn decode_row(row: &SqliteRow) -> Result<OutputRow, sqlx::Error> {
    (0..row.len()).map(|index| decode_value(row, index)).collect()
}

/// Decodes by storage class; SQLite values carry no richer type.
fn decode_value(row: &SqliteRow, index: usize) -> Result<SqlValue, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(SqlValue::Null);
    }
    let type_name = raw.type_info().name().to_owned();
    let value = match type_name.as_str() {
        "INTEGER" | "BOOLEAN" => SqlValue::Int(row.try_get_unchecked(index)?),
        "REAL" => SqlValue::Float(row.try_get_unchecked(index)?),
        "BLOB" => SqlValue::Blob(row.try_get_unchecked(index)?),
        _ => SqlValue::Text(row.try_get_unchecked(index)?),
    };
    Ok(value)
}
