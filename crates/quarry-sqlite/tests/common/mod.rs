#![allow(dead_code)]

use quarry_core::{ColumnDef, Sql, Table};
use quarry_session::Session;
use quarry_sqlite::SqliteDriver;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

pub async fn create_test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .expect("Failed to create in-memory SQLite pool");
    sqlx::query(
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, role TEXT NOT NULL DEFAULT 'member', score REAL)",
    )
    .execute(&pool)
    .await
    .expect("Failed to create users table");
    pool
}

pub async fn session() -> Session<SqliteDriver> {
    Session::new(SqliteDriver::new(create_test_pool().await))
}

pub fn users() -> Table {
    Table::new("users")
        .column(ColumnDef::new("id", "integer").primary_key())
        .column(ColumnDef::new("name", "text").not_null())
        .column(
            ColumnDef::new("role", "text")
                .not_null()
                .default(Sql::literal("member")),
        )
        .column(ColumnDef::new("score", "real"))
        .build()
}
