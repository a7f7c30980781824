//! Blog example.
//!
//! Creates a small schema in SQLite, writes through a cached session and
//! shows which reads hit the database.
//!
//! Run with: `cargo run -p quarry-sqlite --example blog -- --verbose`

use std::sync::Arc;

use clap::Parser;
use quarry_core::{FieldMap, Insert, Row, Select};
use quarry_session::{CacheConfig, CacheStrategy, MemoryCache, Session, SessionConfig};
use quarry_sqlite::SqliteDriver;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Cached query execution on SQLite.
#[derive(Parser)]
#[command(name = "blog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL (SQLite path or connection string).
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite::memory:")]
    database: String,

    /// Session configuration as JSON.
    #[arg(short, long, default_value = "{}")]
    config: String,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&cli.database)
        .await?;
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS posts (id INTEGER PRIMARY KEY, title TEXT NOT NULL, status TEXT NOT NULL DEFAULT 'draft')",
    )
    .execute(&pool)
    .await?;

    let posts = quarry_core::Table::new("posts")
        .column(quarry_core::ColumnDef::new("id", "integer").primary_key())
        .column(quarry_core::ColumnDef::new("title", "text").not_null())
        .column(
            quarry_core::ColumnDef::new("status", "text")
                .not_null()
                .default(quarry_core::Sql::literal("draft")),
        )
        .build();

    let session = Session::new(SqliteDriver::new(pool))
        .with_cache(Arc::new(MemoryCache::new(CacheStrategy::Explicit)))
        .with_config(SessionConfig::from_json(&cli.config)?);

    let insert = Insert::into(&posts)
        .values([
            Row::new().set("title", "Hello").set("status", "published"),
            Row::new().set("title", "Drafting"),
        ])
        .build()?;
    let written = session.run(&insert).await?;
    info!("Inserted {} posts", written.rows_affected);

    let listing = Select::new()
        .from(&posts)
        .fields(
            FieldMap::new()
                .field("id", posts.col("id"))
                .field("title", posts.col("title")),
        )
        .where_clause(posts.col("status").eq("published"))
        .order_by([posts.col("id").asc()])
        .build()?;
    let prepared = session
        .prepare(&listing)?
        .with_cache(CacheConfig::enabled().tag("published-posts"));

    for attempt in 1..=2 {
        let output = session.execute(&prepared).await?;
        info!("Read {attempt}: {} published posts", output.rows.len());
        for row in &output.rows {
            info!("  {row:?}");
        }
    }

    session
        .invalidate(&[], &[String::from("published-posts")])
        .await?;
    info!("Dropped cached listing");

    Ok(())
}
