//! # quarry-session
//!
//! Executes quarry statements through an async [`Driver`] and keeps read
//! results in an optional [`Cache`].
//!
//! Reads are cached when the query opts in (or when the backend caches
//! everything); writes drop dependent entries concurrently with the write
//! itself. Concurrent identical cached reads share one execution.
//!
//! ```rust,ignore
//! let session = Session::new(driver).with_cache(Arc::new(MemoryCache::new(CacheStrategy::All)));
//! let users = session.run(&Select::new().from(&users).build()?).await?;
//! ```

pub mod cache;
pub mod config;
pub mod driver;
pub mod error;
pub mod prepared;
pub mod session;
pub mod strategy;

pub use cache::{query_hash, Cache, CacheConfig, CacheError, CacheStrategy, MemoryCache, Mutation};
pub use config::SessionConfig;
pub use driver::{Driver, DriverError, QueryOutput, Row};
pub use error::{Result, SessionError};
pub use prepared::{PreparedQuery, QueryMetadata};
pub use session::Session;
pub use strategy::{plan_for, CachePlan};
