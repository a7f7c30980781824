//! # quarry-core
//!
//! A dialect-aware SQL statement compiler and relational query planner.
//!
//! This crate provides:
//! - Fluent SELECT / INSERT / UPDATE / DELETE builders that freeze into
//!   immutable statements
//! - A compiler rendering those statements for PostgreSQL, MySQL or any
//!   other [`Dialect`], with bound parameters and per-parameter type tags
//! - Join alias and nullability tracking, and set operators
//! - A relational planner that loads rows together with related rows in a
//!   single statement using lateral joins and JSON aggregation
//!
//! ## Building queries
//!
//! ```rust
//! use quarry_core::{ColumnDef, PostgresDialect, Select, Table, ToQuery};
//!
//! let users = Table::new("users")
//!     .column(ColumnDef::new("id", "integer").primary_key())
//!     .column(ColumnDef::new("name", "text").not_null())
//!     .build();
//!
//! let query = Select::new()
//!     .from(&users)
//!     .where_clause(users.col("name").eq("alice"))
//!     .build()
//!     .unwrap()
//!     .to_query(&PostgresDialect::new())
//!     .unwrap();
//!
//! assert_eq!(
//!     query.sql,
//!     r#"SELECT "id", "name" FROM "users" WHERE "users"."name" = $1"#
//! );
//! ```
//!
//! ## Relational queries
//!
//! ```rust
//! use quarry_core::{
//!     ColumnDef, FetchNode, PostgresDialect, Relation, RelationRegistry, RelationalQuery,
//!     Table, ToQuery,
//! };
//!
//! let users = Table::new("users")
//!     .column(ColumnDef::new("id", "integer").primary_key())
//!     .build();
//! let posts = Table::new("posts")
//!     .column(ColumnDef::new("id", "integer").primary_key())
//!     .column(ColumnDef::new("author_id", "integer"))
//!     .build();
//! let registry = RelationRegistry::new()
//!     .register_table("users", &users)
//!     .register_table("posts", &posts)
//!     .register_relation("users", "posts", Relation::many("posts"))
//!     .register_relation("posts", "author", Relation::one("users").on(&["author_id"], &["id"]));
//!
//! let query = RelationalQuery::find_many(
//!     &registry,
//!     "users",
//!     FetchNode::new().with("posts", FetchNode::new()),
//! )
//! .unwrap();
//! let sql = query.to_query(&PostgresDialect::new()).unwrap().sql;
//! assert!(sql.contains("LEFT JOIN LATERAL"));
//! ```

pub mod builder;
pub mod compiler;
pub mod dialect;
pub mod error;
pub mod fragment;
pub mod relational;
pub mod schema;
pub mod value;

pub use builder::{
    and, excluded, or, order_fields, ConflictUpdate, Delete, Field, FieldMap, Insert, JoinType,
    Nullability, Row, Select, SelectStatement, SelectedField, Source, Update,
};
pub use compiler::{Compiler, StatementKind, ToQuery};
pub use dialect::{Dialect, MySqlDialect, PostgresDialect};
pub use error::{BuildError, MappingError, Result};
pub use fragment::{Query, SetValue, Sql};
pub use relational::{
    map_relational_row, Cardinality, ColumnSelection, FetchNode, Relation, RelationRegistry,
    RelationalField, RelationalQuery, Scope,
};
pub use schema::{ColumnDef, ColumnRef, Table};
pub use value::{SqlValue, ToSqlValue, TypeTag};
