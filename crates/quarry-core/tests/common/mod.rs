#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, Ordering};

use quarry_core::{
    ColumnDef, PostgresDialect, Query, Relation, RelationRegistry, SetValue, Sql, SqlValue,
    Table, ToQuery, TypeTag,
};

pub fn users() -> Table {
    Table::new("users")
        .column(ColumnDef::new("id", "integer").primary_key())
        .column(ColumnDef::new("name", "text").not_null())
        .column(ColumnDef::new("email", "text"))
        .build()
}

pub fn orders() -> Table {
    Table::new("orders")
        .column(ColumnDef::new("id", "integer").primary_key())
        .column(ColumnDef::new("user_id", "integer").not_null())
        .column(ColumnDef::new("total", "numeric").type_tag(TypeTag::Decimal))
        .build()
}

pub fn posts() -> Table {
    Table::new("posts")
        .column(ColumnDef::new("id", "integer").primary_key())
        .column(ColumnDef::new("author_id", "integer").not_null())
        .column(ColumnDef::new("title", "text").not_null())
        .build()
}

pub fn comments() -> Table {
    Table::new("comments")
        .column(ColumnDef::new("id", "integer").primary_key())
        .column(ColumnDef::new("post_id", "integer").not_null())
        .column(ColumnDef::new("body", "text").not_null())
        .build()
}

/// users 1-n posts 1-n comments, with the reverse to-one relations.
pub fn blog_registry() -> RelationRegistry {
    RelationRegistry::new()
        .register_table("users", &users())
        .register_table("posts", &posts())
        .register_table("comments", &comments())
        .register_relation("users", "posts", Relation::many("posts"))
        .register_relation(
            "posts",
            "author",
            Relation::one("users").on(&["author_id"], &["id"]),
        )
        .register_relation("posts", "comments", Relation::many("comments"))
        .register_relation(
            "comments",
            "post",
            Relation::one("posts").on(&["post_id"], &["id"]),
        )
}

/// A table with one column per generator kind.
///
/// `created` has both an insert generator and an on-update generator, so
/// inserts must use the former.
pub fn audited(counter: &'static AtomicI64) -> Table {
    Table::new("audited")
        .column(ColumnDef::new("id", "integer").primary_key())
        .column(ColumnDef::new("label", "text"))
        .column(
            ColumnDef::new("created", "integer")
                .default_fn(move || SetValue::value(counter.fetch_add(1, Ordering::SeqCst)))
                .on_update_fn(|| SetValue::value(-1_i64)),
        )
        .column(
            ColumnDef::new("touched", "timestamp")
                .type_tag(TypeTag::Timestamp)
                .on_update_fn(|| SetValue::sql(Sql::raw("CURRENT_TIMESTAMP"))),
        )
        .column(
            ColumnDef::new("status", "text")
                .default(Sql::literal("new"))
                .on_update_fn(|| SetValue::value("changed")),
        )
        .column(ColumnDef::new("search", "tsvector").generated())
        .build()
}

pub fn pg<T: ToQuery>(stmt: &T) -> Query {
    stmt.to_query(&PostgresDialect::new())
        .unwrap_or_else(|e| panic!("Failed to compile: {e}"))
}

pub fn text(s: &str) -> SqlValue {
    SqlValue::Text(s.to_owned())
}

/// Splits the projection list of a single-table `SELECT ... FROM` into
/// bare column names.
pub fn projected_names(sql: &str) -> Vec<String> {
    let start = sql.find("SELECT ").map(|i| i + "SELECT ".len()).unwrap();
    let end = sql.find(" FROM ").unwrap();
    sql[start..end]
        .split(", ")
        .map(|name| name.trim_matches('"').to_owned())
        .collect()
}
