//! Statement compiler.
//!
//! Turns frozen statements into a [`Sql`] tree for one dialect. Clause
//! order is fixed: CTEs, `DISTINCT`, projection, `FROM`, joins, `WHERE`,
//! `GROUP BY`, `HAVING`, `ORDER BY`, `LIMIT`, `OFFSET`, locking, then set
//! operators. Any clause the dialect cannot express fails the whole
//! compilation; partial SQL is never returned.

use tracing::debug;

use crate::builder::{
    compose, CompoundTail, DeleteStatement, Distinct, Field, InsertStatement, InsertValue, Join,
    JoinType, LockWait, Locking, OnConflict, SelectStatement, SelectedField, Source,
    UpdateStatement,
};
use crate::dialect::Dialect;
use crate::error::{BuildError, Result};
use crate::fragment::{Query, Sql};
use crate::schema::Table;
use crate::value::SqlValue;

/// The kind of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    /// SELECT.
    Select,
    /// INSERT.
    Insert,
    /// UPDATE.
    Update,
    /// DELETE.
    Delete,
}

impl StatementKind {
    /// Returns whether the statement writes.
    #[must_use]
    pub const fn is_mutation(self) -> bool {
        !matches!(self, Self::Select)
    }

    /// Returns the lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Something that compiles to a query.
pub trait ToQuery {
    /// Returns the statement kind.
    fn kind(&self) -> StatementKind;

    /// Returns the physical tables the statement reads or writes.
    fn tables(&self) -> Vec<String>;

    /// Returns whether executing the statement yields rows.
    fn returns_rows(&self) -> bool;

    /// Compiles the statement into a fragment.
    fn to_sql(&self, dialect: &dyn Dialect) -> Result<Sql>;

    /// Compiles and renders the statement.
    fn to_query(&self, dialect: &dyn Dialect) -> Result<Query> {
        let query = self.to_sql(dialect)?.render(dialect);
        debug!(
            dialect = dialect.name(),
            kind = self.kind().as_str(),
            sql = %query.sql,
            params = query.params.len(),
            "compiled statement"
        );
        Ok(query)
    }
}

/// Compiles statements for one dialect.
#[derive(Debug, Clone, Copy)]
pub struct Compiler<'a> {
    dialect: &'a dyn Dialect,
}

impl<'a> Compiler<'a> {
    /// Creates a compiler for a dialect.
    #[must_use]
    pub const fn new(dialect: &'a dyn Dialect) -> Self {
        Self { dialect }
    }

    /// Returns the target dialect.
    #[must_use]
    pub const fn dialect(&self) -> &'a dyn Dialect {
        self.dialect
    }

    fn require(&self, supported: bool, feature: &'static str) -> Result<()> {
        if supported {
            Ok(())
        } else {
            Err(BuildError::unsupported(self.dialect, feature))
        }
    }

    /// Compiles a SELECT.
    pub fn select(&self, stmt: &SelectStatement) -> Result<Sql> {
        check_scope(stmt)?;

        let mut sql = Sql::new();
        if !stmt.ctes.is_empty() {
            let mut ctes = Vec::with_capacity(stmt.ctes.len());
            for cte in &stmt.ctes {
                let mut item = Sql::ident(cte.name.as_str());
                item.push_str(" AS ").push_sql(self.select(&cte.statement)?.paren());
                ctes.push(item);
            }
            sql.push_str("WITH ").push_sql(Sql::join(ctes, ", ")).push_str(" ");
        }

        sql.push_str("SELECT ");
        match &stmt.distinct {
            Distinct::None => {}
            Distinct::All => {
                sql.push_str("DISTINCT ");
            }
            Distinct::On(terms) => {
                self.require(self.dialect.supports_distinct_on(), "DISTINCT ON")?;
                sql.push_str("DISTINCT ON (")
                    .push_sql(Sql::join(terms.iter().cloned(), ", "))
                    .push_str(") ");
            }
        }

        sql.push_sql(projection(&stmt.fields, stmt.joins.is_empty()));
        sql.push_str(" FROM ").push_sql(self.source(&stmt.source)?);

        for join in &stmt.joins {
            sql.push_sql(self.join(join)?);
        }

        if let Some(condition) = &stmt.where_clause {
            sql.push_str(" WHERE ").push_sql(condition.clone());
        }
        if !stmt.group_by.is_empty() {
            sql.push_str(" GROUP BY ")
                .push_sql(Sql::join(stmt.group_by.iter().cloned(), ", "));
        }
        if let Some(condition) = &stmt.having {
            sql.push_str(" HAVING ").push_sql(condition.clone());
        }
        if !stmt.order_by.is_empty() {
            sql.push_str(" ORDER BY ")
                .push_sql(Sql::join(stmt.order_by.iter().cloned(), ", "));
        }
        self.push_limit_offset(&mut sql, stmt.limit, stmt.offset);
        if let Some(locking) = &stmt.locking {
            self.require(self.dialect.supports_locking(), "row locking")?;
            sql.push_sql(locking_clause(locking));
        }

        if stmt.set_operations.is_empty() {
            return Ok(sql);
        }
        let tail = CompoundTail {
            order_by: &stmt.compound_order_by,
            limit: stmt.compound_limit,
            offset: stmt.compound_offset,
        };
        compose(self, sql, &stmt.set_operations, &tail)
    }

    pub(crate) fn push_limit_offset(&self, sql: &mut Sql, limit: Option<u64>, offset: Option<u64>) {
        if let Some(limit) = limit {
            sql.push_str(" LIMIT ").push_sql(Sql::param(limit_value(limit)));
        }
        if let Some(offset) = offset {
            sql.push_str(" OFFSET ").push_sql(Sql::param(limit_value(offset)));
        }
    }

    fn source(&self, source: &Source) -> Result<Sql> {
        Ok(match source {
            Source::Table(table) => table.to_sql(),
            Source::Subquery { statement, alias } => {
                let mut sql = self.select(statement)?.paren();
                sql.push_str(" ").push_ident(alias);
                sql
            }
            Source::Derived { sql: derived, alias } => {
                let mut sql = derived.clone();
                sql.push_str(" ").push_ident(alias);
                sql
            }
            Source::Cte(name) => Sql::ident(name.as_str()),
        })
    }

    fn join(&self, join: &Join) -> Result<Sql> {
        let mut sql = Sql::raw(" ");
        sql.push_str(join.join_type.as_sql()).push_str(" ");
        if join.lateral {
            self.require(self.dialect.supports_lateral(), "LATERAL joins")?;
            sql.push_str("LATERAL ");
        }
        sql.push_sql(self.source(&join.source)?);
        if join.join_type != JoinType::Cross {
            sql.push_str(" ON ")
                .push_sql(join.on.clone().unwrap_or_else(|| Sql::raw("TRUE")));
        }
        Ok(sql)
    }

    fn returning(&self, fields: Option<&Vec<SelectedField>>) -> Result<Sql> {
        let Some(fields) = fields else {
            return Ok(Sql::new());
        };
        self.require(self.dialect.supports_returning(), "RETURNING")?;
        let mut sql = Sql::raw(" RETURNING ");
        sql.push_sql(projection(fields, true));
        Ok(sql)
    }

    /// Compiles an INSERT.
    pub fn insert(&self, stmt: &InsertStatement) -> Result<Sql> {
        let mut sql = Sql::raw("INSERT INTO ");
        sql.push_sql(table_name(&stmt.table)).push_str(" (");
        sql.push_sql(Sql::join(stmt.columns.iter().map(|c| Sql::ident(c.as_str())), ", "));
        sql.push_str(") VALUES ");

        let rows = stmt.rows.iter().map(|row| {
            let values = row.iter().zip(&stmt.static_defaults).map(|(value, default)| {
                match value {
                    InsertValue::Sql(sql) => sql.clone(),
                    InsertValue::Default if self.dialect.supports_default_keyword() => {
                        Sql::raw("DEFAULT")
                    }
                    InsertValue::Default => default.clone().unwrap_or_else(|| Sql::raw("NULL")),
                }
            });
            Sql::join(values, ", ").paren()
        });
        sql.push_sql(Sql::join(rows, ", "));

        if let Some(on_conflict) = &stmt.on_conflict {
            self.require(self.dialect.supports_on_conflict(), "ON CONFLICT")?;
            sql.push_sql(conflict_clause(on_conflict));
        }
        sql.push_sql(self.returning(stmt.returning.as_ref())?);
        Ok(sql)
    }

    /// Compiles an UPDATE.
    pub fn update(&self, stmt: &UpdateStatement) -> Result<Sql> {
        let mut sql = Sql::raw("UPDATE ");
        sql.push_sql(stmt.table.to_sql()).push_str(" SET ");
        sql.push_sql(assignments(&stmt.set));
        if let Some(condition) = &stmt.where_clause {
            sql.push_str(" WHERE ").push_sql(condition.clone());
        }
        sql.push_sql(self.returning(stmt.returning.as_ref())?);
        Ok(sql)
    }

    /// Compiles a DELETE.
    pub fn delete(&self, stmt: &DeleteStatement) -> Result<Sql> {
        let mut sql = Sql::raw("DELETE FROM ");
        sql.push_sql(stmt.table.to_sql());
        if let Some(condition) = &stmt.where_clause {
            sql.push_str(" WHERE ").push_sql(condition.clone());
        }
        sql.push_sql(self.returning(stmt.returning.as_ref())?);
        Ok(sql)
    }
}

fn limit_value(n: u64) -> SqlValue {
    SqlValue::Int(i64::try_from(n).unwrap_or(i64::MAX))
}

/// Fails if a selected column belongs to a source that is not in scope.
fn check_scope(stmt: &SelectStatement) -> Result<()> {
    for field in &stmt.fields {
        if let Field::Column(column) = &field.field {
            if !stmt.nullability.contains_key(column.source()) {
                return Err(BuildError::ColumnNotInScope {
                    path: field.path.join("->"),
                    table: column.source().to_owned(),
                    column: column.name().to_owned(),
                });
            }
        }
    }
    Ok(())
}

/// Renders a projection list. With a single source, columns render as bare
/// names.
fn projection(fields: &[SelectedField], single_source: bool) -> Sql {
    let items = fields.iter().map(|selected| match &selected.field {
        Field::Column(column) if single_source => Sql::ident(column.name()),
        Field::Column(column) => Sql::column(column.clone()),
        Field::Raw(sql) if single_source => sql.unqualified(),
        Field::Raw(sql) => sql.clone(),
        Field::Aliased { sql, alias } => {
            let mut item = if single_source { sql.unqualified() } else { sql.clone() };
            item.push_str(" AS ").push_ident(alias);
            item
        }
    });
    Sql::join(items, ", ")
}

fn table_name(table: &Table) -> Sql {
    let mut sql = Sql::new();
    if let Some(schema) = table.schema() {
        sql.push_ident(schema).push_str(".");
    }
    sql.push_ident(table.name());
    sql
}

fn assignments(set: &[(String, Sql)]) -> Sql {
    let items = set.iter().map(|(name, value)| {
        let mut item = Sql::ident(name.as_str());
        item.push_str(" = ").push_sql(value.clone());
        item
    });
    Sql::join(items, ", ")
}

fn target_list(target: &[String]) -> Sql {
    Sql::join(target.iter().map(|c| Sql::ident(c.as_str())), ", ").paren()
}

fn conflict_clause(on_conflict: &OnConflict) -> Sql {
    let mut sql = Sql::raw(" ON CONFLICT");
    match on_conflict {
        OnConflict::DoNothing { target } => {
            if !target.is_empty() {
                sql.push_str(" ").push_sql(target_list(target));
            }
            sql.push_str(" DO NOTHING");
        }
        OnConflict::DoUpdate {
            target,
            target_where,
            set,
            set_where,
        } => {
            sql.push_str(" ").push_sql(target_list(target));
            if let Some(condition) = target_where {
                sql.push_str(" WHERE ").push_sql(condition.clone());
            }
            sql.push_str(" DO UPDATE SET ").push_sql(assignments(set));
            if let Some(condition) = set_where {
                sql.push_str(" WHERE ").push_sql(condition.clone());
            }
        }
    }
    sql
}

fn locking_clause(locking: &Locking) -> Sql {
    let mut sql = Sql::raw(" ");
    sql.push_str(locking.strength.as_sql());
    if !locking.of.is_empty() {
        sql.push_str(" OF ")
            .push_sql(Sql::join(locking.of.iter().map(|t| Sql::ident(t.as_str())), ", "));
    }
    match locking.wait {
        LockWait::Wait => {}
        LockWait::NoWait => {
            sql.push_str(" NOWAIT");
        }
        LockWait::SkipLocked => {
            sql.push_str(" SKIP LOCKED");
        }
    }
    sql
}

impl ToQuery for SelectStatement {
    fn kind(&self) -> StatementKind {
        StatementKind::Select
    }

    fn tables(&self) -> Vec<String> {
        Self::tables(self)
    }

    fn returns_rows(&self) -> bool {
        true
    }

    fn to_sql(&self, dialect: &dyn Dialect) -> Result<Sql> {
        Compiler::new(dialect).select(self)
    }
}

impl ToQuery for InsertStatement {
    fn kind(&self) -> StatementKind {
        StatementKind::Insert
    }

    fn tables(&self) -> Vec<String> {
        vec![self.table.name().to_owned()]
    }

    fn returns_rows(&self) -> bool {
        self.has_returning()
    }

    fn to_sql(&self, dialect: &dyn Dialect) -> Result<Sql> {
        Compiler::new(dialect).insert(self)
    }
}

impl ToQuery for UpdateStatement {
    fn kind(&self) -> StatementKind {
        StatementKind::Update
    }

    fn tables(&self) -> Vec<String> {
        vec![self.table.name().to_owned()]
    }

    fn returns_rows(&self) -> bool {
        self.has_returning()
    }

    fn to_sql(&self, dialect: &dyn Dialect) -> Result<Sql> {
        Compiler::new(dialect).update(self)
    }
}

impl ToQuery for DeleteStatement {
    fn kind(&self) -> StatementKind {
        StatementKind::Delete
    }

    fn tables(&self) -> Vec<String> {
        vec![self.table.name().to_owned()]
    }

    fn returns_rows(&self) -> bool {
        self.has_returning()
    }

    fn to_sql(&self, dialect: &dyn Dialect) -> Result<Sql> {
        Compiler::new(dialect).delete(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{
        excluded, ConflictUpdate, Delete, FieldMap, Insert, LockStrength, Row, Select, Update,
    };
    use crate::dialect::{MySqlDialect, PostgresDialect};
    use crate::fragment::SetValue;
    use crate::schema::ColumnDef;
    use crate::value::TypeTag;

    fn users() -> Table {
        Table::new("users")
            .column(ColumnDef::new("id", "integer").primary_key())
            .column(ColumnDef::new("name", "text").not_null())
            .column(ColumnDef::new("email", "text"))
            .build()
    }

    fn orders() -> Table {
        Table::new("orders")
            .column(ColumnDef::new("id", "integer").primary_key())
            .column(ColumnDef::new("user_id", "integer").not_null())
            .build()
    }

    fn pg<T: ToQuery>(stmt: &T) -> Query {
        stmt.to_query(&PostgresDialect::new()).unwrap()
    }

    #[test]
    fn test_simple_select() {
        let users = users();
        let stmt = Select::new()
            .from(&users)
            .where_clause(users.col("id").eq(1))
            .order_by([users.col("name").asc()])
            .limit(10)
            .offset(20)
            .build()
            .unwrap();
        let query = pg(&stmt);
        assert_eq!(
            query.sql,
            r#"SELECT "id", "name", "email" FROM "users" WHERE "users"."id" = $1 ORDER BY "users"."name" ASC LIMIT $2 OFFSET $3"#
        );
        assert_eq!(
            query.params,
            vec![SqlValue::Int(1), SqlValue::Int(10), SqlValue::Int(20)]
        );
    }

    #[test]
    fn test_select_with_join_is_qualified() {
        let users = users();
        let orders = orders();
        let stmt = Select::new()
            .from(&users)
            .fields(
                FieldMap::new()
                    .field("id", users.col("id"))
                    .field("order_id", orders.col("id")),
            )
            .inner_join(&orders, orders.col("user_id").eq_col(&users.col("id")))
            .build()
            .unwrap();
        assert_eq!(
            pg(&stmt).sql,
            r#"SELECT "users"."id", "orders"."id" FROM "users" INNER JOIN "orders" ON "orders"."user_id" = "users"."id""#
        );
    }

    #[test]
    fn test_column_not_in_scope() {
        let users = users();
        let orders = orders();
        let stmt = Select::new()
            .from(&users)
            .fields(
                FieldMap::new()
                    .field("id", users.col("id"))
                    .nested("order", FieldMap::new().field("id", orders.col("id"))),
            )
            .build()
            .unwrap();
        let err = stmt.to_query(&PostgresDialect::new()).unwrap_err();
        assert_eq!(
            err,
            BuildError::ColumnNotInScope {
                path: String::from("order->id"),
                table: String::from("orders"),
                column: String::from("id"),
            }
        );
    }

    #[test]
    fn test_distinct_group_having() {
        let orders = orders();
        let stmt = Select::new()
            .from(&orders)
            .fields(
                FieldMap::new()
                    .field("user_id", orders.col("user_id"))
                    .field("n", crate::Field::aliased(Sql::raw("count(*)"), "n")),
            )
            .distinct()
            .group_by([Sql::column(orders.col("user_id"))])
            .having(Sql::raw("count(*) > 1"))
            .build()
            .unwrap();
        assert_eq!(
            pg(&stmt).sql,
            r#"SELECT DISTINCT "user_id", count(*) AS "n" FROM "orders" GROUP BY "orders"."user_id" HAVING count(*) > 1"#
        );
    }

    #[test]
    fn test_distinct_on_requires_dialect_support() {
        let users = users();
        let stmt = Select::new()
            .from(&users)
            .distinct_on([Sql::column(users.col("name"))])
            .build()
            .unwrap();
        assert_eq!(
            pg(&stmt).sql,
            r#"SELECT DISTINCT ON ("users"."name") "id", "name", "email" FROM "users""#
        );
        assert_eq!(
            stmt.to_query(&MySqlDialect::new()).unwrap_err(),
            BuildError::Unsupported {
                dialect: "mysql",
                feature: "DISTINCT ON",
            }
        );
    }

    #[test]
    fn test_locking() {
        let users = users();
        let stmt = Select::new()
            .from(&users)
            .lock_with(LockStrength::Update, &[&users], LockWait::SkipLocked)
            .build()
            .unwrap();
        assert_eq!(
            pg(&stmt).sql,
            r#"SELECT "id", "name", "email" FROM "users" FOR UPDATE OF "users" SKIP LOCKED"#
        );

        let stmt = Select::new()
            .from(&users)
            .lock(LockStrength::Share)
            .build()
            .unwrap();
        assert!(pg(&stmt).sql.ends_with(" FOR SHARE"));
    }

    #[test]
    fn test_cte() {
        let users = users();
        let active = Select::new()
            .from(&users)
            .where_clause(users.col("email").is_not_null())
            .build()
            .unwrap();
        let stmt = Select::new()
            .with_cte("active", active)
            .from(Source::Cte(String::from("active")))
            .fields(FieldMap::new().field("n", Sql::raw("count(*)")))
            .build()
            .unwrap();
        assert_eq!(
            pg(&stmt).sql,
            r#"WITH "active" AS (SELECT "id", "name", "email" FROM "users" WHERE "users"."email" IS NOT NULL) SELECT count(*) FROM "active""#
        );
        assert_eq!(stmt.tables(), vec!["users"]);
    }

    #[test]
    fn test_union_with_global_order() {
        let users = users();
        let fields = || {
            FieldMap::new()
                .field("id", users.col("id"))
                .field("name", users.col("name"))
        };
        let right = Select::new()
            .from(&users)
            .fields(fields())
            .where_clause(users.col("id").gt(100))
            .build()
            .unwrap();
        let stmt = Select::new()
            .from(&users)
            .fields(fields())
            .where_clause(users.col("id").lt(10))
            .union_all(right)
            .order_by([users.col("name").desc()])
            .limit(5)
            .build()
            .unwrap();
        let query = pg(&stmt);
        assert_eq!(
            query.sql,
            r#"(SELECT "id", "name" FROM "users" WHERE "users"."id" < $1) UNION ALL (SELECT "id", "name" FROM "users" WHERE "users"."id" > $2) ORDER BY "name" DESC LIMIT $3"#
        );
        assert_eq!(query.params.len(), 3);
    }

    #[test]
    fn test_set_operations_fold_left() {
        let users = users();
        let one = || {
            Select::new()
                .from(&users)
                .fields(FieldMap::new().field("id", users.col("id")))
        };
        let stmt = one()
            .union(one().build().unwrap())
            .except(one().build().unwrap())
            .build()
            .unwrap();
        assert_eq!(
            pg(&stmt).sql,
            r#"((SELECT "id" FROM "users") UNION (SELECT "id" FROM "users")) EXCEPT (SELECT "id" FROM "users")"#
        );
    }

    #[test]
    fn test_compile_is_idempotent() {
        let users = users();
        let stmt = Select::new()
            .from(&users)
            .where_clause(users.col("name").eq("a"))
            .build()
            .unwrap();
        assert_eq!(pg(&stmt), pg(&stmt));
    }

    #[test]
    fn test_insert_with_conflict_update_and_returning() {
        let users = users();
        let stmt = Insert::into(&users)
            .value(Row::new().set("id", 1).set("name", "alice"))
            .on_conflict_do_update(
                ConflictUpdate::new(&[users.col("id")])
                    .set_sql("name", excluded(&users.col("name"))),
            )
            .returning(FieldMap::new().field("id", users.col("id")))
            .build()
            .unwrap();
        let query = pg(&stmt);
        assert_eq!(
            query.sql,
            r#"INSERT INTO "users" ("id", "name", "email") VALUES ($1, $2, DEFAULT) ON CONFLICT ("id") DO UPDATE SET "name" = excluded."name" RETURNING "id""#
        );
        assert_eq!(query.params.len(), 2);
        assert_eq!(
            stmt.to_query(&MySqlDialect::new()).unwrap_err(),
            BuildError::Unsupported {
                dialect: "mysql",
                feature: "ON CONFLICT",
            }
        );
    }

    #[test]
    fn test_insert_do_nothing_without_target() {
        let users = users();
        let stmt = Insert::into(&users)
            .value(Row::new().set("name", "a"))
            .on_conflict_do_nothing(&[])
            .build()
            .unwrap();
        assert!(pg(&stmt).sql.ends_with(" ON CONFLICT DO NOTHING"));
    }

    #[test]
    fn test_insert_errors() {
        let users = users();
        assert_eq!(
            Insert::into(&users).build().unwrap_err(),
            BuildError::NoRows(String::from("users"))
        );
        assert_eq!(
            Insert::into(&users)
                .value(Row::new().set("nope", 1))
                .build()
                .unwrap_err(),
            BuildError::UnknownColumn {
                table: String::from("users"),
                column: String::from("nope"),
            }
        );
        assert_eq!(
            Insert::into(&users)
                .value(Row::new().set("name", "a"))
                .on_conflict_do_update(ConflictUpdate::new(&[]).set("name", "b"))
                .build()
                .unwrap_err(),
            BuildError::EmptyConflictTarget
        );
    }

    #[test]
    fn test_update_refreshes_on_update_columns() {
        let posts = Table::new("posts")
            .column(ColumnDef::new("id", "integer").primary_key())
            .column(ColumnDef::new("title", "text"))
            .column(
                ColumnDef::new("updated_at", "timestamp")
                    .type_tag(TypeTag::Timestamp)
                    .on_update_fn(|| SetValue::sql(Sql::raw("now()"))),
            )
            .build();
        let stmt = Update::table(&posts)
            .set("title", "new")
            .where_clause(posts.col("id").eq(7))
            .returning_all()
            .build()
            .unwrap();
        assert_eq!(stmt.set_columns(), vec!["title", "updated_at"]);
        let query = pg(&stmt);
        assert_eq!(
            query.sql,
            r#"UPDATE "posts" SET "title" = $1, "updated_at" = now() WHERE "posts"."id" = $2 RETURNING "id", "title", "updated_at""#
        );
    }

    #[test]
    fn test_update_empty_set() {
        let users = users();
        assert_eq!(
            Update::table(&users).build().unwrap_err(),
            BuildError::EmptyUpdateSet(String::from("users"))
        );
    }

    #[test]
    fn test_delete() {
        let users = users();
        let stmt = Delete::from_table(&users)
            .where_clause(users.col("id").eq(3))
            .build();
        assert_eq!(pg(&stmt).sql, r#"DELETE FROM "users" WHERE "users"."id" = $1"#);
        assert!(!stmt.returns_rows());
        assert_eq!(stmt.kind(), StatementKind::Delete);
        assert_eq!(ToQuery::tables(&stmt), vec!["users"]);
    }

    #[test]
    fn test_returning_requires_dialect_support() {
        let users = users();
        let stmt = Delete::from_table(&users)
            .returning(FieldMap::new().field("id", users.col("id")))
            .build();
        assert!(stmt.returns_rows());
        assert_eq!(
            stmt.to_query(&MySqlDialect::new()).unwrap_err(),
            BuildError::Unsupported {
                dialect: "mysql",
                feature: "RETURNING",
            }
        );
    }

    #[test]
    fn test_lateral_join() {
        let users = users();
        let orders = orders();
        let latest = Select::new()
            .from(&orders)
            .where_clause(orders.col("user_id").eq_col(&users.col("id")))
            .order_by([orders.col("id").desc()])
            .limit(1)
            .build()
            .unwrap();
        let stmt = Select::new()
            .from(&users)
            .fields(
                FieldMap::new()
                    .field("id", users.col("id"))
                    .field("latest", Sql::qualified("latest", "id")),
            )
            .left_join_lateral(Source::subquery(latest, "latest"), Sql::raw("TRUE"))
            .build()
            .unwrap();
        assert_eq!(
            pg(&stmt).sql,
            r#"SELECT "users"."id", "latest"."id" FROM "users" LEFT JOIN LATERAL (SELECT "id", "user_id" FROM "orders" WHERE "orders"."user_id" = "users"."id" ORDER BY "orders"."id" DESC LIMIT $1) "latest" ON TRUE"#
        );
    }
}
