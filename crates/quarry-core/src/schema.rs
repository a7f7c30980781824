//! Runtime table and column metadata.
//!
//! Tables are declared once and shared behind an [`Arc`]. Aliasing a table
//! produces a cheap handle over the same definition whose columns render
//! against the alias instead of the table name.

use std::fmt;
use std::sync::Arc;

use crate::error::{BuildError, Result};
use crate::fragment::{SetValue, Sql};
use crate::value::TypeTag;

/// A value generator attached to a column (insert default or on-update).
pub type Generator = Arc<dyn Fn() -> SetValue + Send + Sync>;

/// A column declaration.
#[derive(Clone)]
pub struct ColumnDef {
    name: String,
    sql_type: String,
    not_null: bool,
    primary_key: bool,
    default_value: Option<Sql>,
    generated: bool,
    type_tag: TypeTag,
    default_fn: Option<Generator>,
    on_update_fn: Option<Generator>,
}

impl ColumnDef {
    /// Creates a nullable column with the given SQL type.
    #[must_use]
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            not_null: false,
            primary_key: false,
            default_value: None,
            generated: false,
            type_tag: TypeTag::None,
            default_fn: None,
            on_update_fn: None,
        }
    }

    /// Marks the column NOT NULL.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Marks the column as the primary key (implies NOT NULL).
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.not_null = true;
        self
    }

    /// Sets a static database-side default.
    #[must_use]
    pub fn default(mut self, value: Sql) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Marks the column as generated by the database; it is never written.
    #[must_use]
    pub const fn generated(mut self) -> Self {
        self.generated = true;
        self
    }

    /// Sets the driver type hint for parameters bound to this column.
    #[must_use]
    pub const fn type_tag(mut self, tag: TypeTag) -> Self {
        self.type_tag = tag;
        self
    }

    /// Sets a generator invoked on insert when no value is supplied.
    #[must_use]
    pub fn default_fn(mut self, f: impl Fn() -> SetValue + Send + Sync + 'static) -> Self {
        self.default_fn = Some(Arc::new(f));
        self
    }

    /// Sets a generator invoked on every update.
    #[must_use]
    pub fn on_update_fn(mut self, f: impl Fn() -> SetValue + Send + Sync + 'static) -> Self {
        self.on_update_fn = Some(Arc::new(f));
        self
    }

    /// Returns the column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the SQL type name.
    #[must_use]
    pub fn sql_type(&self) -> &str {
        &self.sql_type
    }

    /// Returns whether the column is NOT NULL.
    #[must_use]
    pub const fn is_not_null(&self) -> bool {
        self.not_null
    }

    /// Returns whether the column is the primary key.
    #[must_use]
    pub const fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    /// Returns whether the column is generated by the database.
    #[must_use]
    pub const fn is_generated(&self) -> bool {
        self.generated
    }

    /// Returns the static default, if any.
    #[must_use]
    pub const fn default_value(&self) -> Option<&Sql> {
        self.default_value.as_ref()
    }

    /// Returns the driver type hint.
    #[must_use]
    pub const fn tag(&self) -> TypeTag {
        self.type_tag
    }

    /// Returns the insert-time generator.
    #[must_use]
    pub const fn default_generator(&self) -> Option<&Generator> {
        self.default_fn.as_ref()
    }

    /// Returns the update-time generator.
    #[must_use]
    pub const fn on_update_generator(&self) -> Option<&Generator> {
        self.on_update_fn.as_ref()
    }
}

impl fmt::Debug for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDef")
            .field("name", &self.name)
            .field("sql_type", &self.sql_type)
            .field("not_null", &self.not_null)
            .field("primary_key", &self.primary_key)
            .field("default_value", &self.default_value)
            .field("generated", &self.generated)
            .field("type_tag", &self.type_tag)
            .field("default_fn", &self.default_fn.is_some())
            .field("on_update_fn", &self.on_update_fn.is_some())
            .finish()
    }
}

#[derive(Debug)]
struct TableDef {
    schema: Option<String>,
    name: String,
    columns: Vec<Arc<ColumnDef>>,
}

/// A table declaration, optionally aliased.
#[derive(Debug, Clone)]
pub struct Table {
    def: Arc<TableDef>,
    alias: Option<String>,
}

/// Builder for [`Table`].
#[derive(Debug)]
pub struct TableBuilder {
    schema: Option<String>,
    name: String,
    columns: Vec<ColumnDef>,
}

impl TableBuilder {
    /// Sets the schema the table lives in.
    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Adds a column. Column order is declaration order.
    #[must_use]
    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// Finishes the declaration.
    #[must_use]
    pub fn build(self) -> Table {
        Table {
            def: Arc::new(TableDef {
                schema: self.schema,
                name: self.name,
                columns: self.columns.into_iter().map(Arc::new).collect(),
            }),
            alias: None,
        }
    }
}

impl Table {
    /// Starts a table declaration.
    #[allow(clippy::new_ret_no_self)]
    #[must_use]
    pub fn new(name: impl Into<String>) -> TableBuilder {
        TableBuilder {
            schema: None,
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Returns the physical table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// Returns the schema, if any.
    #[must_use]
    pub fn schema(&self) -> Option<&str> {
        self.def.schema.as_deref()
    }

    /// Returns the alias, if any.
    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Returns the name columns are qualified with: the alias if set,
    /// otherwise the table name.
    #[must_use]
    pub fn source_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.def.name)
    }

    /// Returns a handle to the same table under another alias.
    #[must_use]
    pub fn aliased(&self, alias: impl Into<String>) -> Self {
        Self {
            def: Arc::clone(&self.def),
            alias: Some(alias.into()),
        }
    }

    /// Looks up a column.
    pub fn try_col(&self, name: &str) -> Result<ColumnRef> {
        self.def
            .columns
            .iter()
            .find(|c| c.name == name)
            .map(|def| ColumnRef {
                source: String::from(self.source_name()),
                table: self.def.name.clone(),
                def: Arc::clone(def),
            })
            .ok_or_else(|| BuildError::UnknownColumn {
                table: self.def.name.clone(),
                column: String::from(name),
            })
    }

    /// Looks up a column.
    ///
    /// # Panics
    ///
    /// Panics if the table has no such column. Use [`Table::try_col`] for
    /// names that are not known statically.
    #[must_use]
    pub fn col(&self, name: &str) -> ColumnRef {
        self.try_col(name)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    /// Returns all columns in declaration order.
    #[must_use]
    pub fn columns(&self) -> Vec<ColumnRef> {
        self.def
            .columns
            .iter()
            .map(|def| ColumnRef {
                source: String::from(self.source_name()),
                table: self.def.name.clone(),
                def: Arc::clone(def),
            })
            .collect()
    }

    /// Returns the column declarations in declaration order.
    #[must_use]
    pub fn column_defs(&self) -> &[Arc<ColumnDef>] {
        &self.def.columns
    }

    /// Returns the `FROM` rendering: `"schema"."name" "alias"`.
    #[must_use]
    pub fn to_sql(&self) -> Sql {
        let mut sql = Sql::new();
        if let Some(schema) = self.schema() {
            sql.push_ident(schema).push_str(".");
        }
        sql.push_ident(self.name());
        if let Some(alias) = self.alias().filter(|a| *a != self.name()) {
            sql.push_str(" ").push_ident(alias);
        }
        sql
    }
}

/// A column bound to a table or alias.
#[derive(Debug, Clone)]
pub struct ColumnRef {
    source: String,
    table: String,
    def: Arc<ColumnDef>,
}

impl ColumnRef {
    /// Returns the column name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.def.name()
    }

    /// Returns the table name or alias this column is qualified with.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the physical table name.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Returns the declaration.
    #[must_use]
    pub fn def(&self) -> &ColumnDef {
        &self.def
    }

    /// Returns the driver type hint.
    #[must_use]
    pub fn type_tag(&self) -> TypeTag {
        self.def.tag()
    }

    /// Returns the same column qualified with another source.
    #[must_use]
    pub fn with_source(&self, source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            table: self.table.clone(),
            def: Arc::clone(&self.def),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::PostgresDialect;

    fn users() -> Table {
        Table::new("users")
            .schema("app")
            .column(ColumnDef::new("id", "integer").primary_key())
            .column(ColumnDef::new("name", "text").not_null())
            .build()
    }

    #[test]
    fn test_table_sql() {
        let dialect = PostgresDialect::new();
        let users = users();
        assert_eq!(users.to_sql().render(&dialect).sql, r#""app"."users""#);
        assert_eq!(
            users.aliased("u").to_sql().render(&dialect).sql,
            r#""app"."users" "u""#
        );
    }

    #[test]
    fn test_aliased_columns_rebind() {
        let users = users().aliased("u");
        let id = users.col("id");
        assert_eq!(id.source(), "u");
        assert_eq!(id.table_name(), "users");
        assert_eq!(
            Sql::column(id).render(&PostgresDialect::new()).sql,
            r#""u"."id""#
        );
    }

    #[test]
    fn test_unknown_column() {
        let err = users().try_col("missing").unwrap_err();
        assert_eq!(
            err,
            BuildError::UnknownColumn {
                table: String::from("users"),
                column: String::from("missing"),
            }
        );
    }

    #[test]
    fn test_columns_keep_declaration_order() {
        let names: Vec<String> = users()
            .columns()
            .iter()
            .map(|c| String::from(c.name()))
            .collect();
        assert_eq!(names, vec!["id", "name"]);
        assert!(users().column_defs()[0].is_primary_key());
        assert!(users().column_defs()[0].is_not_null());
    }
}
