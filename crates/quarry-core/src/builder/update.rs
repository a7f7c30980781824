//! UPDATE statement builder.

use super::insert::resolve_update_set;
use super::selection::{order_fields, FieldMap, SelectedField};
use crate::error::Result;
use crate::fragment::{SetValue, Sql};
use crate::schema::Table;
use crate::value::ToSqlValue;

/// A frozen UPDATE statement.
#[derive(Debug, Clone)]
pub struct UpdateStatement {
    pub(crate) table: Table,
    pub(crate) set: Vec<(String, Sql)>,
    pub(crate) where_clause: Option<Sql>,
    pub(crate) returning: Option<Vec<SelectedField>>,
}

impl UpdateStatement {
    /// Returns the assigned column names, in order.
    #[must_use]
    pub fn set_columns(&self) -> Vec<&str> {
        self.set.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Returns the target table.
    #[must_use]
    pub const fn table(&self) -> &Table {
        &self.table
    }

    /// Returns whether the statement has a RETURNING clause.
    #[must_use]
    pub const fn has_returning(&self) -> bool {
        self.returning.is_some()
    }
}

/// Fluent UPDATE builder.
#[derive(Debug, Clone)]
pub struct Update {
    table: Table,
    patch: Vec<(String, SetValue)>,
    where_clause: Option<Sql>,
    returning: Option<FieldMap>,
}

impl Update {
    /// Starts an update of a table.
    #[must_use]
    pub fn table(table: &Table) -> Self {
        Self {
            table: table.clone(),
            patch: Vec::new(),
            where_clause: None,
            returning: None,
        }
    }

    /// Sets a column to a bound value.
    #[must_use]
    pub fn set<T: ToSqlValue>(mut self, column: &str, value: T) -> Self {
        self.patch.push((column.to_owned(), SetValue::value(value)));
        self
    }

    /// Sets a column to a SQL expression.
    #[must_use]
    pub fn set_sql(mut self, column: &str, sql: Sql) -> Self {
        self.patch.push((column.to_owned(), SetValue::Sql(sql)));
        self
    }

    /// Sets the WHERE clause.
    #[must_use]
    pub fn where_clause(mut self, condition: Sql) -> Self {
        self.where_clause = Some(condition);
        self
    }

    /// Adds a RETURNING clause.
    #[must_use]
    pub fn returning(mut self, fields: FieldMap) -> Self {
        self.returning = Some(fields);
        self
    }

    /// Adds a RETURNING clause with every column.
    #[must_use]
    pub fn returning_all(self) -> Self {
        let fields = FieldMap::from_table(&self.table);
        self.returning(fields)
    }

    /// Freezes the builder. On-update generators run here.
    pub fn build(self) -> Result<UpdateStatement> {
        let set = resolve_update_set(&self.table, &self.patch)?;
        Ok(UpdateStatement {
            set,
            where_clause: self.where_clause,
            returning: self.returning.as_ref().map(order_fields),
            table: self.table,
        })
    }
}
