//! DELETE statement builder.

use super::selection::{order_fields, FieldMap, SelectedField};
use crate::fragment::Sql;
use crate::schema::Table;

/// A frozen DELETE statement.
#[derive(Debug, Clone)]
pub struct DeleteStatement {
    pub(crate) table: Table,
    pub(crate) where_clause: Option<Sql>,
    pub(crate) returning: Option<Vec<SelectedField>>,
}

impl DeleteStatement {
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

/// Fluent DELETE builder.
#[derive(Debug, Clone)]
pub struct Delete {
    table: Table,
    where_clause: Option<Sql>,
    returning: Option<FieldMap>,
}

impl Delete {
    /// Starts a delete from a table.
    #[must_use]
    pub fn from_table(table: &Table) -> Self {
        Self {
            table: table.clone(),
            where_clause: None,
            returning: None,
        }
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

    /// Freezes the builder.
    #[must_use]
    pub fn build(self) -> DeleteStatement {
        DeleteStatement {
            returning: self.returning.as_ref().map(order_fields),
            table: self.table,
            where_clause: self.where_clause,
        }
    }
}
