//! INSERT statement builder.
//!
//! Values are resolved when the statement is built: for every row and every
//! written column, in declaration order, the caller's value wins, then the
//! column's insert generator, then its on-update generator when it has no
//! static default, and finally the database default. Generators therefore
//! run once per build and compiling the frozen statement is repeatable.

use super::selection::{order_fields, FieldMap, SelectedField};
use crate::error::{BuildError, Result};
use crate::fragment::{SetValue, Sql};
use crate::schema::{ColumnDef, ColumnRef, Table};
use crate::value::ToSqlValue;

/// The values of one inserted row, keyed by column name.
#[derive(Debug, Clone, Default)]
pub struct Row {
    values: Vec<(String, SetValue)>,
}

impl Row {
    /// Creates an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a column to a bound value.
    #[must_use]
    pub fn set<T: ToSqlValue>(self, column: &str, value: T) -> Self {
        self.set_value(column, SetValue::value(value))
    }

    /// Sets a column to a SQL expression.
    #[must_use]
    pub fn set_sql(self, column: &str, sql: Sql) -> Self {
        self.set_value(column, SetValue::Sql(sql))
    }

    /// Sets a column.
    #[must_use]
    pub fn set_value(mut self, column: &str, value: SetValue) -> Self {
        if let Some(entry) = self.values.iter_mut().find(|(k, _)| k == column) {
            entry.1 = value;
        } else {
            self.values.push((column.to_owned(), value));
        }
        self
    }

    fn get(&self, column: &str) -> Option<&SetValue> {
        self.values.iter().find(|(k, _)| k == column).map(|(_, v)| v)
    }
}

/// The `DO UPDATE` half of an upsert.
#[derive(Debug, Clone)]
pub struct ConflictUpdate {
    target: Vec<ColumnRef>,
    target_where: Option<Sql>,
    set: Vec<(String, SetValue)>,
    set_where: Option<Sql>,
}

impl ConflictUpdate {
    /// Creates a conflict update on the given target columns.
    #[must_use]
    pub fn new(target: &[ColumnRef]) -> Self {
        Self {
            target: target.to_vec(),
            target_where: None,
            set: Vec::new(),
            set_where: None,
        }
    }

    /// Sets a column to a bound value.
    #[must_use]
    pub fn set<T: ToSqlValue>(mut self, column: &str, value: T) -> Self {
        self.set.push((column.to_owned(), SetValue::value(value)));
        self
    }

    /// Sets a column to a SQL expression, e.g. [`excluded`](super::excluded).
    #[must_use]
    pub fn set_sql(mut self, column: &str, sql: Sql) -> Self {
        self.set.push((column.to_owned(), SetValue::Sql(sql)));
        self
    }

    /// Restricts the conflict target to a partial index predicate.
    #[must_use]
    pub fn target_where(mut self, condition: Sql) -> Self {
        self.target_where = Some(condition);
        self
    }

    /// Only updates rows matching the condition.
    #[must_use]
    pub fn set_where(mut self, condition: Sql) -> Self {
        self.set_where = Some(condition);
        self
    }
}

#[derive(Debug, Clone)]
enum OnConflictConfig {
    DoNothing(Vec<ColumnRef>),
    DoUpdate(ConflictUpdate),
}

/// A resolved value slot of an inserted row.
#[derive(Debug, Clone)]
pub enum InsertValue {
    /// A parameter or SQL expression.
    Sql(Sql),
    /// The column's database default.
    Default,
}

/// A resolved conflict clause.
#[derive(Debug, Clone)]
pub enum OnConflict {
    /// `ON CONFLICT [(target)] DO NOTHING`.
    DoNothing {
        /// Target column names; may be empty.
        target: Vec<String>,
    },
    /// `ON CONFLICT (target) [WHERE ..] DO UPDATE SET .. [WHERE ..]`.
    DoUpdate {
        /// Target column names.
        target: Vec<String>,
        /// Partial index predicate.
        target_where: Option<Sql>,
        /// Assignments, in column declaration order.
        set: Vec<(String, Sql)>,
        /// Update filter.
        set_where: Option<Sql>,
    },
}

/// A frozen INSERT statement.
#[derive(Debug, Clone)]
pub struct InsertStatement {
    pub(crate) table: Table,
    pub(crate) columns: Vec<String>,
    /// Static defaults per column, used where `DEFAULT` can't be written.
    pub(crate) static_defaults: Vec<Option<Sql>>,
    pub(crate) rows: Vec<Vec<InsertValue>>,
    pub(crate) on_conflict: Option<OnConflict>,
    pub(crate) returning: Option<Vec<SelectedField>>,
}

impl InsertStatement {
    /// Returns the written column names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the resolved rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<InsertValue>] {
        &self.rows
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

/// Fluent INSERT builder.
#[derive(Debug, Clone)]
pub struct Insert {
    table: Table,
    rows: Vec<Row>,
    on_conflict: Option<OnConflictConfig>,
    returning: Option<FieldMap>,
}

impl Insert {
    /// Starts an insert into a table.
    #[must_use]
    pub fn into(table: &Table) -> Self {
        Self {
            table: table.clone(),
            rows: Vec::new(),
            on_conflict: None,
            returning: None,
        }
    }

    /// Adds a row.
    #[must_use]
    pub fn value(mut self, row: Row) -> Self {
        self.rows.push(row);
        self
    }

    /// Adds rows.
    #[must_use]
    pub fn values(mut self, rows: impl IntoIterator<Item = Row>) -> Self {
        self.rows.extend(rows);
        self
    }

    /// Adds `ON CONFLICT DO NOTHING`, optionally on a target.
    #[must_use]
    pub fn on_conflict_do_nothing(mut self, target: &[ColumnRef]) -> Self {
        self.on_conflict = Some(OnConflictConfig::DoNothing(target.to_vec()));
        self
    }

    /// Adds `ON CONFLICT ... DO UPDATE`.
    #[must_use]
    pub fn on_conflict_do_update(mut self, update: ConflictUpdate) -> Self {
        self.on_conflict = Some(OnConflictConfig::DoUpdate(update));
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

    /// Freezes the builder, resolving every value slot.
    pub fn build(self) -> Result<InsertStatement> {
        if self.rows.is_empty() {
            return Err(BuildError::NoRows(self.table.name().to_owned()));
        }
        for row in &self.rows {
            for (name, _) in &row.values {
                writable_col(&self.table, name)?;
            }
        }

        let written: Vec<&ColumnDef> = self
            .table
            .column_defs()
            .iter()
            .map(|def| &**def)
            .filter(|def| !def.is_generated())
            .collect();

        let rows = self
            .rows
            .iter()
            .map(|row| {
                written
                    .iter()
                    .map(|def| resolve_insert_value(def, row.get(def.name())))
                    .collect()
            })
            .collect();

        let on_conflict = match self.on_conflict {
            None => None,
            Some(OnConflictConfig::DoNothing(target)) => Some(OnConflict::DoNothing {
                target: target.iter().map(|c| c.name().to_owned()).collect(),
            }),
            Some(OnConflictConfig::DoUpdate(update)) => {
                if update.target.is_empty() {
                    return Err(BuildError::EmptyConflictTarget);
                }
                Some(OnConflict::DoUpdate {
                    target: update.target.iter().map(|c| c.name().to_owned()).collect(),
                    target_where: update.target_where,
                    set: resolve_update_set(&self.table, &update.set)?,
                    set_where: update.set_where,
                })
            }
        };

        Ok(InsertStatement {
            columns: written.iter().map(|def| def.name().to_owned()).collect(),
            static_defaults: written.iter().map(|def| def.default_value().cloned()).collect(),
            rows,
            on_conflict,
            returning: self.returning.as_ref().map(order_fields),
            table: self.table,
        })
    }
}

/// Rejects unknown columns and columns the database generates.
fn writable_col(table: &Table, name: &str) -> Result<()> {
    if table.try_col(name)?.def().is_generated() {
        return Err(BuildError::GeneratedColumn {
            table: table.name().to_owned(),
            column: name.to_owned(),
        });
    }
    Ok(())
}

fn resolve_insert_value(def: &ColumnDef, supplied: Option<&SetValue>) -> InsertValue {
    if let Some(value) = supplied {
        return InsertValue::Sql(value.clone().into_sql(def.tag()));
    }
    if let Some(generate) = def.default_generator() {
        return InsertValue::Sql(generate().into_sql(def.tag()));
    }
    if let (Some(generate), None) = (def.on_update_generator(), def.default_value()) {
        return InsertValue::Sql(generate().into_sql(def.tag()));
    }
    InsertValue::Default
}

/// Builds a SET list: patched columns plus every column with an on-update
/// generator, in declaration order.
pub(crate) fn resolve_update_set(table: &Table, patch: &[(String, SetValue)]) -> Result<Vec<(String, Sql)>> {
    for (name, _) in patch {
        writable_col(table, name)?;
    }

    let mut set = Vec::new();
    for def in table.column_defs() {
        let patched = patch.iter().rev().find(|(k, _)| k == def.name()).map(|(_, v)| v);
        let value = match (patched, def.on_update_generator()) {
            (Some(value), _) => value.clone(),
            (None, Some(generate)) => generate(),
            (None, None) => continue,
        };
        set.push((def.name().to_owned(), value.into_sql(def.tag())));
    }

    if set.is_empty() {
        return Err(BuildError::EmptyUpdateSet(table.name().to_owned()));
    }
    Ok(set)
}
