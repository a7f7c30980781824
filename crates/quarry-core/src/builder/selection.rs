//! Selection model.
//!
//! A [`FieldMap`] is an insertion-ordered tree whose leaves are columns or
//! SQL expressions. [`order_fields`] flattens it depth-first into the
//! positional list every other stage relies on: result columns, set
//! operator shape checks and JSON array positions all follow this order.

use crate::fragment::Sql;
use crate::schema::{ColumnRef, Table};

/// A selected leaf.
#[derive(Debug, Clone)]
pub enum Field {
    /// A table column.
    Column(ColumnRef),
    /// A raw SQL expression, rendered as is.
    Raw(Sql),
    /// A SQL expression rendered with `AS "alias"`.
    Aliased {
        /// The expression.
        sql: Sql,
        /// The output column name.
        alias: String,
    },
}

impl Field {
    /// Creates an aliased expression.
    #[must_use]
    pub fn aliased(sql: Sql, alias: impl Into<String>) -> Self {
        Self::Aliased {
            sql,
            alias: alias.into(),
        }
    }
}

impl From<ColumnRef> for Field {
    fn from(column: ColumnRef) -> Self {
        Self::Column(column)
    }
}

impl From<Sql> for Field {
    fn from(sql: Sql) -> Self {
        Self::Raw(sql)
    }
}

/// A node of a field map: a leaf or a nested bucket.
#[derive(Debug, Clone)]
pub enum FieldNode {
    /// A leaf field.
    Field(Field),
    /// A nested map, typically all columns of one joined table.
    Nested(FieldMap),
}

/// An insertion-ordered, possibly nested, mapping of result keys to fields.
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    entries: Vec<(String, FieldNode)>,
}

impl FieldMap {
    /// Creates an empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Creates a flat map of every column of a table, keyed by column name.
    #[must_use]
    pub fn from_table(table: &Table) -> Self {
        let mut map = Self::new();
        for column in table.columns() {
            map.insert(column.name().to_owned(), FieldNode::Field(Field::Column(column)));
        }
        map
    }

    /// Adds a leaf field.
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, field: impl Into<Field>) -> Self {
        self.insert(key.into(), FieldNode::Field(field.into()));
        self
    }

    /// Adds a nested map.
    #[must_use]
    pub fn nested(mut self, key: impl Into<String>, map: Self) -> Self {
        self.insert(key.into(), FieldNode::Nested(map));
        self
    }

    /// Inserts a node. An existing key keeps its position and gets the new node.
    pub fn insert(&mut self, key: String, node: FieldNode) {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = node;
        } else {
            self.entries.push((key, node));
        }
    }

    /// Returns whether the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over top-level entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldNode)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// A flattened selection entry.
#[derive(Debug, Clone)]
pub struct SelectedField {
    /// Keys from the root of the field map down to this leaf.
    pub path: Vec<String>,
    /// The leaf.
    pub field: Field,
}

impl SelectedField {
    /// Returns the path joined with `.`.
    #[must_use]
    pub fn key(&self) -> String {
        self.path.join(".")
    }

    /// Returns whether the field renders with `AS "alias"`.
    #[must_use]
    pub const fn is_aliased(&self) -> bool {
        matches!(self.field, Field::Aliased { .. })
    }

    /// Returns the alias of an aliased field.
    #[must_use]
    pub fn field_alias(&self) -> Option<&str> {
        match &self.field {
            Field::Aliased { alias, .. } => Some(alias),
            _ => None,
        }
    }

    /// Returns the name this field has in the result set, if it can be
    /// referenced from an enclosing query.
    #[must_use]
    pub fn output_name(&self) -> Option<&str> {
        match &self.field {
            Field::Column(column) => Some(column.name()),
            Field::Aliased { alias, .. } => Some(alias),
            Field::Raw(_) => None,
        }
    }
}

/// Flattens a field map depth-first, preserving insertion order.
#[must_use]
pub fn order_fields(map: &FieldMap) -> Vec<SelectedField> {
    fn walk(map: &FieldMap, prefix: &[String], out: &mut Vec<SelectedField>) {
        for (key, node) in &map.entries {
            let mut path = prefix.to_vec();
            path.push(key.clone());
            match node {
                FieldNode::Field(field) => out.push(SelectedField {
                    path,
                    field: field.clone(),
                }),
                FieldNode::Nested(nested) => walk(nested, &path, out),
            }
        }
    }

    let mut out = Vec::new();
    walk(map, &[], &mut out);
    out
}
