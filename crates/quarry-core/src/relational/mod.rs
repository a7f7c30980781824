//! Relational queries.
//!
//! Relations are declared in an index-based [`RelationRegistry`] (logical
//! table name to table, `(table, relation)` to descriptor) and resolved only
//! when a query is lowered, so mutually recursive relations need no
//! particular declaration order. A [`FetchNode`] tree describes what to load;
//! [`RelationalQuery`] lowers it into one statement with a lateral subquery
//! per requested relation.

mod mapping;
mod planner;

use std::collections::BTreeMap;
use std::fmt;

pub use mapping::{map_relational_row, FieldKind, RelationalField};
pub use planner::RelationalQuery;

use crate::error::{BuildError, Result};
use crate::fragment::Sql;
use crate::schema::{ColumnRef, Table};

/// How many related rows a relation yields per parent row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// At most one.
    One,
    /// Any number.
    Many,
}

/// A declared relation.
#[derive(Debug, Clone)]
pub struct Relation {
    cardinality: Cardinality,
    target: String,
    local: Vec<String>,
    referenced: Vec<String>,
    relation_name: Option<String>,
}

impl Relation {
    /// Declares a to-one relation to a logical table.
    #[must_use]
    pub fn one(target: impl Into<String>) -> Self {
        Self::new(Cardinality::One, target.into())
    }

    /// Declares a to-many relation to a logical table.
    ///
    /// Without [`Relation::on`], its columns are inferred from the reverse
    /// `one` relation declared on the target table.
    #[must_use]
    pub fn many(target: impl Into<String>) -> Self {
        Self::new(Cardinality::Many, target.into())
    }

    const fn new(cardinality: Cardinality, target: String) -> Self {
        Self {
            cardinality,
            target,
            local: Vec::new(),
            referenced: Vec::new(),
            relation_name: None,
        }
    }

    /// Sets the local and referenced key columns, pairwise.
    #[must_use]
    pub fn on(mut self, local: &[&str], referenced: &[&str]) -> Self {
        self.local = local.iter().map(|c| (*c).to_owned()).collect();
        self.referenced = referenced.iter().map(|c| (*c).to_owned()).collect();
        self
    }

    /// Names the relation, to pair it with its reverse when a table has
    /// several relations to the same target.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.relation_name = Some(name.into());
        self
    }

    /// Returns the cardinality.
    #[must_use]
    pub const fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// Returns the target logical table name.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }
}

/// A relation with its key columns resolved.
#[derive(Debug, Clone)]
pub struct ResolvedRelation {
    /// Cardinality.
    pub cardinality: Cardinality,
    /// Target logical table name.
    pub target: String,
    /// Target table.
    pub table: Table,
    /// Key columns on the source table.
    pub local: Vec<String>,
    /// Key columns on the target table.
    pub referenced: Vec<String>,
}

/// Schema graph: logical table names and the relations between them.
#[derive(Debug, Clone, Default)]
pub struct RelationRegistry {
    tables: BTreeMap<String, Table>,
    relations: BTreeMap<String, BTreeMap<String, Relation>>,
}

impl RelationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table under a logical name.
    #[must_use]
    pub fn register_table(mut self, name: impl Into<String>, table: &Table) -> Self {
        self.tables.insert(name.into(), table.clone());
        self
    }

    /// Registers a relation on a logical table.
    #[must_use]
    pub fn register_relation(mut self, table: impl Into<String>, name: impl Into<String>, relation: Relation) -> Self {
        self.relations
            .entry(table.into())
            .or_default()
            .insert(name.into(), relation);
        self
    }

    /// Looks up a table by logical name.
    pub fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| BuildError::UnknownTable(name.to_owned()))
    }

    /// Looks up a declared relation.
    pub fn relation(&self, table: &str, name: &str) -> Result<&Relation> {
        self.relations
            .get(table)
            .and_then(|relations| relations.get(name))
            .ok_or_else(|| BuildError::UnknownRelation {
                table: table.to_owned(),
                relation: name.to_owned(),
            })
    }

    /// Returns the logical table names.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Resolves a relation's key columns, inferring them from the reverse
    /// relation when they were not declared.
    pub fn resolve(&self, table: &str, name: &str) -> Result<ResolvedRelation> {
        let relation = self.relation(table, name)?;
        let target = self.table(&relation.target)?;
        let source = self.table(table)?;

        let (local, referenced) = if relation.local.is_empty() {
            let reverse = self.reverse_of(table, name, relation)?;
            (reverse.referenced.clone(), reverse.local.clone())
        } else {
            (relation.local.clone(), relation.referenced.clone())
        };
        if local.len() != referenced.len() {
            return Err(BuildError::RelationKeyMismatch {
                table: table.to_owned(),
                relation: name.to_owned(),
                local: local.len(),
                referenced: referenced.len(),
            });
        }

        for column in &local {
            source.try_col(column)?;
        }
        for column in &referenced {
            target.try_col(column)?;
        }

        Ok(ResolvedRelation {
            cardinality: relation.cardinality,
            target: relation.target.clone(),
            table: target.clone(),
            local,
            referenced,
        })
    }

    fn reverse_of(&self, table: &str, name: &str, relation: &Relation) -> Result<&Relation> {
        let ambiguous = || BuildError::AmbiguousRelation {
            table: table.to_owned(),
            relation: name.to_owned(),
        };
        let candidates: Vec<&Relation> = self
            .relations
            .get(&relation.target)
            .into_iter()
            .flat_map(BTreeMap::values)
            .filter(|r| r.cardinality == Cardinality::One && r.target == table && !r.local.is_empty())
            .filter(|r| match &relation.relation_name {
                Some(wanted) => r.relation_name.as_ref() == Some(wanted),
                None => true,
            })
            .collect();
        match candidates.as_slice() {
            [single] => Ok(*single),
            _ => Err(ambiguous()),
        }
    }
}

/// Which columns a fetch level returns.
#[derive(Debug, Clone, Default)]
pub enum ColumnSelection {
    /// Every column, in declaration order.
    #[default]
    All,
    /// Only these columns, in the given order.
    Include(Vec<String>),
    /// Every column except these.
    Exclude(Vec<String>),
}

/// The columns of one fetch level, bound to that level's alias.
///
/// Closures on a [`FetchNode`] receive the scope of their own level, so
/// they never need to know the alias the planner picked.
#[derive(Debug, Clone)]
pub struct Scope {
    table: Table,
}

impl Scope {
    pub(crate) fn new(table: Table) -> Self {
        Self { table }
    }

    /// Returns the alias of this level.
    #[must_use]
    pub fn alias(&self) -> &str {
        self.table.source_name()
    }

    /// Returns the aliased table.
    #[must_use]
    pub const fn table(&self) -> &Table {
        &self.table
    }

    /// Looks up a column of this level.
    pub fn try_col(&self, name: &str) -> Result<ColumnRef> {
        self.table.try_col(name)
    }

    /// Looks up a column of this level.
    ///
    /// # Panics
    ///
    /// Panics if the table has no such column.
    #[must_use]
    pub fn col(&self, name: &str) -> ColumnRef {
        self.table.col(name)
    }

    /// Rebinds a column of this level's table to the level's alias. Columns
    /// of other tables are returned unchanged.
    #[must_use]
    pub fn resolve(&self, column: &ColumnRef) -> ColumnRef {
        if column.table_name() == self.table.name() {
            column.with_source(self.alias())
        } else {
            column.clone()
        }
    }

    /// Applies [`Scope::resolve`] to every column in a fragment.
    #[must_use]
    pub fn resolve_sql(&self, sql: &Sql) -> Sql {
        sql.map_columns(|column| Sql::column(self.resolve(column)))
    }
}

type ScopeFn<T> = Box<dyn Fn(&Scope) -> T + Send + Sync>;

/// One level of a relational fetch request.
#[derive(Default)]
pub struct FetchNode {
    pub(crate) columns: ColumnSelection,
    pub(crate) filter: Option<ScopeFn<Sql>>,
    pub(crate) order_by: Option<ScopeFn<Vec<Sql>>>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) extras: Vec<(String, ScopeFn<Sql>)>,
    pub(crate) with: Vec<(String, FetchNode)>,
}

impl FetchNode {
    /// Creates a node selecting every column.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects only these columns.
    #[must_use]
    pub fn include(mut self, columns: &[&str]) -> Self {
        self.columns = ColumnSelection::Include(columns.iter().map(|c| (*c).to_owned()).collect());
        self
    }

    /// Selects every column except these.
    #[must_use]
    pub fn exclude(mut self, columns: &[&str]) -> Self {
        self.columns = ColumnSelection::Exclude(columns.iter().map(|c| (*c).to_owned()).collect());
        self
    }

    /// Sets the column selection.
    #[must_use]
    pub fn columns(mut self, columns: ColumnSelection) -> Self {
        self.columns = columns;
        self
    }

    /// Filters rows at this level.
    #[must_use]
    pub fn filter(mut self, f: impl Fn(&Scope) -> Sql + Send + Sync + 'static) -> Self {
        self.filter = Some(Box::new(f));
        self
    }

    /// Orders rows at this level.
    #[must_use]
    pub fn order_by(mut self, f: impl Fn(&Scope) -> Vec<Sql> + Send + Sync + 'static) -> Self {
        self.order_by = Some(Box::new(f));
        self
    }

    /// Limits rows at this level.
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips rows at this level.
    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Adds a computed field.
    #[must_use]
    pub fn extra(mut self, name: impl Into<String>, f: impl Fn(&Scope) -> Sql + Send + Sync + 'static) -> Self {
        self.extras.push((name.into(), Box::new(f)));
        self
    }

    /// Loads a relation.
    #[must_use]
    pub fn with(mut self, relation: impl Into<String>, node: Self) -> Self {
        self.with.push((relation.into(), node));
        self
    }
}

impl fmt::Debug for FetchNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let extras: Vec<&str> = self.extras.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("FetchNode")
            .field("columns", &self.columns)
            .field("filter", &self.filter.is_some())
            .field("order_by", &self.order_by.is_some())
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .field("extras", &extras)
            .field("with", &self.with)
            .finish()
    }
}
