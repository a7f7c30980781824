//! SELECT statement builder.
//!
//! [`Select`] accumulates clauses fluently and freezes them into a
//! [`SelectStatement`] with [`Select::build`]. Errors raised along the way
//! (a duplicate join alias, for instance) are held until `build()` so the
//! chain stays unbroken; no statement is produced once an error occurred.

use std::collections::BTreeMap;

use super::join::{Join, JoinPlanner, JoinType, Nullability, Source};
use super::selection::{order_fields, Field, FieldMap, FieldNode, SelectedField};
use super::set_op::{SetOperation, SetOperator};
use crate::error::{BuildError, Result};
use crate::fragment::Sql;
use crate::schema::Table;

/// How the selection of a statement is shaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionMode {
    /// Derived from the sources at build time: flat for a single source,
    /// nested under each alias once any join exists.
    Tables,
    /// The caller's field map, never re-shaped.
    Explicit,
}

/// `DISTINCT` handling.
#[derive(Debug, Clone, Default)]
pub enum Distinct {
    /// No DISTINCT.
    #[default]
    None,
    /// `SELECT DISTINCT`.
    All,
    /// `SELECT DISTINCT ON (...)`.
    On(Vec<Sql>),
}

/// Row lock strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStrength {
    /// `FOR UPDATE`.
    Update,
    /// `FOR NO KEY UPDATE`.
    NoKeyUpdate,
    /// `FOR SHARE`.
    Share,
    /// `FOR KEY SHARE`.
    KeyShare,
}

impl LockStrength {
    /// Returns the SQL keywords.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Update => "FOR UPDATE",
            Self::NoKeyUpdate => "FOR NO KEY UPDATE",
            Self::Share => "FOR SHARE",
            Self::KeyShare => "FOR KEY SHARE",
        }
    }
}

/// What to do when a row is already locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockWait {
    /// Block until the lock is released.
    #[default]
    Wait,
    /// `NOWAIT`.
    NoWait,
    /// `SKIP LOCKED`.
    SkipLocked,
}

/// A row-locking clause.
#[derive(Debug, Clone)]
pub struct Locking {
    /// Lock strength.
    pub strength: LockStrength,
    /// Tables to lock; empty locks every table.
    pub of: Vec<String>,
    /// Wait policy.
    pub wait: LockWait,
}

/// A common table expression.
#[derive(Debug, Clone)]
pub struct Cte {
    /// The name.
    pub name: String,
    /// The statement.
    pub statement: SelectStatement,
}

/// A frozen SELECT statement, ready for compilation.
#[derive(Debug, Clone)]
pub struct SelectStatement {
    pub(crate) ctes: Vec<Cte>,
    pub(crate) source: Source,
    pub(crate) fields: Vec<SelectedField>,
    pub(crate) joins: Vec<Join>,
    pub(crate) nullability: BTreeMap<String, Nullability>,
    pub(crate) where_clause: Option<Sql>,
    pub(crate) group_by: Vec<Sql>,
    pub(crate) having: Option<Sql>,
    pub(crate) order_by: Vec<Sql>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) distinct: Distinct,
    pub(crate) locking: Option<Locking>,
    pub(crate) set_operations: Vec<SetOperation>,
    pub(crate) compound_order_by: Vec<Sql>,
    pub(crate) compound_limit: Option<u64>,
    pub(crate) compound_offset: Option<u64>,
}

impl SelectStatement {
    /// Returns the flattened selection.
    #[must_use]
    pub fn fields(&self) -> &[SelectedField] {
        &self.fields
    }

    /// Returns the dotted keys of the selection, in order.
    #[must_use]
    pub fn field_keys(&self) -> Vec<String> {
        self.fields.iter().map(SelectedField::key).collect()
    }

    /// Returns the nullability of every alias in scope.
    #[must_use]
    pub const fn nullability(&self) -> &BTreeMap<String, Nullability> {
        &self.nullability
    }

    /// Returns the joins in order.
    #[must_use]
    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    /// Returns the base source.
    #[must_use]
    pub const fn source(&self) -> &Source {
        &self.source
    }

    /// Returns every physical table the statement reads, deduplicated.
    #[must_use]
    pub fn tables(&self) -> Vec<String> {
        let mut tables = self.source.tables();
        for join in &self.joins {
            tables.extend(join.source.tables());
        }
        for cte in &self.ctes {
            tables.extend(cte.statement.tables());
        }
        for op in &self.set_operations {
            tables.extend(op.statement.tables());
        }
        tables.sort();
        tables.dedup();
        tables
    }
}

/// Fluent SELECT builder.
#[derive(Debug, Clone, Default)]
pub struct Select {
    error: Option<BuildError>,
    ctes: Vec<Cte>,
    source: Option<Source>,
    fields: Option<FieldMap>,
    planner: Option<JoinPlanner>,
    where_clause: Option<Sql>,
    group_by: Vec<Sql>,
    having: Option<Sql>,
    order_by: Vec<Sql>,
    limit: Option<u64>,
    offset: Option<u64>,
    distinct: Distinct,
    locking: Option<Locking>,
    set_operations: Vec<SetOperation>,
    compound_order_by: Vec<Sql>,
    compound_limit: Option<u64>,
    compound_offset: Option<u64>,
}

impl Select {
    /// Creates a new SELECT builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn fail(&mut self, error: BuildError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Sets the base source.
    #[must_use]
    pub fn from(mut self, source: impl Into<Source>) -> Self {
        let source = source.into();
        self.planner = Some(JoinPlanner::new(&source));
        self.source = Some(source);
        self
    }

    /// Selects an explicit field map. The map is used as given.
    #[must_use]
    pub fn fields(mut self, fields: FieldMap) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Returns the selection mode the statement will be built with.
    #[must_use]
    pub const fn mode(&self) -> SelectionMode {
        if self.fields.is_some() {
            SelectionMode::Explicit
        } else {
            SelectionMode::Tables
        }
    }

    /// Adds a common table expression.
    #[must_use]
    pub fn with_cte(mut self, name: impl Into<String>, statement: SelectStatement) -> Self {
        self.ctes.push(Cte {
            name: name.into(),
            statement,
        });
        self
    }

    /// Adds a join.
    #[must_use]
    pub fn join(mut self, source: impl Into<Source>, join_type: JoinType, on: Option<Sql>, lateral: bool) -> Self {
        let join = Join {
            source: source.into(),
            join_type,
            on,
            lateral,
        };
        match self.planner.as_mut() {
            Some(planner) => {
                if let Err(e) = planner.add_join(join) {
                    self.fail(e);
                }
            }
            None => self.fail(BuildError::MissingFrom),
        }
        self
    }

    /// Adds an INNER JOIN.
    #[must_use]
    pub fn inner_join(self, source: impl Into<Source>, on: Sql) -> Self {
        self.join(source, JoinType::Inner, Some(on), false)
    }

    /// Adds a LEFT JOIN.
    #[must_use]
    pub fn left_join(self, source: impl Into<Source>, on: Sql) -> Self {
        self.join(source, JoinType::Left, Some(on), false)
    }

    /// Adds a RIGHT JOIN.
    #[must_use]
    pub fn right_join(self, source: impl Into<Source>, on: Sql) -> Self {
        self.join(source, JoinType::Right, Some(on), false)
    }

    /// Adds a FULL JOIN.
    #[must_use]
    pub fn full_join(self, source: impl Into<Source>, on: Sql) -> Self {
        self.join(source, JoinType::Full, Some(on), false)
    }

    /// Adds a CROSS JOIN.
    #[must_use]
    pub fn cross_join(self, source: impl Into<Source>) -> Self {
        self.join(source, JoinType::Cross, None, false)
    }

    /// Adds an INNER JOIN LATERAL.
    #[must_use]
    pub fn inner_join_lateral(self, source: impl Into<Source>, on: Sql) -> Self {
        self.join(source, JoinType::Inner, Some(on), true)
    }

    /// Adds a LEFT JOIN LATERAL.
    #[must_use]
    pub fn left_join_lateral(self, source: impl Into<Source>, on: Sql) -> Self {
        self.join(source, JoinType::Left, Some(on), true)
    }

    /// Sets the WHERE clause, replacing any previous one.
    #[must_use]
    pub fn where_clause(mut self, condition: Sql) -> Self {
        self.where_clause = Some(condition);
        self
    }

    /// Adds GROUP BY terms.
    #[must_use]
    pub fn group_by(mut self, terms: impl IntoIterator<Item = Sql>) -> Self {
        self.group_by.extend(terms);
        self
    }

    /// Sets the HAVING clause.
    #[must_use]
    pub fn having(mut self, condition: Sql) -> Self {
        self.having = Some(condition);
        self
    }

    /// Adds ORDER BY terms. After a set operator they order the combined result.
    #[must_use]
    pub fn order_by(mut self, terms: impl IntoIterator<Item = Sql>) -> Self {
        if self.set_operations.is_empty() {
            self.order_by.extend(terms);
        } else {
            self.compound_order_by.extend(terms);
        }
        self
    }

    /// Sets LIMIT. After a set operator it limits the combined result.
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        if self.set_operations.is_empty() {
            self.limit = Some(limit);
        } else {
            self.compound_limit = Some(limit);
        }
        self
    }

    /// Sets OFFSET. After a set operator it offsets the combined result.
    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        if self.set_operations.is_empty() {
            self.offset = Some(offset);
        } else {
            self.compound_offset = Some(offset);
        }
        self
    }

    /// Adds DISTINCT.
    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.distinct = Distinct::All;
        self
    }

    /// Adds DISTINCT ON.
    #[must_use]
    pub fn distinct_on(mut self, terms: impl IntoIterator<Item = Sql>) -> Self {
        self.distinct = Distinct::On(terms.into_iter().collect());
        self
    }

    /// Adds a row-locking clause on every table.
    #[must_use]
    pub fn lock(self, strength: LockStrength) -> Self {
        self.lock_with(strength, &[], LockWait::Wait)
    }

    /// Adds a row-locking clause restricted to some tables.
    #[must_use]
    pub fn lock_with(mut self, strength: LockStrength, of: &[&Table], wait: LockWait) -> Self {
        self.locking = Some(Locking {
            strength,
            of: of.iter().map(|t| t.source_name().to_owned()).collect(),
            wait,
        });
        self
    }

    fn set_operation(mut self, operator: SetOperator, all: bool, statement: SelectStatement) -> Self {
        self.set_operations.push(SetOperation {
            operator,
            all,
            statement,
        });
        self
    }

    /// Adds `UNION`.
    #[must_use]
    pub fn union(self, statement: SelectStatement) -> Self {
        self.set_operation(SetOperator::Union, false, statement)
    }

    /// Adds `UNION ALL`.
    #[must_use]
    pub fn union_all(self, statement: SelectStatement) -> Self {
        self.set_operation(SetOperator::Union, true, statement)
    }

    /// Adds `INTERSECT`.
    #[must_use]
    pub fn intersect(self, statement: SelectStatement) -> Self {
        self.set_operation(SetOperator::Intersect, false, statement)
    }

    /// Adds `INTERSECT ALL`.
    #[must_use]
    pub fn intersect_all(self, statement: SelectStatement) -> Self {
        self.set_operation(SetOperator::Intersect, true, statement)
    }

    /// Adds `EXCEPT`.
    #[must_use]
    pub fn except(self, statement: SelectStatement) -> Self {
        self.set_operation(SetOperator::Except, false, statement)
    }

    /// Adds `EXCEPT ALL`.
    #[must_use]
    pub fn except_all(self, statement: SelectStatement) -> Self {
        self.set_operation(SetOperator::Except, true, statement)
    }

    /// Freezes the builder.
    pub fn build(self) -> Result<SelectStatement> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let (Some(source), Some(planner)) = (self.source, self.planner) else {
            return Err(BuildError::MissingFrom);
        };
        let (nullability, joins) = planner.into_parts();

        let fields = match &self.fields {
            Some(map) => order_fields(map),
            None => order_fields(&table_mode_fields(&source, &joins)),
        };
        if fields.is_empty() {
            return Err(BuildError::EmptySelection);
        }

        let keys: Vec<String> = fields.iter().map(SelectedField::key).collect();
        for op in &self.set_operations {
            let right = op.statement.field_keys();
            if right != keys {
                return Err(BuildError::SetOperationShapeMismatch {
                    left: keys.join(", "),
                    right: right.join(", "),
                });
            }
        }

        Ok(SelectStatement {
            ctes: self.ctes,
            source,
            fields,
            joins,
            nullability,
            where_clause: self.where_clause,
            group_by: self.group_by,
            having: self.having,
            order_by: self.order_by,
            limit: self.limit,
            offset: self.offset,
            distinct: self.distinct,
            locking: self.locking,
            set_operations: self.set_operations,
            compound_order_by: self.compound_order_by,
            compound_limit: self.compound_limit,
            compound_offset: self.compound_offset,
        })
    }
}

/// Columns a source exposes to an enclosing statement.
fn source_fields(source: &Source) -> FieldMap {
    match source {
        Source::Table(table) => FieldMap::from_table(table),
        Source::Subquery { statement, alias } => {
            let mut map = FieldMap::new();
            for field in &statement.fields {
                let node = match &field.field {
                    Field::Column(column) => Field::Column(column.with_source(alias.clone())),
                    Field::Aliased { alias: name, .. } => Field::Raw(Sql::qualified(alias, name)),
                    Field::Raw(_) => continue,
                };
                if let Some(name) = field.output_name() {
                    map.insert(name.to_owned(), FieldNode::Field(node));
                }
            }
            map
        }
        Source::Derived { .. } | Source::Cte(_) => FieldMap::new(),
    }
}

fn table_mode_fields(source: &Source, joins: &[Join]) -> FieldMap {
    if joins.is_empty() {
        return source_fields(source);
    }
    let mut map = FieldMap::new();
    for src in std::iter::once(source).chain(joins.iter().map(|j| &j.source)) {
        let nested = source_fields(src);
        if !nested.is_empty() {
            map.insert(src.alias().to_owned(), FieldNode::Nested(nested));
        }
    }
    map
}
