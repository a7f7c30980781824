//! Join sources and the nullability planner.

use std::collections::BTreeMap;

use super::select::SelectStatement;
use crate::error::{BuildError, Result};
use crate::fragment::Sql;
use crate::schema::Table;

/// Join type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    /// INNER JOIN.
    Inner,
    /// LEFT JOIN.
    Left,
    /// RIGHT JOIN.
    Right,
    /// FULL JOIN.
    Full,
    /// CROSS JOIN.
    Cross,
}

impl JoinType {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
            Self::Full => "FULL JOIN",
            Self::Cross => "CROSS JOIN",
        }
    }
}

/// Whether the columns of a source may come back NULL because of outer joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nullability {
    /// Columns keep their declared nullability.
    NotNull,
    /// Every column may be NULL.
    Nullable,
}

/// Something a statement can select from or join.
#[derive(Debug, Clone)]
pub enum Source {
    /// A table, optionally aliased.
    Table(Table),
    /// A built select statement under an alias.
    Subquery {
        /// The statement.
        statement: Box<SelectStatement>,
        /// The alias.
        alias: String,
    },
    /// A raw SQL source (view, function call) under an alias.
    Derived {
        /// The SQL.
        sql: Sql,
        /// The alias.
        alias: String,
    },
    /// A common table expression declared with `with_cte`.
    Cte(String),
}

impl Source {
    /// Creates a subquery source.
    #[must_use]
    pub fn subquery(statement: SelectStatement, alias: impl Into<String>) -> Self {
        Self::Subquery {
            statement: Box::new(statement),
            alias: alias.into(),
        }
    }

    /// Creates a raw SQL source.
    #[must_use]
    pub fn derived(sql: Sql, alias: impl Into<String>) -> Self {
        Self::Derived {
            sql,
            alias: alias.into(),
        }
    }

    /// Returns the name this source is referenced by in the statement.
    #[must_use]
    pub fn alias(&self) -> &str {
        match self {
            Self::Table(table) => table.source_name(),
            Self::Subquery { alias, .. } | Self::Derived { alias, .. } => alias,
            Self::Cte(name) => name,
        }
    }

    /// Returns the physical tables this source reads.
    #[must_use]
    pub fn tables(&self) -> Vec<String> {
        match self {
            Self::Table(table) => vec![table.name().to_owned()],
            Self::Subquery { statement, .. } => statement.tables(),
            Self::Derived { .. } | Self::Cte(_) => Vec::new(),
        }
    }
}

impl From<&Table> for Source {
    fn from(table: &Table) -> Self {
        Self::Table(table.clone())
    }
}

impl From<Table> for Source {
    fn from(table: Table) -> Self {
        Self::Table(table)
    }
}

/// A join entry.
#[derive(Debug, Clone)]
pub struct Join {
    /// The joined source.
    pub source: Source,
    /// The join type.
    pub join_type: JoinType,
    /// The join condition; `None` only for cross joins.
    pub on: Option<Sql>,
    /// Whether the join is `LATERAL`.
    pub lateral: bool,
}

/// Tracks the aliases in scope and their nullability.
#[derive(Debug, Clone)]
pub struct JoinPlanner {
    nullability: BTreeMap<String, Nullability>,
    joins: Vec<Join>,
}

impl JoinPlanner {
    /// Creates a planner with the base source in scope.
    #[must_use]
    pub fn new(base: &Source) -> Self {
        let mut nullability = BTreeMap::new();
        nullability.insert(base.alias().to_owned(), Nullability::NotNull);
        Self {
            nullability,
            joins: Vec::new(),
        }
    }

    /// Adds a join, updating nullability.
    ///
    /// | join  | new alias | existing aliases |
    /// |-------|-----------|------------------|
    /// | inner | not-null  | unchanged        |
    /// | left  | nullable  | unchanged        |
    /// | right | not-null  | all nullable     |
    /// | full  | nullable  | all nullable     |
    ///
    /// Cross joins behave like inner joins.
    pub fn add_join(&mut self, join: Join) -> Result<()> {
        let alias = join.source.alias().to_owned();
        if self.nullability.contains_key(&alias) {
            return Err(BuildError::DuplicateAlias(alias));
        }

        let new = match join.join_type {
            JoinType::Inner | JoinType::Cross => Nullability::NotNull,
            JoinType::Left => Nullability::Nullable,
            JoinType::Right => {
                self.set_all_nullable();
                Nullability::NotNull
            }
            JoinType::Full => {
                self.set_all_nullable();
                Nullability::Nullable
            }
        };
        self.nullability.insert(alias, new);
        self.joins.push(join);
        Ok(())
    }

    fn set_all_nullable(&mut self) {
        for value in self.nullability.values_mut() {
            *value = Nullability::Nullable;
        }
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

    pub(crate) fn into_parts(self) -> (BTreeMap<String, Nullability>, Vec<Join>) {
        (self.nullability, self.joins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnDef;

    fn table(name: &str) -> Table {
        Table::new(name)
            .column(ColumnDef::new("id", "integer"))
            .build()
    }

    fn join(name: &str, join_type: JoinType) -> Join {
        Join {
            source: Source::from(table(name)),
            join_type,
            on: Some(Sql::raw("TRUE")),
            lateral: false,
        }
    }

    #[test]
    fn test_inner_left_right_fold() {
        let mut planner = JoinPlanner::new(&Source::from(table("a")));
        planner.add_join(join("b", JoinType::Inner)).unwrap();
        planner.add_join(join("c", JoinType::Left)).unwrap();
        planner.add_join(join("d", JoinType::Right)).unwrap();

        let n = planner.nullability();
        assert_eq!(n["a"], Nullability::Nullable);
        assert_eq!(n["b"], Nullability::Nullable);
        assert_eq!(n["c"], Nullability::Nullable);
        assert_eq!(n["d"], Nullability::NotNull);
        assert_eq!(planner.joins().len(), 3);
    }

    #[test]
    fn test_full_then_inner_keeps_others_nullable() {
        let mut planner = JoinPlanner::new(&Source::from(table("a")));
        planner.add_join(join("b", JoinType::Full)).unwrap();
        planner.add_join(join("c", JoinType::Inner)).unwrap();

        let n = planner.nullability();
        assert_eq!(n["a"], Nullability::Nullable);
        assert_eq!(n["b"], Nullability::Nullable);
        assert_eq!(n["c"], Nullability::NotNull);
    }

    #[test]
    fn test_duplicate_alias() {
        let mut planner = JoinPlanner::new(&Source::from(table("a")));
        planner.add_join(join("b", JoinType::Left)).unwrap();
        assert_eq!(
            planner.add_join(join("b", JoinType::Inner)),
            Err(BuildError::DuplicateAlias(String::from("b")))
        );
        assert_eq!(
            planner.add_join(join("a", JoinType::Inner)),
            Err(BuildError::DuplicateAlias(String::from("a")))
        );
    }

    #[test]
    fn test_aliased_self_join() {
        let users = table("users");
        let mut planner = JoinPlanner::new(&Source::from(&users));
        let manager = Join {
            source: Source::from(users.aliased("manager")),
            join_type: JoinType::Left,
            on: Some(Sql::raw("TRUE")),
            lateral: false,
        };
        planner.add_join(manager).unwrap();
        assert_eq!(planner.nullability()["manager"], Nullability::Nullable);
    }
}
