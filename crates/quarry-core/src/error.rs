//! Build-time errors.
//!
//! Every error in this module is raised while a statement is assembled or
//! compiled, before any SQL leaves the crate. They describe programmer
//! mistakes and are never worth retrying.

use thiserror::Error;

/// Errors raised while building or compiling a statement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// A selected column belongs to a table that is neither the base table
    /// nor a joined alias.
    #[error("field '{path}' references column '{column}' of table '{table}', which is not part of the query; did you forget to join it?")]
    ColumnNotInScope {
        /// Dotted path of the offending selection entry.
        path: String,
        /// Table or alias the column belongs to.
        table: String,
        /// Column name.
        column: String,
    },

    /// Two sources in one statement share an alias.
    #[error("alias '{0}' is already used in this query")]
    DuplicateAlias(String),

    /// Set operator operands expose different selections.
    #[error("set operator operands must select the same fields in the same order: [{left}] vs [{right}]")]
    SetOperationShapeMismatch {
        /// Field keys of the left operand.
        left: String,
        /// Field keys of the right operand.
        right: String,
    },

    /// Nothing would be selected.
    #[error("no fields selected")]
    EmptySelection,

    /// A select was built without a `FROM` source.
    #[error("select has no FROM source")]
    MissingFrom,

    /// A relational fetch level selects no columns, relations or extras.
    #[error("no fields selected for table '{table}' (alias '{alias}')")]
    NoFieldsSelected {
        /// Table name.
        table: String,
        /// Alias at that nesting level.
        alias: String,
    },

    /// `ON CONFLICT` was given an empty target.
    #[error("ON CONFLICT target must name at least one column")]
    EmptyConflictTarget,

    /// An update (or conflict update) has nothing to set.
    #[error("no values to set for table '{0}'")]
    EmptyUpdateSet(String),

    /// A column name does not exist on the table.
    #[error("table '{table}' has no column '{column}'")]
    UnknownColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// A logical table name is not registered.
    #[error("unknown table '{0}'")]
    UnknownTable(String),

    /// A relation name is not declared on the table.
    #[error("table '{table}' has no relation '{relation}'")]
    UnknownRelation {
        /// Table logical name.
        table: String,
        /// Relation name.
        relation: String,
    },

    /// A `many` relation could not be matched to a single reverse relation.
    #[error("cannot infer the reverse of relation '{relation}' on table '{table}'; declare its columns or name it")]
    AmbiguousRelation {
        /// Table logical name.
        table: String,
        /// Relation name.
        relation: String,
    },

    /// A value was supplied for a column the database computes itself.
    #[error("column '{column}' of table '{table}' is generated and cannot be written")]
    GeneratedColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// A relation declares a different number of local and referenced keys.
    #[error("relation '{relation}' on table '{table}' pairs {local} local key(s) with {referenced} referenced key(s)")]
    RelationKeyMismatch {
        /// Table logical name.
        table: String,
        /// Relation name.
        relation: String,
        /// Number of local key columns.
        local: usize,
        /// Number of referenced key columns.
        referenced: usize,
    },

    /// The target dialect cannot express a requested clause.
    #[error("{feature} is not supported by the {dialect} dialect")]
    Unsupported {
        /// Dialect name.
        dialect: &'static str,
        /// Feature description.
        feature: &'static str,
    },

    /// An insert has no rows.
    #[error("insert into '{0}' has no rows")]
    NoRows(String),
}

impl BuildError {
    pub(crate) fn unsupported(dialect: &dyn crate::Dialect, feature: &'static str) -> Self {
        Self::Unsupported {
            dialect: dialect.name(),
            feature,
        }
    }
}

/// Errors raised while mapping a relational result row back to JSON.
#[derive(Debug, Error)]
pub enum MappingError {
    /// The row has a different number of columns than the plan selected.
    #[error("row has {actual} columns but the plan selected {expected}")]
    RowShape {
        /// Number of selected fields.
        expected: usize,
        /// Number of values in the row.
        actual: usize,
    },

    /// A relation column did not contain valid JSON.
    #[error("invalid JSON in relation column: {0}")]
    Json(#[from] serde_json::Error),

    /// A relation column held something other than JSON text, an array or NULL.
    #[error("unexpected value for relation '{key}'")]
    UnexpectedValue {
        /// Relation key.
        key: String,
    },
}

/// Result type alias for statement building.
pub type Result<T> = std::result::Result<T, BuildError>;
