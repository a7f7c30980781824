//! SQL fragment primitive.
//!
//! Every statement is assembled as a [`Sql`] tree of chunks and rendered
//! exactly once against a [`Dialect`]. Rendering walks the chunks in order
//! with a running placeholder counter, so nested fragments can be composed
//! freely without renumbering parameters.

use serde::Serialize;

use crate::dialect::Dialect;
use crate::schema::ColumnRef;
use crate::value::{SqlValue, ToSqlValue, TypeTag};

/// A bound parameter and its driver type hint.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// The value.
    pub value: SqlValue,
    /// The type hint handed to the driver.
    pub tag: TypeTag,
}

/// One piece of a SQL fragment.
#[derive(Debug, Clone)]
pub enum Chunk {
    /// Raw SQL text, emitted verbatim.
    Text(String),
    /// An identifier, escaped by the dialect.
    Ident(String),
    /// A string literal, escaped by the dialect.
    Literal(String),
    /// A bound parameter.
    Param(Param),
    /// A column, rendered as `source.name`.
    Column(ColumnRef),
}

/// A composable SQL fragment.
#[derive(Debug, Clone, Default)]
pub struct Sql {
    chunks: Vec<Chunk>,
}

impl Sql {
    /// Creates an empty fragment.
    #[must_use]
    pub const fn new() -> Self {
        Self { chunks: Vec::new() }
    }

    /// Creates a fragment from raw SQL text.
    ///
    /// **Warning**: Only use this for SQL that doesn't contain user input.
    #[must_use]
    pub fn raw(text: impl Into<String>) -> Self {
        Self {
            chunks: vec![Chunk::Text(text.into())],
        }
    }

    /// Creates an identifier fragment.
    #[must_use]
    pub fn ident(name: impl Into<String>) -> Self {
        Self {
            chunks: vec![Chunk::Ident(name.into())],
        }
    }

    /// Creates a string literal fragment.
    #[must_use]
    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            chunks: vec![Chunk::Literal(value.into())],
        }
    }

    /// Creates a parameter fragment without a type hint.
    #[must_use]
    pub fn param<T: ToSqlValue>(value: T) -> Self {
        Self::typed_param(value.to_sql_value(), TypeTag::None)
    }

    /// Creates a parameter fragment with a type hint.
    #[must_use]
    pub fn typed_param(value: SqlValue, tag: TypeTag) -> Self {
        Self {
            chunks: vec![Chunk::Param(Param { value, tag })],
        }
    }

    /// Creates a column fragment.
    #[must_use]
    pub fn column(column: ColumnRef) -> Self {
        Self {
            chunks: vec![Chunk::Column(column)],
        }
    }

    /// Creates a `source.name` fragment for a column that only exists in a
    /// derived source (subquery output, lateral `data` column).
    #[must_use]
    pub fn qualified(source: &str, name: &str) -> Self {
        let mut sql = Self::ident(source);
        sql.push_str(".").push_ident(name);
        sql
    }

    /// Appends raw SQL text.
    pub fn push_str(&mut self, text: &str) -> &mut Self {
        if let Some(Chunk::Text(last)) = self.chunks.last_mut() {
            last.push_str(text);
        } else {
            self.chunks.push(Chunk::Text(String::from(text)));
        }
        self
    }

    /// Appends an identifier.
    pub fn push_ident(&mut self, name: &str) -> &mut Self {
        self.chunks.push(Chunk::Ident(String::from(name)));
        self
    }

    /// Appends a parameter.
    pub fn push_param(&mut self, value: SqlValue, tag: TypeTag) -> &mut Self {
        self.chunks.push(Chunk::Param(Param { value, tag }));
        self
    }

    /// Appends another fragment.
    pub fn push_sql(&mut self, other: Self) -> &mut Self {
        for chunk in other.chunks {
            match chunk {
                Chunk::Text(text) => {
                    self.push_str(&text);
                }
                other => self.chunks.push(other),
            }
        }
        self
    }

    /// Appends the fragment produced by `f` only when `condition` holds.
    pub fn push_if(&mut self, condition: bool, f: impl FnOnce() -> Self) -> &mut Self {
        if condition {
            self.push_sql(f());
        }
        self
    }

    /// Joins fragments with a separator.
    #[must_use]
    pub fn join(parts: impl IntoIterator<Item = Self>, separator: &str) -> Self {
        let mut sql = Self::new();
        for (i, part) in parts.into_iter().enumerate() {
            if i > 0 {
                sql.push_str(separator);
            }
            sql.push_sql(part);
        }
        sql
    }

    /// Wraps the fragment in parentheses.
    #[must_use]
    pub fn paren(self) -> Self {
        let mut sql = Self::raw("(");
        sql.push_sql(self).push_str(")");
        sql
    }

    /// Returns whether the fragment has no chunks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Returns the chunks of this fragment.
    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Rewrites every column chunk to its bare column name.
    ///
    /// Used where the result has no table to qualify against: the global
    /// `ORDER BY` of a set operation, `RETURNING`, single-table projections.
    #[must_use]
    pub fn unqualified(&self) -> Self {
        self.map_columns(|column| Self::ident(column.name()))
    }

    /// Replaces every column chunk with the fragment returned by `f`.
    #[must_use]
    pub fn map_columns(&self, mut f: impl FnMut(&ColumnRef) -> Self) -> Self {
        let mut sql = Self::new();
        for chunk in &self.chunks {
            match chunk {
                Chunk::Column(column) => {
                    sql.push_sql(f(column));
                }
                other => {
                    sql.push_sql(Self {
                        chunks: vec![other.clone()],
                    });
                }
            }
        }
        sql
    }

    /// Renders the fragment for a dialect.
    #[must_use]
    pub fn render(&self, dialect: &dyn Dialect) -> Query {
        let mut query = Query::default();
        for chunk in &self.chunks {
            match chunk {
                Chunk::Text(text) => query.sql.push_str(text),
                Chunk::Ident(name) => query.sql.push_str(&dialect.escape_identifier(name)),
                Chunk::Literal(value) => query.sql.push_str(&dialect.escape_string(value)),
                Chunk::Param(param) => {
                    query.params.push(param.value.clone());
                    query.type_tags.push(param.tag);
                    query.sql.push_str(&dialect.escape_param(query.params.len()));
                }
                Chunk::Column(column) => {
                    query.sql.push_str(&dialect.escape_identifier(column.source()));
                    query.sql.push('.');
                    query.sql.push_str(&dialect.escape_identifier(column.name()));
                }
            }
        }
        query
    }
}

impl From<ColumnRef> for Sql {
    fn from(column: ColumnRef) -> Self {
        Self::column(column)
    }
}

impl From<&ColumnRef> for Sql {
    fn from(column: &ColumnRef) -> Self {
        Self::column(column.clone())
    }
}

/// A compiled query: SQL text, ordered parameters and per-parameter type tags.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Query {
    /// The SQL text.
    pub sql: String,
    /// Parameters, in placeholder order.
    pub params: Vec<SqlValue>,
    /// Type hint for each parameter.
    pub type_tags: Vec<TypeTag>,
}

impl Query {
    /// Returns the number of bound parameters.
    #[must_use]
    pub fn param_count(&self) -> usize {
        self.params.len()
    }
}

/// A value assigned to a column in an insert or update: either a bound
/// parameter or a raw SQL expression.
#[derive(Debug, Clone)]
pub enum SetValue {
    /// Bound as a parameter with the column's type tag.
    Value(SqlValue),
    /// Inlined as SQL.
    Sql(Sql),
}

impl SetValue {
    /// Creates a parameter value.
    #[must_use]
    pub fn value<T: ToSqlValue>(value: T) -> Self {
        Self::Value(value.to_sql_value())
    }

    /// Creates a raw SQL value.
    #[must_use]
    pub const fn sql(sql: Sql) -> Self {
        Self::Sql(sql)
    }

    pub(crate) fn into_sql(self, tag: TypeTag) -> Sql {
        match self {
            Self::Value(value) => Sql::typed_param(value, tag),
            Self::Sql(sql) => sql,
        }
    }
}
