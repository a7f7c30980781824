//! Expression helpers.
//!
//! Comparisons are methods on [`ColumnRef`]; parameters created from a
//! comparison carry the column's type tag. Boolean composition lives on
//! [`Sql`].

use std::ops::Not;

use crate::fragment::Sql;
use crate::schema::ColumnRef;
use crate::value::{SqlValue, ToSqlValue};

impl ColumnRef {
    fn bind(&self, value: SqlValue) -> Sql {
        Sql::typed_param(value, self.type_tag())
    }

    fn binary<T: ToSqlValue>(&self, op: &str, value: T) -> Sql {
        let mut sql = Sql::column(self.clone());
        sql.push_str(op).push_sql(self.bind(value.to_sql_value()));
        sql
    }

    fn postfix(&self, op: &str) -> Sql {
        let mut sql = Sql::column(self.clone());
        sql.push_str(op);
        sql
    }

    /// Creates an equality expression.
    #[must_use]
    pub fn eq<T: ToSqlValue>(&self, value: T) -> Sql {
        self.binary(" = ", value)
    }

    /// Creates an inequality expression.
    #[must_use]
    pub fn ne<T: ToSqlValue>(&self, value: T) -> Sql {
        self.binary(" <> ", value)
    }

    /// Creates a greater-than expression.
    #[must_use]
    pub fn gt<T: ToSqlValue>(&self, value: T) -> Sql {
        self.binary(" > ", value)
    }

    /// Creates a greater-than-or-equal expression.
    #[must_use]
    pub fn gte<T: ToSqlValue>(&self, value: T) -> Sql {
        self.binary(" >= ", value)
    }

    /// Creates a less-than expression.
    #[must_use]
    pub fn lt<T: ToSqlValue>(&self, value: T) -> Sql {
        self.binary(" < ", value)
    }

    /// Creates a less-than-or-equal expression.
    #[must_use]
    pub fn lte<T: ToSqlValue>(&self, value: T) -> Sql {
        self.binary(" <= ", value)
    }

    /// Creates a LIKE expression.
    #[must_use]
    pub fn like<T: ToSqlValue>(&self, pattern: T) -> Sql {
        self.binary(" LIKE ", pattern)
    }

    /// Creates an IN expression. An empty list matches nothing.
    #[must_use]
    pub fn in_list<T: ToSqlValue>(&self, values: Vec<T>) -> Sql {
        if values.is_empty() {
            return Sql::raw("FALSE");
        }
        let items = values
            .into_iter()
            .map(|v| self.bind(v.to_sql_value()));
        let mut sql = Sql::column(self.clone());
        sql.push_str(" IN (")
            .push_sql(Sql::join(items, ", "))
            .push_str(")");
        sql
    }

    /// Creates a BETWEEN expression.
    #[must_use]
    pub fn between<T: ToSqlValue, U: ToSqlValue>(&self, low: T, high: U) -> Sql {
        let mut sql = Sql::column(self.clone());
        sql.push_str(" BETWEEN ")
            .push_sql(self.bind(low.to_sql_value()))
            .push_str(" AND ")
            .push_sql(self.bind(high.to_sql_value()));
        sql
    }

    /// Creates an IS NULL expression.
    #[must_use]
    pub fn is_null(&self) -> Sql {
        self.postfix(" IS NULL")
    }

    /// Creates an IS NOT NULL expression.
    #[must_use]
    pub fn is_not_null(&self) -> Sql {
        self.postfix(" IS NOT NULL")
    }

    /// Compares two columns for equality.
    #[must_use]
    pub fn eq_col(&self, other: &Self) -> Sql {
        let mut sql = Sql::column(self.clone());
        sql.push_str(" = ").push_sql(Sql::column(other.clone()));
        sql
    }

    /// Ascending ordering term.
    #[must_use]
    pub fn asc(&self) -> Sql {
        self.postfix(" ASC")
    }

    /// Descending ordering term.
    #[must_use]
    pub fn desc(&self) -> Sql {
        self.postfix(" DESC")
    }
}

impl Sql {
    /// Combines two conditions with AND.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        let mut sql = self;
        sql.push_str(" AND ").push_sql(other);
        sql.paren()
    }

    /// Combines two conditions with OR.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        let mut sql = self;
        sql.push_str(" OR ").push_sql(other);
        sql.paren()
    }
}

impl Not for Sql {
    type Output = Self;

    fn not(self) -> Self {
        let mut sql = Self::raw("NOT ");
        sql.push_sql(self.paren());
        sql
    }
}

fn combine(conditions: impl IntoIterator<Item = Sql>, op: &str) -> Option<Sql> {
    let mut conditions: Vec<Sql> = conditions.into_iter().filter(|c| !c.is_empty()).collect();
    match conditions.len() {
        0 => None,
        1 => conditions.pop(),
        _ => Some(Sql::join(conditions, op).paren()),
    }
}

/// ANDs a list of conditions. Returns `None` for an empty list.
#[must_use]
pub fn and(conditions: impl IntoIterator<Item = Sql>) -> Option<Sql> {
    combine(conditions, " AND ")
}

/// ORs a list of conditions. Returns `None` for an empty list.
#[must_use]
pub fn or(conditions: impl IntoIterator<Item = Sql>) -> Option<Sql> {
    combine(conditions, " OR ")
}

/// References the row proposed for insertion in an `ON CONFLICT DO UPDATE`.
#[must_use]
pub fn excluded(column: &ColumnRef) -> Sql {
    let mut sql = Sql::raw("excluded.");
    sql.push_ident(column.name());
    sql
}
