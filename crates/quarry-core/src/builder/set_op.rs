//! Set-operator composer.

use super::select::SelectStatement;
use crate::compiler::Compiler;
use crate::error::Result;
use crate::fragment::Sql;

/// A set operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    /// UNION.
    Union,
    /// INTERSECT.
    Intersect,
    /// EXCEPT.
    Except,
}

impl SetOperator {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Union => "UNION",
            Self::Intersect => "INTERSECT",
            Self::Except => "EXCEPT",
        }
    }
}

/// A set-operator continuation of a select.
#[derive(Debug, Clone)]
pub struct SetOperation {
    /// The operator.
    pub operator: SetOperator,
    /// Whether `ALL` is added.
    pub all: bool,
    /// The right-hand operand.
    pub statement: SelectStatement,
}

/// Global ordering and paging applied to the combined result.
pub(crate) struct CompoundTail<'a> {
    pub order_by: &'a [Sql],
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Folds `left` and each operation left to right into one fragment.
///
/// Operand shapes are checked when the statement is built, not here.
pub(crate) fn compose(
    compiler: &Compiler<'_>,
    left: Sql,
    operations: &[SetOperation],
    tail: &CompoundTail<'_>,
) -> Result<Sql> {
    let wrap = compiler.dialect().supports_parenthesized_set_operands();
    let operand = |sql: Sql| if wrap { sql.paren() } else { sql };

    let mut acc = left;
    for op in operations {
        let right = compiler.select(&op.statement)?;
        let mut sql = operand(acc);
        sql.push_str(" ").push_str(op.operator.as_sql());
        sql.push_if(op.all, || Sql::raw(" ALL"));
        sql.push_str(" ").push_sql(operand(right));
        acc = sql;
    }

    if !tail.order_by.is_empty() {
        // The combined result has no table to qualify against.
        let terms = tail.order_by.iter().map(Sql::unqualified);
        acc.push_str(" ORDER BY ").push_sql(Sql::join(terms, ", "));
    }
    compiler.push_limit_offset(&mut acc, tail.limit, tail.offset);
    Ok(acc)
}
