//! SQL Dialect support.
//!
//! Different databases have slightly different SQL syntax. The compiler only
//! ever reaches the target dialect through this trait: identifier escaping,
//! parameter placeholders and string literals are the three text-rendering
//! seams, and the capability flags decide whether a clause can be emitted at
//! all.

mod mysql;
mod postgres;

pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;

/// Trait for SQL dialect-specific behavior.
pub trait Dialect: std::fmt::Debug + Send + Sync {
    /// Returns the name of the dialect.
    fn name(&self) -> &'static str;

    /// Returns the identifier quote character (e.g., `"` for standard SQL, `` ` `` for MySQL).
    fn identifier_quote(&self) -> char {
        '"'
    }

    /// Escapes an identifier, doubling any embedded quote character.
    fn escape_identifier(&self, name: &str) -> String {
        let quote = self.identifier_quote();
        let doubled: String = [quote, quote].iter().collect();
        let escaped = name.replace(quote, &doubled);
        format!("{quote}{escaped}{quote}")
    }

    /// Returns the placeholder for the parameter at `index` (1-based).
    fn escape_param(&self, index: usize) -> String;

    /// Escapes a string literal.
    fn escape_string(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Returns whether the dialect supports RETURNING clause.
    fn supports_returning(&self) -> bool {
        false
    }

    /// Returns whether the dialect supports `INSERT ... ON CONFLICT`.
    fn supports_on_conflict(&self) -> bool {
        false
    }

    /// Returns whether `DEFAULT` may appear inside a `VALUES` tuple.
    fn supports_default_keyword(&self) -> bool {
        true
    }

    /// Returns whether the dialect supports `SELECT DISTINCT ON (...)`.
    fn supports_distinct_on(&self) -> bool {
        false
    }

    /// Returns whether the dialect supports `JOIN LATERAL`.
    fn supports_lateral(&self) -> bool {
        false
    }

    /// Returns whether the dialect has `json_build_array` / `json_agg`.
    fn supports_json_agg(&self) -> bool {
        false
    }

    /// Returns whether the dialect supports row-locking clauses (`FOR UPDATE ...`).
    fn supports_locking(&self) -> bool {
        false
    }

    /// Returns whether set operator operands may be wrapped in parentheses.
    fn supports_parenthesized_set_operands(&self) -> bool {
        true
    }
}
