//! PostgreSQL dialect.

use super::Dialect;

/// PostgreSQL dialect: `"identifier"`, `$n` placeholders.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn escape_param(&self, index: usize) -> String {
        format!("${index}")
    }

    fn supports_returning(&self) -> bool {
        true
    }

    fn supports_on_conflict(&self) -> bool {
        true
    }

    fn supports_distinct_on(&self) -> bool {
        true
    }

    fn supports_lateral(&self) -> bool {
        true
    }

    fn supports_json_agg(&self) -> bool {
        true
    }

    fn supports_locking(&self) -> bool {
        true
    }
}
