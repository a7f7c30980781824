//! SQLite dialect implementation.

use quarry_core::Dialect;

/// SQLite dialect.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn escape_param(&self, _index: usize) -> String {
        String::from("?")
    }

    fn supports_returning(&self) -> bool {
        true // SQLite 3.35.0+
    }

    fn supports_on_conflict(&self) -> bool {
        true // SQLite 3.24.0+
    }

    fn supports_default_keyword(&self) -> bool {
        false
    }

    fn supports_parenthesized_set_operands(&self) -> bool {
        false
    }
}
