//! MySQL dialect.

use super::Dialect;

/// MySQL dialect: `` `identifier` ``, `?` placeholders.
#[derive(Debug, Default, Clone, Copy)]
pub struct MySqlDialect;

impl MySqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn identifier_quote(&self) -> char {
        '`'
    }

    fn escape_param(&self, _index: usize) -> String {
        String::from("?")
    }

    fn escape_string(&self, value: &str) -> String {
        // Backslash is an escape character in MySQL string literals
        let escaped = value.replace('\\', "\\\\").replace('\'', "''");
        format!("'{escaped}'")
    }

    fn supports_lateral(&self) -> bool {
        true // 8.0.14+
    }

    fn supports_locking(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mysql_dialect() {
        let dialect = MySqlDialect::new();
        assert_eq!(dialect.name(), "mysql");
        assert_eq!(dialect.escape_identifier("order"), "`order`");
        assert_eq!(dialect.escape_param(1), "?");
        assert_eq!(dialect.escape_param(2), "?");
        assert_eq!(dialect.escape_string("a\\b'c"), "'a\\\\b''c'");
        assert!(!dialect.supports_returning());
        assert!(!dialect.supports_on_conflict());
    }
}
