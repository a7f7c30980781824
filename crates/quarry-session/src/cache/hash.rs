//! Content hashing for cache keys.

use quarry_core::Query;
use sha2::{Digest, Sha256};

/// Computes the cache key of a query from its SQL text and parameters.
///
/// The pair is serialized to JSON before hashing, so equal queries always
/// hash equally. Returns a 64-character lowercase hexadecimal string.
///
/// # Errors
/// Returns an error if the parameters cannot be serialized to JSON.
pub fn query_hash(query: &Query) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(&(&query.sql, &query.params))?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use quarry_core::SqlValue;

    use super::*;

    fn query(sql: &str, params: Vec<SqlValue>) -> Query {
        Query {
            sql: sql.to_owned(),
            params,
            type_tags: Vec::new(),
        }
    }

    #[test]
    fn test_query_hash_deterministic() {
        let q = query("SELECT 1", vec![SqlValue::Int(1)]);
        let hash1 = query_hash(&q).unwrap();
        let hash2 = query_hash(&q).unwrap();
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_query_hash_depends_on_params() {
        let a = query("SELECT $1", vec![SqlValue::Int(1)]);
        let b = query("SELECT $1", vec![SqlValue::Int(2)]);
        assert_ne!(query_hash(&a).unwrap(), query_hash(&b).unwrap());
    }
}
