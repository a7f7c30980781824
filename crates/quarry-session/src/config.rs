//! Session configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Session settings.
///
/// Missing fields take their defaults, so `{}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// TTL in seconds for cached entries whose query gives none.
    pub default_ttl_secs: Option<u64>,
    /// Whether concurrent identical cached reads share one execution.
    pub single_flight: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: None,
            single_flight: true,
        }
    }
}

impl SessionConfig {
    /// Parses a configuration from JSON.
    ///
    /// # Errors
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Returns the default TTL.
    #[must_use]
    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl_secs.map(Duration::from_secs)
    }
}
