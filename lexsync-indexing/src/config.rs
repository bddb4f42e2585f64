//! Configuration sources.
//!
//! The subsystem never reads files or the environment itself; the embedder
//! hands it a `ConfigSource`. Keys are the bare names from
//! [`crate::settings`]; `describe_key` returns the full name (with the
//! embedder's prefix, if any) used in error messages and logs.

use crate::error::ConfigError;
use std::collections::HashMap;

/// Read-only view of the embedder's configuration.
pub trait ConfigSource: Send + Sync {
    /// Returns the raw value for a key, if set.
    fn get_raw(&self, key: &str) -> Option<String>;

    /// Returns the full key name for messages.
    fn describe_key(&self, key: &str) -> String {
        key.to_string()
    }
}

/// Reads a boolean property. Accepts `true` / `false`, case-insensitive.
pub fn get_bool(source: &dyn ConfigSource, key: &str) -> Result<Option<bool>, ConfigError> {
    let Some(raw) = source.get_raw(key) else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(Some(true)),
        "false" => Ok(Some(false)),
        _ => Err(ConfigError::InvalidBool {
            key: source.describe_key(key),
            raw: raw.trim().to_string(),
        }),
    }
}

/// Reads a string property, trimmed. Empty values count as unset.
pub fn get_string(source: &dyn ConfigSource, key: &str) -> Option<String> {
    source
        .get_raw(key)
        .map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// In-memory configuration source.
#[derive(Debug, Clone, Default)]
pub struct MapConfigSource {
    values: HashMap<String, String>,
    prefix: Option<String>,
}

impl MapConfigSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty source whose described keys carry a prefix.
    #[must_use]
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            values: HashMap::new(),
            prefix: Some(prefix.into()),
        }
    }

    /// Sets a value, builder-style.
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Inserts a value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
}

impl ConfigSource for MapConfigSource {
    fn get_raw(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn describe_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key.to_string(),
        }
    }
}
