//! Named secrets supplied by the orchestration platform
//!
//! The credentials file is a JSON object mapping secret names to values.
//! A value is either a JSON object or a string holding a JSON object, since
//! the platform stores secrets as opaque strings.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{ConfigError, Result};

/// Mapping of secret name to secret value
#[derive(Clone, Default)]
pub struct Credentials {
    entries: HashMap<String, serde_json::Value>,
}

impl Credentials {
    /// Load credentials from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_json(&contents)
    }

    /// Parse credentials from a JSON object
    pub fn from_json(s: &str) -> Result<Self> {
        let entries: HashMap<String, serde_json::Value> = serde_json::from_str(s)?;
        Ok(Self { entries })
    }

    /// Add or replace a secret
    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.entries.insert(key.into(), value);
    }

    /// Whether a secret is present
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Raw secret value
    pub fn require(&self, key: &str) -> Result<&serde_json::Value> {
        self.entries
            .get(key)
            .ok_or_else(|| ConfigError::missing_credential(key))
    }

    /// Decode a structured secret
    pub fn require_as<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self.require(key)?;
        let decoded = match value {
            serde_json::Value::String(s) => serde_json::from_str(s),
            other => serde_json::from_value(other.clone()),
        };
        decoded.map_err(|e| ConfigError::malformed_credential(key, e.to_string()))
    }

    /// Decode a structured secret when configured
    pub fn optional_as<T: DeserializeOwned>(&self, key: Option<&str>) -> Result<Option<T>> {
        key.map(|key| self.require_as(key)).transpose()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.entries.keys().collect();
        keys.sort();
        f.debug_struct("Credentials").field("keys", &keys).finish()
    }
}
