//! Backend configuration.
//!
//! A [`BackendConfig`] is an ordered string-to-string map: base URL,
//! credentials, remote-config identifiers and per-job tuning parameters.
//! Server helpers own their configuration once initialized.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Key fragments whose values are never printed.
const SENSITIVE_FRAGMENTS: &[&str] = &["secret", "token", "password", "api_key"];

/// Ordered configuration map for a backend instance.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendConfig(BTreeMap<String, String>);

impl BackendConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Insert or overwrite a value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Remove a value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    /// Look up a value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Check whether a key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Look up a required value.
    pub fn require(&self, key: &str) -> ServerResult<&str> {
        self.get(key).ok_or_else(|| ServerError::missing(key))
    }

    /// Look up a value, falling back to `default`.
    pub fn value_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_string()
    }

    /// Resolve a required value from the configuration, then from the
    /// environment variable `env_var`. Empty values count as missing.
    pub fn resolve(&self, key: &str, env_var: &str) -> ServerResult<String> {
        self.resolve_optional(key, env_var)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ServerError::MissingConfiguration {
                key: key.to_string(),
                hint: format!(
                    " (set it in the backend configuration or the {env_var} environment variable)"
                ),
            })
    }

    /// Resolve an optional value from the configuration, then the environment.
    pub fn resolve_optional(&self, key: &str, env_var: &str) -> Option<String> {
        self.get(key)
            .map(str::to_string)
            .or_else(|| std::env::var(env_var).ok())
    }

    /// Copy of this configuration without the given keys.
    pub fn without(&self, keys: &[&str]) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(k, _)| !keys.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Overlay `other` on top of this configuration.
    pub fn merged(mut self, other: &BackendConfig) -> Self {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), v.clone());
        }
        self
    }

    /// Iterate over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the configuration is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn is_sensitive(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SENSITIVE_FRAGMENTS.iter().any(|f| key.contains(f))
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (k, v) in &self.0 {
            if is_sensitive(k) {
                map.entry(k, &"[REDACTED]");
            } else {
                map.entry(k, v);
            }
        }
        map.finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for BackendConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<BTreeMap<String, String>> for BackendConfig {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}
