//! # Worker specification.
//!
//! A [`WorkerSpec`] describes how one worker is launched: the environment it
//! inherits on top of the supervisor's own. The supervisor keeps a clone per
//! slot so a crashed worker can be replaced with the same configuration.

use std::collections::BTreeMap;

/// Launch configuration for one worker.
///
/// ```rust
/// use procvisor::WorkerSpec;
///
/// let spec = WorkerSpec::new().env("SHARD", "3").env("ROLE", "indexer");
/// assert_eq!(spec.get("SHARD"), Some("3"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkerSpec {
    env: BTreeMap<String, String>,
}

impl WorkerSpec {
    /// Empty spec: the worker inherits the supervisor environment unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an environment variable for the worker (overwrites).
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Reads a variable back.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    /// Iterates variables in key order.
    pub fn vars(&self) -> impl Iterator<Item = (&str, &str)> {
        self.env.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for WorkerSpec
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            env: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
