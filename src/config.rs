//! Configuration.
//!
//! A flat key → JSON value table. Keys may be linked so that several names
//! always resolve to one value. Unknown keys are an error unless the caller
//! supplies a default; nothing is silently substituted.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;

use crate::{Error, Result};

/// Base namespace for every registered type (`<namespace><TypeName>`).
pub const NAMESPACE_KEY: &str = "rdf.namespace";
/// Hash method used by derived identifiers.
pub const IDENTIFIER_HASH_KEY: &str = "identifier.hash";
/// Default for [`IDENTIFIER_HASH_KEY`].
pub const DEFAULT_IDENTIFIER_HASH: &str = "sha224";
/// Set by [`Configuration::open`] to the file it read.
pub const FILE_LOCATION_KEY: &str = "configure.file_location";

#[derive(Debug, Clone, Default)]
pub struct Configuration {
    values: BTreeMap<String, Value>,
    /// key → every key linked with it (itself included)
    links: BTreeMap<String, Vec<String>>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(key, value)` pairs.
    pub fn with<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let mut conf = Self::new();
        for (k, v) in pairs {
            conf.set(k, v);
        }
        conf
    }

    /// Parse a flat JSON object.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let parsed: BTreeMap<String, Value> = serde_json::from_str(json)?;
        Ok(Self::with(parsed))
    }

    /// Read a JSON configuration file.
    ///
    /// String values starting with `BASE/` are resolved against the
    /// directory holding the file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let parsed: BTreeMap<String, Value> = serde_json::from_str(&text)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));

        let mut conf = Self::new();
        for (key, value) in parsed {
            let value = match value.as_str().and_then(|s| s.strip_prefix("BASE/")) {
                Some(rest) => Value::String(base.join(rest).to_string_lossy().into_owned()),
                None => value,
            };
            conf.set(key, value);
        }
        conf.set(FILE_LOCATION_KEY, path.to_string_lossy().into_owned());
        tracing::debug!(file = %path.display(), keys = conf.len(), "configuration loaded");
        Ok(conf)
    }

    /// Set a value. Setting a linked key sets every key in the link.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.links.get(&key) {
            Some(members) => {
                for member in members {
                    self.values.insert(member.clone(), value.clone());
                }
            }
            None => {
                self.values.insert(key, value);
            }
        }
    }

    /// Link `names` so they always hold the same value.
    pub fn link(&mut self, names: &[&str]) {
        let members: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        let shared = members.iter().find_map(|m| self.values.get(m).cloned());
        for name in &members {
            self.links.insert(name.clone(), members.clone());
            match &shared {
                Some(v) => {
                    self.values.insert(name.clone(), v.clone());
                }
                None => {
                    self.values.remove(name);
                }
            }
        }
    }

    /// Look up `key`. Unknown keys are `Error::MissingKey`.
    pub fn get(&self, key: &str) -> Result<&Value> {
        self.values.get(key).ok_or_else(|| Error::MissingKey(key.to_string()))
    }

    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.get(key).cloned().unwrap_or_else(|_| default.into())
    }

    /// Look up a string value.
    pub fn get_str(&self, key: &str) -> Result<&str> {
        let value = self.get(key)?;
        value.as_str().ok_or_else(|| Error::TypeError {
            expected: format!("string for '{key}'"),
            got: value.to_string(),
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}
