//! Bind parameter table shared by WHERE and HAVING.
//!
//! Keys are either named (`:name:` in PQL) or positional (`?0`). The table keeps
//! insertion order so the handoff to the executor is deterministic, and a key that
//! is set twice keeps its original slot but takes the newest value.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A bind parameter key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum BindKey {
    /// Named placeholder, rendered as `:name:`.
    Named(String),
    /// Positional placeholder, rendered as `?n`.
    Positional(usize),
}

impl BindKey {
    /// Interpret a textual key: all-digit strings become positional keys.
    pub fn parse(key: &str) -> Self {
        match key.parse::<usize>() {
            Ok(n) => BindKey::Positional(n),
            Err(_) => BindKey::Named(key.to_string()),
        }
    }

    /// The placeholder text for this key as it appears in PQL.
    pub fn placeholder(&self) -> String {
        match self {
            BindKey::Named(name) => format!(":{}:", name),
            BindKey::Positional(n) => format!("?{}", n),
        }
    }
}

impl fmt::Display for BindKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindKey::Named(name) => f.write_str(name),
            BindKey::Positional(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for BindKey {
    fn from(name: &str) -> Self {
        BindKey::Named(name.to_string())
    }
}

impl From<String> for BindKey {
    fn from(name: String) -> Self {
        BindKey::Named(name)
    }
}

impl From<usize> for BindKey {
    fn from(position: usize) -> Self {
        BindKey::Positional(position)
    }
}

/// Declared type of a bound value, handed through to the executor.
///
/// The discriminants are the codes executors conventionally expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindType {
    Null = 0,
    Int = 1,
    Str = 2,
    Blob = 3,
    Bool = 5,
    Decimal = 32,
    Skip = 1024,
}

impl BindType {
    /// Numeric code of this type.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Look a type up by its numeric code.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(BindType::Null),
            1 => Some(BindType::Int),
            2 => Some(BindType::Str),
            3 => Some(BindType::Blob),
            5 => Some(BindType::Bool),
            32 => Some(BindType::Decimal),
            1024 => Some(BindType::Skip),
            _ => None,
        }
    }
}

/// One entry of the parameter table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundParam {
    pub value: Value,
    pub bind_type: Option<BindType>,
}

/// Insertion-ordered bind parameter table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BindParams {
    entries: IndexMap<BindKey, BoundParam>,
}

impl BindParams {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value without a declared type (chaining form).
    pub fn set(mut self, key: impl Into<BindKey>, value: impl Into<Value>) -> Self {
        self.insert(key, value, None);
        self
    }

    /// Add a value with a declared type (chaining form).
    pub fn set_typed(
        mut self,
        key: impl Into<BindKey>,
        value: impl Into<Value>,
        bind_type: BindType,
    ) -> Self {
        self.insert(key, value, Some(bind_type));
        self
    }

    /// Insert or overwrite a value. An existing key keeps its position.
    pub fn insert(
        &mut self,
        key: impl Into<BindKey>,
        value: impl Into<Value>,
        bind_type: Option<BindType>,
    ) {
        self.entries.insert(
            key.into(),
            BoundParam {
                value: value.into(),
                bind_type,
            },
        );
    }

    /// Declare (or redeclare) the type of a key, creating a `null` entry if absent.
    pub fn declare_type(&mut self, key: impl Into<BindKey>, bind_type: BindType) {
        self.entries
            .entry(key.into())
            .or_insert(BoundParam {
                value: Value::Null,
                bind_type: None,
            })
            .bind_type = Some(bind_type);
    }

    /// Merge another table into this one; colliding keys take the other table's entry.
    pub fn merge(&mut self, other: BindParams) {
        for (key, param) in other.entries {
            self.entries.insert(key, param);
        }
    }

    /// Get the entry bound to a key.
    pub fn get(&self, key: &BindKey) -> Option<&BoundParam> {
        self.entries.get(key)
    }

    /// Check if a key is bound.
    pub fn contains_key(&self, key: &BindKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Get the value bound to a named key.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.entries
            .get(&BindKey::Named(name.to_string()))
            .map(|p| &p.value)
    }

    /// Number of bound keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&BindKey, &BoundParam)> {
        self.entries.iter()
    }

    /// Values keyed by bind key, without declared types.
    pub fn values(&self) -> IndexMap<BindKey, Value> {
        self.entries
            .iter()
            .map(|(k, p)| (k.clone(), p.value.clone()))
            .collect()
    }

    /// Declared types, only for keys that have one.
    pub fn types(&self) -> IndexMap<BindKey, BindType> {
        self.entries
            .iter()
            .filter_map(|(k, p)| p.bind_type.map(|t| (k.clone(), t)))
            .collect()
    }
}

impl<K: Into<BindKey>, V: Into<Value>> FromIterator<(K, V)> for BindParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = BindParams::new();
        for (k, v) in iter {
            params.insert(k, v, None);
        }
        params
    }
}

/// Mints bind keys that are unique for the lifetime of one builder.
#[derive(Debug, Clone)]
pub(crate) struct KeyGenerator {
    prefix: String,
    next: usize,
}

impl KeyGenerator {
    pub(crate) fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 0,
        }
    }

    pub(crate) fn next_key(&mut self) -> BindKey {
        let key = BindKey::Named(format!("{}{}", self.prefix, self.next));
        self.next += 1;
        key
    }

    /// Next key that is not already bound in `taken`.
    pub(crate) fn next_free(&mut self, taken: &BindParams) -> BindKey {
        loop {
            let key = self.next_key();
            if !taken.contains_key(&key) {
                return key;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_duplicate_key_last_write_wins() {
        let mut params = BindParams::new().set("name", "a").set("other", 1);
        params.insert("name", "b", Some(BindType::Str));

        assert_eq!(params.len(), 2);
        assert_eq!(params.value("name"), Some(&json!("b")));
        let keys: Vec<String> = params.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, vec!["name", "other"]);
    }

    #[test]
    fn test_merge_overwrites_collisions() {
        let mut base = BindParams::new().set("a", 1).set("b", 2);
        base.merge(BindParams::new().set("b", 20).set("c", 30));

        assert_eq!(base.len(), 3);
        assert_eq!(base.value("b"), Some(&json!(20)));
    }

    #[test]
    fn test_positional_keys() {
        let params = BindParams::new().set(0usize, "x").set(1usize, "y");
        let key = BindKey::Positional(1);
        assert_eq!(params.get(&key).map(|p| &p.value), Some(&json!("y")));
        assert_eq!(key.placeholder(), "?1");
    }

    #[test]
    fn test_parse_key() {
        assert_eq!(BindKey::parse("3"), BindKey::Positional(3));
        assert_eq!(BindKey::parse("id"), BindKey::Named("id".into()));
    }

    #[test]
    fn test_types_only_declared() {
        let mut params = BindParams::new()
            .set_typed("id", 5, BindType::Int)
            .set("name", "x");
        params.declare_type("flag", BindType::Bool);

        let types = params.types();
        assert_eq!(types.len(), 2);
        assert_eq!(types.get(&BindKey::from("id")), Some(&BindType::Int));
        assert_eq!(params.value("flag"), Some(&Value::Null));
    }

    #[test]
    fn test_bind_type_codes() {
        assert_eq!(BindType::Decimal.code(), 32);
        assert_eq!(BindType::from_code(1024), Some(BindType::Skip));
        assert_eq!(BindType::from_code(4), None);
    }

    #[test]
    fn test_key_generator_is_monotonic() {
        let mut keys = KeyGenerator::new("AP");
        assert_eq!(keys.next_key(), BindKey::from("AP0"));
        assert_eq!(keys.next_key(), BindKey::from("AP1"));
    }
}
