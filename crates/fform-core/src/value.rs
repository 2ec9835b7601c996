#![forbid(unsafe_code)]

//! Store values.
//!
//! A [`Value`] is a plain, acyclic tree of scalars, lists and maps. Lists and
//! maps are persistent collections from the `im` crate, so cloning a value is
//! O(1) and every "mutation" made through [`crate::access`] produces a new
//! tree that shares all untouched branches with the old one.
//!
//! The absence of a value ("undefined") is never stored: it is expressed as
//! `Option<Value>::None` at the API boundary.
//!
//! # Invariants
//!
//! 1. A `Value` never contains itself (trees only, no cycles).
//! 2. Map iteration order is the key order (`OrdMap`), so projections and
//!    snapshots are deterministic.

use std::fmt;

use im::{OrdMap, Vector};

/// Persistent map node.
pub type Map = OrdMap<String, Value>;

/// Persistent list node.
pub type List = Vector<Value>;

/// The canonical value tree. Its root is always a [`Value::Map`].
pub type Store = Value;

/// A node in the value tree.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(List),
    Map(Map),
}

impl Value {
    /// An empty map, the shape of a fresh store.
    #[must_use]
    pub fn empty_map() -> Self {
        Self::Map(Map::new())
    }

    /// An empty list.
    #[must_use]
    pub fn empty_list() -> Self {
        Self::List(List::new())
    }

    /// Build a list value from anything convertible into values.
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Build a map value from `(key, value)` pairs.
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn is_map(&self) -> bool {
        matches!(self, Self::Map(_))
    }

    #[must_use]
    pub const fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    /// Whether this node can be descended into by a path segment.
    #[must_use]
    pub const fn is_container(&self) -> bool {
        matches!(self, Self::Map(_) | Self::List(_))
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&List> {
        match self {
            Self::List(list) => Some(list),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// True when both values are the same persistent node in memory.
    ///
    /// Scalars never share storage, so this is only meaningful for lists and
    /// maps; it is how callers verify structural sharing.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Map(a), Self::Map(b)) => a.ptr_eq(b),
            (Self::List(a), Self::List(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::List(list) => {
                f.write_str("[")?;
                for (i, item) in list.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Map(map) => {
                f.write_str("{")?;
                for (i, (key, item)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key:?}: {item}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<List> for Value {
    fn from(value: List) -> Self {
        Self::List(value)
    }
}

impl From<Map> for Value {
    fn from(value: Map) -> Self {
        Self::Map(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::List(value.into_iter().collect())
    }
}

impl FromIterator<(String, Value)> for Value {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self::Map(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_null() {
        assert!(Value::default().is_null());
    }

    #[test]
    fn map_builder_orders_keys() {
        let value = Value::map([("b", 2), ("a", 1)]);
        let keys: Vec<_> = value.as_map().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn clone_shares_storage() {
        let value = Value::map([("a", Value::list([1, 2, 3]))]);
        let copy = value.clone();
        assert!(value.ptr_eq(&copy));
        assert!(!Value::from(1).ptr_eq(&Value::from(1)));
    }

    #[test]
    fn display_is_compact() {
        let value = Value::map([("a", Value::list([Value::from(1), Value::Null]))]);
        assert_eq!(value.to_string(), r#"{"a": [1, null]}"#);
    }

    #[test]
    fn accessors_reject_other_variants() {
        let value = Value::from("x");
        assert_eq!(value.as_str(), Some("x"));
        assert_eq!(value.as_f64(), None);
        assert_eq!(value.as_bool(), None);
        assert!(value.as_map().is_none());
        assert!(!value.is_container());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_untagged_round_trip() {
        let json = serde_json::json!({"a": 1, "b": [true, null, "x"]});
        let value: Value = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(
            value,
            Value::map([
                ("a", Value::from(1)),
                ("b", Value::list([Value::from(true), Value::Null, Value::from("x")])),
            ])
        );
        assert_eq!(serde_json::to_value(&value).unwrap()["b"], json["b"]);
    }
}
