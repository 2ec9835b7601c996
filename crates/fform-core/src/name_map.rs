#![forbid(unsafe_code)]

//! A map keyed by [`NamePath`].
//!
//! Used to index registered fields by path, to invert dependency lists and to
//! group errors. Iteration follows path order, so anything derived from a
//! `NameMap` is deterministic.

use std::collections::BTreeMap;

use crate::access;
use crate::path::NamePath;
use crate::value::Value;

/// Path-keyed storage with update-or-insert semantics.
#[derive(Debug, Clone, PartialEq)]
pub struct NameMap<T> {
    entries: BTreeMap<NamePath, T>,
}

impl<T> Default for NameMap<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T> NameMap<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, path: NamePath, value: T) {
        self.entries.insert(path, value);
    }

    #[must_use]
    pub fn get(&self, path: &NamePath) -> Option<&T> {
        self.entries.get(path)
    }

    pub fn get_mut(&mut self, path: &NamePath) -> Option<&mut T> {
        self.entries.get_mut(path)
    }

    /// Replace the entry at `path` with `updater(previous)`.
    ///
    /// Returning `None` from the updater removes the entry.
    pub fn update(&mut self, path: &NamePath, updater: impl FnOnce(Option<T>) -> Option<T>) {
        let previous = self.entries.remove(path);
        if let Some(next) = updater(previous) {
            self.entries.insert(path.clone(), next);
        }
    }

    pub fn delete(&mut self, path: &NamePath) -> Option<T> {
        self.entries.remove(path)
    }

    #[must_use]
    pub fn contains(&self, path: &NamePath) -> bool {
        self.entries.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &NamePath> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NamePath, &T)> {
        self.entries.iter()
    }

    /// Project every entry through `f`, in path order.
    pub fn map<U>(&self, mut f: impl FnMut(&NamePath, &T) -> U) -> Vec<U> {
        self.entries.iter().map(|(path, value)| f(path, value)).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl NameMap<Value> {
    /// Fold the entries into a store-shaped value.
    #[must_use]
    pub fn to_store(&self) -> Value {
        self.entries
            .iter()
            .fold(Value::empty_map(), |store, (path, value)| {
                access::set(&store, path, Some(value.clone()), false)
            })
    }
}

impl<T> FromIterator<(NamePath, T)> for NameMap<T> {
    fn from_iter<I: IntoIterator<Item = (NamePath, T)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
