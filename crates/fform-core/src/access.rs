#![forbid(unsafe_code)]

//! Path-addressed reads and copy-on-write updates of a [`Value`] tree.
//!
//! Every writer here takes the input tree by reference and returns a new
//! tree. Branches that are not on the written path are shared with the input
//! (persistent `im` nodes), so observers holding the previous store can keep
//! diffing against it.
//!
//! # Container creation
//!
//! Missing intermediates are created as a list when the next segment is a
//! [`Segment::Index`], and as a map otherwise. A scalar standing where a
//! container is needed is replaced. A non-numeric key written into a list
//! turns that list into a map keyed by the former indices. So does an index
//! more than [`MAX_LIST_GAP`] slots past the end of a list: padding is
//! bounded, and the far slot lives under its decimal key instead.
//!
//! # Removal
//!
//! Writing `None` deletes the leaf. With `remove_if_undefined` set, every
//! container that becomes empty as a result is pruned as well, up to (but
//! excluding) the root. Deleting a list element that is not the last one
//! leaves `Null` in its slot so sibling indices stay stable. Deleting below a
//! missing node or a scalar changes nothing.

use crate::path::{NamePath, Segment};
use crate::value::{List, Map, Value};

/// Most `Null` slots a single write pads a list with.
pub const MAX_LIST_GAP: usize = 1024;

/// Read the value at `path`. The root path returns `store` itself.
#[must_use]
pub fn get<'a>(store: &'a Value, path: &NamePath) -> Option<&'a Value> {
    let mut current = store;
    for segment in path {
        current = match current {
            Value::Map(map) => map.get(segment.as_key().as_ref())?,
            Value::List(list) => list.get(segment.as_index()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Return a new tree with `value` written at `path`.
///
/// `None` deletes the leaf; see the module docs for pruning rules. The result
/// of writing through the root is always a container: deleting the root
/// yields an empty map.
#[must_use]
pub fn set(store: &Value, path: &NamePath, value: Option<Value>, remove_if_undefined: bool) -> Value {
    let prune = remove_if_undefined && value.is_none();
    set_in(Some(store), path.segments(), value, prune).unwrap_or_else(Value::empty_map)
}

fn set_in(
    entity: Option<&Value>,
    segments: &[Segment],
    value: Option<Value>,
    prune: bool,
) -> Option<Value> {
    let Some((head, rest)) = segments.split_first() else {
        return value;
    };

    match entity {
        Some(Value::List(list)) => match head.as_index() {
            Some(index) if index <= list.len() + MAX_LIST_GAP => {
                set_in_list(list.clone(), index, rest, value, prune)
            }
            _ if value.is_none() => entity.cloned(),
            _ => set_in_map(list_to_map(list), head, rest, value, prune),
        },
        Some(Value::Map(map)) => set_in_map(map.clone(), head, rest, value, prune),
        // Nothing below a scalar or a missing node to delete.
        _ if value.is_none() => entity.cloned(),
        _ => match head {
            Segment::Index(index) if *index <= MAX_LIST_GAP => {
                set_in_list(List::new(), *index, rest, value, prune)
            }
            _ => set_in_map(Map::new(), head, rest, value, prune),
        },
    }
}

fn set_in_map(
    mut map: Map,
    head: &Segment,
    rest: &[Segment],
    value: Option<Value>,
    prune: bool,
) -> Option<Value> {
    let key = head.as_key();
    let next = set_in(map.get(key.as_ref()), rest, value, prune);
    match next {
        Some(next) => {
            map.insert(key.into_owned(), next);
        }
        None => {
            map.remove(key.as_ref());
        }
    }
    if prune && map.is_empty() {
        return None;
    }
    Some(Value::Map(map))
}

fn set_in_list(
    mut list: List,
    index: usize,
    rest: &[Segment],
    value: Option<Value>,
    prune: bool,
) -> Option<Value> {
    let next = set_in(list.get(index), rest, value, prune);
    match next {
        Some(next) if index < list.len() => {
            list.set(index, next);
        }
        Some(next) => {
            while list.len() < index {
                list.push_back(Value::Null);
            }
            list.push_back(next);
        }
        None if index + 1 == list.len() => {
            list.pop_back();
        }
        None if index < list.len() => {
            list.set(index, Value::Null);
        }
        None => {}
    }
    if prune && list.is_empty() {
        return None;
    }
    Some(Value::List(list))
}

fn list_to_map(list: &List) -> Map {
    list.iter()
        .enumerate()
        .map(|(i, item)| (i.to_string(), item.clone()))
        .collect()
}

/// Deep-merge `patch` into `store`.
///
/// Maps merge key by key, recursing where both sides hold a map. Lists and
/// scalars in `patch` replace whatever `store` holds at that key.
#[must_use]
pub fn set_values(store: &Value, patch: &Value) -> Value {
    match (store, patch) {
        (Value::Map(base), Value::Map(patch)) => {
            let mut merged = base.clone();
            for (key, incoming) in patch {
                let next = match merged.get(key) {
                    Some(prev @ Value::Map(_)) if incoming.is_map() => set_values(prev, incoming),
                    _ => incoming.clone(),
                };
                merged.insert(key.clone(), next);
            }
            Value::Map(merged)
        }
        (Value::Map(_), _) if !patch.is_container() => store.clone(),
        _ => patch.clone(),
    }
}

/// Merge several patches into `store`, left to right.
#[must_use]
pub fn merge_all<'a>(store: &Value, patches: impl IntoIterator<Item = &'a Value>) -> Value {
    patches
        .into_iter()
        .fold(store.clone(), |acc, patch| set_values(&acc, patch))
}

/// A fresh map containing only the values found at `paths`.
///
/// Built by per-path get + set, so siblings that were not requested are left
/// out. Paths that resolve to nothing are simply absent.
#[must_use]
pub fn clone_by_paths<'a>(store: &Value, paths: impl IntoIterator<Item = &'a NamePath>) -> Value {
    paths.into_iter().fold(Value::empty_map(), |acc, path| {
        match get(store, path) {
            Some(value) => set(&acc, path, Some(value.clone()), false),
            None => acc,
        }
    })
}

/// Move the item at `from` to `to`, shifting the items in between.
///
/// Out-of-range indices return the input unchanged.
#[must_use]
pub fn move_item<T: Clone>(list: &im::Vector<T>, from: usize, to: usize) -> im::Vector<T> {
    let len = list.len();
    if from >= len || to >= len || from == to {
        return list.clone();
    }
    let mut moved = list.clone();
    let item = moved.remove(from);
    moved.insert(to, item);
    moved
}
