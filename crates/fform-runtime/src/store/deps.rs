#![forbid(unsafe_code)]

//! Dependency closure.
//!
//! The graph is never stored. It is rebuilt from the registry on every call
//! by inverting each entity's dependency list into
//! `dependency path -> dependent entities`.
//!
//! # Invariants
//!
//! 1. Every entity is visited at most once per closure, so dependency cycles
//!    terminate.
//! 2. Only dirty entities with a non-empty path are reported, and only they
//!    extend the frontier. Untouched dependents are skipped entirely.

use std::rc::Rc;

use ahash::AHashSet;
use fform_core::{NameMap, NamePath};

use crate::entity::EntityRef;

fn entity_key(entity: &EntityRef) -> usize {
    Rc::as_ptr(entity).cast::<()>() as usize
}

/// Paths of the dirty entities that transitively depend on `root`, in
/// discovery order.
pub fn dependency_children(entities: &[EntityRef], root: &NamePath) -> Vec<NamePath> {
    let mut dependents: NameMap<Vec<EntityRef>> = NameMap::new();
    for entity in entities {
        for dependency in entity.dependencies() {
            dependents.update(&dependency, |prev| {
                let mut list = prev.unwrap_or_default();
                list.push(Rc::clone(entity));
                Some(list)
            });
        }
    }

    let mut visited = AHashSet::new();
    let mut children = Vec::new();
    fill_children(&dependents, root, &mut visited, &mut children);
    children
}

fn fill_children(
    dependents: &NameMap<Vec<EntityRef>>,
    path: &NamePath,
    visited: &mut AHashSet<usize>,
    children: &mut Vec<NamePath>,
) {
    let Some(entities) = dependents.get(path) else {
        return;
    };
    for entity in entities {
        if !visited.insert(entity_key(entity)) {
            continue;
        }
        let name = entity.name_path();
        if entity.is_field_dirty() && !name.is_empty() {
            children.push(name.clone());
            fill_children(dependents, &name, visited, children);
        }
    }
}
