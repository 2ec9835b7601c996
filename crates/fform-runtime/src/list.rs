#![forbid(unsafe_code)]

//! List fields.
//!
//! A [`FieldList`] owns an array value at its path. It is itself a field (an
//! `is_list` entity registered at the list path) and hands out item props so
//! child fields register at `list_path + [index]`.
//!
//! Items get keys that survive reordering: `add`, `remove` and `move_item`
//! rearrange the key list in step with the value, and indices that appear
//! without a key (values written from outside) get a fresh one on the next
//! [`FieldList::fields`] call.

use std::cell::RefCell;
use std::fmt;

use fform_core::{List, NamePath, Value, move_item};

use crate::entity::{Meta, ValueSource};
use crate::error::FormWarning;
use crate::field::{Field, FieldProps, ShouldUpdate};
use crate::store::FormStore;

/// One rendered item of a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListField {
    /// Index below the list path.
    pub name: usize,
    /// Stable identity of the item.
    pub key: u64,
    pub is_list_field: bool,
}

#[derive(Debug, Default)]
struct KeyManager {
    keys: Vec<u64>,
    next_id: u64,
}

impl KeyManager {
    fn fresh(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn key_at(&mut self, index: usize) -> u64 {
        while self.keys.len() <= index {
            let id = self.fresh();
            self.keys.push(id);
        }
        self.keys[index]
    }

    /// Make the key list exactly `len` long.
    fn sync(&mut self, len: usize) {
        if len > 0 {
            self.key_at(len - 1);
        }
        self.keys.truncate(len);
    }
}

/// A list container bound to a path.
pub struct FieldList {
    field: Field,
    path: NamePath,
    keys: RefCell<KeyManager>,
}

impl fmt::Debug for FieldList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldList")
            .field("path", &self.path)
            .field("keys", &self.keys.borrow().keys)
            .finish()
    }
}

impl FieldList {
    /// A list at `name` below the root.
    pub fn new(form: &FormStore, name: impl Into<NamePath>) -> Self {
        Self::with_props(form, FieldProps::new(name))
    }

    /// A list from full field props. `prefix`, `name`, `rules`,
    /// `validate_trigger`, `initial_value` and `is_list_field` are honoured;
    /// the list always re-renders on external changes to its store.
    pub fn with_props(form: &FormStore, props: FieldProps) -> Self {
        let path = props.name_path();
        let inner = FieldProps {
            prefix: path.clone(),
            name: Some(NamePath::root()),
            is_list: true,
            should_update: ShouldUpdate::custom(|prev, next, source| {
                source != Some(ValueSource::Internal) && prev != next
            }),
            ..props
        };
        Self {
            field: Field::new(form, inner),
            path,
            keys: RefCell::new(KeyManager::default()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &NamePath {
        &self.path
    }

    /// The underlying list entity.
    #[must_use]
    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn mount(&self) {
        self.field.mount();
    }

    pub fn unmount(&self) {
        self.field.unmount();
    }

    #[must_use]
    pub fn meta(&self) -> Meta {
        self.field.meta()
    }

    /// Current items. A value that is not a list is treated as empty.
    pub fn fields(&self) -> Vec<ListField> {
        let len = self.current().len();
        let mut keys = self.keys.borrow_mut();
        (0..len)
            .map(|index| ListField {
                name: index,
                key: keys.key_at(index),
                is_list_field: true,
            })
            .collect()
    }

    /// Props for the child field at `index`.
    pub fn item_props(&self, index: usize) -> FieldProps {
        FieldProps::new(index)
            .prefix(self.path.clone())
            .list_field(true)
    }

    /// Insert `value` (or `Null`) at `index`, or append when no index is
    /// given. An index past the end warns and appends.
    pub fn add(&self, value: Option<Value>, index: Option<usize>) {
        let mut list = self.current();
        let item = value.unwrap_or_default();
        {
            let mut keys = self.keys.borrow_mut();
            keys.sync(list.len());
            let id = keys.fresh();
            match index {
                Some(index) if index <= list.len() => {
                    keys.keys.insert(index, id);
                    list.insert(index, item);
                }
                other => {
                    if let Some(index) = other {
                        FormWarning::ListAddIndexOutOfRange {
                            path: self.path.clone(),
                            index,
                            len: list.len(),
                        }
                        .emit();
                    }
                    keys.keys.push(id);
                    list.push_back(item);
                }
            }
        }
        tracing::debug!(message = "list.add", path = %self.path, len = list.len());
        self.field.trigger_change(Some(Value::List(list)));
    }

    /// Drop the items at `indices`. Unknown indices are ignored; an empty
    /// slice does nothing.
    pub fn remove(&self, indices: &[usize]) {
        if indices.is_empty() {
            return;
        }
        let list = self.current();
        let kept: List = list
            .iter()
            .enumerate()
            .filter(|(index, _)| !indices.contains(index))
            .map(|(_, item)| item.clone())
            .collect();
        {
            let mut keys = self.keys.borrow_mut();
            keys.sync(list.len());
            let keys = &mut keys.keys;
            let mut position = 0;
            keys.retain(|_| {
                let keep = !indices.contains(&position);
                position += 1;
                keep
            });
        }
        tracing::debug!(message = "list.remove", path = %self.path, removed = list.len() - kept.len());
        self.field.trigger_change(Some(Value::List(kept)));
    }

    /// Move the item at `from` to `to`. Out-of-range indices are ignored.
    pub fn move_item(&self, from: usize, to: usize) {
        if from == to {
            return;
        }
        let list = self.current();
        if from >= list.len() || to >= list.len() {
            return;
        }
        {
            let mut keys = self.keys.borrow_mut();
            keys.sync(list.len());
            let reordered = move_item(&keys.keys.iter().copied().collect(), from, to);
            keys.keys = reordered.into_iter().collect();
        }
        self.field
            .trigger_change(Some(Value::List(move_item(&list, from, to))));
    }

    fn current(&self) -> List {
        match self.field.value() {
            None | Some(Value::Null) => List::new(),
            Some(Value::List(list)) => list,
            Some(_) => {
                FormWarning::ListValueNotArray {
                    path: self.path.clone(),
                }
                .emit();
                List::new()
            }
        }
    }
}
