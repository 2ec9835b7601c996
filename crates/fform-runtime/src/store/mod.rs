#![forbid(unsafe_code)]

//! The form store.
//!
//! [`FormStore`] owns the canonical value tree, the initial-values baseline
//! and the registry of field entities. Every write replaces the store with a
//! new [`Value`] built by `fform_core::access`, then notifies the registered
//! entities with both the previous and the new store.
//!
//! # Architecture
//!
//! `FormStore` is a cheap handle around `Rc<FormInner>`. State lives in a
//! `RefCell`; entities get a [`WeakFormStore`] so the registry and the fields
//! do not keep each other alive.
//!
//! Validation sessions are `Shared` futures. Each one is spawned on the
//! `LocalSpawn` handle the store was built with, so it settles (and notifies
//! entities) even when nobody awaits the returned [`ValidateHandle`].
//!
//! # Invariants
//!
//! 1. No `RefCell` borrow is held while an entity or a user callback runs.
//!    Entities are snapshotted before every notification round.
//! 2. Notifications reach entities in registration order, synchronously,
//!    before the mutating call returns.
//! 3. Only the most recently issued validation session resolves `Ok`.
//!    Superseded sessions resolve `Err` with `out_of_date = true`.
//! 4. Unregistering never deletes a value another registered entity with the
//!    same path still needs.
//!
//! # Failure Modes
//!
//! - **Spawn failure**: logged as a warning. The session still runs when the
//!   returned handle is polled; fire-and-forget callers lose it.
//! - **Store dropped mid-validation**: the session resolves out of date with
//!   empty values and no notification is sent.

pub mod deps;

pub use deps::dependency_children;

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll};

use fform_core::{NameMap, NamePath, ValidateMessages, Value, access, contains_path};
use futures::future::{FutureExt, LocalBoxFuture, Shared};
use futures::task::{LocalSpawn, LocalSpawnExt};

use crate::config::{Callbacks, FormConfig, ValidateOptions};
use crate::entity::{
    Action, EntityRef, FieldData, FieldEntity, FieldError, FieldSnapshot, Meta, NotifyInfo,
    ValueSource, ValuedNotifyInfo, same_entity,
};
use crate::error::{FormWarning, ValidateError};
use crate::validate::guard::SessionGuard;
use crate::validate::settle::{all_settled, settle_summary};

/// Which paths `get_fields_value` should project.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum NameList {
    /// Every path. Without a filter this is the live store itself.
    All,
    /// Every registered named field, list items excluded (their list
    /// already covers them).
    #[default]
    Registered,
    /// Exactly these paths, registered or not.
    Paths(Vec<NamePath>),
}

/// Which fields `reset_with_field_initial_value` re-applies.
enum ResetScope {
    All,
    Entities(Vec<EntityRef>),
    Paths(Vec<NamePath>),
}

type ValidateSession = Shared<LocalBoxFuture<'static, Result<Value, ValidateError>>>;

/// Result of `validate_fields`.
///
/// Awaiting it is optional: the session runs on the store's spawner either
/// way. Clones observe the same outcome.
#[derive(Clone)]
pub struct ValidateHandle {
    session: ValidateSession,
}

impl fmt::Debug for ValidateHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidateHandle")
            .field("settled", &self.session.peek().is_some())
            .finish()
    }
}

impl Future for ValidateHandle {
    type Output = Result<Value, ValidateError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.session.poll_unpin(cx)
    }
}

/// Cleanup handle returned by [`FormStore::register_field`].
///
/// Dropping it without calling [`Unregister::call`] leaves the entity
/// registered.
pub struct Unregister {
    form: WeakFormStore,
    entity: Weak<dyn FieldEntity>,
    path: NamePath,
}

impl fmt::Debug for Unregister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unregister").field("path", &self.path).finish()
    }
}

impl Unregister {
    /// Remove the entity from the registry and clean up its value.
    ///
    /// `preserve` overrides the entity's own flag, which overrides the
    /// store-level one. `sub_path` is the entity's own name below its
    /// prefix; list items one level deep are left alone while a list is
    /// registered at their parent path, since that list owns their slots.
    pub fn call(self, is_list_field: bool, preserve: Option<bool>, sub_path: &NamePath) {
        if let Some(form) = self.form.upgrade() {
            form.unregister(&self.entity, &self.path, is_list_field, preserve, sub_path);
        }
    }
}

struct FormState {
    store: Value,
    initial_values: Value,
    entities: Vec<EntityRef>,
    callbacks: Callbacks,
    validate_messages: Option<ValidateMessages>,
    validate_trigger: Vec<String>,
    preserve: Option<bool>,
    subscribable: bool,
    force_root_update: Option<Rc<dyn Fn()>>,
}

struct FormInner {
    state: RefCell<FormState>,
    guard: SessionGuard,
    spawner: Rc<dyn LocalSpawn>,
}

/// Handle to a form store. Clones share the same store.
#[derive(Clone)]
pub struct FormStore {
    inner: Rc<FormInner>,
}

/// Non-owning handle held by fields.
#[derive(Clone, Default)]
pub struct WeakFormStore {
    inner: Weak<FormInner>,
}

impl WeakFormStore {
    #[must_use]
    pub fn upgrade(&self) -> Option<FormStore> {
        self.inner.upgrade().map(|inner| FormStore { inner })
    }
}

impl fmt::Debug for WeakFormStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakFormStore")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl fmt::Debug for FormStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("FormStore")
            .field("store", &state.store)
            .field("initial_values", &state.initial_values)
            .field("entities", &state.entities.len())
            .field("preserve", &state.preserve)
            .field("subscribable", &state.subscribable)
            .finish_non_exhaustive()
    }
}

impl FormStore {
    /// A store with default configuration.
    pub fn new(spawner: impl LocalSpawn + 'static) -> Self {
        Self::with_config(spawner, FormConfig::default())
    }

    pub fn with_config(spawner: impl LocalSpawn + 'static, config: FormConfig) -> Self {
        let FormConfig {
            initial_values,
            preserve,
            subscribable,
            validate_messages,
            validate_trigger,
            callbacks,
        } = config;

        let form = Self {
            inner: Rc::new(FormInner {
                state: RefCell::new(FormState {
                    store: Value::empty_map(),
                    initial_values: Value::empty_map(),
                    entities: Vec::new(),
                    callbacks,
                    validate_messages,
                    validate_trigger,
                    preserve,
                    subscribable,
                    force_root_update: None,
                }),
                guard: SessionGuard::new(),
                spawner: Rc::new(spawner),
            }),
        };
        if let Some(values) = initial_values {
            form.set_initial_values(values, true);
        }
        form
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakFormStore {
        WeakFormStore {
            inner: Rc::downgrade(&self.inner),
        }
    }

    // ── Internal helpers ────────────────────────────────────────────────

    fn store(&self) -> Value {
        self.inner.state.borrow().store.clone()
    }

    /// Replace the store and return the previous one.
    fn write(&self, update: impl FnOnce(&Value) -> Value) -> Value {
        let mut state = self.inner.state.borrow_mut();
        let next = update(&state.store);
        std::mem::replace(&mut state.store, next)
    }

    /// Registered entities; `pure` keeps only named ones.
    fn entities(&self, pure: bool) -> Vec<EntityRef> {
        let state = self.inner.state.borrow();
        state
            .entities
            .iter()
            .filter(|entity| !pure || !entity.name_path().is_empty())
            .cloned()
            .collect()
    }

    fn callbacks(&self) -> Callbacks {
        self.inner.state.borrow().callbacks.clone()
    }

    /// Deliver `info` to every registered entity, or fire the root re-render
    /// signal when subscriptions are off.
    fn notify_observers(&self, prev: &Value, name_list: Option<&[NamePath]>, info: NotifyInfo) {
        let (subscribable, force_root_update) = {
            let state = self.inner.state.borrow();
            (state.subscribable, state.force_root_update.clone())
        };
        if !subscribable {
            if let Some(force) = force_root_update {
                force();
            }
            return;
        }
        let valued = ValuedNotifyInfo {
            info,
            store: self.store(),
        };
        for entity in self.entities(false) {
            entity.on_store_change(prev, name_list, &valued);
        }
    }

    /// Re-apply field-level initial values.
    ///
    /// A field's own initial value only applies when the form's initial
    /// values have nothing at that path and no other registered field at the
    /// same path also declares one. With `skip_exist`, values already in the
    /// store are kept.
    fn reset_with_field_initial_value(&self, scope: ResetScope, skip_exist: bool) {
        let registered = self.entities(true);
        let mut records: NameMap<Vec<(EntityRef, Value)>> = NameMap::new();
        for entity in &registered {
            if let Some(initial) = entity.initial_value() {
                records.update(&entity.name_path(), |prev| {
                    let mut list = prev.unwrap_or_default();
                    list.push((Rc::clone(entity), initial));
                    Some(list)
                });
            }
        }

        let required: Vec<EntityRef> = match scope {
            ResetScope::All => registered,
            ResetScope::Entities(entities) => entities,
            ResetScope::Paths(paths) => paths
                .iter()
                .filter_map(|path| records.get(path))
                .flat_map(|list| list.iter().map(|(entity, _)| Rc::clone(entity)))
                .collect(),
        };

        for entity in required {
            if entity.initial_value().is_none() {
                continue;
            }
            let path = entity.name_path();
            if self.get_initial_value(&path).is_some() {
                FormWarning::ShadowedInitialValue { path }.emit();
                continue;
            }
            match records.get(&path).map(Vec::as_slice) {
                Some([(_, value)]) => {
                    if !skip_exist || self.get_field_value(&path).is_none() {
                        let value = value.clone();
                        self.write(|store| access::set(store, &path, Some(value), false));
                    }
                }
                Some(list) if list.len() > 1 => {
                    FormWarning::ConflictingInitialValue { path }.emit();
                }
                _ => {}
            }
        }
    }

    fn unregister(
        &self,
        entity: &Weak<dyn FieldEntity>,
        path: &NamePath,
        is_list_field: bool,
        preserve: Option<bool>,
        sub_path: &NamePath,
    ) {
        let entity_preserve = entity
            .upgrade()
            .is_some_and(|entity| entity.is_preserve())
            .then_some(true);
        let merged_preserve = {
            let mut state = self.inner.state.borrow_mut();
            state
                .entities
                .retain(|item| !std::ptr::addr_eq(Rc::as_ptr(item), entity.as_ptr()));
            preserve.or(entity_preserve).or(state.preserve)
        };
        tracing::debug!(message = "form.unregister", path = %path, ?merged_preserve);

        if merged_preserve == Some(true) || path.is_empty() {
            return;
        }
        if is_list_field && sub_path.len() <= 1 && self.is_owned_by_list(path) {
            return;
        }
        let default = if is_list_field {
            None
        } else {
            self.get_initial_value(path)
        };
        let still_covered = self
            .entities(false)
            .iter()
            .any(|other| &other.name_path() == path);
        if !still_covered && self.get_field_value(path) != default {
            self.write(|store| access::set(store, path, default, true));
        }
    }

    /// A direct list item's slot belongs to the list registered at its
    /// parent path, if there is one.
    fn is_owned_by_list(&self, path: &NamePath) -> bool {
        let Some(parent) = path.parent() else {
            return false;
        };
        self.entities(false)
            .iter()
            .any(|other| other.is_list() && other.name_path() == parent)
    }

    // ── Hook surface ────────────────────────────────────────────────────

    /// Route an action from a binding layer.
    pub fn dispatch(&self, action: Action) {
        match action {
            Action::UpdateValue { path, value } => self.update_value(&path, value),
            Action::ValidateField { path, trigger_name } => {
                let _ = self.validate_fields(
                    Some(std::slice::from_ref(&path)),
                    ValidateOptions::default().trigger(trigger_name),
                );
            }
        }
    }

    /// Seed the store with the entity's initial value if nothing is stored
    /// at its path yet. Called once when the entity is constructed.
    pub fn init_entity_value(&self, entity: &dyn FieldEntity) {
        let Some(initial) = entity.initial_value() else {
            return;
        };
        let path = entity.name_path();
        if self.get_field_value(&path).is_none() {
            self.write(|store| access::set(store, &path, Some(initial), false));
        }
    }

    /// Add an entity to the registry. Registering the same instance twice
    /// keeps one slot.
    pub fn register_field(&self, entity: EntityRef) -> Unregister {
        let path = entity.name_path();
        let already = self
            .inner
            .state
            .borrow()
            .entities
            .iter()
            .any(|item| same_entity(item, &entity));

        if !already {
            self.inner
                .state
                .borrow_mut()
                .entities
                .push(Rc::clone(&entity));
            tracing::debug!(message = "form.register", path = %path);

            if entity.initial_value().is_some() {
                let prev = self.store();
                self.reset_with_field_initial_value(
                    ResetScope::Entities(vec![Rc::clone(&entity)]),
                    true,
                );
                self.notify_observers(
                    &prev,
                    Some(std::slice::from_ref(&path)),
                    NotifyInfo::ValueUpdate {
                        source: ValueSource::Internal,
                    },
                );
            }
        }

        Unregister {
            form: self.downgrade(),
            entity: Rc::downgrade(&entity),
            path,
        }
    }

    /// Replace the initial-values baseline. On the first call the store is
    /// seeded with it; values already in the store win.
    pub fn set_initial_values(&self, values: Value, is_first_init: bool) {
        let mut state = self.inner.state.borrow_mut();
        if is_first_init {
            let seeded = access::merge_all(&Value::empty_map(), [&values, &state.store]);
            state.store = seeded;
        }
        state.initial_values = values;
    }

    pub fn set_callbacks(&self, callbacks: Callbacks) {
        self.inner.state.borrow_mut().callbacks = callbacks;
    }

    pub fn set_validate_messages(&self, messages: ValidateMessages) {
        self.inner.state.borrow_mut().validate_messages = Some(messages);
    }

    pub fn set_preserve(&self, preserve: Option<bool>) {
        self.inner.state.borrow_mut().preserve = preserve;
    }

    /// Turn per-entity notifications on or off.
    pub fn use_subscribe(&self, subscribable: bool) {
        self.inner.state.borrow_mut().subscribable = subscribable;
    }

    /// Root re-render signal used while subscriptions are off.
    pub fn set_force_root_update(&self, force: impl Fn() + 'static) {
        self.inner.state.borrow_mut().force_root_update = Some(Rc::new(force));
    }

    /// Triggers that validate fields without their own trigger list.
    #[must_use]
    pub fn validate_trigger(&self) -> Vec<String> {
        self.inner.state.borrow().validate_trigger.clone()
    }

    /// Snapshot of every named field.
    #[must_use]
    pub fn get_fields(&self) -> Vec<FieldSnapshot> {
        self.entities(true)
            .into_iter()
            .map(|entity| {
                let Meta {
                    touched,
                    validating,
                    errors,
                    name,
                } = entity.meta();
                let value = self.get_field_value(&name);
                FieldSnapshot {
                    name,
                    touched,
                    validating,
                    errors,
                    value,
                }
            })
            .collect()
    }

    // ── Reads ───────────────────────────────────────────────────────────

    /// Value at `path` in the initial-values baseline.
    #[must_use]
    pub fn get_initial_value(&self, path: &NamePath) -> Option<Value> {
        access::get(&self.inner.state.borrow().initial_values, path).cloned()
    }

    #[must_use]
    pub fn get_field_value(&self, path: &NamePath) -> Option<Value> {
        access::get(&self.inner.state.borrow().store, path).cloned()
    }

    /// The live store.
    #[must_use]
    pub fn get_all_values(&self) -> Value {
        self.store()
    }

    /// Project the store onto `names`, optionally keeping only fields whose
    /// meta passes `filter`. Paths without a registered entity never pass a
    /// filter.
    #[must_use]
    pub fn get_fields_value(&self, names: NameList, filter: Option<&dyn Fn(&Meta) -> bool>) -> Value {
        if names == NameList::All && filter.is_none() {
            return self.store();
        }

        let candidates: Vec<(NamePath, Option<EntityRef>)> = match names {
            NameList::All => self
                .entities(true)
                .into_iter()
                .map(|entity| (entity.name_path(), Some(entity)))
                .collect(),
            NameList::Registered => self
                .entities(true)
                .into_iter()
                .filter(|entity| !entity.is_list_field())
                .map(|entity| (entity.name_path(), Some(entity)))
                .collect(),
            NameList::Paths(paths) => {
                let index = self.fields_map();
                paths
                    .into_iter()
                    .map(|path| {
                        let entity = index.get(&path).cloned();
                        (path, entity)
                    })
                    .collect()
            }
        };

        let selected: Vec<NamePath> = candidates
            .into_iter()
            .filter(|(_, entity)| match (filter, entity) {
                (None, _) => true,
                (Some(filter), Some(entity)) => filter(&entity.meta()),
                (Some(_), None) => false,
            })
            .map(|(path, _)| path)
            .collect();

        access::clone_by_paths(&self.store(), &selected)
    }

    fn fields_map(&self) -> NameMap<EntityRef> {
        self.entities(true)
            .into_iter()
            .map(|entity| (entity.name_path(), entity))
            .collect()
    }

    #[must_use]
    pub fn get_field_error(&self, path: &NamePath) -> Vec<String> {
        self.get_fields_error(Some(std::slice::from_ref(path)))
            .into_iter()
            .next()
            .map(|field| field.errors)
            .unwrap_or_default()
    }

    /// Errors of every named field, or of each requested path. A path with
    /// no registered field reports an empty list.
    #[must_use]
    pub fn get_fields_error(&self, paths: Option<&[NamePath]>) -> Vec<FieldError> {
        match paths {
            None => self
                .entities(true)
                .into_iter()
                .map(|entity| FieldError {
                    name: entity.name_path(),
                    errors: entity.errors(),
                })
                .collect(),
            Some(paths) => {
                let index = self.fields_map();
                paths
                    .iter()
                    .map(|path| FieldError {
                        name: path.clone(),
                        errors: index.get(path).map(|entity| entity.errors()).unwrap_or_default(),
                    })
                    .collect()
            }
        }
    }

    /// Touched state of fields.
    ///
    /// Without paths: any (or, with `require_all`, every) named field. With
    /// paths: each requested path groups the fields at or below it; a group
    /// is touched when any of its fields is, and groups combine with the
    /// same any/every quantifier.
    #[must_use]
    pub fn is_fields_touched(&self, paths: Option<&[NamePath]>, require_all: bool) -> bool {
        let entities = self.entities(true);
        let Some(paths) = paths else {
            return if require_all {
                entities.iter().all(|entity| entity.is_field_touched())
            } else {
                entities.iter().any(|entity| entity.is_field_touched())
            };
        };

        let mut groups: NameMap<Vec<EntityRef>> = NameMap::new();
        for path in paths {
            groups.set(path.clone(), Vec::new());
        }
        for entity in &entities {
            let name = entity.name_path();
            for path in paths {
                if name.starts_with(path) {
                    if let Some(group) = groups.get_mut(path) {
                        group.push(Rc::clone(entity));
                    }
                }
            }
        }

        let touched = groups.map(|_, group| group.iter().any(|entity| entity.is_field_touched()));
        if require_all {
            touched.iter().all(|t| *t)
        } else {
            touched.iter().any(|t| *t)
        }
    }

    #[must_use]
    pub fn is_field_touched(&self, path: &NamePath) -> bool {
        self.is_fields_touched(Some(std::slice::from_ref(path)), false)
    }

    #[must_use]
    pub fn is_field_validating(&self, path: &NamePath) -> bool {
        self.is_fields_validating(Some(std::slice::from_ref(path)))
    }

    #[must_use]
    pub fn is_fields_validating(&self, paths: Option<&[NamePath]>) -> bool {
        self.entities(false).iter().any(|entity| {
            paths.is_none_or(|paths| contains_path(paths, &entity.name_path()))
                && entity.is_field_validating()
        })
    }

    // ── Writes ──────────────────────────────────────────────────────────

    /// Reset the whole store (no paths) or the given paths to their initial
    /// values, then re-apply field-level initial values.
    pub fn reset_fields(&self, paths: Option<&[NamePath]>) {
        let Some(paths) = paths else {
            let initial = self.inner_initial_values();
            let prev = self.write(|_| access::set_values(&Value::empty_map(), &initial));
            self.reset_with_field_initial_value(ResetScope::All, false);
            tracing::debug!(message = "form.reset", scoped = false);
            self.notify_observers(&prev, None, NotifyInfo::Reset);
            return;
        };

        let prev = self.store();
        for path in paths {
            let initial = self.get_initial_value(path);
            self.write(|store| access::set(store, path, initial, false));
        }
        self.reset_with_field_initial_value(ResetScope::Paths(paths.to_vec()), false);
        tracing::debug!(message = "form.reset", scoped = true, paths = paths.len());
        self.notify_observers(&prev, Some(paths), NotifyInfo::Reset);
    }

    fn inner_initial_values(&self) -> Value {
        self.inner.state.borrow().initial_values.clone()
    }

    /// Write field data (value and meta) and notify each field's path.
    pub fn set_fields(&self, fields: Vec<FieldData>) {
        let prev = self.store();
        for data in fields {
            let path = data.name.clone();
            if let Some(value) = data.value.clone() {
                self.write(|store| access::set(store, &path, Some(value), false));
            }
            self.notify_observers(
                &prev,
                Some(std::slice::from_ref(&path)),
                NotifyInfo::SetField { data },
            );
        }
    }

    /// Deep-merge `patch` into the store and rebroadcast to every entity.
    pub fn set_fields_value(&self, patch: &Value) {
        let prev = self.write(|store| access::set_values(store, patch));
        self.notify_observers(
            &prev,
            None,
            NotifyInfo::ValueUpdate {
                source: ValueSource::External,
            },
        );
    }

    /// A field's own change: write, notify, re-validate dirty dependents.
    pub fn update_value(&self, path: &NamePath, value: Option<Value>) {
        let prev = self.write(|store| access::set(store, path, value, false));
        self.notify_observers(
            &prev,
            Some(std::slice::from_ref(path)),
            NotifyInfo::ValueUpdate {
                source: ValueSource::Internal,
            },
        );

        let children = dependency_children(&self.entities(false), path);
        tracing::debug!(message = "form.update_value", path = %path, dependents = children.len());
        if !children.is_empty() {
            let _ = self.validate_fields(Some(children.as_slice()), ValidateOptions::default());
        }

        let mut related = Vec::with_capacity(children.len() + 1);
        related.push(path.clone());
        related.extend(children.iter().cloned());
        self.notify_observers(
            &prev,
            Some(children.as_slice()),
            NotifyInfo::DependenciesUpdate {
                related_fields: related.clone(),
            },
        );

        if let Some(on_values_change) = self.callbacks().on_values_change {
            let changed = access::clone_by_paths(&self.store(), std::slice::from_ref(path));
            let all = self.get_fields_value(NameList::Registered, None);
            on_values_change(&changed, &all);
        }

        self.trigger_on_fields_change(&related, None);
    }

    fn trigger_on_fields_change(&self, name_list: &[NamePath], field_errors: Option<&[FieldError]>) {
        let Some(on_fields_change) = self.callbacks().on_fields_change else {
            return;
        };
        let mut fields = self.get_fields();
        if let Some(field_errors) = field_errors {
            let settled: NameMap<Vec<String>> = field_errors
                .iter()
                .map(|field| (field.name.clone(), field.errors.clone()))
                .collect();
            for field in &mut fields {
                if let Some(errors) = settled.get(&field.name) {
                    field.errors = errors.clone();
                }
            }
        }
        let changed: Vec<FieldSnapshot> = fields
            .iter()
            .filter(|field| contains_path(name_list, &field.name))
            .cloned()
            .collect();
        on_fields_change(&changed, &fields);
    }

    // ── Validation ──────────────────────────────────────────────────────

    /// Validate the given paths (all named fields when `None`).
    ///
    /// With `options.recursive`, every field below a requested path is
    /// validated too. The handle resolves to the values of the validated
    /// paths when every rule passed and no newer session was issued.
    pub fn validate_fields(&self, paths: Option<&[NamePath]>, options: ValidateOptions) -> ValidateHandle {
        let entities = self.entities(true);
        let provided = paths.is_some();
        let mut name_list: Vec<NamePath> = match paths {
            Some(paths) => paths.to_vec(),
            None => entities.iter().map(|entity| entity.name_path()).collect(),
        };
        if let (Some(requested), true) = (paths, options.recursive) {
            for entity in &entities {
                let name = entity.name_path();
                if requested.iter().any(|prefix| name.starts_with(prefix))
                    && !contains_path(&name_list, &name)
                {
                    name_list.push(name);
                }
            }
        }

        let messages = {
            let state = self.inner.state.borrow();
            match &state.validate_messages {
                Some(overrides) => ValidateMessages::default().merged(overrides),
                None => ValidateMessages::default(),
            }
        };
        let field_options = ValidateOptions {
            validate_messages: Some(Rc::new(messages)),
            ..options
        };

        let mut pending = Vec::new();
        for entity in &entities {
            if !entity.has_rules() {
                continue;
            }
            let name = entity.name_path();
            if provided && !contains_path(&name_list, &name) {
                continue;
            }
            let errors = entity.validate_rules(&field_options);
            pending.push(async move {
                let field = FieldError {
                    name,
                    errors: errors.await,
                };
                if field.errors.is_empty() {
                    Ok(field)
                } else {
                    Err(field)
                }
            });
        }

        let ticket = self.inner.guard.issue();
        tracing::debug!(message = "form.validate.session", ticket = ticket.get(), fields = pending.len());

        let weak = self.downgrade();
        let session = async move {
            let summary = settle_summary(all_settled(pending).await);
            let Some(form) = weak.upgrade() else {
                return Err(ValidateError::out_of_date(Value::empty_map()));
            };

            let results = match &summary {
                Ok(results) | Err(results) => results,
            };
            let result_paths: Vec<NamePath> = results.iter().map(|field| field.name.clone()).collect();
            form.notify_observers(&form.store(), Some(result_paths.as_slice()), NotifyInfo::ValidateFinish);
            form.trigger_on_fields_change(&result_paths, Some(results));

            let current = form.inner.guard.is_current(ticket);
            if !current {
                tracing::debug!(message = "form.validate.stale", ticket = ticket.get());
            }
            let values = form.get_fields_value(NameList::Paths(name_list), None);
            match summary {
                Ok(_) if current => Ok(values),
                Ok(_) => Err(ValidateError::out_of_date(values)),
                Err(results) => Err(ValidateError {
                    values,
                    error_fields: results
                        .into_iter()
                        .filter(|field| !field.errors.is_empty())
                        .collect(),
                    out_of_date: !current,
                }),
            }
        }
        .boxed_local()
        .shared();

        if let Err(err) = self.inner.spawner.spawn_local(session.clone().map(|_| ())) {
            FormWarning::SpawnFailed {
                task: "validation session",
                reason: err.to_string(),
            }
            .emit();
        }
        ValidateHandle { session }
    }

    /// Validate everything, then fire `on_finish` or `on_finish_failed`.
    pub fn submit(&self) {
        let handle = self.validate_fields(None, ValidateOptions::default());
        let weak = self.downgrade();
        let task = async move {
            let outcome = handle.await;
            let Some(form) = weak.upgrade() else {
                return;
            };
            let callbacks = form.callbacks();
            match outcome {
                Ok(values) => {
                    if let Some(on_finish) = callbacks.on_finish {
                        if let Err(err) = on_finish(&values) {
                            FormWarning::FinishCallbackFailed {
                                reason: err.to_string(),
                            }
                            .emit();
                        }
                    }
                }
                Err(err) => {
                    if let Some(on_finish_failed) = callbacks.on_finish_failed {
                        on_finish_failed(&err);
                    }
                }
            }
        };
        if let Err(err) = self.inner.spawner.spawn_local(task) {
            FormWarning::SpawnFailed {
                task: "submit",
                reason: err.to_string(),
            }
            .emit();
        }
    }
}
