#![forbid(unsafe_code)]

//! The stock field observer.
//!
//! [`Field`] is the [`FieldEntity`] a binding layer creates for every form
//! control. It keeps the field's meta (touched, dirty, validating, errors),
//! decides whether a store change concerns it, and signals re-renders to its
//! subscribers.
//!
//! # Lifecycle
//!
//! 1. [`Field::new`] seeds the field's initial value into the store.
//! 2. [`Field::mount`] registers it.
//! 3. [`Field::trigger_change`] / [`Field::trigger_validate`] feed user input.
//! 4. [`Field::unmount`] unregisters it, cleaning up its value unless
//!    preserved.
//!
//! # Invariants
//!
//! 1. `render_count` increases by exactly one per re-render signal. Unmounted
//!    fields send no signals.
//! 2. A validation pass commits its errors only if no newer pass (or meta
//!    write) started on this field since.
//! 3. Subscribers are notified in subscription order. Dropping a
//!    [`Subscription`] removes its callback before the next signal.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use fform_core::{NamePath, Value, contains_path, to_path};
use futures::future::{FutureExt, LocalBoxFuture};

use crate::config::{DEFAULT_TRIGGER, ValidateOptions};
use crate::entity::{
    Action, EntityRef, FieldEntity, Meta, NotifyInfo, ValueSource, ValuedNotifyInfo,
};
use crate::error::FormWarning;
use crate::rule::{Rule, ValidateFirst};
use crate::store::{FormStore, Unregister, WeakFormStore};
use crate::validate::guard::{SessionGuard, Ticket};
use crate::validate::runner::{self, RuleContext};

type NormalizeFn = dyn Fn(Option<Value>, Option<&Value>, &Value) -> Option<Value>;
type ShouldUpdateFn = dyn Fn(&Value, &Value, Option<ValueSource>) -> bool;

/// When a field re-renders on store changes it is not scoped to.
#[derive(Clone, Default)]
pub enum ShouldUpdate {
    /// Re-render when the field's own value changed.
    #[default]
    Default,
    /// Re-render on every store change.
    Always,
    /// Decide from `(prev_store, next_store, source)`.
    Custom(Rc<ShouldUpdateFn>),
}

impl ShouldUpdate {
    pub fn custom(f: impl Fn(&Value, &Value, Option<ValueSource>) -> bool + 'static) -> Self {
        Self::Custom(Rc::new(f))
    }

    const fn is_set(&self) -> bool {
        !matches!(self, Self::Default)
    }

    fn require_update(
        &self,
        prev: &Value,
        next: &Value,
        prev_value: Option<&Value>,
        next_value: Option<&Value>,
        info: &NotifyInfo,
    ) -> bool {
        match self {
            Self::Custom(f) => f(prev, next, info.source()),
            Self::Default | Self::Always => prev_value != next_value,
        }
    }
}

impl fmt::Debug for ShouldUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("Default"),
            Self::Always => f.write_str("Always"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Configuration of a [`Field`].
#[derive(Clone)]
#[must_use]
pub struct FieldProps {
    /// Path the name is resolved below (set by an enclosing list).
    pub prefix: NamePath,
    /// Name below the prefix. Unnamed fields observe without a value.
    pub name: Option<NamePath>,
    pub rules: Vec<Rule>,
    pub dependencies: Vec<NamePath>,
    pub initial_value: Option<Value>,
    pub validate_first: ValidateFirst,
    /// Validation triggers. Falls back to the form's list.
    pub validate_trigger: Option<Vec<String>>,
    /// Event that collects the value.
    pub trigger: String,
    pub preserve: Option<bool>,
    pub is_list_field: bool,
    pub is_list: bool,
    /// `(next, prev, all_values) -> stored`.
    pub normalize: Option<Rc<NormalizeFn>>,
    pub should_update: ShouldUpdate,
    pub message_variables: Vec<(String, String)>,
}

impl Default for FieldProps {
    fn default() -> Self {
        Self {
            prefix: NamePath::root(),
            name: None,
            rules: Vec::new(),
            dependencies: Vec::new(),
            initial_value: None,
            validate_first: ValidateFirst::All,
            validate_trigger: None,
            trigger: DEFAULT_TRIGGER.to_string(),
            preserve: None,
            is_list_field: false,
            is_list: false,
            normalize: None,
            should_update: ShouldUpdate::Default,
            message_variables: Vec::new(),
        }
    }
}

impl fmt::Debug for FieldProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldProps")
            .field("prefix", &self.prefix)
            .field("name", &self.name)
            .field("rules", &self.rules.len())
            .field("dependencies", &self.dependencies)
            .field("initial_value", &self.initial_value)
            .field("validate_first", &self.validate_first)
            .field("validate_trigger", &self.validate_trigger)
            .field("preserve", &self.preserve)
            .field("is_list_field", &self.is_list_field)
            .field("is_list", &self.is_list)
            .field("should_update", &self.should_update)
            .finish_non_exhaustive()
    }
}

impl FieldProps {
    pub fn new(name: impl Into<NamePath>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Props of a field without a name.
    pub fn unnamed() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<NamePath>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn prefix(mut self, prefix: impl Into<NamePath>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(mut self, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.rules.extend(rules);
        self
    }

    pub fn dependency(mut self, path: impl Into<NamePath>) -> Self {
        self.dependencies.push(path.into());
        self
    }

    pub fn initial_value(mut self, value: impl Into<Value>) -> Self {
        self.initial_value = Some(value.into());
        self
    }

    pub fn validate_first(mut self, validate_first: impl Into<ValidateFirst>) -> Self {
        self.validate_first = validate_first.into();
        self
    }

    pub fn validate_trigger<I, S>(mut self, triggers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.validate_trigger = Some(triggers.into_iter().map(Into::into).collect());
        self
    }

    pub fn trigger(mut self, trigger: impl Into<String>) -> Self {
        self.trigger = trigger.into();
        self
    }

    pub fn preserve(mut self, preserve: bool) -> Self {
        self.preserve = Some(preserve);
        self
    }

    pub fn list_field(mut self, is_list_field: bool) -> Self {
        self.is_list_field = is_list_field;
        self
    }

    pub fn list(mut self, is_list: bool) -> Self {
        self.is_list = is_list;
        self
    }

    pub fn normalize(
        mut self,
        f: impl Fn(Option<Value>, Option<&Value>, &Value) -> Option<Value> + 'static,
    ) -> Self {
        self.normalize = Some(Rc::new(f));
        self
    }

    pub fn should_update(mut self, should_update: ShouldUpdate) -> Self {
        self.should_update = should_update;
        self
    }

    pub fn message_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.message_variables.push((key.into(), value.into()));
        self
    }

    /// Full path: prefix plus name, or the root for unnamed fields.
    #[must_use]
    pub fn name_path(&self) -> NamePath {
        match &self.name {
            Some(name) => self.prefix.join(name),
            None => NamePath::root(),
        }
    }
}

/// Why a field asked to be re-rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderReason {
    /// Meta or value changed.
    Update,
    /// The field was reset and should remount its control.
    Reset,
}

type Listener = dyn Fn(RenderReason);

/// RAII guard for a re-render listener. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    _listener: Rc<Listener>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

struct FieldInner {
    me: Weak<FieldInner>,
    form: WeakFormStore,
    props: FieldProps,
    name_path: NamePath,
    touched: Cell<bool>,
    dirty: Cell<bool>,
    errors: RefCell<Vec<String>>,
    pending: Cell<Option<Ticket>>,
    guard: SessionGuard,
    mounted: Cell<bool>,
    render_count: Cell<u64>,
    reset_count: Cell<u64>,
    listeners: RefCell<Vec<Weak<Listener>>>,
    unregister: RefCell<Option<Unregister>>,
}

/// Handle to a field observer. Clones share the same field.
#[derive(Clone)]
pub struct Field {
    inner: Rc<FieldInner>,
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.inner.name_path)
            .field("touched", &self.inner.touched.get())
            .field("dirty", &self.inner.dirty.get())
            .field("validating", &self.inner.pending.get().is_some())
            .field("errors", &self.inner.errors.borrow())
            .field("mounted", &self.inner.mounted.get())
            .finish()
    }
}

impl Field {
    /// Create a field bound to `form` and seed its initial value.
    ///
    /// The field is not registered until [`mount`](Self::mount).
    pub fn new(form: &FormStore, props: FieldProps) -> Self {
        let name_path = props.name_path();
        if props.is_list_field && props.preserve == Some(false) {
            let depth = props.name.as_ref().map_or(0, NamePath::len);
            if depth <= 1 {
                FormWarning::PreserveOnListItem {
                    path: name_path.clone(),
                }
                .emit();
            }
        }
        if props.name.is_none() && !props.rules.is_empty() {
            FormWarning::MissingFieldName.emit();
        }

        let inner = Rc::new_cyclic(|me| FieldInner {
            me: me.clone(),
            form: form.downgrade(),
            props,
            name_path,
            touched: Cell::new(false),
            dirty: Cell::new(false),
            errors: RefCell::new(Vec::new()),
            pending: Cell::new(None),
            guard: SessionGuard::new(),
            mounted: Cell::new(false),
            render_count: Cell::new(0),
            reset_count: Cell::new(0),
            listeners: RefCell::new(Vec::new()),
            unregister: RefCell::new(None),
        });
        form.init_entity_value(&*inner);
        Self { inner }
    }

    /// Register with the form.
    pub fn mount(&self) {
        let inner = &self.inner;
        if inner.mounted.replace(true) {
            return;
        }
        if let Some(form) = inner.form.upgrade() {
            let unregister = form.register_field(self.entity());
            *inner.unregister.borrow_mut() = Some(unregister);
        }
        if matches!(inner.props.should_update, ShouldUpdate::Always) {
            inner.re_render(RenderReason::Update);
        }
    }

    /// Unregister from the form. The stored value is removed unless the field
    /// (or the form) preserves it.
    pub fn unmount(&self) {
        let inner = &self.inner;
        let unregister = inner.unregister.borrow_mut().take();
        if let Some(unregister) = unregister {
            let sub_path = to_path(inner.props.name.clone());
            unregister.call(inner.props.is_list_field, inner.props.preserve, &sub_path);
        }
        inner.mounted.set(false);
    }

    /// The control reported a new value.
    pub fn trigger_change(&self, value: Option<Value>) {
        let inner = &self.inner;
        inner.touched.set(true);
        inner.dirty.set(true);
        let Some(form) = inner.form.upgrade() else {
            return;
        };

        let current = form.get_field_value(&inner.name_path);
        let next = match &inner.props.normalize {
            Some(normalize) => {
                let all = form.get_all_values();
                normalize(value, current.as_ref(), &all)
            }
            None => value,
        };
        form.dispatch(Action::UpdateValue {
            path: inner.name_path.clone(),
            value: next,
        });

        let trigger = inner.props.trigger.clone();
        if inner.validate_triggers(&form).contains(&trigger) {
            self.trigger_validate(&trigger);
        }
    }

    /// A validation event fired on the control.
    pub fn trigger_validate(&self, trigger_name: &str) {
        let inner = &self.inner;
        if inner.props.rules.is_empty() {
            return;
        }
        let Some(form) = inner.form.upgrade() else {
            return;
        };
        if inner.validate_triggers(&form).iter().any(|t| t == trigger_name) {
            form.dispatch(Action::ValidateField {
                path: inner.name_path.clone(),
                trigger_name: trigger_name.to_string(),
            });
        }
    }

    /// Current value in the store.
    #[must_use]
    pub fn value(&self) -> Option<Value> {
        self.inner
            .form
            .upgrade()
            .and_then(|form| form.get_field_value(&self.inner.name_path))
    }

    #[must_use]
    pub fn meta(&self) -> Meta {
        self.inner.meta()
    }

    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.inner.errors.borrow().clone()
    }

    #[must_use]
    pub fn is_touched(&self) -> bool {
        self.inner.touched.get()
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.is_field_dirty()
    }

    #[must_use]
    pub fn is_validating(&self) -> bool {
        self.inner.pending.get().is_some()
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.inner.mounted.get()
    }

    /// Number of re-render signals so far.
    #[must_use]
    pub fn render_count(&self) -> u64 {
        self.inner.render_count.get()
    }

    /// Number of resets so far.
    #[must_use]
    pub fn reset_count(&self) -> u64 {
        self.inner.reset_count.get()
    }

    #[must_use]
    pub fn name_path(&self) -> NamePath {
        self.inner.name_path.clone()
    }

    #[must_use]
    pub fn props(&self) -> &FieldProps {
        &self.inner.props
    }

    /// The field as a registry entry.
    #[must_use]
    pub fn entity(&self) -> EntityRef {
        let inner: Rc<FieldInner> = Rc::clone(&self.inner);
        inner
    }

    /// Call `listener` on every re-render signal while the returned guard
    /// lives.
    pub fn subscribe(&self, listener: impl Fn(RenderReason) + 'static) -> Subscription {
        let listener: Rc<Listener> = Rc::new(listener);
        self.inner
            .listeners
            .borrow_mut()
            .push(Rc::downgrade(&listener));
        Subscription {
            _listener: listener,
        }
    }
}

impl FieldInner {
    fn validate_triggers(&self, form: &FormStore) -> Vec<String> {
        self.props
            .validate_trigger
            .clone()
            .unwrap_or_else(|| form.validate_trigger())
    }

    fn re_render(&self, reason: RenderReason) {
        if !self.mounted.get() {
            return;
        }
        match reason {
            RenderReason::Update => self.render_count.set(self.render_count.get() + 1),
            RenderReason::Reset => self.reset_count.set(self.reset_count.get() + 1),
        }
        let live: Vec<Rc<Listener>> = {
            let mut listeners = self.listeners.borrow_mut();
            listeners.retain(|listener| listener.strong_count() > 0);
            listeners.iter().filter_map(Weak::upgrade).collect()
        };
        for listener in live {
            listener(reason);
        }
    }

    fn clear_meta(&self) {
        self.touched.set(false);
        self.dirty.set(false);
        self.pending.set(None);
        self.errors.borrow_mut().clear();
    }

    fn commit_validation(&self, ticket: Ticket, errors: &[String]) {
        if self.pending.get() != Some(ticket) {
            tracing::debug!(
                message = "field.validate.stale",
                path = %self.name_path,
                ticket = ticket.get()
            );
            return;
        }
        self.pending.set(None);
        *self.errors.borrow_mut() = errors.to_vec();
        self.re_render(RenderReason::Update);
    }
}

impl FieldEntity for FieldInner {
    fn name_path(&self) -> NamePath {
        self.name_path.clone()
    }

    fn meta(&self) -> Meta {
        Meta {
            touched: self.touched.get(),
            validating: self.pending.get().is_some(),
            errors: self.errors.borrow().clone(),
            name: self.name_path.clone(),
        }
    }

    fn is_field_touched(&self) -> bool {
        self.touched.get()
    }

    fn is_field_dirty(&self) -> bool {
        self.touched.get() || self.dirty.get()
    }

    fn is_field_validating(&self) -> bool {
        self.pending.get().is_some()
    }

    fn errors(&self) -> Vec<String> {
        self.errors.borrow().clone()
    }

    fn is_list_field(&self) -> bool {
        self.props.is_list_field
    }

    fn is_list(&self) -> bool {
        self.props.is_list
    }

    fn is_preserve(&self) -> bool {
        self.props.preserve == Some(true)
    }

    fn rules(&self) -> Vec<Rule> {
        self.props.rules.clone()
    }

    fn has_rules(&self) -> bool {
        !self.props.rules.is_empty()
    }

    fn dependencies(&self) -> Vec<NamePath> {
        self.props.dependencies.clone()
    }

    fn initial_value(&self) -> Option<Value> {
        self.props.initial_value.clone()
    }

    fn on_store_change(&self, prev: &Value, name_list: Option<&[NamePath]>, info: &ValuedNotifyInfo) {
        let path = &self.name_path;
        let should_update = &self.props.should_update;
        let prev_value = fform_core::get(prev, path);
        let next_value = fform_core::get(&info.store, path);
        let path_match = name_list.is_some_and(|list| contains_path(list, path));

        if info.info.source() == Some(ValueSource::External) && prev_value != next_value {
            self.touched.set(true);
            self.dirty.set(true);
            self.pending.set(None);
            self.errors.borrow_mut().clear();
        }

        match &info.info {
            NotifyInfo::Reset => {
                if name_list.is_none() || path_match {
                    self.clear_meta();
                    self.re_render(RenderReason::Reset);
                    return;
                }
            }
            NotifyInfo::SetField { data } => {
                if path_match {
                    if let Some(touched) = data.touched {
                        self.touched.set(touched);
                    }
                    if let (Some(validating), false) = (data.validating, data.from_snapshot) {
                        self.pending
                            .set(validating.then(|| self.guard.issue()));
                    }
                    if let Some(errors) = &data.errors {
                        *self.errors.borrow_mut() = errors.clone();
                    }
                    self.dirty.set(true);
                    self.re_render(RenderReason::Update);
                    return;
                }
                let covers_descendant = data.value.is_some()
                    && name_list
                        .is_some_and(|list| list.iter().any(|changed| changed.starts_with(path)));
                if covers_descendant {
                    self.re_render(RenderReason::Update);
                    return;
                }
                if should_update.is_set()
                    && path.is_empty()
                    && should_update.require_update(prev, &info.store, prev_value, next_value, &info.info)
                {
                    self.re_render(RenderReason::Update);
                    return;
                }
            }
            NotifyInfo::DependenciesUpdate { related_fields } => {
                if self
                    .props
                    .dependencies
                    .iter()
                    .any(|dependency| contains_path(related_fields, dependency))
                {
                    self.re_render(RenderReason::Update);
                    return;
                }
            }
            NotifyInfo::ValueUpdate { .. } | NotifyInfo::ValidateFinish => {
                let eligible =
                    self.props.dependencies.is_empty() || !path.is_empty() || should_update.is_set();
                if path_match
                    || (eligible
                        && should_update.require_update(
                            prev,
                            &info.store,
                            prev_value,
                            next_value,
                            &info.info,
                        ))
                {
                    self.re_render(RenderReason::Update);
                    return;
                }
            }
        }

        if matches!(should_update, ShouldUpdate::Always) {
            self.re_render(RenderReason::Update);
        }
    }

    fn validate_rules(&self, options: &ValidateOptions) -> LocalBoxFuture<'static, Vec<String>> {
        let form = self.form.upgrade();
        let context = RuleContext {
            path: self.name_path.clone(),
            value: form
                .as_ref()
                .and_then(|form| form.get_field_value(&self.name_path)),
            values: form
                .as_ref()
                .map_or_else(Value::empty_map, FormStore::get_all_values),
            validate_first: self.props.validate_first,
            message_variables: self.props.message_variables.clone(),
        };
        let rules = self.props.rules.clone();
        let options = options.clone();

        let ticket = self.guard.issue();
        self.pending.set(Some(ticket));
        self.dirty.set(true);
        self.errors.borrow_mut().clear();
        self.re_render(RenderReason::Update);

        let me = self.me.clone();
        async move {
            let mounted = me.upgrade().is_some_and(|field| field.mounted.get());
            let errors = if mounted {
                runner::validate_rules(context, &rules, &options).await
            } else {
                Vec::new()
            };
            if let Some(field) = me.upgrade() {
                field.commit_validation(ticket, &errors);
            }
            errors
        }
        .boxed_local()
    }
}
