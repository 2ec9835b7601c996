#![forbid(unsafe_code)]

//! The field-entity contract.
//!
//! A field entity is one observer bound to a path in the form store. The
//! store holds entities as [`EntityRef`] (`Rc<dyn FieldEntity>`), notifies
//! them synchronously on every store change and asks them to run their rules
//! when validation is requested.
//!
//! All methods take `&self`: entities keep their meta state behind interior
//! mutability, the same way the store does, so notifications can be delivered
//! while other handles to the entity are alive.
//!
//! # Invariants
//!
//! 1. An entity's [`name_path`](FieldEntity::name_path) does not change while
//!    it is registered.
//! 2. `on_store_change` must not re-enter the store with a write. Reads are
//!    fine: the store never holds a borrow while notifying.
//! 3. The future returned by [`validate_rules`](FieldEntity::validate_rules)
//!    resolves to the error list of that call; an empty list means the value
//!    passed.

use std::rc::Rc;

use fform_core::{NamePath, Value};
use futures::future::LocalBoxFuture;

use crate::config::ValidateOptions;
use crate::rule::Rule;

/// Shared handle to a registered entity. Identity is the `Rc` allocation.
pub type EntityRef = Rc<dyn FieldEntity>;

/// True when both handles point at the same entity instance.
#[must_use]
pub fn same_entity(a: &EntityRef, b: &EntityRef) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// Observer capabilities the form store relies on.
pub trait FieldEntity {
    /// Full path of the field (prefix included). Empty for unnamed fields.
    fn name_path(&self) -> NamePath;

    fn meta(&self) -> Meta;

    fn is_field_touched(&self) -> bool;

    /// Touched or validated since mount (or the last reset).
    fn is_field_dirty(&self) -> bool;

    fn is_field_validating(&self) -> bool;

    fn errors(&self) -> Vec<String>;

    /// An item of a field list, addressed by index below the list path.
    fn is_list_field(&self) -> bool {
        false
    }

    /// The container entity of a field list. Direct items below it leave
    /// their slots to it on unregister.
    fn is_list(&self) -> bool {
        false
    }

    fn is_preserve(&self) -> bool {
        false
    }

    fn rules(&self) -> Vec<Rule>;

    fn has_rules(&self) -> bool {
        !self.rules().is_empty()
    }

    /// Paths whose updates should re-validate this entity.
    fn dependencies(&self) -> Vec<NamePath>;

    fn initial_value(&self) -> Option<Value>;

    /// Store change notification.
    ///
    /// `prev` is the store before the change. `name_list` is the set of
    /// paths the change is scoped to, `None` for unscoped broadcasts.
    fn on_store_change(&self, prev: &Value, name_list: Option<&[NamePath]>, info: &ValuedNotifyInfo);

    /// Run this entity's rules against its current value.
    fn validate_rules(&self, options: &ValidateOptions) -> LocalBoxFuture<'static, Vec<String>>;
}

/// Observable state of a field.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Meta {
    pub touched: bool,
    pub validating: bool,
    pub errors: Vec<String>,
    pub name: NamePath,
}

/// Errors reported for one field.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldError {
    pub name: NamePath,
    pub errors: Vec<String>,
}

/// A point-in-time view of a registered field, as returned by `get_fields`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldSnapshot {
    pub name: NamePath,
    pub touched: bool,
    pub validating: bool,
    pub errors: Vec<String>,
    pub value: Option<Value>,
}

/// Payload of `set_fields`: every attribute left as `None` is untouched.
#[derive(Debug, Clone, PartialEq, Default)]
#[must_use]
pub struct FieldData {
    pub name: NamePath,
    pub touched: Option<bool>,
    pub validating: Option<bool>,
    pub errors: Option<Vec<String>>,
    pub value: Option<Value>,
    /// Built from a [`FieldSnapshot`]; its `validating` flag is not applied.
    pub from_snapshot: bool,
}

impl FieldData {
    pub fn new(name: impl Into<NamePath>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn touched(mut self, touched: bool) -> Self {
        self.touched = Some(touched);
        self
    }

    pub fn validating(mut self, validating: bool) -> Self {
        self.validating = Some(validating);
        self
    }

    pub fn errors<I, S>(mut self, errors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.errors = Some(errors.into_iter().map(Into::into).collect());
        self
    }

    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }
}

impl From<FieldSnapshot> for FieldData {
    fn from(snapshot: FieldSnapshot) -> Self {
        Self {
            name: snapshot.name,
            touched: Some(snapshot.touched),
            validating: Some(snapshot.validating),
            errors: Some(snapshot.errors),
            value: snapshot.value,
            from_snapshot: true,
        }
    }
}

/// Who caused a value update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    /// A field's own change trigger.
    Internal,
    /// Bulk writes through `set_fields_value`.
    External,
}

/// What happened to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum NotifyInfo {
    ValueUpdate { source: ValueSource },
    ValidateFinish,
    Reset,
    SetField { data: FieldData },
    DependenciesUpdate { related_fields: Vec<NamePath> },
}

impl NotifyInfo {
    #[must_use]
    pub fn source(&self) -> Option<ValueSource> {
        match self {
            Self::ValueUpdate { source } => Some(*source),
            _ => None,
        }
    }
}

/// A notification together with the store it was fired against.
#[derive(Debug, Clone, PartialEq)]
pub struct ValuedNotifyInfo {
    pub info: NotifyInfo,
    pub store: Value,
}

/// Inbound actions from a binding layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    UpdateValue {
        path: NamePath,
        value: Option<Value>,
    },
    ValidateField {
        path: NamePath,
        trigger_name: String,
    },
}
