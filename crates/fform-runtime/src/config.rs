#![forbid(unsafe_code)]

//! Form configuration, callbacks and validation options.

use std::error::Error;
use std::fmt;
use std::rc::Rc;

use fform_core::{ValidateMessages, Value};

use crate::entity::FieldSnapshot;
use crate::error::ValidateError;

/// Result of the `on_finish` callback. Errors are logged, never propagated.
pub type FinishResult = Result<(), Box<dyn Error>>;

type ValuesChangeFn = dyn Fn(&Value, &Value);
type FieldsChangeFn = dyn Fn(&[FieldSnapshot], &[FieldSnapshot]);
type FinishFn = dyn Fn(&Value) -> FinishResult;
type FinishFailedFn = dyn Fn(&ValidateError);

/// User callbacks fired by the form store.
#[derive(Clone, Default)]
#[must_use]
pub struct Callbacks {
    /// `(changed_values, all_values)` after a field's own change.
    pub on_values_change: Option<Rc<ValuesChangeFn>>,
    /// `(changed_fields, all_fields)` after a change or a settled validation.
    pub on_fields_change: Option<Rc<FieldsChangeFn>>,
    /// Submitted values after a successful `submit`.
    pub on_finish: Option<Rc<FinishFn>>,
    /// The rejection of a failed `submit`.
    pub on_finish_failed: Option<Rc<FinishFailedFn>>,
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_values_change", &self.on_values_change.is_some())
            .field("on_fields_change", &self.on_fields_change.is_some())
            .field("on_finish", &self.on_finish.is_some())
            .field("on_finish_failed", &self.on_finish_failed.is_some())
            .finish()
    }
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_values_change(mut self, f: impl Fn(&Value, &Value) + 'static) -> Self {
        self.on_values_change = Some(Rc::new(f));
        self
    }

    pub fn on_fields_change(
        mut self,
        f: impl Fn(&[FieldSnapshot], &[FieldSnapshot]) + 'static,
    ) -> Self {
        self.on_fields_change = Some(Rc::new(f));
        self
    }

    pub fn on_finish(mut self, f: impl Fn(&Value) -> FinishResult + 'static) -> Self {
        self.on_finish = Some(Rc::new(f));
        self
    }

    pub fn on_finish_failed(mut self, f: impl Fn(&ValidateError) + 'static) -> Self {
        self.on_finish_failed = Some(Rc::new(f));
        self
    }
}

/// Default trigger that collects a field's value and validates it.
pub const DEFAULT_TRIGGER: &str = "onChange";

/// Construction-time settings of a form store.
#[derive(Debug, Clone)]
#[must_use]
pub struct FormConfig {
    /// Initial values, applied as the first `set_initial_values`.
    pub initial_values: Option<Value>,
    /// Store-level preserve. Fields without their own flag inherit it.
    pub preserve: Option<bool>,
    /// Deliver per-entity notifications. When off, only the root re-render
    /// signal fires.
    pub subscribable: bool,
    /// Overrides laid on top of the built-in message table.
    pub validate_messages: Option<ValidateMessages>,
    /// Triggers that validate fields without their own trigger list.
    pub validate_trigger: Vec<String>,
    pub callbacks: Callbacks,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            initial_values: None,
            preserve: None,
            subscribable: true,
            validate_messages: None,
            validate_trigger: vec![DEFAULT_TRIGGER.to_string()],
            callbacks: Callbacks::default(),
        }
    }
}

impl FormConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initial_values(mut self, values: Value) -> Self {
        self.initial_values = Some(values);
        self
    }

    pub fn preserve(mut self, preserve: bool) -> Self {
        self.preserve = Some(preserve);
        self
    }

    pub fn subscribable(mut self, subscribable: bool) -> Self {
        self.subscribable = subscribable;
        self
    }

    pub fn validate_messages(mut self, messages: ValidateMessages) -> Self {
        self.validate_messages = Some(messages);
        self
    }

    pub fn validate_trigger<I, S>(mut self, triggers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.validate_trigger = triggers.into_iter().map(Into::into).collect();
        self
    }

    pub fn callbacks(mut self, callbacks: Callbacks) -> Self {
        self.callbacks = callbacks;
        self
    }
}

/// Options of one validation request.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct ValidateOptions {
    /// Only rules that apply to this trigger run.
    pub trigger_name: Option<String>,
    /// Also validate every field below a requested path.
    pub recursive: bool,
    /// Message table for this pass. The store fills this in with the
    /// built-in table merged with the form's overrides.
    pub validate_messages: Option<Rc<ValidateMessages>>,
}

impl ValidateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(mut self, trigger_name: impl Into<String>) -> Self {
        self.trigger_name = Some(trigger_name.into());
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn messages(mut self, messages: ValidateMessages) -> Self {
        self.validate_messages = Some(Rc::new(messages));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_config_defaults() {
        let config = FormConfig::default();
        assert!(config.subscribable);
        assert_eq!(config.preserve, None);
        assert_eq!(config.validate_trigger, vec![DEFAULT_TRIGGER.to_string()]);
    }

    #[test]
    fn builders_chain() {
        let config = FormConfig::new()
            .preserve(true)
            .subscribable(false)
            .validate_trigger(["onBlur", "onChange"]);
        assert_eq!(config.preserve, Some(true));
        assert!(!config.subscribable);
        assert_eq!(config.validate_trigger.len(), 2);

        let options = ValidateOptions::new().trigger("onBlur").recursive(true);
        assert_eq!(options.trigger_name.as_deref(), Some("onBlur"));
        assert!(options.recursive);
    }

    #[test]
    fn callbacks_debug_hides_closures() {
        let callbacks = Callbacks::new().on_finish(|_| Ok(()));
        let debug = format!("{callbacks:?}");
        assert!(debug.contains("on_finish: true"));
        assert!(debug.contains("on_finish_failed: false"));
    }
}
