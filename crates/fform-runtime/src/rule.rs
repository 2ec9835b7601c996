#![forbid(unsafe_code)]

//! Validation rules.
//!
//! A [`Rule`] is an opaque async predicate over a field's value. The engine
//! does not interpret rules; it only decides when to run them, in which order
//! (see [`ValidateFirst`]) and which message to report when one fails.

use std::fmt;
use std::future::Future;
use std::rc::Rc;

use fform_core::{NamePath, ValidateMessages, Value};
use futures::FutureExt;
use futures::future::{self, LocalBoxFuture};
use thiserror::Error;

/// What a rule sees when it runs.
#[derive(Debug, Clone)]
pub struct RuleInput {
    pub path: NamePath,
    /// The field's value, `None` when nothing is stored at its path.
    pub value: Option<Value>,
    /// The whole store at the time validation started.
    pub values: Value,
    pub messages: Rc<ValidateMessages>,
}

impl RuleInput {
    /// Value of another field in the same store snapshot.
    #[must_use]
    pub fn value_at(&self, path: &NamePath) -> Option<&Value> {
        fform_core::get(&self.values, path)
    }
}

/// A failed rule. Without a message the rule's own message, then the
/// `default` template, is reported.
#[derive(Debug, Clone, PartialEq, Eq, Default, Error)]
#[error("{}", .message.as_deref().unwrap_or("rule failed"))]
pub struct RuleFailure {
    pub message: Option<String>,
}

impl RuleFailure {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }
}

pub type RuleResult = Result<(), RuleFailure>;

type Validator = dyn Fn(RuleInput) -> LocalBoxFuture<'static, RuleResult>;

/// One validator plus its reporting and trigger configuration.
#[derive(Clone)]
pub struct Rule {
    validator: Rc<Validator>,
    message: Option<String>,
    validate_trigger: Option<Vec<String>>,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("message", &self.message)
            .field("validate_trigger", &self.validate_trigger)
            .finish_non_exhaustive()
    }
}

impl Rule {
    /// An asynchronous rule.
    pub fn new<F, Fut>(validator: F) -> Self
    where
        F: Fn(RuleInput) -> Fut + 'static,
        Fut: Future<Output = RuleResult> + 'static,
    {
        Self {
            validator: Rc::new(move |input| validator(input).boxed_local()),
            message: None,
            validate_trigger: None,
        }
    }

    /// A rule that decides synchronously.
    pub fn sync<F>(validator: F) -> Self
    where
        F: Fn(&RuleInput) -> RuleResult + 'static,
    {
        Self::new(move |input| future::ready(validator(&input)))
    }

    /// Message reported when this rule fails without its own message.
    /// `${name}` and message variables are substituted.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Restrict the rule to the given trigger names.
    #[must_use]
    pub fn with_trigger<I, S>(mut self, triggers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.validate_trigger = Some(triggers.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Whether the rule runs for `trigger_name`. Rules without a trigger
    /// list, and calls without a trigger name, always apply.
    #[must_use]
    pub fn applies_to(&self, trigger_name: Option<&str>) -> bool {
        match (trigger_name, &self.validate_trigger) {
            (Some(name), Some(triggers)) => triggers.iter().any(|t| t == name),
            _ => true,
        }
    }

    pub fn run(&self, input: RuleInput) -> LocalBoxFuture<'static, RuleResult> {
        (self.validator)(input)
    }
}

/// Rule execution policy of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidateFirst {
    /// Run every rule and report every failure.
    #[default]
    All,
    /// Run rules one at a time and stop at the first failure.
    First,
    /// Run every rule concurrently and report only the failure of the
    /// lowest-indexed failing rule.
    Parallel,
}

impl From<bool> for ValidateFirst {
    fn from(first: bool) -> Self {
        if first { Self::First } else { Self::All }
    }
}
