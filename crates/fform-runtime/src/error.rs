#![forbid(unsafe_code)]

//! Errors and development warnings.
//!
//! Two kinds of trouble exist in the form engine:
//!
//! - [`ValidateError`] is a real outcome. `validate_fields` resolves to it
//!   when rules fail or when a newer session superseded this one. `submit`
//!   catches it and hands it to `on_finish_failed`.
//! - [`FormWarning`] is never returned. Misconfiguration (conflicting initial
//!   values, bad list indices and so on) is logged through `tracing` and the
//!   operation degrades to a no-op or a sensible fallback.

use fform_core::{NamePath, Value};
use thiserror::Error;

use crate::entity::FieldError;

/// Structured rejection of a validation session.
#[derive(Debug, Clone, PartialEq, Error)]
#[error(
    "validation failed: {} field(s) with errors (out_of_date: {out_of_date})",
    .error_fields.len()
)]
pub struct ValidateError {
    /// Current values restricted to the validated paths.
    pub values: Value,
    /// Fields that reported at least one error, in registration order.
    pub error_fields: Vec<FieldError>,
    /// True when a newer session was issued before this one settled.
    pub out_of_date: bool,
}

impl ValidateError {
    #[must_use]
    pub fn out_of_date(values: Value) -> Self {
        Self {
            values,
            error_fields: Vec::new(),
            out_of_date: true,
        }
    }

    /// Error messages reported for `path`, if that field failed.
    #[must_use]
    pub fn errors_for(&self, path: &NamePath) -> Option<&[String]> {
        self.error_fields
            .iter()
            .find(|field| &field.name == path)
            .map(|field| field.errors.as_slice())
    }
}

/// Development-time misconfiguration. Logged, never propagated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormWarning {
    #[error("multiple fields at '{path}' set an initial value; none applied")]
    ConflictingInitialValue { path: NamePath },

    #[error("form initial values already cover '{path}'; field initial value ignored")]
    ShadowedInitialValue { path: NamePath },

    #[error("list add index {index} is out of range for '{path}' (len {len}); appended")]
    ListAddIndexOutOfRange {
        path: NamePath,
        index: usize,
        len: usize,
    },

    #[error("current value of '{path}' is not a list; treated as empty")]
    ListValueNotArray { path: NamePath },

    #[error("preserve should not be set on a direct list item ('{path}')")]
    PreserveOnListItem { path: NamePath },

    #[error("field with rules has no name; its rules can never be validated by path")]
    MissingFieldName,

    #[error("could not spawn {task}: {reason}")]
    SpawnFailed { task: &'static str, reason: String },

    #[error("on_finish callback failed: {reason}")]
    FinishCallbackFailed { reason: String },
}

impl FormWarning {
    /// Stable machine-readable name of the warning.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ConflictingInitialValue { .. } => "conflicting_initial_value",
            Self::ShadowedInitialValue { .. } => "shadowed_initial_value",
            Self::ListAddIndexOutOfRange { .. } => "list_add_index_out_of_range",
            Self::ListValueNotArray { .. } => "list_value_not_array",
            Self::PreserveOnListItem { .. } => "preserve_on_list_item",
            Self::MissingFieldName => "missing_field_name",
            Self::SpawnFailed { .. } => "spawn_failed",
            Self::FinishCallbackFailed { .. } => "finish_callback_failed",
        }
    }

    /// Log the warning.
    pub fn emit(&self) {
        tracing::warn!(message = "form.warning", kind = self.kind(), detail = %self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fform_core::path;

    #[test]
    fn validate_error_display_mentions_staleness() {
        let err = ValidateError::out_of_date(Value::empty_map());
        assert_eq!(err.to_string(), "validation failed: 0 field(s) with errors (out_of_date: true)");
    }

    #[test]
    fn errors_for_finds_failed_field() {
        let err = ValidateError {
            values: Value::empty_map(),
            error_fields: vec![FieldError {
                name: path!["b"],
                errors: vec!["too small".into()],
            }],
            out_of_date: false,
        };
        assert_eq!(err.errors_for(&path!["b"]), Some(&["too small".to_string()][..]));
        assert_eq!(err.errors_for(&path!["a"]), None);
        assert_eq!(err.to_string(), "validation failed: 1 field(s) with errors (out_of_date: false)");
    }

    #[test]
    fn warning_messages_name_the_path() {
        let warning = FormWarning::ConflictingInitialValue {
            path: path!["user", "name"],
        };
        assert_eq!(warning.kind(), "conflicting_initial_value");
        assert!(warning.to_string().contains("'user.name'"));
    }
}
