#![forbid(unsafe_code)]

//! fform public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users. The
//! [`prelude`] re-exports the types a binding layer touches day to day.

pub use fform_core as core;
#[cfg(feature = "runtime")]
pub use fform_runtime as runtime;

pub mod prelude {
    pub use fform_core::{NamePath, Segment, ValidateMessages, Value, path};

    #[cfg(feature = "runtime")]
    pub use fform_runtime::{
        Callbacks, Field, FieldData, FieldList, FieldProps, FormConfig, FormStore, NameList,
        Rule, RuleFailure, RuleInput, ShouldUpdate, ValidateError, ValidateFirst,
        ValidateOptions,
    };
}
