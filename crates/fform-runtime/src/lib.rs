#![forbid(unsafe_code)]

//! Reactive runtime for fform.
//!
//! # Role in fform
//! `fform-runtime` turns the plain data of `fform-core` into a live form: a
//! [`FormStore`] that owns the value tree, the [`Field`] observers bound to
//! paths in it, and the async validation that runs their [`Rule`]s.
//!
//! # How it fits in the system
//! A binding layer (a UI toolkit, a test, a headless driver) creates one
//! `FormStore` per form and one `Field` per control, mounts them, and feeds
//! user input through [`Field::trigger_change`]. The store notifies every
//! registered field synchronously; validation sessions run on the
//! `LocalSpawn` handle the store was created with.
//!
//! ```ignore
//! let mut pool = LocalPool::new();
//! let form = FormStore::new(pool.spawner());
//! let age = Field::new(&form, FieldProps::new("age").rule(Rule::sync(|input| {
//!     match input.value.as_ref().and_then(Value::as_f64) {
//!         Some(n) if n >= 18.0 => Ok(()),
//!         _ => Err(RuleFailure::message("too young")),
//!     }
//! })));
//! age.mount();
//! age.trigger_change(Some(Value::from(12)));
//! pool.run_until_stalled();
//! assert_eq!(age.errors(), vec!["too young".to_string()]);
//! ```

pub mod config;
pub mod entity;
pub mod error;
pub mod field;
pub mod list;
pub mod rule;
pub mod store;
pub mod validate;

pub use config::{Callbacks, DEFAULT_TRIGGER, FinishResult, FormConfig, ValidateOptions};
pub use entity::{
    Action, EntityRef, FieldData, FieldEntity, FieldError, FieldSnapshot, Meta, NotifyInfo,
    ValueSource, ValuedNotifyInfo,
};
pub use error::{FormWarning, ValidateError};
pub use fform_core::{NamePath, ValidateMessages, Value};
pub use field::{Field, FieldProps, RenderReason, ShouldUpdate, Subscription};
pub use list::{FieldList, ListField};
pub use rule::{Rule, RuleFailure, RuleInput, RuleResult, ValidateFirst};
pub use store::{FormStore, NameList, Unregister, ValidateHandle, WeakFormStore};
