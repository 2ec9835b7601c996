#![forbid(unsafe_code)]

//! Asynchronous validation.
//!
//! - [`runner`] runs one field's rules under its [`ValidateFirst`] policy.
//! - [`settle`] waits for every field of a session, failures included.
//! - [`guard`] tells a settling pass whether a newer one superseded it.
//!
//! The form store and every field each own a [`SessionGuard`]: the store's
//! decides which session may resolve `Ok`, a field's decides which pass may
//! write its errors.
//!
//! [`ValidateFirst`]: crate::rule::ValidateFirst

pub mod guard;
pub mod runner;
pub mod settle;

pub use guard::{SessionGuard, Ticket};
pub use runner::{RuleContext, validate_rules};
pub use settle::{Settled, all_settled, settle_summary};
