#![forbid(unsafe_code)]

//! Core data layer for fform.
//!
//! # Role in fform
//! `fform-core` holds the plain data the form engine works on: the
//! [`Value`] tree, the canonical [`NamePath`], the copy-on-write accessors in
//! [`access`], the path-keyed [`NameMap`] and the validate-message table.
//! It has no notion of fields, observers or async; those live in
//! `fform-runtime`.
//!
//! # How it fits in the system
//! The runtime's form store keeps one [`Store`] value and replaces it on every
//! write through [`access::set`] / [`access::set_values`]. Because the
//! collections are persistent, the previous store stays valid and cheap to
//! keep around for change detection.

pub mod access;
pub mod messages;
pub mod name_map;
pub mod path;
pub mod value;

pub use access::{MAX_LIST_GAP, clone_by_paths, get, merge_all, move_item, set, set_values};
pub use messages::ValidateMessages;
pub use name_map::NameMap;
pub use path::{NamePath, Segment, contains_path, match_path, to_path};
pub use value::{List, Map, Store, Value};
