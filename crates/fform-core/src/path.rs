#![forbid(unsafe_code)]

//! Canonical name paths.
//!
//! A [`NamePath`] addresses a location inside a [`Value`](crate::Value) tree
//! as an ordered sequence of [`Segment`]s. Field names supplied by a binding
//! layer (a bare key, a bare index, or an explicit sequence) are normalized
//! through the `From` conversions or [`to_path`].
//!
//! # Invariants
//!
//! 1. Paths are immutable once constructed; every combinator returns a new
//!    path.
//! 2. Two paths are equal iff they have the same length and are equal
//!    segment by segment. `Key("0")` and `Index(0)` are distinct segments
//!    even though both resolve to the same slot when reading a value.
//! 3. The empty path is the root.

use std::borrow::Cow;
use std::fmt;

/// One step of a [`NamePath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Segment {
    Index(usize),
    Key(String),
}

impl Segment {
    /// The list index this segment addresses, if it is numeric.
    ///
    /// Keys made of decimal digits count as indices so that paths built from
    /// string input can still address list items.
    #[must_use]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(i) => Some(*i),
            Self::Key(key) => key.parse().ok(),
        }
    }

    /// The map key this segment addresses.
    #[must_use]
    pub fn as_key(&self) -> Cow<'_, str> {
        match self {
            Self::Key(key) => Cow::Borrowed(key),
            Self::Index(i) => Cow::Owned(i.to_string()),
        }
    }

    #[must_use]
    pub const fn is_index(&self) -> bool {
        matches!(self, Self::Index(_))
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Key(key) => f.write_str(key),
        }
    }
}

impl From<&str> for Segment {
    fn from(value: &str) -> Self {
        Self::Key(value.to_owned())
    }
}

impl From<String> for Segment {
    fn from(value: String) -> Self {
        Self::Key(value)
    }
}

impl From<usize> for Segment {
    fn from(value: usize) -> Self {
        Self::Index(value)
    }
}

/// Integer literals default to `i32`; negative numbers have no list slot and
/// become plain keys.
impl From<i32> for Segment {
    fn from(value: i32) -> Self {
        match usize::try_from(value) {
            Ok(index) => Self::Index(index),
            Err(_) => Self::Key(value.to_string()),
        }
    }
}

/// An ordered, immutable sequence of segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct NamePath {
    segments: Vec<Segment>,
}

impl NamePath {
    /// The empty path.
    #[must_use]
    pub const fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    #[must_use]
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    #[must_use]
    pub fn first(&self) -> Option<&Segment> {
        self.segments.first()
    }

    #[must_use]
    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// True when `prefix` is a leading run of this path (every path starts
    /// with the root and with itself).
    #[must_use]
    pub fn starts_with(&self, prefix: &NamePath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// A new path with `segment` appended.
    #[must_use]
    pub fn child(&self, segment: impl Into<Segment>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// A new path made of this path followed by `other`.
    #[must_use]
    pub fn join(&self, other: &NamePath) -> Self {
        let mut segments = Vec::with_capacity(self.len() + other.len());
        segments.extend_from_slice(&self.segments);
        segments.extend_from_slice(&other.segments);
        Self { segments }
    }

    /// The path without its last segment; `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let (_, head) = self.segments.split_last()?;
        Some(Self {
            segments: head.to_vec(),
        })
    }
}

impl fmt::Display for NamePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a NamePath {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

impl FromIterator<Segment> for NamePath {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}

impl From<Segment> for NamePath {
    fn from(value: Segment) -> Self {
        Self {
            segments: vec![value],
        }
    }
}

impl From<Vec<Segment>> for NamePath {
    fn from(segments: Vec<Segment>) -> Self {
        Self { segments }
    }
}

impl From<&[Segment]> for NamePath {
    fn from(segments: &[Segment]) -> Self {
        Self {
            segments: segments.to_vec(),
        }
    }
}

impl From<&NamePath> for NamePath {
    fn from(value: &NamePath) -> Self {
        value.clone()
    }
}

impl From<&str> for NamePath {
    fn from(value: &str) -> Self {
        Segment::from(value).into()
    }
}

impl From<String> for NamePath {
    fn from(value: String) -> Self {
        Segment::from(value).into()
    }
}

impl From<usize> for NamePath {
    fn from(value: usize) -> Self {
        Segment::from(value).into()
    }
}

impl From<i32> for NamePath {
    fn from(value: i32) -> Self {
        Segment::from(value).into()
    }
}

/// Normalize an optional field name into a path; `None` is the root.
pub fn to_path<P: Into<NamePath>>(name: Option<P>) -> NamePath {
    name.map(Into::into).unwrap_or_default()
}

/// Exact path equality.
#[must_use]
pub fn match_path(a: &NamePath, b: &NamePath) -> bool {
    a == b
}

/// True iff `target` exactly matches one of `paths`.
#[must_use]
pub fn contains_path(paths: &[NamePath], target: &NamePath) -> bool {
    paths.iter().any(|path| match_path(path, target))
}

/// Build a [`NamePath`] from mixed key/index literals.
///
/// ```
/// use fform_core::{path, NamePath, Segment};
///
/// let p = path!["users", 0, "email"];
/// assert_eq!(p.segments()[1], Segment::Index(0));
/// assert_eq!(path![], NamePath::root());
/// ```
#[macro_export]
macro_rules! path {
    () => {
        $crate::path::NamePath::root()
    };
    ($($segment:expr),+ $(,)?) => {
        $crate::path::NamePath::new(vec![$($crate::path::Segment::from($segment)),+])
    };
}
