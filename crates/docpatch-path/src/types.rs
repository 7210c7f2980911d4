//! Type definitions for document paths.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Field segment that marks "the value itself" at the end of a focus path.
pub const FOCUS_TERMINATOR: &str = "$";

/// Addresses an array member by its stable `_key` instead of its position.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyedSegment {
    #[serde(rename = "_key")]
    pub key: String,
}

impl KeyedSegment {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// A single step in a [`Path`].
///
/// Serializes to the same shape the editing surface sends over the wire:
/// a string for object fields, a non-negative integer for array positions,
/// and `{"_key": "..."}` for keyed array members.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Segment {
    Index(usize),
    Field(String),
    Key(KeyedSegment),
}

impl Segment {
    #[inline]
    pub fn field(name: impl Into<String>) -> Self {
        Segment::Field(name.into())
    }

    #[inline]
    pub fn index(i: usize) -> Self {
        Segment::Index(i)
    }

    #[inline]
    pub fn key(key: impl Into<String>) -> Self {
        Segment::Key(KeyedSegment::new(key))
    }

    /// The focus terminator segment (`"$"`).
    #[inline]
    pub fn focus_terminator() -> Self {
        Segment::Field(FOCUS_TERMINATOR.to_string())
    }

    #[inline]
    pub fn is_focus_terminator(&self) -> bool {
        matches!(self, Segment::Field(f) if f == FOCUS_TERMINATOR)
    }

    /// True for segments that can only be resolved against an array.
    #[inline]
    pub fn is_array_segment(&self) -> bool {
        matches!(self, Segment::Index(_) | Segment::Key(_))
    }

    #[inline]
    pub fn as_field(&self) -> Option<&str> {
        match self {
            Segment::Field(f) => Some(f),
            _ => None,
        }
    }

    #[inline]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Segment::Index(i) => Some(*i),
            _ => None,
        }
    }

    #[inline]
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Segment::Key(k) => Some(&k.key),
            _ => None,
        }
    }

    /// Short name of the segment kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Segment::Index(_) => "index",
            Segment::Field(_) => "field",
            Segment::Key(_) => "key",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Index(i) => write!(f, "[{i}]"),
            Segment::Field(name) => write!(f, "{name}"),
            Segment::Key(k) => write!(f, "[_key=={:?}]", k.key),
        }
    }
}

impl From<&str> for Segment {
    fn from(s: &str) -> Self {
        Segment::Field(s.to_owned())
    }
}

impl From<String> for Segment {
    fn from(s: String) -> Self {
        Segment::Field(s)
    }
}

impl From<usize> for Segment {
    fn from(i: usize) -> Self {
        Segment::Index(i)
    }
}

impl From<KeyedSegment> for Segment {
    fn from(k: KeyedSegment) -> Self {
        Segment::Key(k)
    }
}

/// An ordered sequence of segments addressing a location in a document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<Segment>);

impl Path {
    #[inline]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// The empty path, addressing the document itself.
    #[inline]
    pub fn root() -> Self {
        Self::new()
    }

    #[inline]
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self(segments)
    }

    /// Append a field segment (builder).
    #[inline]
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.0.push(Segment::Field(name.into()));
        self
    }

    /// Append an index segment (builder).
    #[inline]
    pub fn index(mut self, i: usize) -> Self {
        self.0.push(Segment::Index(i));
        self
    }

    /// Append a key segment (builder).
    #[inline]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.0.push(Segment::key(key));
        self
    }

    #[inline]
    pub fn push(&mut self, segment: Segment) {
        self.0.push(segment);
    }

    #[inline]
    pub fn pop(&mut self) -> Option<Segment> {
        self.0.pop()
    }

    /// Returns a new path with `segment` unshifted onto the front.
    pub fn prepended(&self, segment: Segment) -> Path {
        let mut segments = Vec::with_capacity(self.0.len() + 1);
        segments.push(segment);
        segments.extend(self.0.iter().cloned());
        Path(segments)
    }

    /// Unshift `segment` onto the front of this path in place.
    #[inline]
    pub fn unshift(&mut self, segment: Segment) {
        self.0.insert(0, segment);
    }

    /// Returns `self` followed by all segments of `other`.
    pub fn join(&self, other: &[Segment]) -> Path {
        let mut segments = self.0.clone();
        segments.extend(other.iter().cloned());
        Path(segments)
    }

    /// The path without its last segment, or `None` for the root.
    pub fn parent(&self) -> Option<Path> {
        self.0.split_last().map(|(_, rest)| Path(rest.to_vec()))
    }

    #[inline]
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    #[inline]
    pub fn into_segments(self) -> Vec<Segment> {
        self.0
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// True when the path ends with [`FOCUS_TERMINATOR`].
    pub fn has_focus_terminator(&self) -> bool {
        self.0.last().is_some_and(Segment::is_focus_terminator)
    }

    /// The path with a trailing focus terminator removed.
    pub fn without_focus_terminator(&self) -> &[Segment] {
        match self.0.split_last() {
            Some((last, rest)) if last.is_focus_terminator() => rest,
            _ => &self.0,
        }
    }
}

impl std::ops::Deref for Path {
    type Target = [Segment];

    fn deref(&self) -> &[Segment] {
        &self.0
    }
}

impl AsRef<[Segment]> for Path {
    fn as_ref(&self) -> &[Segment] {
        &self.0
    }
}

impl From<Vec<Segment>> for Path {
    fn from(segments: Vec<Segment>) -> Self {
        Path(segments)
    }
}

impl From<&[Segment]> for Path {
    fn from(segments: &[Segment]) -> Self {
        Path(segments.to_vec())
    }
}

impl FromIterator<Segment> for Path {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        Path(iter.into_iter().collect())
    }
}

impl IntoIterator for Path {
    type Item = Segment;
    type IntoIter = std::vec::IntoIter<Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::string::to_path_string(&self.0))
    }
}

/// Construct a [`Path`] from a list of segments.
///
/// String literals become field segments and integers become index segments.
/// Use [`Segment::key`] for keyed segments.
///
/// ```
/// use docpatch_path::{path, Segment};
///
/// let p = path!["items", Segment::key("a1"), "title"];
/// assert_eq!(p.len(), 3);
/// let q = path!["rows", 0];
/// assert_eq!(q[1], Segment::Index(0));
/// ```
#[macro_export]
macro_rules! path {
    () => {
        $crate::Path::root()
    };
    ($($seg:expr),+ $(,)?) => {{
        let mut p = $crate::Path::root();
        $(
            p.push($crate::Segment::from($seg));
        )+
        p
    }};
}
