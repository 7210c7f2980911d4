//! Keyed document paths.
//!
//! A path is an ordered list of [`Segment`]s: object field names, array
//! positions, and `{_key}` references that address an array member by its
//! stable identity regardless of where it currently sits in the array.
//!
//! # Example
//!
//! ```
//! use docpatch_path::{get, path, starts_with, trim_child_path, Segment};
//! use serde_json::json;
//!
//! let doc = json!({"items": [{"_key": "a", "title": "First"}, {"_key": "b", "title": "Second"}]});
//!
//! let title = path!["items", Segment::key("b"), "title"];
//! assert_eq!(get(&doc, &title), Some(&json!("Second")));
//!
//! let base = path!["items", Segment::key("b")];
//! assert!(starts_with(&base, &title));
//! assert_eq!(trim_child_path(&base, &title), path!["title"]);
//! ```

use thiserror::Error;

pub mod types;
pub use types::{KeyedSegment, Path, Segment, FOCUS_TERMINATOR};

pub mod get;
pub use get::{get, get_mut, index_for_key};

pub mod string;
pub use string::{parse_path, to_path_string};

pub mod validate;
pub use validate::{validate_path, MAX_PATH_LENGTH};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("invalid path syntax at offset {offset}")]
    Syntax { offset: usize },
    #[error("path too long ({len} segments)")]
    PathTooLong { len: usize },
    #[error("empty _key at segment {position}")]
    EmptyKey { position: usize },
    #[error("focus terminator at segment {position} is not the last segment")]
    MisplacedFocusTerminator { position: usize },
}

/// Compare two segments.
///
/// Key segments compare by `_key`. An index never equals a key segment, even
/// when the keyed member happens to sit at that index.
pub fn is_segment_equal(a: &Segment, b: &Segment) -> bool {
    match (a, b) {
        (Segment::Field(x), Segment::Field(y)) => x == y,
        (Segment::Index(x), Segment::Index(y)) => x == y,
        (Segment::Key(x), Segment::Key(y)) => x.key == y.key,
        _ => false,
    }
}

/// Check if two paths are equal.
pub fn is_equal(a: &[Segment], b: &[Segment]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| is_segment_equal(x, y))
}

/// Number of leading segments the two paths have in common.
pub fn num_equal_segments(a: &[Segment], b: &[Segment]) -> usize {
    a.iter()
        .zip(b)
        .take_while(|(x, y)| is_segment_equal(x, y))
        .count()
}

/// Check if `candidate` starts with every segment of `base`.
///
/// A path starts with itself, and every path starts with the root.
///
/// # Example
///
/// ```
/// use docpatch_path::{path, starts_with};
///
/// assert!(starts_with(&path!["a"], &path!["a", "b"]));
/// assert!(starts_with(&path!["a", "b"], &path!["a", "b"]));
/// assert!(!starts_with(&path!["a", "b"], &path!["a"]));
/// ```
pub fn starts_with(base: &[Segment], candidate: &[Segment]) -> bool {
    base.len() <= candidate.len() && num_equal_segments(base, candidate) == base.len()
}

/// Strip the leading segments `path` shares with `prefix`.
///
/// Stops at the first mismatch and returns whatever remains of `path`.
pub fn trim_left(prefix: &[Segment], path: &[Segment]) -> Path {
    let shared = num_equal_segments(prefix, path);
    Path::from(&path[shared..])
}

/// Re-scope `full` to be relative to `base`.
///
/// Returns the root path when `full` is not inside `base`.
///
/// # Example
///
/// ```
/// use docpatch_path::{path, trim_child_path};
///
/// assert_eq!(trim_child_path(&path!["a"], &path!["a", "b", 0]), path!["b", 0]);
/// assert_eq!(trim_child_path(&path!["x"], &path!["a", "b"]), path![]);
/// ```
pub fn trim_child_path(base: &[Segment], full: &[Segment]) -> Path {
    if starts_with(base, full) {
        Path::from(&full[base.len()..])
    } else {
        Path::root()
    }
}
