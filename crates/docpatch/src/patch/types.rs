//! Core types for the patch module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use docpatch_path::{Path, PathError, Segment};

// ── Error ─────────────────────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PatchError {
    /// A segment was resolved against a container that cannot hold it,
    /// e.g. a `{_key}` segment against an object.
    #[error("cannot resolve {} segment `{segment}` at `{path}` against {found}", .segment.kind())]
    Target {
        path: Path,
        segment: Segment,
        found: &'static str,
    },
    #[error("expected a number at `{path}`, found {found}")]
    NotANumber { path: Path, found: &'static str },
    #[error("expected a string at `{path}`, found {found}")]
    NotAString { path: Path, found: &'static str },
    #[error("expected an array at `{path}`, found {found}")]
    NotAnArray { path: Path, found: &'static str },
    #[error("no value at `{path}`")]
    NotFound { path: Path },
    #[error("no array member with _key {key:?} at `{path}`")]
    KeyNotFound { path: Path, key: String },
    #[error("index {index} out of bounds (len: {len}) at `{path}`")]
    IndexOutOfBounds { path: Path, index: usize, len: usize },
    #[error("numeric result at `{path}` is not finite")]
    NonFinite { path: Path },
    #[error("focus terminator is not a patch target: `{path}`")]
    FocusTerminator { path: Path },
    #[error(transparent)]
    InvalidPath(#[from] PathError),
    #[error("invalid patch: {0}")]
    InvalidPatch(String),
}

/// Name of a value's shape, used in error messages.
pub fn shape_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ── Insert position ───────────────────────────────────────────────────────

/// Where `insert` places its items relative to the addressed anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertPosition {
    Before,
    After,
    /// Items take the anchor's place.
    Replace,
}

impl InsertPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsertPosition::Before => "before",
            InsertPosition::After => "after",
            InsertPosition::Replace => "replace",
        }
    }
}

// ── Patch enum ────────────────────────────────────────────────────────────

/// A path-addressed mutation instruction.
///
/// Constructors do not look at any document; targets are validated when the
/// patch is applied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Patch {
    /// Replace the value at `path`.
    Set { path: Path, value: Value },
    /// Remove the value at `path`. No-op when nothing is there.
    Unset { path: Path },
    /// Set the value at `path` unless a value is already present (`null`
    /// counts as present).
    SetIfMissing { path: Path, value: Value },
    /// Splice `items` into an array. See [`InsertPosition`].
    Insert {
        path: Path,
        position: InsertPosition,
        items: Vec<Value>,
    },
    Inc {
        path: Path,
        #[serde(rename = "value")]
        amount: f64,
    },
    Dec {
        path: Path,
        #[serde(rename = "value")]
        amount: f64,
    },
    /// Apply a diff-match-patch text patch to the string at `path`. No-op
    /// when nothing is there.
    DiffMatchPatch { path: Path, value: String },
}

impl Patch {
    #[inline]
    pub fn set(path: impl Into<Path>, value: impl Into<Value>) -> Self {
        Patch::Set {
            path: path.into(),
            value: value.into(),
        }
    }

    #[inline]
    pub fn unset(path: impl Into<Path>) -> Self {
        Patch::Unset { path: path.into() }
    }

    #[inline]
    pub fn set_if_missing(path: impl Into<Path>, value: impl Into<Value>) -> Self {
        Patch::SetIfMissing {
            path: path.into(),
            value: value.into(),
        }
    }

    #[inline]
    pub fn insert(path: impl Into<Path>, position: InsertPosition, items: Vec<Value>) -> Self {
        Patch::Insert {
            path: path.into(),
            position,
            items,
        }
    }

    #[inline]
    pub fn inc(path: impl Into<Path>, amount: f64) -> Self {
        Patch::Inc {
            path: path.into(),
            amount,
        }
    }

    #[inline]
    pub fn dec(path: impl Into<Path>, amount: f64) -> Self {
        Patch::Dec {
            path: path.into(),
            amount,
        }
    }

    /// `value` is a patch in diff-match-patch text form, such as
    /// `"@@ -1,3 +1,3 @@\n-foo\n+bar\n"`. See
    /// [`text_diff`](super::text::text_diff) to compute one.
    #[inline]
    pub fn diff_match_patch(path: impl Into<Path>, value: impl Into<String>) -> Self {
        Patch::DiffMatchPatch {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Returns the patch type name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Patch::Set { .. } => "set",
            Patch::Unset { .. } => "unset",
            Patch::SetIfMissing { .. } => "setIfMissing",
            Patch::Insert { .. } => "insert",
            Patch::Inc { .. } => "inc",
            Patch::Dec { .. } => "dec",
            Patch::DiffMatchPatch { .. } => "diffMatchPatch",
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Patch::Set { path, .. } => path,
            Patch::Unset { path } => path,
            Patch::SetIfMissing { path, .. } => path,
            Patch::Insert { path, .. } => path,
            Patch::Inc { path, .. } => path,
            Patch::Dec { path, .. } => path,
            Patch::DiffMatchPatch { path, .. } => path,
        }
    }

    pub fn path_mut(&mut self) -> &mut Path {
        match self {
            Patch::Set { path, .. } => path,
            Patch::Unset { path } => path,
            Patch::SetIfMissing { path, .. } => path,
            Patch::Insert { path, .. } => path,
            Patch::Inc { path, .. } => path,
            Patch::Dec { path, .. } => path,
            Patch::DiffMatchPatch { path, .. } => path,
        }
    }

    /// Same patch, addressed at `path` instead.
    pub fn with_path(mut self, path: Path) -> Self {
        *self.path_mut() = path;
        self
    }
}

// ── Origin ────────────────────────────────────────────────────────────────

/// Who produced a patch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// The server's echo of an edit this process sent.
    Local,
    /// An edit made by another collaborator.
    Remote,
    /// Produced by the engine itself, e.g. a rebase replacement.
    Internal,
}

/// A patch tagged with its provenance, as delivered through the channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OriginPatch {
    pub patch: Patch,
    pub origin: Origin,
    pub timestamp: DateTime<Utc>,
}

impl OriginPatch {
    /// Tag `patch` with `origin`, stamped with the current time.
    pub fn new(patch: Patch, origin: Origin) -> Self {
        Self::at(patch, origin, Utc::now())
    }

    pub fn at(patch: Patch, origin: Origin, timestamp: DateTime<Utc>) -> Self {
        Self {
            patch,
            origin,
            timestamp,
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        self.patch.path()
    }
}

// ── Options ───────────────────────────────────────────────────────────────

/// Options for [`apply_all_with`](super::apply::apply_all_with).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplyOptions {
    /// Give every keyless object inside an array a fresh `_key` after the
    /// patches are applied.
    pub ensure_keys: bool,
    /// Length of generated keys.
    pub key_length: usize,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            ensure_keys: false,
            key_length: crate::keys::DEFAULT_KEY_LENGTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docpatch_path::path;
    use serde_json::json;

    #[test]
    fn constructors_and_accessors() {
        let p = Patch::set(path!["title"], "B");
        assert_eq!(p.name(), "set");
        assert_eq!(p.path(), &path!["title"]);

        let p = Patch::set_if_missing(path![], json!({"_type": "post"}));
        assert_eq!(p.name(), "setIfMissing");
        assert!(p.path().is_root());

        let p = Patch::dec(path!["count"], 2.0).with_path(path!["n"]);
        assert_eq!(p, Patch::dec(path!["n"], 2.0));
    }

    #[test]
    fn wire_format() {
        let p = Patch::insert(
            path!["items", Segment::key("a")],
            InsertPosition::After,
            vec![json!({"_key": "c"})],
        );
        assert_eq!(
            serde_json::to_value(&p).unwrap(),
            json!({
                "type": "insert",
                "path": ["items", {"_key": "a"}],
                "position": "after",
                "items": [{"_key": "c"}]
            })
        );

        let inc: Patch =
            serde_json::from_value(json!({"type": "inc", "path": ["n"], "value": 3})).unwrap();
        assert_eq!(inc, Patch::inc(path!["n"], 3.0));

        let dmp: Patch = serde_json::from_value(json!({
            "type": "diffMatchPatch",
            "path": ["title"],
            "value": "@@ -1 +1 @@\n-a\n+b\n"
        }))
        .unwrap();
        assert_eq!(dmp, Patch::diff_match_patch(path!["title"], "@@ -1 +1 @@\n-a\n+b\n"));
        assert_eq!(dmp.name(), "diffMatchPatch");

        let sim: Patch = serde_json::from_value(
            json!({"type": "setIfMissing", "path": [], "value": {"_type": "x"}}),
        )
        .unwrap();
        assert_eq!(sim, Patch::set_if_missing(path![], json!({"_type": "x"})));
    }

    #[test]
    fn target_error_message_names_segment_and_shape() {
        let err = PatchError::Target {
            path: path!["title"],
            segment: Segment::key("a"),
            found: "string",
        };
        assert_eq!(
            err.to_string(),
            r#"cannot resolve key segment `[_key=="a"]` at `title` against string"#
        );
    }

    #[test]
    fn apply_options_defaults() {
        let opts: ApplyOptions = serde_json::from_value(json!({"ensure_keys": true})).unwrap();
        assert!(opts.ensure_keys);
        assert_eq!(opts.key_length, 12);
        assert!(!ApplyOptions::default().ensure_keys);
    }
}
