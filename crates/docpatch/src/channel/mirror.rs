//! Subscriber-side helpers: narrowing messages to a subtree and keeping a
//! shadow copy of it current.

use std::borrow::Cow;

use serde_json::{Map, Value};

use docpatch_path::{get, is_equal, starts_with, trim_child_path, Path, Segment};

use super::ChannelMessage;
use crate::patch::{apply_all, Origin, OriginPatch, Patch, PatchError};

/// Whether `patch` is an `insert` anchored on the array member at `base`.
///
/// Such an insert edits the array around the member rather than the member
/// itself, so it must not be re-rooted onto it.
fn anchors_on(base: &[Segment], patch: &Patch) -> bool {
    matches!(patch, Patch::Insert { .. })
        && base.last().is_some_and(Segment::is_array_segment)
        && is_equal(base, patch.path())
}

/// The patches of `message` that touch `base` or something below it,
/// re-rooted so their paths are relative to `base`.
///
/// An `insert` anchored on `base` itself edits the surrounding array and is
/// left out.
///
/// ```
/// use docpatch::channel::{scope_message, ChannelMessage};
/// use docpatch::{path, Origin, Patch, PatchEvent, Segment};
///
/// let msg = ChannelMessage::from_event(
///     PatchEvent::from(vec![
///         Patch::set(path!["body", Segment::key("p1"), "text"], "hi"),
///         Patch::set(path!["title"], "T"),
///     ]),
///     Origin::Remote,
///     None,
/// );
/// let scoped = scope_message(&path!["body", Segment::key("p1")], &msg);
/// assert_eq!(scoped.len(), 1);
/// assert_eq!(scoped[0].path(), &path!["text"]);
/// ```
pub fn scope_message(base: &[Segment], message: &ChannelMessage) -> Vec<OriginPatch> {
    message
        .patches
        .iter()
        .filter(|op| starts_with(base, op.path()) && !anchors_on(base, &op.patch))
        .map(|op| OriginPatch {
            patch: op.patch.clone().with_path(trim_child_path(base, op.path())),
            origin: op.origin,
            timestamp: op.timestamp,
        })
        .collect()
}

fn with_key(mut member: Value, key: &str) -> Value {
    if let Value::Object(map) = &mut member {
        if !map.contains_key("_key") {
            map.insert("_key".to_string(), Value::String(key.to_string()));
        }
    }
    member
}

/// The smallest document holding `value` at `base`.
///
/// Containers along `base` are created; when `value` is `None` the innermost
/// container is left without the member. Index segments are padded with
/// `null`.
fn skeleton(base: &[Segment], value: Option<Value>) -> Option<Value> {
    base.iter().rev().fold(value, |inner, segment| {
        Some(match segment {
            Segment::Field(name) => {
                let mut map = Map::new();
                if let Some(inner) = inner {
                    map.insert(name.clone(), inner);
                }
                Value::Object(map)
            }
            Segment::Key(k) => Value::Array(
                inner
                    .map(|member| with_key(member, &k.key))
                    .into_iter()
                    .collect(),
            ),
            Segment::Index(i) => {
                let mut items = vec![Value::Null; *i];
                items.extend(inner);
                Value::Array(items)
            }
        })
    })
}

/// Shadow copy of the value at `base`, kept current from channel messages.
///
/// Echoes of local edits are ignored by default since the editing surface
/// already shows them. A patch addressed above `base` (such as a rebase's
/// whole-document replace), or an `insert` anchored on it, changes the
/// subtree from outside. The copy is then taken from the message snapshot
/// when there is one. Otherwise the patches are replayed against a minimal
/// document built around the current copy.
///
/// Index segments in `base` follow a position, not a member. Inserts and
/// removals of siblings that shift it are not tracked; address array
/// members by `_key` instead.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtreeMirror {
    base: Path,
    value: Option<Value>,
    include_local: bool,
}

impl SubtreeMirror {
    pub fn new(base: Path) -> Self {
        Self {
            base,
            value: None,
            include_local: false,
        }
    }

    /// Start from the value at `base` inside `document`.
    pub fn from_snapshot(base: Path, document: Option<&Value>) -> Self {
        let value = document.and_then(|doc| get(doc, &base)).cloned();
        Self {
            base,
            value,
            include_local: false,
        }
    }

    /// Also apply patches tagged [`Origin::Local`].
    pub fn including_local(mut self) -> Self {
        self.include_local = true;
        self
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Apply the relevant part of `message`. Returns whether the mirrored
    /// value changed.
    ///
    /// On error the mirror keeps its previous value.
    pub fn receive(&mut self, message: &ChannelMessage) -> Result<bool, PatchError> {
        let mut relevant: Vec<&Patch> = Vec::new();
        let mut from_outside = false;
        for op in &message.patches {
            if op.origin == Origin::Local && !self.include_local {
                continue;
            }
            let path = op.path();
            let outside = anchors_on(&self.base, &op.patch)
                || (starts_with(path, &self.base) && !is_equal(path, &self.base));
            if outside || starts_with(&self.base, path) {
                from_outside |= outside;
                relevant.push(&op.patch);
            }
        }
        if relevant.is_empty() {
            return Ok(false);
        }

        let next = if from_outside {
            match &message.snapshot {
                Some(doc) => get(doc, &self.base).cloned(),
                None => self.replay(&relevant)?,
            }
        } else {
            let scoped: Vec<Patch> = relevant
                .iter()
                .map(|patch| {
                    let path = trim_child_path(&self.base, patch.path());
                    (*patch).clone().with_path(path)
                })
                .collect();
            match apply_all(self.value.as_ref(), &scoped)? {
                Some(Cow::Borrowed(_)) => return Ok(false),
                Some(Cow::Owned(value)) => Some(value),
                None => None,
            }
        };
        let changed = next != self.value;
        self.value = next;
        Ok(changed)
    }

    /// Apply full-path patches to a skeleton document around the current
    /// copy and read the subtree back out.
    fn replay(&self, patches: &[&Patch]) -> Result<Option<Value>, PatchError> {
        let doc = skeleton(&self.base, self.value.clone());
        let patches: Vec<Patch> = patches.iter().map(|patch| (*patch).clone()).collect();
        let result = apply_all(doc.as_ref(), &patches)?;
        Ok(result.and_then(|doc| get(&doc, &self.base).cloned()))
    }
}
