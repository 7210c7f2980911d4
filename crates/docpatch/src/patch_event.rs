//! Ordered, immutable batches of patches.
//!
//! Nested editors emit a [`PatchEvent`] relative to their own value; each
//! parent on the way up calls [`PatchEvent::prefix_all`] with the segment the
//! child lives under. Composition never reorders patches.

use serde::{Deserialize, Serialize};

use docpatch_path::Segment;

use crate::patch::util::prefix_path;
use crate::patch::Patch;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatchEvent {
    patches: Vec<Patch>,
}

impl PatchEvent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an event from parts, flattening one level: each part may be a
    /// single patch, a list of patches, or another event.
    ///
    /// ```
    /// use docpatch::{path, Patch, PatchEvent};
    ///
    /// let ev = PatchEvent::from_parts([
    ///     PatchEvent::from(Patch::unset(path!["a"])),
    ///     PatchEvent::from(vec![Patch::unset(path!["b"]), Patch::unset(path!["c"])]),
    /// ]);
    /// assert_eq!(ev.len(), 3);
    /// ```
    pub fn from_parts<I, P>(parts: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PatchEvent>,
    {
        let patches = parts
            .into_iter()
            .flat_map(|part| part.into().patches)
            .collect();
        Self { patches }
    }

    /// Returns a new event with `other`'s patches before this event's.
    pub fn prepend(self, other: impl Into<PatchEvent>) -> Self {
        let mut patches = other.into().patches;
        patches.extend(self.patches);
        Self { patches }
    }

    /// Returns a new event with `other`'s patches after this event's.
    pub fn append(mut self, other: impl Into<PatchEvent>) -> Self {
        self.patches.extend(other.into().patches);
        self
    }

    /// Returns a new event with `segment` unshifted onto every patch path.
    pub fn prefix_all(self, segment: impl Into<Segment>) -> Self {
        let segment = segment.into();
        let patches = self
            .patches
            .iter()
            .map(|p| prefix_path(p, segment.clone()))
            .collect();
        Self { patches }
    }

    #[inline]
    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    #[inline]
    pub fn into_patches(self) -> Vec<Patch> {
        self.patches
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.patches.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Patch> {
        self.patches.iter()
    }
}

impl From<Patch> for PatchEvent {
    fn from(patch: Patch) -> Self {
        Self {
            patches: vec![patch],
        }
    }
}

impl From<Vec<Patch>> for PatchEvent {
    fn from(patches: Vec<Patch>) -> Self {
        Self { patches }
    }
}

impl FromIterator<Patch> for PatchEvent {
    fn from_iter<I: IntoIterator<Item = Patch>>(iter: I) -> Self {
        Self {
            patches: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for PatchEvent {
    type Item = Patch;
    type IntoIter = std::vec::IntoIter<Patch>;

    fn into_iter(self) -> Self::IntoIter {
        self.patches.into_iter()
    }
}

impl<'a> IntoIterator for &'a PatchEvent {
    type Item = &'a Patch;
    type IntoIter = std::slice::Iter<'a, Patch>;

    fn into_iter(self) -> Self::IntoIter {
        self.patches.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docpatch_path::path;

    #[test]
    fn prepend_and_append_keep_order() {
        let ev = PatchEvent::from(Patch::set(path!["b"], 2))
            .prepend(Patch::set(path!["a"], 1))
            .append(vec![Patch::set(path!["c"], 3)]);
        let names: Vec<_> = ev.iter().map(|p| p.path()[0].to_string()).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn prefix_all_unshifts_every_path() {
        let ev = PatchEvent::from(vec![Patch::unset(path!["x"]), Patch::set(path![], 1)])
            .prefix_all(Segment::key("k"))
            .prefix_all("body");
        assert_eq!(
            ev.into_patches(),
            vec![
                Patch::unset(path!["body", Segment::key("k"), "x"]),
                Patch::set(path!["body", Segment::key("k")], 1),
            ]
        );
    }

    #[test]
    fn empty_event() {
        let ev = PatchEvent::new();
        assert!(ev.is_empty());
        assert!(ev.prefix_all("a").is_empty());
    }

    #[test]
    fn serializes_as_plain_list() {
        let ev = PatchEvent::from(Patch::unset(path!["a"]));
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v, serde_json::json!([{"type": "unset", "path": ["a"]}]));
    }
}
