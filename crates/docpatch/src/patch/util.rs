//! Helpers for re-addressing and filtering patches by path.

use docpatch_path::{starts_with, Path, Segment};

use super::types::Patch;

/// Returns `patch` with `segment` unshifted onto its path.
///
/// Used when a nested editor's patches bubble up to its parent, which knows
/// the segment under which the child lives.
///
/// ```
/// use docpatch::{path, prefix_path, Patch};
///
/// let p = prefix_path(&Patch::set(path!["title"], "B"), "post".into());
/// assert_eq!(p, Patch::set(path!["post", "title"], "B"));
/// ```
pub fn prefix_path(patch: &Patch, segment: Segment) -> Patch {
    let path = patch.path().prepended(segment);
    patch.clone().with_path(path)
}

/// Creates a closure that returns `true` if a patch's path starts with
/// `prefix`.
///
/// A patch at `prefix` itself matches.
pub fn matcher(prefix: &Path) -> impl Fn(&Patch) -> bool + '_ {
    move |patch: &Patch| starts_with(prefix, patch.path())
}
