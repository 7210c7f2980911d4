//! String edits in diff-match-patch text form.
//!
//! Patches use the character-indexed ("compat") encoding so that patch text
//! produced by other diff-match-patch implementations applies unchanged.

use diff_match_patch_rs::{Compat, DiffMatchPatch, PatchInput};
use serde_json::Value;
use tracing::debug;

use docpatch_path::{Path, Segment};

use super::types::{shape_of, Patch, PatchError};

/// A `diffMatchPatch` patch at `path` that turns `from` into `to`.
///
/// ```
/// use docpatch::{apply_patches, path, text_diff};
/// use serde_json::json;
///
/// let patch = text_diff(path!["title"], "the quick brown fox", "the quick brown cat").unwrap();
/// let out = apply_patches(json!({"title": "the quick brown fox"}), &[patch]).unwrap();
/// assert_eq!(out, Some(json!({"title": "the quick brown cat"})));
/// ```
pub fn text_diff(path: impl Into<Path>, from: &str, to: &str) -> Result<Patch, PatchError> {
    let dmp = DiffMatchPatch::new();
    let diffs = dmp
        .diff_main::<Compat>(from, to)
        .map_err(|err| PatchError::InvalidPatch(format!("cannot diff strings: {err:?}")))?;
    let patches = dmp
        .patch_make(PatchInput::new_diffs(&diffs))
        .map_err(|err| PatchError::InvalidPatch(format!("cannot build text patch: {err:?}")))?;
    Ok(Patch::diff_match_patch(path, dmp.patch_to_text(&patches)))
}

/// Apply `patch_text` to the string `target`.
///
/// Hunks whose context no longer matches are dropped, the rest still apply.
pub(crate) fn apply_text_patch(
    target: &mut Value,
    patch_text: &str,
    path: &[Segment],
) -> Result<(), PatchError> {
    let Value::String(text) = target else {
        return Err(PatchError::NotAString {
            path: Path::from(path),
            found: shape_of(target),
        });
    };
    let dmp = DiffMatchPatch::new();
    let patches = dmp
        .patch_from_text::<Compat>(patch_text)
        .map_err(|err| PatchError::InvalidPatch(format!("malformed text patch: {err:?}")))?;
    let (next, applied) = dmp
        .patch_apply(&patches, text.as_str())
        .map_err(|err| PatchError::InvalidPatch(format!("cannot apply text patch: {err:?}")))?;
    let rejected = applied.iter().filter(|ok| !**ok).count();
    if rejected > 0 {
        debug!(path = %Path::from(path), rejected, "text patch hunks did not match");
    }
    *text = next;
    Ok(())
}
