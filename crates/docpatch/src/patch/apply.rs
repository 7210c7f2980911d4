//! The patch reducer.
//!
//! Documents are threaded through as `Option<Cow<Value>>`: `None` is the
//! absent document, and a patch that changes nothing hands its input back
//! untouched. The first effective patch clones the document once; every later
//! patch in the same fold mutates that owned copy.

use std::borrow::Cow;

use serde_json::{Number, Value};

use docpatch_path::{validate_path, Path, Segment};

use super::text::apply_text_patch;
use super::types::{shape_of, ApplyOptions, InsertPosition, Patch, PatchError};
use crate::keys::{ensure_array_keys, resolve_index, KeyGenerator};

// ── Path navigation ───────────────────────────────────────────────────────

fn target_error(at: &[Segment], segment: &Segment, found: &Value) -> PatchError {
    PatchError::Target {
        path: Path::from(at),
        segment: segment.clone(),
        found: shape_of(found),
    }
}

fn not_found(path: &[Segment]) -> PatchError {
    PatchError::NotFound {
        path: Path::from(path),
    }
}

/// One step down, failing when `segment` does not fit `current`'s shape.
fn step<'v>(
    current: &'v Value,
    segment: &Segment,
    at: &[Segment],
) -> Result<Option<&'v Value>, PatchError> {
    match (segment, current) {
        (Segment::Field(name), Value::Object(map)) => Ok(map.get(name)),
        (Segment::Index(_) | Segment::Key(_), Value::Array(arr)) => {
            Ok(resolve_index(arr, segment).map(|i| &arr[i]))
        }
        (_, other) => Err(target_error(at, segment, other)),
    }
}

fn step_mut<'v>(
    current: &'v mut Value,
    segment: &Segment,
    at: &[Segment],
) -> Result<Option<&'v mut Value>, PatchError> {
    match (segment, current) {
        (Segment::Field(name), Value::Object(map)) => Ok(map.get_mut(name)),
        (Segment::Index(_) | Segment::Key(_), Value::Array(arr)) => {
            Ok(resolve_index(arr, segment).and_then(|i| arr.get_mut(i)))
        }
        (_, other) => Err(target_error(at, segment, other)),
    }
}

/// Strict lookup: `Ok(None)` when something along `path` is missing, an error
/// when a segment meets the wrong kind of container.
fn probe<'v>(doc: &'v Value, path: &[Segment]) -> Result<Option<&'v Value>, PatchError> {
    let mut current = doc;
    for (depth, segment) in path.iter().enumerate() {
        match step(current, segment, &path[..depth])? {
            Some(next) => current = next,
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}

/// Walk to the value at `path`, which must exist.
fn walk_mut<'v>(doc: &'v mut Value, path: &[Segment]) -> Result<&'v mut Value, PatchError> {
    let mut current = doc;
    for (depth, segment) in path.iter().enumerate() {
        current = match step_mut(current, segment, &path[..depth])? {
            Some(next) => next,
            None => return Err(not_found(&path[..=depth])),
        };
    }
    Ok(current)
}

// ── Individual patch applicators ──────────────────────────────────────────

fn add_number(target: &mut Value, delta: f64, path: &[Segment]) -> Result<(), PatchError> {
    let Value::Number(current) = target else {
        return Err(PatchError::NotANumber {
            path: Path::from(path),
            found: shape_of(target),
        });
    };
    if !delta.is_finite() {
        return Err(PatchError::NonFinite {
            path: Path::from(path),
        });
    }
    // integers stay integers while both operands are integral
    if let Some(int) = current.as_i64() {
        // i64::MAX as f64 rounds up to 2^63, which is out of range
        if delta.fract() == 0.0 && delta >= i64::MIN as f64 && delta < i64::MAX as f64 {
            if let Some(sum) = int.checked_add(delta as i64) {
                *target = Value::from(sum);
                return Ok(());
            }
        }
    }
    let sum = current.as_f64().map(|n| n + delta);
    *target = sum
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| PatchError::NonFinite {
            path: Path::from(path),
        })?;
    Ok(())
}

fn set_at(
    parent: &mut Value,
    last: &Segment,
    value: Value,
    path: &[Segment],
) -> Result<(), PatchError> {
    let at = &path[..path.len() - 1];
    match (last, parent) {
        (Segment::Field(name), Value::Object(map)) => {
            map.insert(name.clone(), value);
            Ok(())
        }
        (Segment::Index(i), Value::Array(arr)) => {
            let len = arr.len();
            if *i < len {
                arr[*i] = value;
            } else if *i == len {
                arr.push(value);
            } else {
                return Err(PatchError::IndexOutOfBounds {
                    path: Path::from(path),
                    index: *i,
                    len,
                });
            }
            Ok(())
        }
        (Segment::Key(k), Value::Array(arr)) => {
            let idx = resolve_index(arr, last).ok_or_else(|| PatchError::KeyNotFound {
                path: Path::from(at),
                key: k.key.clone(),
            })?;
            arr[idx] = value;
            Ok(())
        }
        (_, other) => Err(target_error(at, last, other)),
    }
}

fn unset_at(parent: &mut Value, last: &Segment) {
    match (last, parent) {
        (Segment::Field(name), Value::Object(map)) => {
            map.shift_remove(name);
        }
        (Segment::Index(_) | Segment::Key(_), Value::Array(arr)) => {
            if let Some(idx) = resolve_index(arr, last) {
                arr.remove(idx);
            }
        }
        _ => {}
    }
}

fn splice_whole(
    target: &mut Value,
    position: InsertPosition,
    items: &[Value],
    path: &[Segment],
) -> Result<(), PatchError> {
    let Value::Array(arr) = target else {
        return Err(PatchError::NotAnArray {
            path: Path::from(path),
            found: shape_of(target),
        });
    };
    match position {
        InsertPosition::Before => {
            arr.splice(0..0, items.iter().cloned());
        }
        InsertPosition::After => arr.extend(items.iter().cloned()),
        InsertPosition::Replace => *arr = items.to_vec(),
    }
    Ok(())
}

fn splice_at_anchor(
    arr: &mut Vec<Value>,
    anchor: &Segment,
    position: InsertPosition,
    items: &[Value],
    path: &[Segment],
) -> Result<(), PatchError> {
    let at = &path[..path.len() - 1];
    let idx = match anchor {
        Segment::Index(i) if *i < arr.len() => *i,
        Segment::Index(i) => {
            return Err(PatchError::IndexOutOfBounds {
                path: Path::from(path),
                index: *i,
                len: arr.len(),
            })
        }
        Segment::Key(k) => {
            resolve_index(arr, anchor).ok_or_else(|| PatchError::KeyNotFound {
                path: Path::from(at),
                key: k.key.clone(),
            })?
        }
        Segment::Field(_) => return Err(not_found(path)),
    };
    let items = items.iter().cloned();
    match position {
        InsertPosition::Before => {
            arr.splice(idx..idx, items);
        }
        InsertPosition::After => {
            arr.splice(idx + 1..idx + 1, items);
        }
        InsertPosition::Replace => {
            arr.splice(idx..=idx, items);
        }
    }
    Ok(())
}

fn insert_at(
    parent: &mut Value,
    last: &Segment,
    position: InsertPosition,
    items: &[Value],
    path: &[Segment],
) -> Result<(), PatchError> {
    // An index or key over an array is an anchor; anything else addresses
    // the array to insert into.
    if last.is_array_segment() {
        if let Value::Array(arr) = &mut *parent {
            return splice_at_anchor(arr, last, position, items, path);
        }
    }
    let target = step_mut(parent, last, &path[..path.len() - 1])?
        .ok_or_else(|| not_found(path))?;
    splice_whole(target, position, items, path)
}

/// Apply `patch` to `doc` in place. `patch` must have a non-empty path.
fn apply_in_place(doc: &mut Value, patch: &Patch) -> Result<(), PatchError> {
    let path = patch.path().segments();
    let Some((last, parent_path)) = path.split_last() else {
        return Ok(());
    };
    let parent = walk_mut(doc, parent_path)?;
    match patch {
        Patch::Set { value, .. } | Patch::SetIfMissing { value, .. } => {
            set_at(parent, last, value.clone(), path)
        }
        Patch::Unset { .. } => {
            unset_at(parent, last);
            Ok(())
        }
        Patch::Insert {
            position, items, ..
        } => insert_at(parent, last, *position, items, path),
        Patch::Inc { amount, .. } => {
            let target = step_mut(parent, last, parent_path)?.ok_or_else(|| not_found(path))?;
            add_number(target, *amount, path)
        }
        Patch::Dec { amount, .. } => {
            let target = step_mut(parent, last, parent_path)?.ok_or_else(|| not_found(path))?;
            add_number(target, -*amount, path)
        }
        Patch::DiffMatchPatch { value, .. } => {
            let target = step_mut(parent, last, parent_path)?.ok_or_else(|| not_found(path))?;
            apply_text_patch(target, value, path)
        }
    }
}

fn apply_to_root<'a>(
    doc: Option<Cow<'a, Value>>,
    patch: &Patch,
) -> Result<Option<Cow<'a, Value>>, PatchError> {
    match patch {
        Patch::Set { value, .. } => Ok(Some(Cow::Owned(value.clone()))),
        Patch::Unset { .. } => Ok(None),
        Patch::SetIfMissing { value, .. } => match doc {
            Some(doc) => Ok(Some(doc)),
            None => Ok(Some(Cow::Owned(value.clone()))),
        },
        Patch::Insert {
            position, items, ..
        } => {
            let mut owned = doc.ok_or_else(|| not_found(&[]))?.into_owned();
            splice_whole(&mut owned, *position, items, &[])?;
            Ok(Some(Cow::Owned(owned)))
        }
        Patch::Inc { amount, .. } | Patch::Dec { amount, .. } => {
            let delta = if matches!(patch, Patch::Dec { .. }) {
                -*amount
            } else {
                *amount
            };
            let mut owned = doc.ok_or_else(|| not_found(&[]))?.into_owned();
            add_number(&mut owned, delta, &[])?;
            Ok(Some(Cow::Owned(owned)))
        }
        Patch::DiffMatchPatch { value, .. } => {
            let Some(doc) = doc else {
                return Ok(None);
            };
            let mut owned = doc.into_owned();
            apply_text_patch(&mut owned, value, &[])?;
            Ok(Some(Cow::Owned(owned)))
        }
    }
}

// ── Main apply functions ──────────────────────────────────────────────────

/// Apply a single patch.
///
/// A patch that changes nothing (`setIfMissing` on a present value, `unset`
/// or `diffMatchPatch` of a missing value) returns `doc` as given, so a
/// borrowed input stays borrowed.
pub fn apply_patch<'a>(
    doc: Option<Cow<'a, Value>>,
    patch: &Patch,
) -> Result<Option<Cow<'a, Value>>, PatchError> {
    let path = patch.path();
    if path.iter().any(Segment::is_focus_terminator) {
        return Err(PatchError::FocusTerminator { path: path.clone() });
    }
    validate_path(path)?;
    if path.is_root() {
        return apply_to_root(doc, patch);
    }
    let Some(doc) = doc else {
        return match patch {
            Patch::Unset { .. } | Patch::DiffMatchPatch { .. } => Ok(None),
            _ => Err(not_found(&[])),
        };
    };
    match patch {
        Patch::Unset { .. } | Patch::DiffMatchPatch { .. } if probe(&doc, path)?.is_none() => {
            return Ok(Some(doc))
        }
        Patch::SetIfMissing { .. } if probe(&doc, path)?.is_some() => return Ok(Some(doc)),
        _ => {}
    }
    let mut owned = doc.into_owned();
    apply_in_place(&mut owned, patch)?;
    Ok(Some(Cow::Owned(owned)))
}

/// Apply `patches` in order, as a left fold over [`apply_patch`].
///
/// When every patch is a no-op the result borrows `doc` itself:
///
/// ```
/// use docpatch::{apply_all, path, Patch};
/// use serde_json::json;
///
/// let doc = json!({"_type": "post", "title": "A"});
/// let out = apply_all(Some(&doc), &[Patch::set_if_missing(path!["title"], "B")])
///     .unwrap()
///     .unwrap();
/// assert!(std::ptr::eq(out.as_ref(), &doc));
/// ```
pub fn apply_all<'a>(
    doc: Option<&'a Value>,
    patches: &[Patch],
) -> Result<Option<Cow<'a, Value>>, PatchError> {
    patches
        .iter()
        .try_fold(doc.map(Cow::Borrowed), |acc, patch| apply_patch(acc, patch))
}

/// [`apply_all`], then post-process the result according to `options`.
pub fn apply_all_with<'a>(
    doc: Option<&'a Value>,
    patches: &[Patch],
    options: &ApplyOptions,
) -> Result<Option<Cow<'a, Value>>, PatchError> {
    let result = apply_all(doc, patches)?;
    if !options.ensure_keys {
        return Ok(result);
    }
    let Some(result) = result else {
        return Ok(None);
    };
    let mut keys = KeyGenerator::new().with_length(options.key_length);
    let keyed = match ensure_array_keys(result.as_ref(), &mut keys) {
        Cow::Owned(v) => Some(v),
        Cow::Borrowed(_) => None,
    };
    Ok(Some(keyed.map(Cow::Owned).unwrap_or(result)))
}

/// Owned variant of [`apply_all`] for callers that give up their document.
pub fn apply_patches(doc: Value, patches: &[Patch]) -> Result<Option<Value>, PatchError> {
    let result = patches
        .iter()
        .try_fold(Some(Cow::Owned(doc)), |acc, patch| apply_patch(acc, patch))?;
    Ok(result.map(Cow::into_owned))
}

// ── Tests ─────────────────────────────────────────────────────────────────
