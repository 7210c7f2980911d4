use serde_json::Value;

use crate::types::Segment;

/// Position of the first member of `array` whose `_key` equals `key`.
///
/// Duplicate keys resolve to the first match without any diagnostic; this
/// crate does no logging. The reducer reports duplicates when it resolves a
/// key segment (`docpatch::keys::resolve_index`).
pub fn index_for_key(array: &[Value], key: &str) -> Option<usize> {
    array
        .iter()
        .position(|item| item.get("_key").and_then(Value::as_str) == Some(key))
}

fn step<'a>(current: &'a Value, segment: &Segment) -> Option<&'a Value> {
    match (segment, current) {
        (Segment::Field(name), Value::Object(map)) => map.get(name),
        (Segment::Index(i), Value::Array(arr)) => arr.get(*i),
        (Segment::Key(k), Value::Array(arr)) => index_for_key(arr, &k.key).map(|i| &arr[i]),
        _ => None,
    }
}

fn step_mut<'a>(current: &'a mut Value, segment: &Segment) -> Option<&'a mut Value> {
    match (segment, current) {
        (Segment::Field(name), Value::Object(map)) => map.get_mut(name),
        (Segment::Index(i), Value::Array(arr)) => arr.get_mut(*i),
        (Segment::Key(k), Value::Array(arr)) => {
            let idx = index_for_key(arr, &k.key)?;
            arr.get_mut(idx)
        }
        _ => None,
    }
}

fn strip_terminator(path: &[Segment]) -> &[Segment] {
    match path.split_last() {
        Some((last, rest)) if last.is_focus_terminator() => rest,
        _ => path,
    }
}

/// Get a value from a document by path.
///
/// Never fails: any intermediate miss, or a segment that does not fit the
/// container it is applied to, yields `None`. A trailing focus terminator is
/// ignored. Key segments take the first member with a matching `_key`, see
/// [`index_for_key`].
pub fn get<'a>(val: &'a Value, path: &[Segment]) -> Option<&'a Value> {
    strip_terminator(path)
        .iter()
        .try_fold(val, |current, segment| step(current, segment))
}

/// Get a mutable reference to a value in a document by path.
///
/// Same resolution rules as [`get`].
pub fn get_mut<'a>(val: &'a mut Value, path: &[Segment]) -> Option<&'a mut Value> {
    let mut current = val;
    for segment in strip_terminator(path) {
        current = step_mut(current, segment)?;
    }
    Some(current)
}
