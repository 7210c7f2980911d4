//! Key-stable array indexing.
//!
//! Members of arrays are addressed by their `_key` so that a patch computed
//! against one ordering still lands on the right element after a concurrent
//! reorder or insert. Duplicate keys are a data defect: the first match wins
//! and a warning is logged.

use std::borrow::Cow;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Value};
use tracing::warn;

use docpatch_path::{index_for_key, Path, Segment};

use crate::patch::types::PatchError;

/// Length of keys produced by [`KeyGenerator::new`].
pub const DEFAULT_KEY_LENGTH: usize = 12;

const HEX: &[u8; 16] = b"0123456789abcdef";

/// An array member located by [`resolve_array_segment`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolved<'a> {
    pub index: usize,
    pub element: &'a Value,
}

/// Locate the member of `array` addressed by `segment`.
///
/// Index segments are positional and yield `None` when out of range. Key
/// segments yield the first member whose `_key` matches. A field segment
/// cannot address an array member and fails with [`PatchError::Target`]; the
/// error's path is relative to the array.
pub fn resolve_array_segment<'a>(
    array: &'a [Value],
    segment: &Segment,
) -> Result<Option<Resolved<'a>>, PatchError> {
    match segment {
        Segment::Field(_) => Err(PatchError::Target {
            path: Path::root(),
            segment: segment.clone(),
            found: "array",
        }),
        _ => Ok(resolve_index(array, segment).map(|index| Resolved {
            index,
            element: &array[index],
        })),
    }
}

/// Position addressed by an index or key segment, if any.
///
/// Field segments never resolve.
pub fn resolve_index(array: &[Value], segment: &Segment) -> Option<usize> {
    match segment {
        Segment::Index(i) if *i < array.len() => Some(*i),
        Segment::Key(k) => {
            let found = index_for_key(array, &k.key)?;
            if index_for_key(&array[found + 1..], &k.key).is_some() {
                warn!(key = %k.key, index = found, "duplicate _key in array, using first match");
            }
            Some(found)
        }
        _ => None,
    }
}

// ── Key generation ────────────────────────────────────────────────────────

/// Produces random lowercase hex keys for array members.
#[derive(Debug, Clone)]
pub struct KeyGenerator {
    rng: StdRng,
    length: usize,
}

impl KeyGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            length: DEFAULT_KEY_LENGTH,
        }
    }

    /// Deterministic generator, for tests and reproducible fixtures.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            length: DEFAULT_KEY_LENGTH,
        }
    }

    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length.max(1);
        self
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn next_key(&mut self) -> String {
        (0..self.length)
            .map(|_| HEX[self.rng.gen_range(0..HEX.len())] as char)
            .collect()
    }
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn has_key(map: &Map<String, Value>) -> bool {
    map.get("_key").is_some_and(Value::is_string)
}

fn ensure_keys_deep(value: &Value, keys: &mut KeyGenerator, in_array: bool) -> Option<Value> {
    match value {
        Value::Object(map) => {
            let mut out: Option<Map<String, Value>> = None;
            for (name, child) in map {
                if let Some(updated) = ensure_keys_deep(child, keys, false) {
                    out.get_or_insert_with(|| map.clone())
                        .insert(name.clone(), updated);
                }
            }
            if in_array && !has_key(map) {
                let rest = out.unwrap_or_else(|| map.clone());
                let mut keyed = Map::with_capacity(rest.len() + 1);
                keyed.insert("_key".to_string(), Value::String(keys.next_key()));
                keyed.extend(rest);
                out = Some(keyed);
            }
            out.map(Value::Object)
        }
        Value::Array(items) => {
            let mut out: Option<Vec<Value>> = None;
            for (i, item) in items.iter().enumerate() {
                if let Some(updated) = ensure_keys_deep(item, keys, true) {
                    out.get_or_insert_with(|| items.clone())[i] = updated;
                }
            }
            out.map(Value::Array)
        }
        _ => None,
    }
}

/// Give every object member of every array in `value` a `_key`, if it lacks
/// one.
///
/// Generated keys are inserted as the first field. Returns the input
/// borrowed when nothing was missing.
///
/// ```
/// use docpatch::keys::{ensure_array_keys, KeyGenerator};
/// use serde_json::json;
/// use std::borrow::Cow;
///
/// let doc = json!({"items": [{"_key": "a"}, "plain"]});
/// let mut keys = KeyGenerator::seeded(1);
/// assert!(matches!(ensure_array_keys(&doc, &mut keys), Cow::Borrowed(_)));
/// ```
pub fn ensure_array_keys<'a>(value: &'a Value, keys: &mut KeyGenerator) -> Cow<'a, Value> {
    match ensure_keys_deep(value, keys, false) {
        Some(updated) => Cow::Owned(updated),
        None => Cow::Borrowed(value),
    }
}
