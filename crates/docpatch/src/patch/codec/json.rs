//! JSON codec for patches.
//!
//! Converts patches to and from `serde_json::Value` in the wire format:
//! `{"type": "set", "path": ["title"], "value": "B"}`.

use serde::Deserialize;
use serde_json::Value;

use crate::patch::types::{Patch, PatchError};

/// Deserialize one patch from its JSON form.
pub fn from_json(value: &Value) -> Result<Patch, PatchError> {
    Patch::deserialize(value).map_err(|e| PatchError::InvalidPatch(e.to_string()))
}

/// Serialize a patch to its JSON form.
///
/// JSON has no NaN or infinity, so `inc`/`dec` amounts must be finite.
pub fn to_json(patch: &Patch) -> Result<Value, PatchError> {
    if let Patch::Inc { path, amount } | Patch::Dec { path, amount } = patch {
        if !amount.is_finite() {
            return Err(PatchError::NonFinite { path: path.clone() });
        }
    }
    serde_json::to_value(patch).map_err(|e| PatchError::InvalidPatch(e.to_string()))
}

/// Deserialize a patch list from a JSON array.
pub fn from_json_patch(value: &Value) -> Result<Vec<Patch>, PatchError> {
    let items = value
        .as_array()
        .ok_or_else(|| PatchError::InvalidPatch("patch list must be an array".into()))?;
    items.iter().map(from_json).collect()
}

/// Serialize a patch list to a JSON array.
pub fn to_json_patch(patches: &[Patch]) -> Result<Value, PatchError> {
    patches
        .iter()
        .map(to_json)
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::types::InsertPosition;
    use docpatch_path::{path, Segment};
    use serde_json::json;

    #[test]
    fn decodes_every_patch_type() {
        let wire = json!([
            {"type": "set", "path": ["title"], "value": "B"},
            {"type": "unset", "path": ["items", {"_key": "a"}]},
            {"type": "setIfMissing", "path": [], "value": {"_type": "post"}},
            {"type": "insert", "path": ["items", 0], "position": "before", "items": [1]},
            {"type": "inc", "path": ["n"], "value": 1},
            {"type": "dec", "path": ["n"], "value": 2.5},
            {"type": "diffMatchPatch", "path": ["t"], "value": "@@ -1 +1 @@\n-a\n+b\n"}
        ]);
        let patches = from_json_patch(&wire).unwrap();
        assert_eq!(
            patches,
            vec![
                Patch::set(path!["title"], "B"),
                Patch::unset(path!["items", Segment::key("a")]),
                Patch::set_if_missing(path![], json!({"_type": "post"})),
                Patch::insert(path!["items", 0], InsertPosition::Before, vec![json!(1)]),
                Patch::inc(path!["n"], 1.0),
                Patch::dec(path!["n"], 2.5),
                Patch::diff_match_patch(path!["t"], "@@ -1 +1 @@\n-a\n+b\n"),
            ]
        );
        assert_eq!(from_json_patch(&to_json_patch(&patches).unwrap()).unwrap(), patches);
    }

    #[test]
    fn encodes_text_patches() {
        let patch = Patch::diff_match_patch(path!["title"], "@@ -1 +1 @@\n-a\n+b\n");
        let wire = to_json(&patch).unwrap();
        assert_eq!(wire["type"], json!("diffMatchPatch"));
        assert_eq!(from_json(&wire).unwrap(), patch);
    }

    #[test]
    fn refuses_to_encode_non_finite_amounts() {
        let err = to_json(&Patch::inc(path!["n"], f64::NAN)).unwrap_err();
        assert_eq!(err, PatchError::NonFinite { path: path!["n"] });
        let patches = [Patch::unset(path!["a"]), Patch::dec(path!["n"], f64::INFINITY)];
        assert!(to_json_patch(&patches).is_err());
    }

    #[test]
    fn rejects_unknown_type() {
        let err = from_json(&json!({"type": "flip", "path": []})).unwrap_err();
        assert!(matches!(err, PatchError::InvalidPatch(_)));
    }

    #[test]
    fn rejects_bad_path_segment() {
        let err = from_json(&json!({"type": "unset", "path": [true]})).unwrap_err();
        assert!(matches!(err, PatchError::InvalidPatch(_)));
    }

    #[test]
    fn rejects_non_array_list() {
        assert!(from_json_patch(&json!({"type": "unset", "path": []})).is_err());
    }
}
