//! Core logic behind the `docpatch` binary, kept here so it can be tested
//! without spawning a process.

use serde_json::Value;
use thiserror::Error;

use docpatch_path::{get, parse_path, PathError};

use crate::patch::{apply_all_with, from_json_patch, ApplyOptions, PatchError};

#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Patch(#[from] PatchError),
    #[error("invalid path: {0}")]
    Path(#[from] PathError),
    #[error("no value at `{0}`")]
    NotFound(String),
}

// ── apply ─────────────────────────────────────────────────────────────────

/// Apply a JSON patch list to a JSON document.
///
/// Returns the pretty-printed result, or `null` when the patches unset the
/// whole document.
pub fn apply_patch_json(
    doc_json: &str,
    patches_json: &str,
    options: &ApplyOptions,
) -> Result<String, CliError> {
    let doc: Value = serde_json::from_str(doc_json)?;
    let raw: Value = serde_json::from_str(patches_json)?;
    let patches = from_json_patch(&raw)?;
    let result = apply_all_with(Some(&doc), &patches, options)?;
    let null = Value::Null;
    let out = result.as_deref().unwrap_or(&null);
    Ok(serde_json::to_string_pretty(out)?)
}

// ── get ───────────────────────────────────────────────────────────────────

/// Look up a path, given in string form, in a JSON document.
pub fn get_path_json(doc_json: &str, path: &str) -> Result<String, CliError> {
    let doc: Value = serde_json::from_str(doc_json)?;
    let parsed = parse_path(path)?;
    let found = get(&doc, &parsed).ok_or_else(|| CliError::NotFound(path.to_string()))?;
    Ok(serde_json::to_string_pretty(found)?)
}
