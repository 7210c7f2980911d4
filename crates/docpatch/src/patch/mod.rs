//! Patch algebra and reducer.
//!
//! # Patch types
//!
//! `set`, `unset`, `setIfMissing`, `insert` (before / after / replace),
//! `inc`, `dec`, `diffMatchPatch`. Every patch carries a
//! [`Path`](docpatch_path::Path) that may address array members by `_key`.

pub mod types;
pub mod apply;
pub mod codec;
pub mod text;
pub mod util;

pub use types::{shape_of, ApplyOptions, InsertPosition, Origin, OriginPatch, Patch, PatchError};
pub use apply::{apply_all, apply_all_with, apply_patch, apply_patches};
pub use codec::json::{from_json, from_json_patch, to_json, to_json_patch};
pub use text::text_diff;
pub use util::{matcher, prefix_path};
