//! Patch algebra, reducer and patch channel for structured documents.
//!
//! Documents are `serde_json::Value`s whose arrays hold members identified
//! by a `_key` string. Edits are [`Patch`]es addressed by a
//! [`Path`](docpatch_path::Path), applied with a pure reducer, batched into
//! [`PatchEvent`]s and broadcast through a [`PatchChannel`] tagged with
//! their [`Origin`].
//!
//! # Example
//!
//! ```
//! use docpatch::{apply_all, path, InsertPosition, Patch, PatchEvent, Segment};
//! use serde_json::json;
//!
//! let doc = json!({"items": [{"_key": "a"}, {"_key": "b"}]});
//! let event = PatchEvent::from(Patch::insert(
//!     path![Segment::key("a")],
//!     InsertPosition::After,
//!     vec![json!({"_key": "c"})],
//! ))
//! .prefix_all("items");
//!
//! let out = apply_all(Some(&doc), event.patches()).unwrap().unwrap();
//! assert_eq!(out.as_ref(), &json!({"items": [{"_key": "a"}, {"_key": "c"}, {"_key": "b"}]}));
//! ```

pub mod channel;
pub mod cli;
pub mod keys;
pub mod patch;
pub mod patch_event;

pub use channel::{
    ChannelMessage, DeliveryReport, DocumentConnection, DocumentEvent, HandlerError,
    HandlerResult, PatchChannel, Subscription,
};
pub use docpatch_path::{path, Path, Segment};
pub use keys::{ensure_array_keys, KeyGenerator};
pub use patch::{
    apply_all, apply_all_with, apply_patch, apply_patches, prefix_path, text_diff, ApplyOptions,
    InsertPosition, Origin, OriginPatch, Patch, PatchError,
};
pub use patch_event::PatchEvent;
