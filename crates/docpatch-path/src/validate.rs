//! Structural validation of paths.

use crate::types::Segment;
use crate::PathError;

/// Maximum allowed path depth.
pub const MAX_PATH_LENGTH: usize = 256;

/// Validate a path.
///
/// # Errors
///
/// Returns an error if:
/// - The path exceeds the maximum depth (256 segments)
/// - A key segment has an empty `_key`
/// - The focus terminator appears anywhere but the last position
///
/// # Example
///
/// ```
/// use docpatch_path::{path, validate_path, Segment, FOCUS_TERMINATOR};
///
/// validate_path(&path!["items", Segment::key("a"), FOCUS_TERMINATOR]).unwrap();
/// validate_path(&path!["items", Segment::key("")]).unwrap_err();
/// validate_path(&path![FOCUS_TERMINATOR, "title"]).unwrap_err();
/// ```
pub fn validate_path(path: &[Segment]) -> Result<(), PathError> {
    if path.len() > MAX_PATH_LENGTH {
        return Err(PathError::PathTooLong { len: path.len() });
    }
    let last = path.len().saturating_sub(1);
    for (i, segment) in path.iter().enumerate() {
        match segment {
            Segment::Key(k) if k.key.is_empty() => {
                return Err(PathError::EmptyKey { position: i });
            }
            s if s.is_focus_terminator() && i != last => {
                return Err(PathError::MisplacedFocusTerminator { position: i });
            }
            _ => {}
        }
    }
    Ok(())
}
