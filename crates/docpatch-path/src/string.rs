//! Human-readable string form of paths: `items[_key=="a1"].title`, `rows[0]`.

use crate::types::{Path, Segment};
use crate::PathError;

/// Render a path in string form.
///
/// Field segments are joined with `.`, index segments render as `[n]` and
/// key segments as `[_key=="..."]`. The root path renders as an empty string.
///
/// Field names are written verbatim. A name that is empty or contains `.` or
/// `[` renders fine but does not parse back to the same path; use the JSON
/// form of [`Path`] where such names can occur.
///
/// ```
/// use docpatch_path::{path, to_path_string, Segment};
///
/// let p = path!["items", Segment::key("a1"), "tags", 0];
/// assert_eq!(to_path_string(&p), r#"items[_key=="a1"].tags[0]"#);
/// ```
pub fn to_path_string(path: &[Segment]) -> String {
    let mut out = String::new();
    for (i, segment) in path.iter().enumerate() {
        match segment {
            Segment::Field(name) => {
                if i > 0 {
                    out.push('.');
                }
                out.push_str(name);
            }
            Segment::Index(idx) => {
                out.push('[');
                out.push_str(&idx.to_string());
                out.push(']');
            }
            Segment::Key(k) => {
                out.push_str("[_key==");
                // serde_json quotes and escapes exactly like the parser expects
                out.push_str(&serde_json::Value::String(k.key.clone()).to_string());
                out.push(']');
            }
        }
    }
    out
}

/// Parse the string form produced by [`to_path_string`].
///
/// # Errors
///
/// Returns [`PathError::Syntax`] with the byte offset of the first character
/// that could not be parsed.
///
/// ```
/// use docpatch_path::{parse_path, path, Segment};
///
/// assert_eq!(parse_path("").unwrap(), path![]);
/// assert_eq!(
///     parse_path(r#"body[_key=="p1"].children[2]"#).unwrap(),
///     path!["body", Segment::key("p1"), "children", 2],
/// );
/// assert!(parse_path("a[").is_err());
/// ```
pub fn parse_path(input: &str) -> Result<Path, PathError> {
    let bytes = input.as_bytes();
    let mut segments = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        match bytes[pos] {
            b'[' => {
                let (segment, next) = parse_bracket(input, pos)?;
                segments.push(segment);
                pos = next;
            }
            b'.' => {
                if segments.is_empty() {
                    return Err(PathError::Syntax { offset: pos });
                }
                pos += 1;
                let (name, next) = parse_field(input, pos)?;
                segments.push(Segment::Field(name));
                pos = next;
            }
            _ => {
                if !segments.is_empty() {
                    return Err(PathError::Syntax { offset: pos });
                }
                let (name, next) = parse_field(input, pos)?;
                segments.push(Segment::Field(name));
                pos = next;
            }
        }
    }

    Ok(Path::from_segments(segments))
}

fn parse_field(input: &str, start: usize) -> Result<(String, usize), PathError> {
    let end = input[start..]
        .find(|c: char| c == '.' || c == '[')
        .map(|i| start + i)
        .unwrap_or(input.len());
    if end == start {
        return Err(PathError::Syntax { offset: start });
    }
    Ok((input[start..end].to_string(), end))
}

fn parse_bracket(input: &str, start: usize) -> Result<(Segment, usize), PathError> {
    let body_start = start + 1;
    let rest = &input[body_start..];

    if let Some(after_key) = rest.strip_prefix("_key") {
        let after_key = after_key.trim_start();
        let skipped = rest.len() - after_key.len();
        let Some(after_eq) = after_key.strip_prefix("==") else {
            return Err(PathError::Syntax { offset: body_start + skipped });
        };
        let after_eq_trimmed = after_eq.trim_start();
        let quote_at = body_start + rest.len() - after_eq_trimmed.len();
        let (key, after_quote) = parse_quoted(input, quote_at)?;
        let close = skip_spaces(input, after_quote);
        if input.as_bytes().get(close) != Some(&b']') {
            return Err(PathError::Syntax { offset: close });
        }
        return Ok((Segment::key(key), close + 1));
    }

    let close = rest
        .find(']')
        .map(|i| body_start + i)
        .ok_or(PathError::Syntax { offset: input.len() })?;
    let digits = input[body_start..close].trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PathError::Syntax { offset: body_start });
    }
    let index = digits
        .parse::<usize>()
        .map_err(|_| PathError::Syntax { offset: body_start })?;
    Ok((Segment::Index(index), close + 1))
}

fn parse_quoted(input: &str, start: usize) -> Result<(String, usize), PathError> {
    let bytes = input.as_bytes();
    if bytes.get(start) != Some(&b'"') {
        return Err(PathError::Syntax { offset: start });
    }
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => {
                let key: String = serde_json::from_str(&input[start..=i])
                    .map_err(|_| PathError::Syntax { offset: start })?;
                return Ok((key, i + 1));
            }
            _ => i += 1,
        }
    }
    Err(PathError::Syntax { offset: input.len() })
}

fn skip_spaces(input: &str, mut pos: usize) -> usize {
    let bytes = input.as_bytes();
    while bytes.get(pos).is_some_and(|b| b.is_ascii_whitespace()) {
        pos += 1;
    }
    pos
}
