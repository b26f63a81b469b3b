//! Source positions, traceback entries and short source identifiers.
//!
//! Source identifiers follow a fixed convention: a leading `@` names a
//! file, a leading `=` carries literal display text, and anything else is
//! the program text itself. [`chunk_id`] turns any of them into a bounded
//! display string.

use serde::Serialize;

/// Maximum size, in bytes, of a short source display string (one byte
/// reserved, as for a NUL-terminated buffer).
pub const ID_SIZE: usize = 60;

const RETS: &str = "...";
const PRE: &str = "[string \"";
const POS: &str = "\"]";

/// Represents a position in source code.
///
/// # Examples
///
/// ```
/// use core_types::SourcePosition;
///
/// let pos = SourcePosition {
///     source: "main.sol".to_string(),
///     line: 10,
/// };
///
/// assert_eq!(pos.to_string(), "main.sol:10");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourcePosition {
    /// Short display form of the source identifier
    pub source: String,
    /// Line number (1-based)
    pub line: i32,
}

impl std::fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.source, self.line)
    }
}

/// Represents a single frame in a call stack traceback.
///
/// # Examples
///
/// ```
/// use core_types::StackFrame;
///
/// let frame = StackFrame {
///     function_name: Some("update".to_string()),
///     source: "game.sol".to_string(),
///     line: Some(25),
///     is_tail_call: false,
/// };
///
/// assert_eq!(frame.function_name.as_deref(), Some("update"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackFrame {
    /// Best-effort name of the function, None when it cannot be inferred
    pub function_name: Option<String>,
    /// Short display form of the source identifier
    pub source: String,
    /// Line currently executing, None for native frames
    pub line: Option<i32>,
    /// Whether the frame was entered through a tail call
    pub is_tail_call: bool,
}

/// Build the short display form of a source identifier.
///
/// # Examples
///
/// ```
/// use core_types::chunk_id;
///
/// assert_eq!(chunk_id("=stdin"), "stdin");
/// assert_eq!(chunk_id("@scripts/main.sol"), "scripts/main.sol");
/// assert_eq!(chunk_id("return 1"), "[string \"return 1\"]");
/// assert_eq!(chunk_id("x = 1\ny = 2"), "[string \"x = 1...\"]");
/// ```
pub fn chunk_id(source: &str) -> String {
    if let Some(rest) = source.strip_prefix('=') {
        if source.len() <= ID_SIZE {
            rest.to_string()
        } else {
            rest[..floor_boundary(rest, ID_SIZE - 1)].to_string()
        }
    } else if let Some(rest) = source.strip_prefix('@') {
        if source.len() <= ID_SIZE {
            rest.to_string()
        } else {
            let keep = ID_SIZE - RETS.len() - 1;
            let start = ceil_boundary(rest, rest.len() - keep);
            format!("{}{}", RETS, &rest[start..])
        }
    } else {
        let avail = ID_SIZE - (PRE.len() + RETS.len() + POS.len()) - 1;
        let newline = source.find('\n');
        if source.len() < avail && newline.is_none() {
            format!("{}{}{}", PRE, source, POS)
        } else {
            let len = newline.unwrap_or(source.len()).min(avail);
            let end = floor_boundary(source, len);
            format!("{}{}{}{}", PRE, &source[..end], RETS, POS)
        }
    }
}

/// Largest char boundary not after `index`.
fn floor_boundary(s: &str, index: usize) -> usize {
    let mut index = index.min(s.len());
    while !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Smallest char boundary not before `index`.
fn ceil_boundary(s: &str, index: usize) -> usize {
    let mut index = index.min(s.len());
    while !s.is_char_boundary(index) {
        index += 1;
    }
    index
}
