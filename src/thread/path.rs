//! Positional path codec
//!
//! A path addresses a node in a comment forest by its zero-based position at each
//! level, e.g. `"2.0.1"` is the second reply of the first reply of the third
//! top-level comment. Positions are assigned at creation and never reused, so a
//! path keeps pointing at the same node for the lifetime of the thread.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ThreadError;

/// Separator between path segments
pub const SEPARATOR: char = '.';

/// Split a path into its first index and the remaining path.
///
/// With no separator the remainder is empty. Indices too large for `usize`
/// saturate to `usize::MAX`, which no sibling sequence can reach.
pub fn decode(path: &str) -> Result<(usize, &str), ThreadError> {
    let (head, rest) = match path.split_once(SEPARATOR) {
        Some((head, rest)) => (head, rest),
        None => (path, ""),
    };

    if !is_index(head) {
        return Err(ThreadError::Malformed(path.to_string()));
    }

    let index = head.parse::<usize>().unwrap_or(usize::MAX);
    Ok((index, rest))
}

/// Join indices into the canonical dotted form.
pub fn encode(indices: &[usize]) -> String {
    indices
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

/// Check a path against `index("."index)*`.
pub fn is_well_formed(path: &str) -> bool {
    !path.is_empty() && path.split(SEPARATOR).all(is_index)
}

/// A single segment: decimal digits, no leading zero unless the segment is `0`.
fn is_index(segment: &str) -> bool {
    match segment.as_bytes() {
        [] => false,
        [b'0'] => true,
        [b'0', ..] => false,
        bytes => bytes.iter().all(u8::is_ascii_digit),
    }
}

/// A parsed, well-formed comment path
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommentPath(Vec<usize>);

impl CommentPath {
    /// Path of a top-level comment
    pub fn top_level(index: usize) -> Self {
        Self(vec![index])
    }

    /// Path of the `index`-th reply under this node
    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    /// Path of the enclosing node, or `None` for a top-level comment
    pub fn parent(&self) -> Option<Self> {
        if self.0.len() > 1 {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        } else {
            None
        }
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// Nesting depth; top-level comments have depth 1
    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for CommentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode(&self.0))
    }
}

impl FromStr for CommentPath {
    type Err = ThreadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !is_well_formed(s) {
            return Err(ThreadError::Malformed(s.to_string()));
        }

        let mut indices = Vec::new();
        let mut rest = s;
        while !rest.is_empty() {
            let (index, remainder) = decode(rest)?;
            indices.push(index);
            rest = remainder;
        }
        Ok(Self(indices))
    }
}

impl TryFrom<String> for CommentPath {
    type Error = ThreadError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CommentPath> for String {
    fn from(path: CommentPath) -> Self {
        path.to_string()
    }
}
