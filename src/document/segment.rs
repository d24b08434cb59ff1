/*!
 * Translatable segments and their identity.
 */

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};

/// Where a segment came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Source document path
    pub path: PathBuf,
    /// 1-based position of the segment within the document
    pub ordinal: usize,
    /// 1-based line the segment starts on
    pub line: usize,
}

impl SourceLocation {
    pub fn new(path: impl Into<PathBuf>, ordinal: usize, line: usize) -> Self {
        Self {
            path: path.into(),
            ordinal,
            line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}#{}", self.path.display(), self.line, self.ordinal)
    }
}

/// One unit of translatable text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Normalized, line-joined source text; doubles as the catalog msgid
    pub source_text: String,
    /// Origin of the text
    pub location: SourceLocation,
    /// Hex SHA-256 of `source_text`
    pub content_hash: String,
}

impl Segment {
    /// Build a segment from raw text; the text is normalized before hashing
    pub fn new(raw_text: &str, location: SourceLocation) -> Self {
        let source_text = normalize_text(raw_text);
        let content_hash = content_hash(&source_text);
        Self {
            source_text,
            location,
            content_hash,
        }
    }

    /// Path of the document the segment belongs to
    pub fn path(&self) -> &Path {
        &self.location.path
    }

    /// Key used for whitespace-insensitive catalog matching
    pub fn fuzzy_key(&self) -> String {
        fuzzy_key(&self.source_text)
    }
}

/// Join wrapped lines and collapse whitespace runs to a single space.
///
/// Re-wrapping a paragraph never changes the result.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Compute the stable identity of normalized text
pub fn content_hash(normalized: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Whitespace-insensitive, case-sensitive matching key
pub fn fuzzy_key(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}
