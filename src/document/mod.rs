/*!
 * Source documents and the translatable segments extracted from them.
 */

pub mod extractor;
pub mod segment;

pub use extractor::{SegmentExtractor, extract_segments};
pub use segment::{Segment, SourceLocation, content_hash, fuzzy_key, normalize_text};

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog::Catalog;

/// Read an RST document and extract its segments in document order
pub fn load_segments(path: &Path) -> Result<Vec<Segment>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read source document: {}", path.display()))?;
    Ok(extract_segments(path, &text))
}

/// Segments from a Sphinx `.pot` template, one per live non-plural msgid.
///
/// The location comes from the entry's first `#:` reference when it has one.
pub fn load_template_segments(path: &Path) -> Result<Vec<Segment>> {
    let template = Catalog::load(path)
        .with_context(|| format!("Failed to read template: {}", path.display()))?;

    let segments = template
        .messages()
        .filter(|entry| entry.msgid_plural().is_none() && !entry.msgid().trim().is_empty())
        .enumerate()
        .map(|(index, entry)| {
            let (origin, line) = entry
                .references()
                .first()
                .and_then(|reference| reference.split_whitespace().next())
                .and_then(|reference| reference.rsplit_once(':'))
                .and_then(|(file, line)| line.parse::<usize>().ok().map(|line| (PathBuf::from(file), line)))
                .unwrap_or_else(|| (path.to_path_buf(), 0));
            Segment::new(entry.msgid(), SourceLocation::new(origin, index + 1, line))
        })
        .collect();
    Ok(segments)
}
