/*!
 * Serializing catalogs back to PO text.
 *
 * Untouched entries are emitted from their raw text. Everything else is
 * written the way gettext tools write it: one line when it fits, otherwise an
 * empty first line followed by chunks broken after spaces and after `\n`.
 */

use log::debug;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use super::model::{Catalog, CatalogEntry};
use crate::errors::CatalogError;

/// Escape a string for use inside PO quotes
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            '\r' => escaped.push_str("\\r"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Lines for one `keyword "value"` field
fn format_field(prefix: &str, keyword: &str, value: &str, width: usize) -> Vec<String> {
    let escaped = escape(value);
    let single = format!("{}{} \"{}\"", prefix, keyword, escaped);
    let inner_newline = value.find('\n').is_some_and(|i| i + 1 < value.len());
    if !inner_newline && single.chars().count() <= width {
        return vec![single];
    }

    let max = width.saturating_sub(prefix.chars().count() + 2).max(1);
    let mut lines = vec![format!("{}{} \"\"", prefix, keyword)];
    for piece in escaped.split_inclusive("\\n") {
        for chunk in wrap_piece(piece, max) {
            lines.push(format!("{}\"{}\"", prefix, chunk));
        }
    }
    lines
}

/// Break `piece` after spaces so each chunk fits in `max` characters where possible
fn wrap_piece(piece: &str, max: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    for word in piece.split_inclusive(' ') {
        let word_len = word.chars().count();
        if current_len > 0 && current_len + word_len > max {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        current.push_str(word);
        current_len += word_len;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Render one entry without a trailing newline
pub fn render_entry(entry: &CatalogEntry, width: usize) -> String {
    if let Some(raw) = entry.raw() {
        return raw.to_string();
    }

    let mut lines = Vec::new();
    for comment in &entry.translator_comments {
        if comment.is_empty() {
            lines.push("#".to_string());
        } else {
            lines.push(format!("# {}", comment));
        }
    }
    for comment in &entry.extracted_comments {
        lines.push(format!("#. {}", comment));
    }
    for reference in &entry.references {
        lines.push(format!("#: {}", reference));
    }

    let mut flags = Vec::with_capacity(entry.flags.len() + 1);
    if entry.fuzzy {
        flags.push("fuzzy");
    }
    flags.extend(entry.flags.iter().map(String::as_str));
    if !flags.is_empty() {
        lines.push(format!("#, {}", flags.join(", ")));
    }

    let prefix = if entry.obsolete { "#~ " } else { "" };
    for previous in &entry.previous {
        if entry.obsolete {
            lines.push(format!("#~| {}", previous));
        } else {
            lines.push(format!("#| {}", previous));
        }
    }

    if let Some(context) = &entry.msgctxt {
        lines.extend(format_field(prefix, "msgctxt", context, width));
    }
    lines.extend(format_field(prefix, "msgid", &entry.msgid, width));
    match &entry.msgid_plural {
        Some(plural) => {
            lines.extend(format_field(prefix, "msgid_plural", plural, width));
            for (index, form) in entry.msgstr_plural.iter().enumerate() {
                lines.extend(format_field(prefix, &format!("msgstr[{}]", index), form, width));
            }
        }
        None => lines.extend(format_field(prefix, "msgstr", &entry.msgstr, width)),
    }

    lines.join("\n")
}

impl Catalog {
    fn render_entries(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| render_entry(entry, self.wrap_width))
            .collect()
    }

    /// Full PO text of the catalog
    pub fn to_po_string(&self) -> String {
        join_entries(&self.render_entries())
    }

    /// Write the catalog atomically: a temporary file next to `path`, then a rename
    pub fn save(&mut self, path: &Path) -> Result<(), CatalogError> {
        let rendered = self.render_entries();
        let text = join_entries(&rendered);

        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => Path::new(".").to_path_buf(),
        };
        fs::create_dir_all(&directory)?;

        let mut temp = NamedTempFile::new_in(&directory)?;
        temp.write_all(text.as_bytes())?;
        temp.flush()?;
        temp.persist(path).map_err(|e| CatalogError::Io(e.error))?;

        debug!("Saved catalog {} ({} entries)", path.display(), rendered.len());
        self.mark_clean(rendered);
        Ok(())
    }
}

fn join_entries(rendered: &[String]) -> String {
    if rendered.is_empty() {
        return String::new();
    }
    let mut text = rendered.join("\n\n");
    text.push('\n');
    text
}
