/*!
 * Reading PO catalogs.
 *
 * A line-oriented state machine: comments open an entry, keywords fill its
 * fields, quoted continuation lines extend the last field, and a blank line
 * (or the next entry's comments/keywords) closes it.
 */

use log::warn;
use std::fs;
use std::path::Path;

use super::model::{Catalog, CatalogEntry, DEFAULT_WRAP_WIDTH};
use crate::errors::CatalogError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    None,
    Msgctxt,
    Msgid,
    MsgidPlural,
    Msgstr,
    MsgstrPlural(usize),
}

#[derive(Default)]
struct Pending<'a> {
    entry: CatalogEntry,
    raw: Vec<&'a str>,
    field: Option<Field>,
    has_msgid: bool,
    has_msgstr: bool,
}

impl Pending<'_> {
    fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    fn field(&self) -> Field {
        self.field.unwrap_or(Field::None)
    }
}

fn parse_error(line: usize, message: impl Into<String>) -> CatalogError {
    CatalogError::Parse {
        line,
        message: message.into(),
    }
}

/// Undo PO string escaping
pub fn unescape(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('"') => result.push('"'),
            Some('\\') => result.push('\\'),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }
    result
}

fn unquote(text: &str, line: usize) -> Result<String, CatalogError> {
    let text = text.trim();
    if text.len() < 2 || !text.starts_with('"') || !text.ends_with('"') {
        return Err(parse_error(line, format!("expected a quoted string, found `{}`", text)));
    }
    Ok(unescape(&text[1..text.len() - 1]))
}

fn strip_marker<'a>(line: &'a str, marker: &str) -> &'a str {
    let rest = &line[marker.len()..];
    rest.strip_prefix(' ').unwrap_or(rest)
}

/// Parse PO text into a catalog
pub fn parse(text: &str) -> Result<Catalog, CatalogError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut entries = Vec::new();
    let mut pending = Pending::default();

    for (index, line) in text.lines().enumerate() {
        let number = index + 1;

        if line.trim().is_empty() {
            finish(&mut pending, &mut entries, number);
            continue;
        }

        if let Some(rest) = line.strip_prefix("#~") {
            let content = rest.trim_start();
            if let Some(previous) = content.strip_prefix('|') {
                if pending.has_msgstr {
                    finish(&mut pending, &mut entries, number);
                }
                pending.entry.previous.push(previous.trim_start().to_string());
                pending.raw.push(line);
                continue;
            }
            keyword_line(&mut pending, &mut entries, content, line, number, true)?;
            continue;
        }

        if line.starts_with('#') {
            if pending.has_msgstr {
                finish(&mut pending, &mut entries, number);
            }
            comment_line(&mut pending.entry, line);
            pending.raw.push(line);
            continue;
        }

        keyword_line(&mut pending, &mut entries, line, line, number, false)?;
    }
    finish(&mut pending, &mut entries, text.lines().count() + 1);

    Ok(Catalog::from_entries(entries, DEFAULT_WRAP_WIDTH))
}

fn comment_line(entry: &mut CatalogEntry, line: &str) {
    if line.starts_with("#,") {
        for flag in strip_marker(line, "#,").split(',') {
            let flag = flag.trim();
            if flag == "fuzzy" {
                entry.fuzzy = true;
            } else if !flag.is_empty() {
                entry.flags.push(flag.to_string());
            }
        }
    } else if line.starts_with("#.") {
        entry.extracted_comments.push(strip_marker(line, "#.").to_string());
    } else if line.starts_with("#:") {
        entry.references.push(strip_marker(line, "#:").to_string());
    } else if line.starts_with("#|") {
        entry.previous.push(strip_marker(line, "#|").to_string());
    } else {
        entry.translator_comments.push(strip_marker(line, "#").to_string());
    }
}

fn keyword_line<'a>(
    pending: &mut Pending<'a>,
    entries: &mut Vec<CatalogEntry>,
    content: &str,
    line: &'a str,
    number: usize,
    obsolete: bool,
) -> Result<(), CatalogError> {
    if content.starts_with('"') {
        let value = unquote(content, number)?;
        match pending.field() {
            Field::None => return Err(parse_error(number, "continuation line without a keyword")),
            Field::Msgctxt => pending.entry.msgctxt.get_or_insert_with(String::new).push_str(&value),
            Field::Msgid => pending.entry.msgid.push_str(&value),
            Field::MsgidPlural => pending
                .entry
                .msgid_plural
                .get_or_insert_with(String::new)
                .push_str(&value),
            Field::Msgstr => pending.entry.msgstr.push_str(&value),
            Field::MsgstrPlural(index) => {
                if let Some(form) = pending.entry.msgstr_plural.get_mut(index) {
                    form.push_str(&value);
                }
            }
        }
        pending.raw.push(line);
        return Ok(());
    }

    let (keyword, rest) = content
        .split_once(char::is_whitespace)
        .ok_or_else(|| parse_error(number, format!("unexpected line `{}`", content)))?;

    let field = match keyword {
        "msgctxt" => Field::Msgctxt,
        "msgid" => Field::Msgid,
        "msgid_plural" => Field::MsgidPlural,
        "msgstr" => Field::Msgstr,
        other => match other
            .strip_prefix("msgstr[")
            .and_then(|s| s.strip_suffix(']'))
            .and_then(|n| n.parse::<usize>().ok())
        {
            Some(index) => Field::MsgstrPlural(index),
            None => return Err(parse_error(number, format!("unknown keyword `{}`", other))),
        },
    };

    // A new msgctxt/msgid right after a msgstr starts the next entry.
    if matches!(field, Field::Msgctxt | Field::Msgid) && pending.has_msgstr {
        finish(pending, entries, number);
    }
    if obsolete {
        pending.entry.obsolete = true;
    }

    let value = unquote(rest, number)?;
    match field {
        Field::Msgctxt => pending.entry.msgctxt = Some(value),
        Field::Msgid => {
            pending.entry.msgid = value;
            pending.has_msgid = true;
        }
        Field::MsgidPlural => pending.entry.msgid_plural = Some(value),
        Field::Msgstr => {
            pending.entry.msgstr = value;
            pending.has_msgstr = true;
        }
        Field::MsgstrPlural(index) => {
            let forms = &mut pending.entry.msgstr_plural;
            if forms.len() <= index {
                forms.resize(index + 1, String::new());
            }
            forms[index] = value;
            pending.has_msgstr = true;
        }
        Field::None => {}
    }
    pending.field = Some(field);
    pending.raw.push(line);
    Ok(())
}

fn finish(pending: &mut Pending<'_>, entries: &mut Vec<CatalogEntry>, line: usize) {
    if pending.is_empty() {
        return;
    }
    let done = std::mem::take(pending);
    if !done.has_msgid {
        warn!("Dropping comment block without an entry before line {}", line);
        return;
    }
    let mut entry = done.entry;
    entry.raw = Some(done.raw.join("\n"));
    entries.push(entry);
}

impl Catalog {
    /// Parse PO text
    pub fn parse(text: &str) -> Result<Self, CatalogError> {
        parse(text)
    }

    /// Read and parse a PO file
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = fs::read_to_string(path)?;
        parse(&text)
    }
}
