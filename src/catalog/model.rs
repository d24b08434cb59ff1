/*!
 * In-memory representation of a gettext PO catalog.
 *
 * Entries read from disk keep their raw text; as long as nobody mutates an
 * entry it is written back byte-for-byte.
 */

use std::collections::HashMap;

use crate::document::normalize_text;

/// Default column width used by gettext tools
pub const DEFAULT_WRAP_WIDTH: usize = 78;

/// One `msgid`/`msgstr` record
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CatalogEntry {
    pub(crate) msgctxt: Option<String>,
    pub(crate) msgid: String,
    pub(crate) msgid_plural: Option<String>,
    pub(crate) msgstr: String,
    pub(crate) msgstr_plural: Vec<String>,
    pub(crate) translator_comments: Vec<String>,
    pub(crate) extracted_comments: Vec<String>,
    pub(crate) references: Vec<String>,
    /// Flags other than `fuzzy`, in file order
    pub(crate) flags: Vec<String>,
    pub(crate) fuzzy: bool,
    /// `#|` lines, kept verbatim without the marker
    pub(crate) previous: Vec<String>,
    pub(crate) obsolete: bool,
    /// Exact text the entry was parsed from; cleared on mutation
    pub(crate) raw: Option<String>,
}

impl CatalogEntry {
    pub fn new(msgid: impl Into<String>, msgstr: impl Into<String>) -> Self {
        Self {
            msgid: msgid.into(),
            msgstr: msgstr.into(),
            ..Self::default()
        }
    }

    pub fn msgid(&self) -> &str {
        &self.msgid
    }

    pub fn msgstr(&self) -> &str {
        &self.msgstr
    }

    pub fn msgctxt(&self) -> Option<&str> {
        self.msgctxt.as_deref()
    }

    pub fn msgid_plural(&self) -> Option<&str> {
        self.msgid_plural.as_deref()
    }

    pub fn msgstr_plural(&self) -> &[String] {
        &self.msgstr_plural
    }

    pub fn references(&self) -> &[String] {
        &self.references
    }

    pub fn translator_comments(&self) -> &[String] {
        &self.translator_comments
    }

    pub fn extracted_comments(&self) -> &[String] {
        &self.extracted_comments
    }

    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    pub fn is_fuzzy(&self) -> bool {
        self.fuzzy
    }

    pub fn is_obsolete(&self) -> bool {
        self.obsolete
    }

    /// The header entry has an empty msgid and no context
    pub fn is_header(&self) -> bool {
        self.msgid.is_empty() && self.msgctxt.is_none()
    }

    /// Translated means a non-empty msgstr (all plural forms for plural entries)
    pub fn is_translated(&self) -> bool {
        if self.msgid_plural.is_some() {
            !self.msgstr_plural.is_empty() && self.msgstr_plural.iter().all(|s| !s.is_empty())
        } else {
            !self.msgstr.is_empty()
        }
    }

    /// Whether the entry changed since it was parsed
    pub fn is_modified(&self) -> bool {
        self.raw.is_none()
    }

    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    pub fn set_msgstr(&mut self, msgstr: impl Into<String>) {
        let msgstr = msgstr.into();
        if msgstr != self.msgstr {
            self.msgstr = msgstr;
            self.raw = None;
        }
    }

    pub fn set_fuzzy(&mut self, fuzzy: bool) {
        if fuzzy != self.fuzzy {
            self.fuzzy = fuzzy;
            self.raw = None;
        }
    }

    pub fn set_msgctxt(&mut self, msgctxt: Option<String>) {
        if msgctxt != self.msgctxt {
            self.msgctxt = msgctxt;
            self.raw = None;
        }
    }

    /// Add a `#:` reference unless already present
    pub fn add_reference(&mut self, reference: impl Into<String>) {
        let reference = reference.into();
        if !self.references.iter().any(|r| *r == reference) {
            self.references.push(reference);
            self.raw = None;
        }
    }

    pub fn add_translator_comment(&mut self, comment: impl Into<String>) {
        self.translator_comments.push(comment.into());
        self.raw = None;
    }

    /// Key used for uniqueness within a catalog
    pub fn key(&self) -> (Option<&str>, &str) {
        (self.msgctxt.as_deref(), self.msgid.as_str())
    }
}

/// A whole PO file
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    pub(crate) entries: Vec<CatalogEntry>,
    pub(crate) wrap_width: usize,
    /// Set by operations that change the file without touching an entry
    pub(crate) structure_changed: bool,
    index: HashMap<(Option<String>, String), usize>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::from_entries(Vec::new(), DEFAULT_WRAP_WIDTH)
    }
}

impl Catalog {
    /// Fresh catalog with a standard header
    pub fn new(language: &str, project_id_version: &str) -> Self {
        let header_text = format!(
            "Project-Id-Version: {}\n\
             Language: {}\n\
             MIME-Version: 1.0\n\
             Content-Type: text/plain; charset=UTF-8\n\
             Content-Transfer-Encoding: 8bit\n",
            project_id_version, language
        );
        let header = CatalogEntry::new("", header_text);
        Self::from_entries(vec![header], DEFAULT_WRAP_WIDTH)
    }

    pub(crate) fn from_entries(entries: Vec<CatalogEntry>, wrap_width: usize) -> Self {
        let mut catalog = Self {
            entries,
            wrap_width,
            structure_changed: false,
            index: HashMap::new(),
        };
        catalog.rebuild_index();
        catalog
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.obsolete && !e.is_header())
            .map(|(i, e)| ((e.msgctxt.clone(), e.msgid.clone()), i))
            .collect();
    }

    pub fn wrap_width(&self) -> usize {
        self.wrap_width
    }

    /// Width applied to entries written from scratch; raw entries keep theirs
    pub fn set_wrap_width(&mut self, width: usize) {
        self.wrap_width = width;
    }

    pub fn header(&self) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.is_header() && !e.obsolete)
    }

    /// All entries, header and obsolete entries included, in file order
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Live (non-header, non-obsolete) entries
    pub fn messages(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter().filter(|e| !e.is_header() && !e.obsolete)
    }

    pub fn len(&self) -> usize {
        self.messages().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index of the live entry with this msgid and no context
    pub fn find_index(&self, msgid: &str) -> Option<usize> {
        self.index.get(&(None, msgid.to_string())).copied()
    }

    /// Like `find_index`, but also matches a msgid whose line breaks or
    /// whitespace runs differ from the normalized `text`
    pub fn find_index_normalized(&self, text: &str) -> Option<usize> {
        self.find_index(text).or_else(|| {
            self.entries.iter().position(|e| {
                !e.is_header()
                    && !e.obsolete
                    && e.msgctxt.is_none()
                    && e.msgid_plural.is_none()
                    && normalize_text(&e.msgid) == text
            })
        })
    }

    pub fn find(&self, msgid: &str) -> Option<&CatalogEntry> {
        self.find_index(msgid).map(|i| &self.entries[i])
    }

    pub fn get(&self, index: usize) -> Option<&CatalogEntry> {
        self.entries.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut CatalogEntry> {
        self.entries.get_mut(index)
    }

    /// Append a live entry before any obsolete entries and return its index.
    ///
    /// An existing entry with the same key is returned instead.
    pub fn insert(&mut self, entry: CatalogEntry) -> usize {
        let key = (entry.msgctxt.clone(), entry.msgid.clone());
        if let Some(&existing) = self.index.get(&key) {
            return existing;
        }
        let position = self
            .entries
            .iter()
            .position(|e| e.obsolete)
            .unwrap_or(self.entries.len());
        self.entries.insert(position, entry);
        self.structure_changed = true;
        if position + 1 == self.entries.len() {
            self.index.insert(key, position);
        } else {
            self.rebuild_index();
        }
        position
    }

    /// Clear the fuzzy flag on every entry; returns how many changed
    pub fn remove_fuzzy_flags(&mut self) -> usize {
        let mut cleared = 0;
        for entry in self.entries.iter_mut().filter(|e| e.fuzzy) {
            entry.set_fuzzy(false);
            cleared += 1;
        }
        cleared
    }

    /// Whether writing the catalog would change the file
    pub fn is_dirty(&self) -> bool {
        self.structure_changed || self.entries.iter().any(CatalogEntry::is_modified)
    }

    /// Forget modifications after a successful save
    pub(crate) fn mark_clean(&mut self, rendered: Vec<String>) {
        for (entry, raw) in self.entries.iter_mut().zip(rendered) {
            entry.raw = Some(raw);
        }
        self.structure_changed = false;
    }
}
