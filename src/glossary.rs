/*!
 * Glossary loading and term extraction.
 *
 * A glossary is an ordered list of source term → target term pairs handed to
 * the translation service as-is. It is read from a two-column CSV file
 * (first line is a header such as `EN,SV`) or from a JSON object.
 */

use anyhow::{Context, Result, anyhow};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::file_utils::FileManager;

static REF_DISPLAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r":ref:`([^`<]+?)\s*<[^`>]+>`").expect("valid reference regex")
});

// A lowercase letter directly followed by an uppercase one; all-caps acronyms never match
static PASCAL_CASE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Z][A-Za-z]*[a-z][A-Z][A-Za-z]*\b").expect("valid PascalCase regex")
});

/// Ordered source → target term mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Glossary {
    entries: Vec<(String, String)>,
}

impl Glossary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pair; a repeated source term replaces the earlier target
    pub fn insert(&mut self, source: impl Into<String>, target: impl Into<String>) {
        let source = source.into();
        let target = target.into();
        match self.entries.iter_mut().find(|(s, _)| *s == source) {
            Some(entry) => entry.1 = target,
            None => self.entries.push((source, target)),
        }
    }

    pub fn get(&self, source: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(s, _)| s == source)
            .map(|(_, t)| t.as_str())
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tab-separated entries, one pair per line
    pub fn to_tsv(&self) -> String {
        self.entries
            .iter()
            .map(|(s, t)| format!("{}\t{}", s, t))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Load a glossary, choosing the format from the extension
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = FileManager::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("json"));

        let glossary = if is_json {
            Self::from_json(&text).with_context(|| format!("Invalid glossary file: {:?}", path))?
        } else {
            Self::from_csv(&text).with_context(|| format!("Invalid glossary file: {:?}", path))?
        };
        debug!("Loaded {} glossary terms from {:?}", glossary.len(), path);
        Ok(glossary)
    }

    /// Parse a two-column CSV with a header line
    pub fn from_csv(text: &str) -> Result<Self> {
        let mut glossary = Self::new();
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        for (index, line) in text.lines().enumerate().skip(1) {
            if line.trim().is_empty() {
                continue;
            }
            let fields = split_csv_line(line)
                .ok_or_else(|| anyhow!("Unterminated quote on line {}", index + 1))?;
            match fields.as_slice() {
                [source, target, ..] if !source.trim().is_empty() && !target.trim().is_empty() => {
                    glossary.insert(source.trim(), target.trim());
                }
                _ => warn!("Skipping glossary line {}: expected two columns", index + 1),
            }
        }
        Ok(glossary)
    }

    /// Parse a JSON object of string values
    pub fn from_json(text: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let object = value
            .as_object()
            .ok_or_else(|| anyhow!("Glossary JSON must be an object"))?;

        let mut glossary = Self::new();
        for (source, target) in object {
            let target = target
                .as_str()
                .ok_or_else(|| anyhow!("Glossary value for '{}' is not a string", source))?;
            glossary.insert(source.as_str(), target);
        }
        Ok(glossary)
    }
}

/// Split one CSV line; `""` inside quotes is a literal quote
fn split_csv_line(line: &str) -> Option<Vec<String>> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    if in_quotes {
        return None;
    }
    fields.push(current);
    Some(fields)
}

/// Display texts of `:ref:` references with explicit labels, sorted and unique
pub fn extract_reference_terms(sources: &[PathBuf]) -> Result<Vec<String>> {
    let mut terms = BTreeSet::new();
    for source in sources {
        let text = FileManager::read_to_string(source)?;
        // References wrap across lines in RST paragraphs
        let joined = text.split_whitespace().collect::<Vec<_>>().join(" ");
        for caps in REF_DISPLAY_RE.captures_iter(&joined) {
            let term = caps[1].trim();
            if !term.is_empty() {
                terms.insert(term.to_string());
            }
        }
    }
    Ok(terms.into_iter().collect())
}

/// PascalCase product names such as `OpenSearch`, sorted and unique
pub fn extract_product_terms(sources: &[PathBuf]) -> Result<Vec<String>> {
    let mut terms = BTreeSet::new();
    for source in sources {
        let text = FileManager::read_to_string(source)?;
        for found in PASCAL_CASE_RE.find_iter(&text) {
            terms.insert(found.as_str().to_string());
        }
    }
    Ok(terms.into_iter().collect())
}
