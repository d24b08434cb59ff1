/*!
 * Database entity models and DTOs.
 *
 * These structures map directly to the cache table and to the
 * maintenance operations that scan it.
 */

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One cached translation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Database ID
    pub id: i64,
    /// SHA256 of the normalized source text
    pub source_text_hash: String,
    /// Normalized source text (the msgid)
    pub source_text: String,
    pub source_language: String,
    pub target_language: String,
    pub translated_text: String,
    /// RFC 3339 timestamp
    pub created_at: String,
    /// RFC 3339 timestamp, touched on every hit
    pub last_used_at: String,
    pub hit_count: i64,
}

impl CacheRecord {
    /// Create a new cache record stamped with the current time
    pub fn new(
        source_text_hash: String,
        source_text: String,
        source_language: String,
        target_language: String,
        translated_text: String,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: 0, // Will be assigned by database
            source_text_hash,
            source_text,
            source_language,
            target_language,
            translated_text,
            created_at: now.clone(),
            last_used_at: now,
            hit_count: 0,
        }
    }
}

/// Aggregate numbers about the cache
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: i64,
    pub total_hits: i64,
    /// Entry count per (source, target) language pair
    pub language_pairs: Vec<(String, String, i64)>,
    pub oldest_entry: Option<String>,
    pub newest_entry: Option<String>,
    /// Database file size in bytes
    pub file_size_bytes: u64,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cache entries: {}", self.total_entries)?;
        writeln!(f, "Cache hits: {}", self.total_hits)?;
        for (source, target, count) in &self.language_pairs {
            writeln!(f, "  {} -> {}: {}", source, target, count)?;
        }
        if let Some(oldest) = &self.oldest_entry {
            writeln!(f, "Oldest entry: {}", oldest)?;
        }
        if let Some(newest) = &self.newest_entry {
            writeln!(f, "Newest entry: {}", newest)?;
        }
        write!(f, "Size: {} KB", self.file_size_bytes / 1024)
    }
}

/// How a purge pattern is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    #[default]
    Substring,
    /// `*` and `?`, anchored at both ends
    Wildcard,
    Regex,
}

/// A compiled purge pattern
#[derive(Debug, Clone)]
pub enum PurgePattern {
    Substring(String),
    Matcher(Regex),
}

impl PurgePattern {
    pub fn new(pattern: &str, kind: PatternKind) -> Result<Self> {
        match kind {
            PatternKind::Substring => Ok(Self::Substring(pattern.to_string())),
            PatternKind::Wildcard => {
                let mut expression = String::from("(?s)^");
                for c in pattern.chars() {
                    match c {
                        '*' => expression.push_str(".*"),
                        '?' => expression.push('.'),
                        other => expression.push_str(&regex::escape(&other.to_string())),
                    }
                }
                expression.push('$');
                let regex = Regex::new(&expression)
                    .with_context(|| format!("Invalid wildcard pattern: {}", pattern))?;
                Ok(Self::Matcher(regex))
            }
            PatternKind::Regex => {
                let regex = Regex::new(pattern)
                    .with_context(|| format!("Invalid regular expression: {}", pattern))?;
                Ok(Self::Matcher(regex))
            }
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Substring(needle) => text.contains(needle.as_str()),
            Self::Matcher(regex) => regex.is_match(text),
        }
    }
}

/// Which stored text a purge pattern is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurgeField {
    #[default]
    Translated,
    Source,
    Both,
}

impl PurgeField {
    pub fn matches(&self, pattern: &PurgePattern, record: &CacheRecord) -> bool {
        match self {
            Self::Translated => pattern.is_match(&record.translated_text),
            Self::Source => pattern.is_match(&record.source_text),
            Self::Both => {
                pattern.is_match(&record.translated_text) || pattern.is_match(&record.source_text)
            }
        }
    }
}

/// Result of a purge run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    /// Rows that matched (and were deleted unless dry run)
    pub matched: usize,
    pub dry_run: bool,
    /// A few matching source texts for display
    pub samples: Vec<String>,
}
