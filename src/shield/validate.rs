/*!
 * Structural checks on restored text.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;

use super::placeholder::PlaceholderMap;

static LEFTOVER_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\{*\s*SHIELD[A-Z0-9]*\s*_\s*(?:REF|LBL|URL|SUB|RAW)\s*_\s*\d+\s*\}*")
        .expect("valid leftover token regex")
});

/// A problem found in restored text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// Token-like text survived restoration
    LeftoverToken(String),
    /// A placeholder's original markup is absent from the output
    MissingMarkup { index: usize },
    /// Odd/even backtick count differs from the source
    BacktickParity { source: usize, restored: usize },
    /// Non-empty source came back empty
    EmptyTranslation,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LeftoverToken(token) => write!(f, "leftover token `{}`", token),
            Self::MissingMarkup { index } => write!(f, "markup of placeholder #{} missing", index),
            Self::BacktickParity { source, restored } => write!(
                f,
                "backtick parity differs (source {}, translation {})",
                source, restored
            ),
            Self::EmptyTranslation => write!(f, "empty translation"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    /// One-line summary for logs and review notes
    pub fn summary(&self) -> String {
        self.issues
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Check `restored` against the source recorded in `map`
pub fn validate(map: &PlaceholderMap, restored: &str) -> ValidationReport {
    let source = map.source();
    let mut issues = Vec::new();

    if restored.trim().is_empty() && !source.trim().is_empty() {
        issues.push(ValidationIssue::EmptyTranslation);
    }

    for leftover in LEFTOVER_TOKEN_RE.find_iter(restored) {
        let token = leftover.as_str().trim();
        if !source.contains(token) {
            issues.push(ValidationIssue::LeftoverToken(token.to_string()));
        }
    }

    // Placeholders sharing an original need one copy each
    let mut by_original: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for placeholder in map.iter() {
        by_original.entry(placeholder.original.as_str()).or_default().push(placeholder.index);
    }
    let mut missing: Vec<usize> = by_original
        .iter()
        .flat_map(|(original, indices)| {
            let present = restored.matches(original).count();
            indices.iter().skip(present).copied()
        })
        .collect();
    missing.sort_unstable();
    issues.extend(missing.into_iter().map(|index| ValidationIssue::MissingMarkup { index }));

    let source_ticks = source.matches('`').count();
    let restored_ticks = restored.matches('`').count();
    if source_ticks % 2 != restored_ticks % 2 {
        issues.push(ValidationIssue::BacktickParity {
            source: source_ticks,
            restored: restored_ticks,
        });
    }

    ValidationReport { issues }
}
