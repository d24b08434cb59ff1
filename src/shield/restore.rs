/*!
 * Putting original markup back into translated text.
 *
 * Services do not always return tokens intact: they add spaces, drop braces,
 * change case, split tokens across lines, wrap them in the construct they
 * replaced, or drop them altogether. Restoration works through these cases
 * in order:
 *
 * 1. collapse whitespace inside brace-delimited token-like spans
 * 2. substitute every token found with a tolerant pattern, stripping residue
 * 3. rebuild constructs the translator re-derived instead of keeping the token
 * 4. re-insert whatever is still missing according to the configured policy
 * 5. decode stray HTML entities and fix glued emphasis
 *
 * Every step records a [`Repair`]. A canonical token inside unchanged text
 * always restores to exactly the source.
 */

use log::debug;
use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use super::formatting;
use super::placeholder::{Placeholder, PlaceholderKind, PlaceholderMap};
use super::validate::{self, ValidationReport};

/// Where to put markup whose token vanished from the translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPlaceholderPolicy {
    /// Append at the end of the segment
    #[default]
    SegmentEnd,
    /// Insert before the terminal punctuation of the nearest sentence
    SentenceBoundary,
}

/// Knobs for [`restore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreOptions {
    pub missing_policy: MissingPlaceholderPolicy,
    pub decode_entities: bool,
    pub fix_spacing: bool,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            missing_policy: MissingPlaceholderPolicy::SegmentEnd,
            decode_entities: true,
            fix_spacing: true,
        }
    }
}

/// What a repair did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairKind {
    TokenWhitespaceCollapsed,
    TokenReconstructed,
    UnknownTokenDropped,
    DuplicateTokenDropped,
    ResidueStripped,
    DuplicateReferenceRemoved,
    DisplayTextRestored,
    ReferenceRebuilt,
    UrlRebuilt,
    SubstitutionRebuilt,
    MissingReinserted,
    EntitiesDecoded,
    SpacingFixed,
}

impl RepairKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TokenWhitespaceCollapsed => "token-whitespace-collapsed",
            Self::TokenReconstructed => "token-reconstructed",
            Self::UnknownTokenDropped => "unknown-token-dropped",
            Self::DuplicateTokenDropped => "duplicate-token-dropped",
            Self::ResidueStripped => "residue-stripped",
            Self::DuplicateReferenceRemoved => "duplicate-reference-removed",
            Self::DisplayTextRestored => "display-text-restored",
            Self::ReferenceRebuilt => "reference-rebuilt",
            Self::UrlRebuilt => "url-rebuilt",
            Self::SubstitutionRebuilt => "substitution-rebuilt",
            Self::MissingReinserted => "missing-reinserted",
            Self::EntitiesDecoded => "entities-decoded",
            Self::SpacingFixed => "spacing-fixed",
        }
    }
}

/// One repair applied during restoration
#[derive(Debug, Clone, PartialEq)]
pub struct Repair {
    pub kind: RepairKind,
    /// Index of the placeholder involved, if any
    pub placeholder: Option<usize>,
    pub detail: String,
}

impl Repair {
    fn new(kind: RepairKind, placeholder: Option<usize>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            placeholder,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Repair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.placeholder {
            Some(index) => write!(f, "{} (#{}): {}", self.kind.name(), index, self.detail),
            None => write!(f, "{}: {}", self.kind.name(), self.detail),
        }
    }
}

/// Result of [`restore`]
#[derive(Debug, Clone, PartialEq)]
pub struct RestoreOutcome {
    pub text: String,
    pub repairs: Vec<Repair>,
    /// Placeholders that had to be re-inserted on a best-effort basis
    pub unresolved: Vec<usize>,
    /// Structural check of the final text
    pub validation: ValidationReport,
    /// Set when a human should look at the result
    pub needs_review: bool,
}

static TOKEN_SPAN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\s*\{[^{}]{1,96}\}").expect("valid token span regex"));

static ROLE_WRAP_BEFORE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":[A-Za-z][\w-]*:`\s*<?\s*$").expect("valid role wrap regex"));

static ROLE_WRAP_AFTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*>?\s*`(?:__?)?").expect("valid role wrap regex"));

static PLAIN_WRAP_BEFORE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`<?$").expect("valid backtick wrap regex"));

static PLAIN_WRAP_AFTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^>?`(?:__?)?").expect("valid backtick wrap regex"));

static TRAILING_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^`__?").expect("valid hyperlink suffix regex"));

/// Restore `translated` using `map`.
pub fn restore(translated: &str, map: &PlaceholderMap, options: &RestoreOptions) -> RestoreOutcome {
    let mut repairs = Vec::new();

    let text = collapse_token_whitespace(translated, map.namespace(), &mut repairs);
    // Lost tokens are recovered while restored markup is still absent, so a
    // recovery can never match markup that belongs to another placeholder.
    let text = recover_lost_tokens(&text, map, &mut repairs);
    let (mut text, found) = substitute_tokens(&text, map, &mut repairs);

    let mut unresolved = Vec::new();
    for placeholder in map.iter().filter(|p| !found.contains(&p.index)) {
        text = match options.missing_policy {
            MissingPlaceholderPolicy::SegmentEnd => append_at_end(&text, &placeholder.original),
            MissingPlaceholderPolicy::SentenceBoundary => {
                insert_at_sentence_boundary(&text, &placeholder.original, placeholder.position)
            }
        };
        debug!("Placeholder {} missing from translation, re-inserted", placeholder);
        repairs.push(Repair::new(
            RepairKind::MissingReinserted,
            Some(placeholder.index),
            format!("{:?}: {}", options.missing_policy, placeholder.original),
        ));
        unresolved.push(placeholder.index);
    }

    if options.decode_entities {
        let (decoded, changed) = formatting::decode_entities(map.source(), &text);
        if changed {
            repairs.push(Repair::new(RepairKind::EntitiesDecoded, None, "HTML entities decoded"));
            text = decoded;
        }
    }
    if options.fix_spacing {
        let (fixed, changed) = formatting::fix_inline_spacing(map.source(), &text);
        if changed {
            repairs.push(Repair::new(RepairKind::SpacingFixed, None, "spacing around emphasis"));
            text = fixed;
        }
    }

    for repair in &repairs {
        debug!("Restore repair {}", repair);
    }

    let validation = validate::validate(map, &text);
    RestoreOutcome {
        needs_review: !unresolved.is_empty() || !validation.is_valid(),
        text,
        repairs,
        unresolved,
        validation,
    }
}

/// Tolerant token pattern for one namespace
fn token_pattern(namespace: &str) -> Option<Regex> {
    let pattern = format!(
        r"(?i)(?:\{{\s*){{0,2}}{}\s*_\s*(REF|LBL|URL|SUB|RAW)\s*_\s*(\d+)(?:\s*\}}){{0,2}}",
        regex::escape(namespace)
    );
    Regex::new(&pattern).ok()
}

/// Indices of placeholders whose token survived translation
fn present_tokens(text: &str, map: &PlaceholderMap) -> HashSet<usize> {
    let Some(pattern) = token_pattern(map.namespace()) else {
        return HashSet::new();
    };
    pattern
        .captures_iter(text)
        .filter_map(|caps| caps[2].parse::<usize>().ok())
        .filter(|index| map.get(*index).is_some())
        .collect()
}

/// Put the token back where the translator copied or re-derived the markup.
///
/// Each match is consumed by one placeholder, so repeated constructs need
/// one surviving copy each.
fn recover_lost_tokens(text: &str, map: &PlaceholderMap, repairs: &mut Vec<Repair>) -> String {
    let present = present_tokens(text, map);
    let mut text = text.to_string();
    for placeholder in map.iter().filter(|p| !present.contains(&p.index)) {
        if text.contains(&placeholder.original) {
            text = text.replacen(&placeholder.original, &placeholder.token, 1);
            continue;
        }
        if let Some((rebuilt, kind)) = rebuild_construct(&text, placeholder) {
            repairs.push(Repair::new(kind, Some(placeholder.index), placeholder.original.clone()));
            text = rebuilt;
        }
    }
    text
}

fn collapse_token_whitespace(text: &str, namespace: &str, repairs: &mut Vec<Repair>) -> String {
    let namespace = namespace.to_uppercase();
    let mut collapsed = false;
    let result = TOKEN_SPAN_RE.replace_all(text, |caps: &regex::Captures| {
        let span = &caps[0];
        let squeezed: String = span.chars().filter(|c| !c.is_whitespace()).collect();
        if squeezed != span && squeezed.to_uppercase().contains(&namespace) {
            collapsed = true;
            squeezed
        } else {
            span.to_string()
        }
    });
    let result = result.into_owned();
    if collapsed {
        repairs.push(Repair::new(
            RepairKind::TokenWhitespaceCollapsed,
            None,
            "whitespace removed inside token",
        ));
    }
    result
}

fn substitute_tokens(
    text: &str,
    map: &PlaceholderMap,
    repairs: &mut Vec<Repair>,
) -> (String, HashSet<usize>) {
    let mut found = HashSet::new();
    let Some(pattern) = token_pattern(map.namespace()) else {
        return (text.to_string(), found);
    };

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for caps in pattern.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() < cursor {
            continue;
        }
        out.push_str(&text[cursor..whole.start()]);
        cursor = whole.end();

        let placeholder = caps[2].parse::<usize>().ok().and_then(|index| map.get(index));
        let Some(placeholder) = placeholder else {
            repairs.push(Repair::new(RepairKind::UnknownTokenDropped, None, whole.as_str()));
            continue;
        };
        if !found.insert(placeholder.index) {
            repairs.push(Repair::new(
                RepairKind::DuplicateTokenDropped,
                Some(placeholder.index),
                whole.as_str(),
            ));
            continue;
        }
        if whole.as_str() != placeholder.token {
            repairs.push(Repair::new(
                RepairKind::TokenReconstructed,
                Some(placeholder.index),
                whole.as_str(),
            ));
        }

        cursor += strip_residue(&mut out, &text[cursor..], placeholder, map.source(), repairs);
        cursor += remove_duplicate_reference(&mut out, &text[cursor..], placeholder, map.source(), repairs);
        out.push_str(&placeholder.original);
    }
    out.push_str(&text[cursor..]);

    (out, found)
}

/// Strip the construct the translator wrapped around a token.
///
/// Truncates `out` and returns how many bytes of `after` to skip.
fn strip_residue(
    out: &mut String,
    after: &str,
    placeholder: &Placeholder,
    source: &str,
    repairs: &mut Vec<Repair>,
) -> usize {
    let haystack = out.as_str();
    let wrapped = ROLE_WRAP_BEFORE_RE
        .find(haystack)
        .and_then(|before| ROLE_WRAP_AFTER_RE.find(after).map(|a| (before.start(), a.end())))
        .or_else(|| {
            PLAIN_WRAP_BEFORE_RE
                .find(haystack)
                .and_then(|before| PLAIN_WRAP_AFTER_RE.find(after).map(|a| (before.start(), a.end())))
        });
    let residue = wrapped.or_else(|| {
        let original = &placeholder.original;
        if original.ends_with("`__") || original.ends_with("`_") {
            TRAILING_SUFFIX_RE.find(after).map(|a| (haystack.len(), a.end()))
        } else {
            None
        }
    });
    let Some((cut, skip)) = residue else { return 0 };

    let candidate = format!("{}{}{}", &haystack[cut..], placeholder.original, &after[..skip]);
    if source.contains(&candidate) {
        return 0;
    }
    repairs.push(Repair::new(RepairKind::ResidueStripped, Some(placeholder.index), candidate));
    out.truncate(cut);
    skip
}

/// Drop a re-derived copy of a reference sitting right next to its token
fn remove_duplicate_reference(
    out: &mut String,
    after: &str,
    placeholder: &Placeholder,
    source: &str,
    repairs: &mut Vec<Repair>,
) -> usize {
    let (role, label) = match &placeholder.kind {
        PlaceholderKind::RefDisplay { role, label, .. } | PlaceholderKind::RefBare { role, label } => {
            (role, label)
        }
        _ => return 0,
    };
    if label.is_empty() {
        return 0;
    }
    let reference = format!(
        r":{}:`\s*<?\s*{}\s*>?\s*`",
        regex::escape(role),
        regex::escape(label)
    );

    if let Ok(following) = Regex::new(&format!(r"^\s*{}", reference)) {
        if let Some(m) = following.find(after) {
            if !source.contains(m.as_str().trim()) {
                repairs.push(Repair::new(
                    RepairKind::DuplicateReferenceRemoved,
                    Some(placeholder.index),
                    m.as_str().trim(),
                ));
                return m.end();
            }
        }
    }
    if let Ok(preceding) = Regex::new(&format!(r"{}\s*$", reference)) {
        if let Some(m) = preceding.find(out.as_str()) {
            if !source.contains(m.as_str().trim()) {
                repairs.push(Repair::new(
                    RepairKind::DuplicateReferenceRemoved,
                    Some(placeholder.index),
                    m.as_str().trim(),
                ));
                let start = m.start();
                out.truncate(start);
            }
        }
    }
    0
}

/// Replace a re-derived construct with the placeholder's token
fn rebuild_construct(text: &str, placeholder: &Placeholder) -> Option<(String, RepairKind)> {
    let (pattern, kind, fallback) = match &placeholder.kind {
        PlaceholderKind::RefDisplay { role, label, .. } if !label.is_empty() => (
            reference_pattern(role, label),
            RepairKind::DisplayTextRestored,
            None,
        ),
        PlaceholderKind::RefBare { role, label } if !label.is_empty() => (
            reference_pattern(role, label),
            RepairKind::ReferenceRebuilt,
            None,
        ),
        PlaceholderKind::Url { url, .. } => (
            format!(r"`[^`]*<\s*{}\s*>`_{{0,2}}", regex::escape(url)),
            RepairKind::UrlRebuilt,
            Some(url.as_str()),
        ),
        PlaceholderKind::Substitution { name, .. } => (
            format!(r"\|\s*{}\s*\|_{{0,2}}", regex::escape(name)),
            RepairKind::SubstitutionRebuilt,
            None,
        ),
        _ => return None,
    };

    let re = Regex::new(&pattern).ok()?;
    if re.is_match(text) {
        let rebuilt = re.replacen(text, 1, NoExpand(&placeholder.token)).into_owned();
        return Some((rebuilt, kind));
    }
    // A bare URL left where the hyperlink used to be
    let url = fallback?;
    text.contains(url)
        .then(|| (text.replacen(url, &placeholder.token, 1), kind))
}

fn reference_pattern(role: &str, label: &str) -> String {
    format!(
        r":{}:`\s*(?:[^`<]*?<\s*)?{}\s*>?\s*`",
        regex::escape(role),
        regex::escape(label)
    )
}

fn append_at_end(text: &str, markup: &str) -> String {
    let trimmed = text.trim_end();
    if trimmed.is_empty() {
        markup.to_string()
    } else {
        format!("{} {}", trimmed, markup)
    }
}

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Insert `markup` before the terminal punctuation of the sentence that ends
/// at or after `position` (relative, 0.0..=1.0).
fn insert_at_sentence_boundary(text: &str, markup: &str, position: f32) -> String {
    let trimmed = text.trim_end();
    let terminals: Vec<usize> = trimmed
        .char_indices()
        .filter(|(i, c)| {
            is_terminal(*c)
                && trimmed[i + c.len_utf8()..]
                    .chars()
                    .next()
                    .is_none_or(char::is_whitespace)
        })
        .map(|(i, _)| i)
        .collect();

    let target = (position.clamp(0.0, 1.0) * trimmed.len() as f32) as usize;
    let Some(&end) = terminals.iter().find(|&&i| i >= target).or(terminals.last()) else {
        return append_at_end(text, markup);
    };

    let mut at = end;
    while let Some(prev) = trimmed[..at].chars().next_back() {
        if !is_terminal(prev) {
            break;
        }
        at -= prev.len_utf8();
    }

    let head = &trimmed[..at];
    let separator = if head.is_empty() || head.ends_with(char::is_whitespace) {
        ""
    } else {
        " "
    };
    format!("{}{}{}{}", head, separator, markup, &text[at..])
}
