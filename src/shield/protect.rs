/*!
 * Replacing non-translatable inline markup with opaque tokens.
 *
 * Constructs are matched one family at a time, most specific first, so a
 * reference never gets half-consumed by the hyperlink or substitution passes.
 */

use log::debug;
use once_cell::sync::Lazy;
use rand::{Rng, distr::Alphanumeric};
use regex::{Captures, Regex};

use super::placeholder::{DEFAULT_NAMESPACE, PlaceholderKind, PlaceholderMap};

/// Roles whose target is a label or document name
pub const REFERENCE_ROLES: &[&str] = &["ref", "doc", "numref", "term"];

/// Roles whose content is prose and should be translated
pub const PROSE_ROLES: &[&str] = &[
    "guilabel",
    "menuselection",
    "emphasis",
    "strong",
    "sup",
    "sub",
    "title-reference",
];

static INLINE_LITERAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"``[^`]+``").expect("valid inline literal regex"));

/// Display form; the closing `>` and backtick are optional so unterminated refs are still caught
static REF_DISPLAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r":(ref|doc|numref|term):`([^`<]*?[^`<\s])\s*<([^<>`\s]+)(?:(>`)|(>)|(`))?")
        .expect("valid reference regex")
});

static REF_BARE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r":(ref|doc|numref|term):`(?:\s*<?([^`<>]+?)>?\s*`|([^`<>\s]+))")
        .expect("valid bare reference regex")
});

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"`([^`<]*?[^`<\s])\s*<([^<>`\s]+)>`(__?)?").expect("valid hyperlink regex")
});

static SUBSTITUTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\|([^|\s](?:[^|]*?[^|\s])?)\|(__?)?").expect("valid substitution regex")
});

static ROLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":([A-Za-z][\w-]*):`([^`]*)`").expect("valid role regex"));

static NAMED_REFERENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`[^`\s][^`]*`__?").expect("valid named reference regex"));

/// Token-like text already present in a source
static COLLISION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\{\{\s*SHIELD|SHIELD[A-Z0-9]*\s*_\s*(?:REF|LBL|URL|SUB|RAW)\s*_\s*\d")
        .expect("valid collision regex")
});

/// Shield every recognised construct in `text`.
///
/// Returns the shielded text and the map needed to undo it. Unterminated
/// constructs are still shielded and marked `well_formed = false`.
pub fn protect(text: &str) -> (String, PlaceholderMap) {
    let namespace = choose_namespace(text);
    let mut map = PlaceholderMap::new(namespace, text);

    let shielded = replace_literals(text, &mut map);
    let shielded = replace_display_references(&shielded, &mut map);
    let shielded = replace_bare_references(&shielded, &mut map);
    let shielded = replace_urls(&shielded, &mut map);
    let shielded = replace_substitutions(&shielded, &mut map);
    let shielded = replace_raw_roles(&shielded, &mut map);
    let shielded = replace_named_references(&shielded, &mut map);

    map.locate_tokens(&shielded);
    for placeholder in map.malformed() {
        debug!("Unterminated markup shielded as {}", placeholder);
    }
    (shielded, map)
}

/// Pick a namespace the source cannot collide with
fn choose_namespace(text: &str) -> String {
    if !COLLISION_RE.is_match(text) {
        return DEFAULT_NAMESPACE.to_string();
    }

    let upper = text.to_uppercase();
    loop {
        let suffix: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(6)
            .map(|b| char::from(b).to_ascii_uppercase())
            .collect();
        let namespace = format!("{}{}", DEFAULT_NAMESPACE, suffix);
        if !upper.contains(&namespace) {
            debug!("Source already contains shield tokens, using namespace {}", namespace);
            return namespace;
        }
    }
}

fn replace_literals(text: &str, map: &mut PlaceholderMap) -> String {
    INLINE_LITERAL_RE
        .replace_all(text, |caps: &Captures| map.push(PlaceholderKind::RawInline, &caps[0], true))
        .into_owned()
}

fn replace_display_references(text: &str, map: &mut PlaceholderMap) -> String {
    REF_DISPLAY_RE
        .replace_all(text, |caps: &Captures| {
            let kind = PlaceholderKind::RefDisplay {
                role: caps[1].to_string(),
                display: caps[2].to_string(),
                label: caps[3].to_string(),
            };
            let well_formed = caps.get(4).is_some();
            map.push(kind, &caps[0], well_formed)
        })
        .into_owned()
}

fn replace_bare_references(text: &str, map: &mut PlaceholderMap) -> String {
    REF_BARE_RE
        .replace_all(text, |caps: &Captures| {
            let (label, well_formed) = match (caps.get(2), caps.get(3)) {
                (Some(closed), _) => (closed.as_str().trim(), true),
                (None, Some(open)) => (open.as_str(), false),
                (None, None) => ("", false),
            };
            let kind = PlaceholderKind::RefBare {
                role: caps[1].to_string(),
                label: label.to_string(),
            };
            map.push(kind, &caps[0], well_formed)
        })
        .into_owned()
}

fn replace_urls(text: &str, map: &mut PlaceholderMap) -> String {
    URL_RE
        .replace_all(text, |caps: &Captures| {
            let suffix = caps.get(3).map(|m| m.as_str()).unwrap_or_default();
            let kind = PlaceholderKind::Url {
                display: caps[1].to_string(),
                url: caps[2].to_string(),
                suffix: suffix.to_string(),
            };
            map.push(kind, &caps[0], !suffix.is_empty())
        })
        .into_owned()
}

fn replace_substitutions(text: &str, map: &mut PlaceholderMap) -> String {
    SUBSTITUTION_RE
        .replace_all(text, |caps: &Captures| {
            let whole = caps.get(0).map(|m| (m.start(), m.end())).unwrap_or_default();
            // `a|b|c` is not a substitution reference: it needs a word boundary on both sides.
            let before = text[..whole.0].chars().next_back();
            let after = text[whole.1..].chars().next();
            if before.is_some_and(char::is_alphanumeric) || after.is_some_and(char::is_alphanumeric) {
                return caps[0].to_string();
            }
            let kind = PlaceholderKind::Substitution {
                name: caps[1].to_string(),
                suffix: caps.get(2).map(|m| m.as_str()).unwrap_or_default().to_string(),
            };
            map.push(kind, &caps[0], true)
        })
        .into_owned()
}

fn replace_raw_roles(text: &str, map: &mut PlaceholderMap) -> String {
    ROLE_RE
        .replace_all(text, |caps: &Captures| {
            let role = caps[1].to_ascii_lowercase();
            if PROSE_ROLES.contains(&role.as_str()) {
                return caps[0].to_string();
            }
            map.push(PlaceholderKind::RawInline, &caps[0], true)
        })
        .into_owned()
}

fn replace_named_references(text: &str, map: &mut PlaceholderMap) -> String {
    NAMED_REFERENCE_RE
        .replace_all(text, |caps: &Captures| {
            let start = caps.get(0).map(|m| m.start()).unwrap_or_default();
            // The closing backtick of a prose role is not the start of a reference.
            if text[..start].ends_with(':') {
                return caps[0].to_string();
            }
            map.push(PlaceholderKind::RawInline, &caps[0], true)
        })
        .into_owned()
}
