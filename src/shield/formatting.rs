/*!
 * Cosmetic repairs applied to translated text after restoration.
 *
 * Each repair only fires when the translation introduced the problem: if the
 * source already contains the same form, the text is left alone.
 */

use once_cell::sync::Lazy;
use regex::Regex;

/// HTML entities some services emit instead of literal characters
const ENTITIES: &[(&str, &str)] = &[
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&apos;", "'"),
    // Last, so `&amp;lt;` decodes one level only
    ("&amp;", "&"),
];

static BOLD_GLUED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*([^*:]+):\*\*(\S)").expect("valid bold regex"));

static ITALIC_GLUED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|[^*])\*([^*:]+):\*([^\s*])").expect("valid italic regex"));

static NUMBER_GLUED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\.\*\*").expect("valid numbered bold regex"));

/// Decode entities that appear in `text` but not in `source`.
///
/// Returns the new text and whether anything changed.
pub fn decode_entities(source: &str, text: &str) -> (String, bool) {
    let mut result = text.to_string();
    let mut changed = false;
    for (entity, literal) in ENTITIES {
        if result.contains(entity) && !source.contains(entity) {
            result = result.replace(entity, literal);
            changed = true;
        }
    }
    (result, changed)
}

/// Restore spaces the translation glued onto emphasis markers.
///
/// `**Note:**Text` becomes `**Note:** Text`, `*Tip:*x` becomes `*Tip:* x` and
/// `1.**Step**` becomes `1. **Step**`.
pub fn fix_inline_spacing(source: &str, text: &str) -> (String, bool) {
    let mut result = text.to_string();
    let mut changed = false;

    if !BOLD_GLUED_RE.is_match(source) && BOLD_GLUED_RE.is_match(&result) {
        result = BOLD_GLUED_RE.replace_all(&result, "**$1:** $2").into_owned();
        changed = true;
    }
    if !ITALIC_GLUED_RE.is_match(source) && ITALIC_GLUED_RE.is_match(&result) {
        result = ITALIC_GLUED_RE.replace_all(&result, "$1*$2:* $3").into_owned();
        changed = true;
    }
    if !NUMBER_GLUED_RE.is_match(source) && NUMBER_GLUED_RE.is_match(&result) {
        result = NUMBER_GLUED_RE.replace_all(&result, "$1. **").into_owned();
        changed = true;
    }

    (result, changed)
}
