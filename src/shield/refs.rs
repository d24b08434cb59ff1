/*!
 * Repair of references damaged by earlier, unshielded translation runs.
 *
 * Catalogs translated before placeholders were used contain references the
 * service rewrote: glued prefixes, truncated closing brackets, fragments of
 * the display text or label repeated after the reference, or the whole
 * reference written twice. These rules only touch reference syntax.
 */

use once_cell::sync::Lazy;
use regex::Regex;

static TEMP_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\btemp(:(?:ref|doc):`)").expect("valid temp prefix regex"));

static GLUED_ROLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([\p{L}\d])(:(?:ref|doc|numref|term):`)").expect("valid glued role regex")
});

static TRUNCATED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r":(ref|doc|numref|term):`([^<`]+)<([^>`\s]+)`").expect("valid truncated reference regex")
});

static REFERENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r":(ref|doc|numref|term):`([^<`]*?)\s*<([^<>`\s]+)>`").expect("valid reference regex")
});

static DUPLICATE_LABEL_TAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^<`]*?)\s*<([^<>`\s]+)>`").expect("valid label tail regex"));

static LABEL_SUFFIX_TAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^<>`\s]+)>`").expect("valid label suffix regex"));

static GLUED_WORDS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\p{L}+(?:[ \t]+\p{L}+)?").expect("valid glued words regex"));

static ANY_REFERENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r":(?:ref|doc|numref|term):`[^`]+`").expect("valid reference regex")
});

/// Repair corrupted references in a translated string.
///
/// Text without damaged references comes back unchanged.
pub fn repair_references(text: &str) -> String {
    let fixed = TEMP_PREFIX_RE.replace_all(text, "$1");
    let fixed = GLUED_ROLE_RE.replace_all(&fixed, "$1 $2");
    let fixed = TRUNCATED_RE.replace_all(&fixed, ":$1:`$2<$3>`");
    let fixed = repair_tails(&fixed);
    remove_repeated_references(&fixed)
}

fn repair_tails(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for caps in REFERENCE_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() < cursor {
            continue;
        }
        out.push_str(&text[cursor..whole.end()]);
        cursor = whole.end();
        cursor += repair_tail(&text[cursor..], caps[2].trim(), &caps[3], &mut out);
    }
    out.push_str(&text[cursor..]);
    out
}

/// Fix whatever follows a well-formed reference; returns bytes of `rest` consumed
fn repair_tail(rest: &str, display: &str, label: &str, out: &mut String) -> usize {
    if let Some(caps) = DUPLICATE_LABEL_TAIL_RE.captures(rest) {
        if &caps[2] == label {
            out.push_str(&caps[1]);
            return caps[0].len();
        }
    }
    if let Some(caps) = LABEL_SUFFIX_TAIL_RE.captures(rest) {
        if label.ends_with(&caps[1]) {
            return caps[0].len();
        }
    }
    if let Some(glued) = GLUED_WORDS_RE.find(rest) {
        let words = glued.as_str();
        if display.contains(words) {
            return words.len();
        }
        let first = words.split_whitespace().next().unwrap_or(words);
        if display.contains(first) {
            return first.len();
        }
        out.push(' ');
    }
    0
}

fn remove_repeated_references(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    let mut previous: Option<&str> = None;
    for reference in ANY_REFERENCE_RE.find_iter(text) {
        let between = &text[cursor..reference.start()];
        if previous == Some(reference.as_str()) && between.trim().is_empty() {
            cursor = reference.end();
            continue;
        }
        out.push_str(&text[cursor..reference.end()]);
        cursor = reference.end();
        previous = Some(reference.as_str());
    }
    out.push_str(&text[cursor..]);
    out
}
