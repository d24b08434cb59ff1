/*!
 * Markup shielding for reStructuredText segments.
 *
 * Before a segment goes to a translation service, references, hyperlinks,
 * substitutions and literal markup are swapped for opaque tokens
 * (`{{SHIELD_REF_0}}`). After translation the tokens are swapped back, and
 * whatever damage the service did to them is repaired.
 *
 * - `placeholder`: token kinds and the per-segment placeholder map
 * - `protect`: source text to shielded text
 * - `restore`: translated text back to markup, with repairs
 * - `formatting`: entity decoding and emphasis spacing
 * - `validate`: structural checks on the result
 * - `refs`: repair of references corrupted by earlier, unshielded runs
 */

pub mod formatting;
pub mod placeholder;
pub mod protect;
pub mod refs;
pub mod restore;
pub mod validate;

pub use placeholder::{Placeholder, PlaceholderKind, PlaceholderMap};
pub use restore::{MissingPlaceholderPolicy, Repair, RepairKind, RestoreOptions, RestoreOutcome};
pub use validate::{ValidationIssue, ValidationReport};

/// Protect/restore with a fixed set of restore options
#[derive(Debug, Clone, Default)]
pub struct MarkupShield {
    options: RestoreOptions,
}

impl MarkupShield {
    pub fn new(options: RestoreOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RestoreOptions {
        &self.options
    }

    /// Replace non-translatable markup with tokens
    pub fn protect(&self, text: &str) -> (String, PlaceholderMap) {
        protect::protect(text)
    }

    /// Put the markup back into `translated`
    pub fn restore(&self, translated: &str, map: &PlaceholderMap) -> RestoreOutcome {
        restore::restore(translated, map, &self.options)
    }
}
