/*!
 * Deciding, per segment, whether an existing translation can be reused.
 *
 * Order of preference: exact catalog match, fuzzy catalog match, cache hit,
 * fresh translation. Force-retranslate skips every reuse step.
 */

use std::collections::HashMap;

use crate::catalog::{Catalog, CatalogEntry};
use crate::document::{Segment, fuzzy_key};
use crate::translation::memory::{CacheKey, TranslationMemory};

/// Outcome of reconciling one segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The catalog already has a translation for this exact msgid
    ReuseExact,
    /// A whitespace-variant entry has a translation; reuse it for review
    ReuseFuzzy { msgstr: String },
    /// The translation memory knows this text
    CacheHit { msgstr: String },
    /// Nothing to reuse
    Translate,
}

/// Per-document reconciliation state
#[derive(Debug)]
pub struct Reconciler {
    force: bool,
    /// fuzzy key → translation, first translated entry wins
    fuzzy_index: HashMap<String, String>,
}

impl Reconciler {
    /// Index the translated entries of `catalog`
    pub fn new(catalog: &Catalog, force: bool) -> Self {
        let mut fuzzy_index = HashMap::new();
        for entry in catalog.messages() {
            if entry.msgid_plural().is_none() && entry.msgctxt().is_none() && !entry.msgstr().is_empty() {
                fuzzy_index
                    .entry(fuzzy_key(entry.msgid()))
                    .or_insert_with(|| entry.msgstr().to_string());
            }
        }
        Self { force, fuzzy_index }
    }

    pub fn is_forced(&self) -> bool {
        self.force
    }

    /// Catalog steps only: exact (a wrapped msgid counts), then fuzzy
    pub fn check_catalog(&self, catalog: &Catalog, segment: &Segment) -> Option<Resolution> {
        if self.force {
            return None;
        }
        if catalog
            .find_index_normalized(&segment.source_text)
            .and_then(|index| catalog.get(index))
            .is_some_and(|entry| !entry.msgstr().is_empty())
        {
            return Some(Resolution::ReuseExact);
        }
        self.fuzzy_index
            .get(&segment.fuzzy_key())
            .map(|msgstr| Resolution::ReuseFuzzy { msgstr: msgstr.clone() })
    }

    /// Full decision for one segment
    pub async fn resolve(
        &self,
        catalog: &Catalog,
        segment: &Segment,
        memory: &TranslationMemory,
        key: &CacheKey,
    ) -> Resolution {
        if let Some(resolution) = self.check_catalog(catalog, segment) {
            return resolution;
        }
        if self.force {
            return Resolution::Translate;
        }
        match memory.lookup(key).await {
            Some(msgstr) => Resolution::CacheHit { msgstr },
            None => Resolution::Translate,
        }
    }

    /// Remember a translation written during this run for later fuzzy matches
    pub fn record(&mut self, segment: &Segment, msgstr: &str) {
        if !msgstr.is_empty() {
            self.fuzzy_index
                .entry(segment.fuzzy_key())
                .or_insert_with(|| msgstr.to_string());
        }
    }
}

fn reference_for(segment: &Segment) -> String {
    format!("{}:{}", segment.path().display(), segment.location.line)
}

/// Create or update the entry for `segment` and return its index
pub fn apply_translation(catalog: &mut Catalog, segment: &Segment, msgstr: &str, fuzzy: bool) -> usize {
    let index = match catalog.find_index_normalized(&segment.source_text) {
        Some(index) => index,
        None => {
            let mut entry = CatalogEntry::new(segment.source_text.clone(), "");
            entry.add_reference(reference_for(segment));
            catalog.insert(entry)
        }
    };
    if let Some(entry) = catalog.get_mut(index) {
        entry.set_msgstr(msgstr);
        entry.set_fuzzy(fuzzy);
    }
    index
}

/// Make sure an entry exists, leaving any existing one alone
pub fn ensure_entry(catalog: &mut Catalog, segment: &Segment) -> usize {
    match catalog.find_index_normalized(&segment.source_text) {
        Some(index) => index,
        None => {
            let mut entry = CatalogEntry::new(segment.source_text.clone(), "");
            entry.add_reference(reference_for(segment));
            catalog.insert(entry)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::SourceLocation;

    fn segment(text: &str) -> Segment {
        Segment::new(text, SourceLocation::new("source/circulation.rst", 1, 3))
    }

    fn catalog_with(entries: &[(&str, &str)]) -> Catalog {
        let mut catalog = Catalog::new("sv", "Manual");
        for (msgid, msgstr) in entries {
            catalog.insert(CatalogEntry::new(*msgid, *msgstr));
        }
        catalog
    }

    fn key_for(segment: &Segment) -> CacheKey {
        CacheKey::new(&segment.content_hash, "en", "sv")
    }

    #[tokio::test]
    async fn test_resolve_withExactMatch_shouldPreferItOverCache() {
        let catalog = catalog_with(&[("Check out items", "Låna ut exemplar")]);
        let memory = TranslationMemory::in_memory().unwrap();
        let seg = segment("Check out items");
        memory.store(&key_for(&seg), &seg.source_text, "Något annat").await;

        let reconciler = Reconciler::new(&catalog, false);
        assert_eq!(reconciler.resolve(&catalog, &seg, &memory, &key_for(&seg)).await, Resolution::ReuseExact);
    }

    #[tokio::test]
    async fn test_resolve_withWhitespaceVariant_shouldReuseFuzzy() {
        let catalog = catalog_with(&[("Add item(s)", "Lägg till exemplar")]);
        let memory = TranslationMemory::in_memory().unwrap();
        let seg = segment("Add item (s)");

        let reconciler = Reconciler::new(&catalog, false);
        assert_eq!(
            reconciler.resolve(&catalog, &seg, &memory, &key_for(&seg)).await,
            Resolution::ReuseFuzzy { msgstr: "Lägg till exemplar".to_string() }
        );
    }

    #[tokio::test]
    async fn test_resolve_withEmptyExactAndCache_shouldHitCache() {
        let catalog = catalog_with(&[("Renew", "")]);
        let memory = TranslationMemory::in_memory().unwrap();
        let seg = segment("Renew");
        memory.store(&key_for(&seg), "Renew", "Förnya").await;

        let reconciler = Reconciler::new(&catalog, false);
        assert_eq!(
            reconciler.resolve(&catalog, &seg, &memory, &key_for(&seg)).await,
            Resolution::CacheHit { msgstr: "Förnya".to_string() }
        );
    }

    #[tokio::test]
    async fn test_resolve_withForce_shouldAlwaysTranslate() {
        let catalog = catalog_with(&[("Renew", "Förnya")]);
        let memory = TranslationMemory::in_memory().unwrap();
        let seg = segment("Renew");
        memory.store(&key_for(&seg), "Renew", "Förnya").await;

        let reconciler = Reconciler::new(&catalog, true);
        assert_eq!(reconciler.resolve(&catalog, &seg, &memory, &key_for(&seg)).await, Resolution::Translate);
    }

    #[test]
    fn test_fuzzyMatch_shouldBeCaseSensitive() {
        let catalog = catalog_with(&[("Add item", "Lägg till")]);
        let reconciler = Reconciler::new(&catalog, false);
        assert_eq!(reconciler.check_catalog(&catalog, &segment("add item")), None);
    }

    #[test]
    fn test_applyTranslation_shouldInsertOrUpdate() {
        let mut catalog = catalog_with(&[("Renew", "")]);
        let seg = segment("Renew");
        let index = apply_translation(&mut catalog, &seg, "Förnya", true);
        assert_eq!(catalog.get(index).map(CatalogEntry::msgstr), Some("Förnya"));
        assert!(catalog.get(index).is_some_and(CatalogEntry::is_fuzzy));

        let fresh = segment("Return");
        let index = apply_translation(&mut catalog, &fresh, "Återlämna", false);
        let entry = catalog.get(index).expect("entry");
        assert_eq!(entry.references(), ["source/circulation.rst:3"]);
        assert!(!entry.is_fuzzy());
    }

    #[test]
    fn test_checkCatalog_withWrappedMsgid_shouldReuseExact() {
        let catalog = catalog_with(&[("Check out items\nfrom the desk.", "Låna ut exemplar i disken.")]);
        let reconciler = Reconciler::new(&catalog, false);
        assert_eq!(
            reconciler.check_catalog(&catalog, &segment("Check out items from the desk.")),
            Some(Resolution::ReuseExact)
        );
    }

    #[test]
    fn test_applyTranslation_withWrappedMsgid_shouldUpdateInPlace() {
        let mut catalog = catalog_with(&[("Check out items\nfrom the desk.", "")]);
        let index = apply_translation(&mut catalog, &segment("Check out items from the desk."), "Låna ut", false);
        assert_eq!(catalog.len(), 1);
        let entry = catalog.get(index).expect("entry");
        assert_eq!(entry.msgid(), "Check out items\nfrom the desk.");
        assert_eq!(entry.msgstr(), "Låna ut");
        assert!(!entry.is_fuzzy());

        let again = ensure_entry(&mut catalog, &segment("Check out items from the desk."));
        assert_eq!(again, index);
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_ensureEntry_shouldNotTouchExisting() {
        let mut catalog = catalog_with(&[("Renew", "Förnya")]);
        let index = ensure_entry(&mut catalog, &segment("Renew"));
        assert_eq!(catalog.get(index).map(CatalogEntry::msgstr), Some("Förnya"));

        let added = ensure_entry(&mut catalog, &segment("Checkin"));
        assert_eq!(catalog.get(added).map(CatalogEntry::msgstr), Some(""));
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_record_shouldFeedLaterFuzzyMatches() {
        let catalog = catalog_with(&[]);
        let mut reconciler = Reconciler::new(&catalog, false);
        reconciler.record(&segment("Add  item"), "Lägg till");
        assert_eq!(
            reconciler.check_catalog(&catalog, &segment("Additem")),
            Some(Resolution::ReuseFuzzy { msgstr: "Lägg till".to_string() })
        );
    }
}
