/*!
 * Tests for the markup shield as a whole: protect, restore, validate.
 */

use docshield::shield::refs::repair_references;
use docshield::shield::{MarkupShield, MissingPlaceholderPolicy, PlaceholderKind, RestoreOptions};

/// Source lines from real manuals, one construct family each
const CORPUS: &[&str] = &[
    "Plain text with no markup at all.",
    "See the :ref:`item search <item-searching-label>` tool.",
    "Go to :ref:`circulation-label`, then :doc:`/acquisitions/orders`.",
    "Read the `Koha community site <https://koha-community.org>`_ first.",
    "Set |koha| preferences and press :kbd:`Ctrl+S`.",
    "Run ``koha-rebuild-zebra -v`` nightly, see `cron`_.",
    "Click :guilabel:`Save` and **check** the *result*.",
    "Two refs :ref:`a <a-label>` and :ref:`b <b-label>` in one line.",
];

#[test]
fn test_protectThenRestore_withoutTranslation_shouldReturnSource() {
    let shield = MarkupShield::default();
    for source in CORPUS {
        let (shielded, map) = shield.protect(source);
        let outcome = shield.restore(&shielded, &map);
        assert_eq!(&outcome.text, source);
        assert!(!outcome.needs_review, "{} needed review", source);
    }
}

#[test]
fn test_protect_withReference_shouldHideSyntaxFromService() {
    let shield = MarkupShield::default();
    let (shielded, map) = shield.protect("See the :ref:`item search <item-searching-label>` tool.");
    assert!(!shielded.contains(":ref:"));
    assert!(!shielded.contains("item-searching-label"));
    assert_eq!(map.len(), 1);
    assert!(map.get(0).is_some_and(|p| matches!(p.kind, PlaceholderKind::RefDisplay { .. })));
}

#[test]
fn test_restore_withDroppedDisplayText_shouldRebuildReference() {
    let shield = MarkupShield::default();
    let (_, map) = shield.protect("See the :ref:`item search <item-searching-label>` tool.");
    let outcome = shield.restore(":ref:`<item-searching-label>` tool.", &map);
    assert_eq!(outcome.text, ":ref:`item search <item-searching-label>` tool.");
    assert!(!outcome.repairs.is_empty());
}

#[test]
fn test_restore_withLostToken_shouldFollowPolicy() {
    let source = "Open :ref:`circulation-label`. Then save.";
    let end = MarkupShield::default();
    let (_, map) = end.protect(source);
    assert_eq!(
        end.restore("Ouvrez. Puis enregistrez.", &map).text,
        "Ouvrez. Puis enregistrez. :ref:`circulation-label`"
    );

    let sentence = MarkupShield::new(RestoreOptions {
        missing_policy: MissingPlaceholderPolicy::SentenceBoundary,
        ..RestoreOptions::default()
    });
    let outcome = sentence.restore("Ouvrez. Puis enregistrez.", &map);
    assert_eq!(outcome.text, "Ouvrez :ref:`circulation-label`. Puis enregistrez.");
    assert_eq!(outcome.unresolved, vec![0]);
}

#[test]
fn test_repairReferences_withHealthyTranslation_shouldNotChange() {
    let text = "Se verktyget :ref:`exemplarsökning <item-searching-label>`.";
    assert_eq!(repair_references(text), text);
}
