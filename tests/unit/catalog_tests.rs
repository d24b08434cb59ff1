/*!
 * Tests for reading and rewriting PO catalogs on disk.
 */

use anyhow::Result;
use docshield::catalog::{Catalog, CatalogEntry};
use docshield::file_utils::FileManager;

/// Written by another tool: narrow wrapping and a comment order we must keep
const FOREIGN_PO: &str = r#"# Koha manual, Swedish
msgid ""
msgstr ""
"Project-Id-Version: Koha Manual\n"
"Language: sv\n"

#: ../../source/circulation.rst:10
msgid ""
"Check out items to a patron from the "
"circulation module."
msgstr ""
"Låna ut exemplar till en låntagare "
"från cirkulationsmodulen."

#, fuzzy
#: ../../source/circulation.rst:20
msgid "Renew items"
msgstr "Förnya exemplar"

#: ../../source/circulation.rst:30
msgid "Check in"
msgstr ""
"#;

#[test]
fn test_saveAfterOneChange_shouldKeepOtherEntriesByteIdentical() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("circulation.po");
    FileManager::write_to_file(&path, FOREIGN_PO)?;

    let mut catalog = Catalog::load(&path)?;
    let index = catalog.find_index("Check in").expect("entry");
    if let Some(entry) = catalog.get_mut(index) {
        entry.set_msgstr("Återlämna");
    }
    catalog.save(&path)?;

    let written = FileManager::read_to_string(&path)?;
    let unchanged_prefix = FOREIGN_PO.split("#: ../../source/circulation.rst:30").next().unwrap_or_default();
    assert!(written.starts_with(unchanged_prefix));
    assert!(written.ends_with("msgid \"Check in\"\nmsgstr \"Återlämna\"\n"));
    Ok(())
}

#[test]
fn test_removeFuzzyFlags_shouldClearAndPersist() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("circulation.po");
    FileManager::write_to_file(&path, FOREIGN_PO)?;

    let mut catalog = Catalog::load(&path)?;
    assert_eq!(catalog.remove_fuzzy_flags(), 1);
    catalog.save(&path)?;

    let reloaded = Catalog::load(&path)?;
    assert!(reloaded.messages().all(|e| !e.is_fuzzy()));
    assert_eq!(reloaded.find("Renew items").map(CatalogEntry::msgstr), Some("Förnya exemplar"));
    assert!(!FileManager::read_to_string(&path)?.contains("fuzzy"));
    Ok(())
}

#[test]
fn test_loadWithoutChanges_shouldNotBeDirty() -> Result<()> {
    let catalog = Catalog::parse(FOREIGN_PO)?;
    assert!(!catalog.is_dirty());
    assert_eq!(catalog.to_po_string(), FOREIGN_PO);
    assert_eq!(
        catalog.find("Check out items to a patron from the circulation module.").map(CatalogEntry::msgstr),
        Some("Låna ut exemplar till en låntagare från cirkulationsmodulen.")
    );
    Ok(())
}
