/*!
 * Tests for the translation memory over an on-disk cache.
 */

use anyhow::Result;
use docshield::database::{DatabaseConnection, PatternKind, PurgeField, PurgePattern, Repository};
use docshield::document::content_hash;
use docshield::translation::{CacheKey, TranslationMemory};

fn key(text: &str, target: &str) -> CacheKey {
    CacheKey::new(&content_hash(text), "en", target)
}

async fn seeded(memory: &TranslationMemory) {
    memory.store(&key("Save", "sv"), "Save", "Spara %word%").await;
    memory.store(&key("Cancel", "sv"), "Cancel", "Avbryt").await;
    memory.store(&key("Delete", "sv"), "Delete", "Ta bort %word%").await;
    memory.store(&key("Save", "de"), "Save", "Speichern %word%").await;
}

#[tokio::test]
async fn test_memory_acrossReopen_shouldPersistTranslations() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("cache.db");
    {
        let memory = TranslationMemory::new(Repository::new(DatabaseConnection::new(&path)?));
        memory.store(&key("Save", "sv"), "Save", "Spara").await;
    }

    let reopened = TranslationMemory::new(Repository::new(DatabaseConnection::new(&path)?));
    assert_eq!(reopened.lookup(&key("Save", "sv")).await, Some("Spara".to_string()));
    assert_eq!(reopened.lookup(&key("Save", "de")).await, None);
    Ok(())
}

#[tokio::test]
async fn test_purge_withDryRun_shouldReportWhatRealRunDeletes() -> Result<()> {
    let memory = TranslationMemory::in_memory()?;
    seeded(&memory).await;

    let pattern = || PurgePattern::new("%word%", PatternKind::Substring);
    let preview = memory.purge(pattern()?, PurgeField::Translated, Some("sv"), true).await?;
    assert_eq!(preview.matched, 2);
    assert!(preview.dry_run);
    assert_eq!(memory.stats().await?.total_entries, 4);

    let deleted = memory.purge(pattern()?, PurgeField::Translated, Some("sv"), false).await?;
    assert_eq!(deleted.matched, preview.matched);
    assert_eq!(memory.stats().await?.total_entries, 2);
    assert_eq!(memory.lookup(&key("Cancel", "sv")).await, Some("Avbryt".to_string()));
    assert_eq!(memory.lookup(&key("Save", "de")).await, Some("Speichern %word%".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_purge_withRegexOnSource_shouldMatchSourceColumn() -> Result<()> {
    let memory = TranslationMemory::in_memory()?;
    seeded(&memory).await;

    let pattern = PurgePattern::new("^(Save|Delete)$", PatternKind::Regex)?;
    let report = memory.purge(pattern, PurgeField::Source, None, false).await?;
    assert_eq!(report.matched, 3);
    assert_eq!(memory.stats().await?.total_entries, 1);
    Ok(())
}
