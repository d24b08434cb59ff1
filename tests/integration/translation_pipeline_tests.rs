/*!
 * Integration tests for the translation pipeline.
 *
 * Every run goes through real RST extraction, the markup shield, an
 * in-memory translation cache and PO files in a temporary directory; only
 * the translation service is mocked.
 */

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use docshield::catalog::{Catalog, CatalogEntry};
use docshield::errors::{PipelineError, ProviderError};
use docshield::glossary::Glossary;
use docshield::providers::mock::{MockBehavior, MockFailure, MockProvider};
use docshield::providers::{Provider, TranslationRequest};
use docshield::translation::{CacheKey, RunContext, TranslationPipeline};
use docshield::document::content_hash;

use crate::common::{CIRCULATION_RST, PATRONS_RST, Project, memory};

fn provider(mock: &MockProvider) -> Arc<dyn Provider> {
    Arc::new(mock.clone())
}

#[tokio::test]
async fn test_run_withWorkingProvider_shouldWriteCatalogWithMarkupIntact() -> Result<()> {
    let project = Project::new()?;
    project.write_source("circulation", CIRCULATION_RST)?;
    let mock = MockProvider::working();

    let summary = project.run(provider(&mock), &memory(), false).await?;

    assert!(summary.is_clean(), "{}", summary);
    assert_eq!(summary.translated, 4);
    assert_eq!(mock.request_count(), 4);

    let catalog = Catalog::load(&project.catalog_path("circulation"))?;
    let entry = catalog
        .find("Check out items from the :ref:`checkout <checkout-label>` page.")
        .expect("entry for the reference paragraph");
    assert_eq!(entry.msgstr(), "[sv] Check out items from the :ref:`checkout <checkout-label>` page.");
    assert!(!entry.is_fuzzy());
    assert!(entry.references()[0].ends_with("circulation.rst:4"));

    // The service never saw raw reference syntax
    assert!(mock.received().iter().all(|r| !r.text.contains(":ref:")));
    Ok(())
}

#[tokio::test]
async fn test_run_twiceOnUnchangedSource_shouldKeepCatalogByteIdentical() -> Result<()> {
    let project = Project::new()?;
    project.write_source("circulation", CIRCULATION_RST)?;
    project.write_source("patrons", PATRONS_RST)?;
    let cache = memory();

    let first = MockProvider::working();
    project.run(provider(&first), &cache, false).await?;
    let circulation = project.read_catalog("circulation")?;
    let patrons = project.read_catalog("patrons")?;

    let second = MockProvider::working();
    let summary = project.run(provider(&second), &cache, false).await?;

    assert_eq!(second.request_count(), 0);
    assert_eq!(summary.reused_exact, 6);
    assert!(summary.catalogs_written.is_empty());
    assert_eq!(project.read_catalog("circulation")?, circulation);
    assert_eq!(project.read_catalog("patrons")?, patrons);
    Ok(())
}

#[tokio::test]
async fn test_run_afterCatalogLoss_shouldRecoverFromCacheWithoutCalls() -> Result<()> {
    let project = Project::new()?;
    project.write_source("circulation", CIRCULATION_RST)?;
    let cache = memory();

    project.run(provider(&MockProvider::working()), &cache, false).await?;
    let original = project.read_catalog("circulation")?;
    std::fs::remove_file(project.catalog_path("circulation"))?;

    let second = MockProvider::working();
    let summary = project.run(provider(&second), &cache, false).await?;

    assert_eq!(second.request_count(), 0);
    assert_eq!(summary.cache_hits, 4);
    assert_eq!(project.read_catalog("circulation")?, original);
    Ok(())
}

#[tokio::test]
async fn test_run_withOneCharacterChanged_shouldTranslateOnlyThatSegment() -> Result<()> {
    let project = Project::new()?;
    project.write_source("circulation", CIRCULATION_RST)?;
    let cache = memory();
    project.run(provider(&MockProvider::working()), &cache, false).await?;

    project.write_source(
        "circulation",
        &CIRCULATION_RST.replace("before they are due.", "before they are due!"),
    )?;
    let second = MockProvider::working();
    let summary = project.run(provider(&second), &cache, false).await?;

    assert_eq!(second.request_count(), 1);
    assert_eq!(second.received()[0].text, "Renew items before they are due!");
    assert_eq!(summary.translated, 1);
    assert_eq!(summary.reused_exact, 3);
    Ok(())
}

#[tokio::test]
async fn test_run_withRewrappedParagraph_shouldReuseExactly() -> Result<()> {
    let project = Project::new()?;
    project.write_source("patrons", PATRONS_RST)?;
    let cache = memory();
    project.run(provider(&MockProvider::working()), &cache, false).await?;

    project.write_source("patrons", &PATRONS_RST.replace("from the patrons", "from the\npatrons"))?;
    let second = MockProvider::working();
    project.run(provider(&second), &cache, false).await?;

    assert_eq!(second.request_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_run_withExactCatalogAndDifferentCache_shouldPreferCatalog() -> Result<()> {
    let project = Project::new()?;
    project.write_source("patrons", "Renew\n")?;
    let mut catalog = Catalog::new("sv", "Manual");
    catalog.insert(CatalogEntry::new("Renew", "Förnya"));
    catalog.save(&project.catalog_path("patrons"))?;

    let cache = memory();
    cache.store(&CacheKey::new(&content_hash("Renew"), "en", "sv"), "Renew", "Något annat").await;

    let mock = MockProvider::working();
    let summary = project.run(provider(&mock), &cache, false).await?;

    assert_eq!(summary.reused_exact, 1);
    assert_eq!(mock.request_count(), 0);
    let saved = Catalog::load(&project.catalog_path("patrons"))?;
    assert_eq!(saved.find("Renew").map(CatalogEntry::msgstr), Some("Förnya"));
    Ok(())
}

#[tokio::test]
async fn test_run_withWhitespaceVariantInCatalog_shouldReuseAsFuzzy() -> Result<()> {
    let project = Project::new()?;
    project.write_source("items", "Add item (s)\n")?;
    let mut catalog = Catalog::new("sv", "Manual");
    catalog.insert(CatalogEntry::new("Add item(s)", "Lägg till exemplar"));
    catalog.save(&project.catalog_path("items"))?;

    let mock = MockProvider::working();
    let summary = project.run(provider(&mock), &memory(), false).await?;

    assert_eq!(summary.reused_fuzzy, 1);
    assert_eq!(mock.request_count(), 0);
    let saved = Catalog::load(&project.catalog_path("items"))?;
    let entry = saved.find("Add item (s)").expect("new entry");
    assert_eq!(entry.msgstr(), "Lägg till exemplar");
    assert!(entry.is_fuzzy());
    Ok(())
}

#[tokio::test]
async fn test_run_withWrappedMsgidInCatalog_shouldFillThatEntryInPlace() -> Result<()> {
    let project = Project::new()?;
    project.write_source("desk", "Check out items\nfrom the desk.\n")?;
    let mut catalog = Catalog::new("sv", "Manual");
    catalog.insert(CatalogEntry::new("Check out items\nfrom the desk.", ""));
    catalog.save(&project.catalog_path("desk"))?;

    let mock = MockProvider::working();
    let summary = project.run(provider(&mock), &memory(), false).await?;

    assert_eq!(summary.translated, 1);
    let saved = Catalog::load(&project.catalog_path("desk"))?;
    assert_eq!(saved.len(), 1);
    assert!(saved.find("Check out items from the desk.").is_none());
    let entry = saved.find("Check out items\nfrom the desk.").expect("wrapped entry");
    assert_eq!(entry.msgstr(), "[sv] Check out items from the desk.");
    assert!(!entry.is_fuzzy());

    // A second run treats the filled wrapped entry as an exact match
    let second = MockProvider::working();
    let rerun = project.run(provider(&second), &memory(), false).await?;
    assert_eq!(rerun.reused_exact, 1);
    assert_eq!(second.request_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_run_withForce_shouldRetranslateEverything() -> Result<()> {
    let project = Project::new()?;
    project.write_source("patrons", PATRONS_RST)?;
    let cache = memory();
    project.run(provider(&MockProvider::working()), &cache, false).await?;

    let second = MockProvider::working();
    let summary = project.run(provider(&second), &cache, true).await?;

    assert_eq!(second.request_count(), 2);
    assert_eq!(summary.translated, 2);
    Ok(())
}

#[tokio::test]
async fn test_run_withDroppedDisplayText_shouldRestoreFullReference() -> Result<()> {
    let project = Project::new()?;
    project.write_source("search", "See the :ref:`item search <item-searching-label>` tool.\n")?;
    let mock = MockProvider::working()
        .with_custom_response(|_| ":ref:`<item-searching-label>` tool.".to_string());

    let summary = project.run(provider(&mock), &memory(), false).await?;

    assert!(summary.flagged.is_empty(), "{}", summary);
    let catalog = Catalog::load(&project.catalog_path("search"))?;
    let entry = catalog
        .find("See the :ref:`item search <item-searching-label>` tool.")
        .expect("entry");
    assert_eq!(entry.msgstr(), ":ref:`item search <item-searching-label>` tool.");
    assert!(!entry.is_fuzzy());
    Ok(())
}

#[tokio::test]
async fn test_run_withLostPlaceholder_shouldFlagAndNotCache() -> Result<()> {
    let project = Project::new()?;
    project.write_source("open", "Open :ref:`circulation-label`. Then save.\n")?;
    let mock = MockProvider::working().with_custom_response(|_| "Öppna. Spara sedan.".to_string());
    let cache = memory();

    let summary = project.run(provider(&mock), &cache, false).await?;

    assert_eq!(summary.flagged.len(), 1);
    assert!(summary.flagged[0].location.contains("open.rst:1#1"));
    let catalog = Catalog::load(&project.catalog_path("open"))?;
    let entry = catalog.find("Open :ref:`circulation-label`. Then save.").expect("entry");
    assert_eq!(entry.msgstr(), "Öppna. Spara sedan. :ref:`circulation-label`");
    assert!(entry.is_fuzzy());

    let key = CacheKey::new(&content_hash("Open :ref:`circulation-label`. Then save."), "en", "sv");
    assert_eq!(cache.lookup(&key).await, None);
    Ok(())
}

#[tokio::test]
async fn test_run_withOneRejectedSegment_shouldContinueWithOthers() -> Result<()> {
    let project = Project::new()?;
    project.write_source("mixed", "First paragraph.\n\nBroken paragraph.\n\nLast paragraph.\n")?;
    let mock = MockProvider::new(MockBehavior::FailMatching {
        needle: "Broken",
        failure: MockFailure::Rejected,
    });

    let summary = project.run(provider(&mock), &memory(), false).await?;

    assert_eq!(summary.translated, 2);
    assert_eq!(summary.failed.len(), 1);
    assert!(summary.failed[0].location.ends_with("mixed.rst:3#2"));
    assert_eq!(summary.failed[0].preview, "Broken paragraph.");
    assert!(summary.aborted.is_none());
    // Rejections are not retried
    assert_eq!(mock.request_count(), 3);

    let catalog = Catalog::load(&project.catalog_path("mixed"))?;
    assert_eq!(catalog.find("Broken paragraph.").map(CatalogEntry::msgstr), Some(""));
    assert_eq!(
        catalog.find("Last paragraph.").map(CatalogEntry::msgstr),
        Some("[sv] Last paragraph.")
    );
    Ok(())
}

#[tokio::test]
async fn test_run_withPersistentOutage_shouldFailSegmentAfterRetries() -> Result<()> {
    let project = Project::new()?;
    project.write_source("patrons", PATRONS_RST)?;
    let mock = MockProvider::failing(MockFailure::Transient);

    let summary = project.run(provider(&mock), &memory(), false).await?;

    assert_eq!(summary.failed.len(), 2);
    assert_eq!(mock.request_count(), 6);
    assert_eq!(summary.api_calls, 6);
    assert!(summary.aborted.is_none());
    assert!(project.catalog_path("patrons").exists());
    Ok(())
}

#[tokio::test]
async fn test_run_withIntermittentOutage_shouldRecoverByRetrying() -> Result<()> {
    let project = Project::new()?;
    project.write_source("circulation", CIRCULATION_RST)?;
    let mock = MockProvider::intermittent(2);

    let summary = project.run(provider(&mock), &memory(), false).await?;

    assert!(summary.failed.is_empty(), "{}", summary);
    assert_eq!(summary.translated, 4);
    assert!(mock.request_count() > 4);
    Ok(())
}

#[tokio::test]
async fn test_run_withFatalError_shouldAbortAndKeepCompletedWork() -> Result<()> {
    let project = Project::new()?;
    project.write_source("a_steps", "First.\n\nSecond.\n\nThird.\n\nFourth.\n")?;
    project.write_source("b_more", "Never reached.\n")?;
    let mock = MockProvider::new(MockBehavior::FailMatching {
        needle: "Third",
        failure: MockFailure::Fatal,
    });
    let cache = memory();

    let summary = project.run(provider(&mock), &cache, false).await?;

    assert!(matches!(summary.aborted, Some(PipelineError::FatalServiceFailure(_))));
    assert_eq!(summary.translated, 2);
    assert_eq!(mock.request_count(), 3);

    let catalog = Catalog::load(&project.catalog_path("a_steps"))?;
    assert_eq!(catalog.find("Second.").map(CatalogEntry::msgstr), Some("[sv] Second."));
    assert!(catalog.find("Fourth.").is_none());
    assert!(!project.catalog_path("b_more").exists());

    let key = CacheKey::new(&content_hash("First."), "en", "sv");
    assert_eq!(cache.lookup(&key).await, Some("[sv] First.".to_string()));
    Ok(())
}

/// Raises the interrupt flag while serving its first request
#[derive(Debug)]
struct InterruptingProvider {
    flag: Arc<AtomicBool>,
    calls: AtomicUsize,
}

#[async_trait]
impl Provider for InterruptingProvider {
    async fn translate(&self, request: &TranslationRequest) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.flag.store(true, Ordering::SeqCst);
        Ok(format!("[{}] {}", request.target_language, request.text))
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "interrupting"
    }
}

#[tokio::test]
async fn test_run_withInterruptBetweenSegments_shouldSaveProgressAndStop() -> Result<()> {
    let project = Project::new()?;
    project.write_source("a_first", PATRONS_RST)?;
    project.write_source("b_second", "Untouched.\n")?;
    let flag = Arc::new(AtomicBool::new(false));
    let interrupting = Arc::new(InterruptingProvider {
        flag: Arc::clone(&flag),
        calls: AtomicUsize::new(0),
    });

    let ctx = RunContext::new(project.settings(false), interrupting.clone(), memory()).with_interrupt(flag);
    let summary = TranslationPipeline::new(ctx).run(&project.documents()?).await;

    assert!(summary.interrupted);
    assert_eq!(interrupting.calls.load(Ordering::SeqCst), 1);
    let catalog = Catalog::load(&project.catalog_path("a_first"))?;
    assert_eq!(catalog.len(), 1);
    assert!(!project.catalog_path("b_second").exists());
    Ok(())
}

#[tokio::test]
async fn test_run_withGlossary_shouldPassItToProvider() -> Result<()> {
    let project = Project::new()?;
    project.write_source("patrons", PATRONS_RST)?;
    let mock = MockProvider::working();
    let mut glossary = Glossary::new();
    glossary.insert("patron", "låntagare");

    let ctx = RunContext::new(project.settings(false), provider(&mock), memory()).with_glossary(Some(glossary));
    TranslationPipeline::new(ctx).run(&project.documents()?).await;

    let received = mock.received();
    assert_eq!(received.len(), 2);
    assert!(received.iter().all(|r| r.glossary.as_ref().is_some_and(|g| g.get("patron") == Some("låntagare"))));
    Ok(())
}
