/*!
 * End-to-end tests through the controller: translate, report, repair and
 * maintain the on-disk cache the way the command line does.
 */

use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use docshield::app_controller::TranslateOptions;
use docshield::catalog::Catalog;
use docshield::database::{PatternKind, PurgeField};
use docshield::file_utils::FileManager;
use docshield::providers::Provider;
use docshield::providers::mock::MockProvider;

use crate::common::{CIRCULATION_RST, PATRONS_RST, Project};

const CIRCULATION_POT: &str = r#"msgid ""
msgstr ""
"Content-Type: text/plain; charset=UTF-8\n"

#: ../../source/circulation.rst:1
msgid "Circulation"
msgstr ""

#: ../../source/circulation.rst:4
msgid "Check out items from the :ref:`checkout <checkout-label>` page."
msgstr ""
"#;

fn options() -> TranslateOptions {
    TranslateOptions {
        show_progress: false,
        ..Default::default()
    }
}

async fn translate_project(project: &Project, mock: &MockProvider) -> Result<()> {
    let controller = project.controller();
    let provider: Arc<dyn Provider> = Arc::new(mock.clone());
    let summary = controller
        .translate_with(provider, controller.open_memory()?, &options(), Arc::new(AtomicBool::new(false)))
        .await?;
    assert!(summary.is_clean(), "{}", summary);
    Ok(())
}

#[tokio::test]
async fn test_translateWith_thenStatus_shouldReportFullCompletion() -> Result<()> {
    let project = Project::new()?;
    project.write_source("circulation", CIRCULATION_RST)?;
    project.write_source("patrons", PATRONS_RST)?;
    let controller = project.controller();

    let before = controller.status(None)?;
    assert_eq!(before.overall_percentage(), 0.0);

    translate_project(&project, &MockProvider::working()).await?;

    let report = controller.status(None)?;
    assert_eq!(report.files.len(), 2);
    assert_eq!(report.overall_percentage(), 100.0);
    let circulation = report.files[0].stats.as_ref().expect("catalog exists");
    assert_eq!(circulation.translated, 4);
    assert_eq!(circulation.fuzzy, 0);
    assert!(report.to_string().contains("circulation"));
    Ok(())
}

#[tokio::test]
async fn test_translateWith_singleFile_shouldOnlyWriteThatCatalog() -> Result<()> {
    let project = Project::new()?;
    project.write_source("circulation", CIRCULATION_RST)?;
    project.write_source("patrons", PATRONS_RST)?;
    let controller = project.controller();
    let mock = MockProvider::working();

    let options = TranslateOptions {
        file: Some("patrons.rst".to_string()),
        ..options()
    };
    let summary = controller
        .translate_with(Arc::new(mock.clone()), controller.open_memory()?, &options, Arc::new(AtomicBool::new(false)))
        .await?;

    assert_eq!(summary.documents, 1);
    assert_eq!(mock.request_count(), 2);
    assert!(FileManager::file_exists(project.catalog_path("patrons")));
    assert!(!FileManager::file_exists(project.catalog_path("circulation")));
    Ok(())
}

#[tokio::test]
async fn test_fixRefs_withCorruptedTranslation_shouldRepairOnlyWhenNotDryRun() -> Result<()> {
    let project = Project::new()?;
    project.write_source("circulation", CIRCULATION_RST)?;
    translate_project(&project, &MockProvider::working()).await?;

    let path = project.catalog_path("circulation");
    let msgid = "Check out items from the :ref:`checkout <checkout-label>` page.";
    let mut catalog = Catalog::load(&path)?;
    let index = catalog.find_index(msgid).expect("entry");
    if let Some(entry) = catalog.get_mut(index) {
        entry.set_msgstr("Låna ut:ref:`kassan <checkout-label>` sidan.");
    }
    catalog.save(&path)?;
    let corrupted = project.read_catalog("circulation")?;

    let controller = project.controller();
    let preview = controller.fix_refs(None, true)?;
    assert_eq!(preview.len(), 1);
    assert_eq!(preview[0].changes.len(), 1);
    assert_eq!(preview[0].changes[0].2, "Låna ut :ref:`kassan <checkout-label>` sidan.");
    assert_eq!(project.read_catalog("circulation")?, corrupted);

    controller.fix_refs(None, false)?;
    let repaired = Catalog::load(&path)?;
    assert_eq!(
        repaired.find(msgid).map(|e| e.msgstr().to_string()),
        Some("Låna ut :ref:`kassan <checkout-label>` sidan.".to_string())
    );
    assert!(controller.fix_refs(None, true)?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_removeFuzzy_afterReview_shouldClearFlags() -> Result<()> {
    let project = Project::new()?;
    project.write_source("patrons", PATRONS_RST)?;
    translate_project(&project, &MockProvider::working()).await?;

    let path = project.catalog_path("patrons");
    let mut catalog = Catalog::load(&path)?;
    if let Some(index) = catalog.find_index("Patron categories control loan rules.") {
        if let Some(entry) = catalog.get_mut(index) {
            entry.set_fuzzy(true);
        }
    }
    catalog.save(&path)?;

    let controller = project.controller();
    let cleared = controller.remove_fuzzy(Some("patrons"))?;
    assert_eq!(cleared, vec![(path.clone(), 1)]);
    assert!(Catalog::load(&path)?.messages().all(|e| !e.is_fuzzy()));
    assert!(controller.remove_fuzzy(None)?.is_empty());
    Ok(())
}

#[test]
fn test_removeFuzzy_withUnknownDocument_shouldFail() -> Result<()> {
    let project = Project::new()?;
    project.write_source("patrons", PATRONS_RST)?;
    assert!(project.controller().remove_fuzzy(Some("acquisitions")).is_err());
    Ok(())
}

#[test]
fn test_glossaryTerms_shouldListReferenceDisplayTexts() -> Result<()> {
    let project = Project::new()?;
    project.write_source("circulation", CIRCULATION_RST)?;
    project.write_source("patrons", PATRONS_RST)?;

    let terms = project.controller().glossary_terms()?;
    assert_eq!(terms, vec!["checkout".to_string(), "item search".to_string()]);
    Ok(())
}

#[test]
fn test_glossaryTerms_withPascalCaseNames_shouldListThemBeforeDisplayTexts() -> Result<()> {
    let project = Project::new()?;
    project.write_source("circulation", CIRCULATION_RST)?;
    project.write_source("search", "Koha uses OpenSearch for the :ref:`item search <item-searching-label>` page.\n")?;

    let terms = project.controller().glossary_terms()?;
    assert_eq!(
        terms,
        vec!["OpenSearch".to_string(), "checkout".to_string(), "item search".to_string()]
    );
    Ok(())
}

#[test]
fn test_collectDocuments_fromPot_shouldReadTemplates() -> Result<()> {
    let project = Project::new()?;
    FileManager::write_to_file(project.pot_dir().join("circulation.pot"), CIRCULATION_POT)?;

    let documents = project.controller().collect_documents(None, true)?;
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].name, "circulation");
    assert_eq!(documents[0].segments.len(), 2);
    assert_eq!(documents[0].segments[1].location.line, 4);

    let single = project.controller().collect_documents(Some("circulation.rst"), true)?;
    assert_eq!(single.len(), 1);
    assert!(project.controller().collect_documents(Some("serials"), true).is_err());
    Ok(())
}

#[test]
fn test_cacheStats_beforeAnyRun_shouldReportEmptyCache() -> Result<()> {
    let project = Project::new()?;
    let controller = project.controller();

    let stats = tokio_test::block_on(controller.cache_stats())?;
    assert_eq!(stats.total_entries, 0);
    assert!(project.dir.path().join("cache").join("translation_cache.db").exists());
    Ok(())
}

#[tokio::test]
async fn test_cachePurge_onDiskCache_shouldPreviewThenDelete() -> Result<()> {
    let project = Project::new()?;
    project.write_source("patrons", PATRONS_RST)?;
    translate_project(&project, &MockProvider::working()).await?;
    let controller = project.controller();

    assert_eq!(controller.cache_stats().await?.total_entries, 2);

    let preview = controller
        .cache_purge("categories", PatternKind::Substring, PurgeField::Source, true)
        .await?;
    assert_eq!(preview.matched, 1);
    assert_eq!(controller.cache_stats().await?.total_entries, 2);

    let purged = controller
        .cache_purge("categories", PatternKind::Substring, PurgeField::Source, false)
        .await?;
    assert_eq!(purged.matched, preview.matched);
    assert_eq!(controller.cache_stats().await?.total_entries, 1);

    assert!(controller.cache_delete_containing("").await.is_err());
    assert!(controller.cache_prune(-1).await.is_err());
    assert_eq!(controller.cache_clear().await?, 1);
    Ok(())
}
