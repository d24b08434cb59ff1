/*!
 * Common test utilities for the docshield test suite
 */

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use docshield::app_config::Config;
use docshield::app_controller::Controller;
use docshield::document::load_segments;
use docshield::file_utils::FileManager;
use docshield::providers::Provider;
use docshield::shield::RestoreOptions;
use docshield::translation::{
    DocumentJob, PipelineSettings, RetryPolicy, RunContext, RunSummary, TranslationMemory, TranslationPipeline,
};

/// Four segments: a title, two references and plain prose; the code block is skipped
pub const CIRCULATION_RST: &str = "Circulation
===========

Check out items from the :ref:`checkout <checkout-label>` page.

Renew items before they are due.

.. code-block:: bash

   koha-restart

See the :ref:`item search <item-searching-label>` tool.
";

/// Two plain paragraphs
pub const PATRONS_RST: &str = "Add a patron from the patrons module.

Patron categories control loan rules.
";

/// Throwaway documentation project: sources, catalogs, cache file
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    pub fn new() -> Result<Self> {
        init_logging();
        Ok(Self { dir: TempDir::new()? })
    }

    pub fn source_dir(&self) -> PathBuf {
        self.dir.path().join("source")
    }

    pub fn po_dir(&self) -> PathBuf {
        self.dir.path().join("locales")
    }

    pub fn pot_dir(&self) -> PathBuf {
        self.dir.path().join("build").join("gettext")
    }

    /// Write `source/<name>.rst`
    pub fn write_source(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.source_dir().join(format!("{}.rst", name));
        FileManager::write_to_file(&path, content)?;
        Ok(path)
    }

    /// Swedish catalog path for a document
    pub fn catalog_path(&self, name: &str) -> PathBuf {
        FileManager::catalog_path(self.po_dir(), "sv", name)
    }

    pub fn read_catalog(&self, name: &str) -> Result<String> {
        FileManager::read_to_string(self.catalog_path(name))
    }

    /// Every source as a pipeline job, sorted by name
    pub fn documents(&self) -> Result<Vec<DocumentJob>> {
        let mut jobs = Vec::new();
        for source in FileManager::source_files(self.source_dir())? {
            jobs.push(DocumentJob::new(FileManager::document_stem(&source), load_segments(&source)?));
        }
        Ok(jobs)
    }

    /// en → sv config pointing at this project
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.source_language = "en".to_string();
        config.target_language = "sv".to_string();
        config.paths.source_dir = self.source_dir();
        config.paths.po_dir = self.po_dir();
        config.paths.pot_dir = self.pot_dir();
        config.paths.cache_path = Some(self.dir.path().join("cache").join("translation_cache.db"));
        config.translation.common.rate_limit_delay_ms = 0;
        config.translation.common.retry_backoff_ms = 1;
        config.translation.common.max_backoff_ms = 5;
        config
    }

    pub fn controller(&self) -> Controller {
        Controller::with_config(self.config()).expect("controller")
    }

    /// Run settings with no delays and no progress output
    pub fn settings(&self, force: bool) -> PipelineSettings {
        test_settings(&self.po_dir(), force)
    }

    /// Translate every source with `provider`
    pub async fn run(&self, provider: Arc<dyn Provider>, memory: &TranslationMemory, force: bool) -> Result<RunSummary> {
        let ctx = RunContext::new(self.settings(force), provider, memory.clone());
        Ok(TranslationPipeline::new(ctx).run(&self.documents()?).await)
    }
}

pub fn test_settings(po_dir: &Path, force: bool) -> PipelineSettings {
    PipelineSettings {
        source_language: "en".to_string(),
        target_language: "sv".to_string(),
        po_dir: po_dir.to_path_buf(),
        retry: RetryPolicy::new(3, 1, 5),
        rate_limit_delay: Duration::ZERO,
        restore: RestoreOptions::default(),
        wrap_width: 78,
        project_id_version: "Manual".to_string(),
        force,
        show_progress: false,
    }
}

/// Route library logs through the test harness; safe to call repeatedly
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Fresh in-memory translation memory
pub fn memory() -> TranslationMemory {
    TranslationMemory::in_memory().expect("in-memory cache")
}
