use anyhow::{Context, Result, anyhow};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::app_config::{Config, TranslationProvider};
use crate::catalog::{Catalog, StatusReport};
use crate::database::{CacheStats, DatabaseConnection, PatternKind, PurgeField, PurgePattern, PurgeReport, Repository};
use crate::document::{load_segments, load_template_segments};
use crate::file_utils::FileManager;
use crate::glossary::{Glossary, extract_product_terms, extract_reference_terms};
use crate::providers::Provider;
use crate::providers::deepl::DeepL;
use crate::shield::refs::repair_references;
use crate::translation::{DocumentJob, PipelineSettings, RunContext, RunSummary, TranslationMemory, TranslationPipeline};

// @module: Application controller for documentation translation

/// Options for one `translate` invocation
#[derive(Debug, Clone, Default)]
pub struct TranslateOptions {
    /// Single document by name; every document when `None`
    pub file: Option<String>,
    /// Retranslate even when catalog or cache has a translation
    pub force: bool,
    /// Read segments from `.pot` templates instead of `.rst` sources
    pub from_pot: bool,
    pub show_progress: bool,
}

/// References repaired in one catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefFixReport {
    pub catalog: PathBuf,
    /// (msgid, before, after) for every changed msgstr
    pub changes: Vec<(String, String, String)>,
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Check if the controller is properly initialized with configuration
    pub fn is_initialized(&self) -> bool {
        !self.config.source_language.is_empty() && !self.config.target_language.is_empty()
    }

    /// Translation memory over the configured cache database
    pub fn open_memory(&self) -> Result<TranslationMemory> {
        let path = self.config.cache_path()?;
        debug!("Using translation cache at {}", path.display());
        let connection = DatabaseConnection::new(&path)
            .with_context(|| format!("Failed to open translation cache: {}", path.display()))?;
        Ok(TranslationMemory::new(Repository::new(connection)))
    }

    /// Configured glossary, if any
    pub fn load_glossary(&self) -> Result<Option<Glossary>> {
        match &self.config.paths.glossary_path {
            Some(path) => {
                let glossary = Glossary::load(path)?;
                info!("Loaded glossary with {} terms from {}", glossary.len(), path.display());
                Ok(Some(glossary))
            }
            None => Ok(None),
        }
    }

    /// Client for the configured translation service
    pub fn build_provider(&self) -> Result<Arc<dyn Provider>> {
        let translation = &self.config.translation;
        match translation.provider {
            TranslationProvider::DeepL => Ok(Arc::new(DeepL::new(
                translation.get_api_key(),
                translation.get_endpoint(),
                translation.get_timeout_secs(),
                translation.get_formality(),
            ))),
        }
    }

    /// Segments grouped per document, in document name order
    pub fn collect_documents(&self, file: Option<&str>, from_pot: bool) -> Result<Vec<DocumentJob>> {
        let paths = &self.config.paths;
        let mut documents = Vec::new();

        if from_pot {
            let templates = match file {
                Some(name) => {
                    let stem = name.trim_end_matches(".rst").trim_end_matches(".pot");
                    let template = FileManager::find_pot_file(&paths.pot_dir, stem)?
                        .ok_or_else(|| anyhow!("No template found for {} in {}", name, paths.pot_dir.display()))?;
                    vec![template]
                }
                None => FileManager::find_all_pot_files(&paths.pot_dir)?,
            };
            for template in templates {
                let segments = load_template_segments(&template)?;
                documents.push(DocumentJob::new(FileManager::document_stem(&template), segments));
            }
        } else {
            let sources = self.source_paths(file)?;
            for source in sources {
                let segments = load_segments(&source)?;
                documents.push(DocumentJob::new(FileManager::document_stem(&source), segments));
            }
        }

        documents.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(documents)
    }

    fn source_paths(&self, file: Option<&str>) -> Result<Vec<PathBuf>> {
        let source_dir = &self.config.paths.source_dir;
        match file {
            Some(name) => Ok(vec![FileManager::resolve_source_file(source_dir, name)?]),
            None => FileManager::source_files(source_dir),
        }
    }

    fn catalog_paths(&self, file: Option<&str>) -> Result<Vec<PathBuf>> {
        let language = &self.config.target_language;
        match file {
            Some(name) => {
                let stem = name.trim_end_matches(".rst").trim_end_matches(".po");
                let path = FileManager::catalog_path(&self.config.paths.po_dir, language, stem);
                if !FileManager::file_exists(&path) {
                    return Err(anyhow!("No catalog found at {}", path.display()));
                }
                Ok(vec![path])
            }
            None => FileManager::catalog_files(&self.config.paths.po_dir, language),
        }
    }

    /// Translate with the configured service after checking it is usable
    pub async fn translate(&self, options: &TranslateOptions, interrupt: Arc<AtomicBool>) -> Result<RunSummary> {
        self.config.validate_for_translation()?;
        let provider = self.build_provider()?;
        provider
            .test_connection()
            .await
            .with_context(|| format!("{} is not usable", self.config.translation.provider.display_name()))?;
        let memory = self.open_memory()?;
        self.translate_with(provider, memory, options, interrupt).await
    }

    /// Translate with an explicit service and memory
    pub async fn translate_with(
        &self,
        provider: Arc<dyn Provider>,
        memory: TranslationMemory,
        options: &TranslateOptions,
        interrupt: Arc<AtomicBool>,
    ) -> Result<RunSummary> {
        let documents = self.collect_documents(options.file.as_deref(), options.from_pot)?;
        if documents.is_empty() {
            warn!("Nothing to translate");
            return Ok(RunSummary::default());
        }
        info!(
            "Translating {} document(s) from {} to {} with {}",
            documents.len(),
            self.config.source_language,
            self.config.target_language,
            provider.name()
        );

        let mut settings = PipelineSettings::from_config(&self.config, options.force);
        settings.show_progress = options.show_progress;
        let ctx = RunContext::new(settings, provider, memory)
            .with_glossary(self.load_glossary()?)
            .with_interrupt(interrupt);

        let start_time = std::time::Instant::now();
        let summary = TranslationPipeline::new(ctx).run(&documents).await;
        info!("Finished in {:.1}s", start_time.elapsed().as_secs_f64());
        Ok(summary)
    }

    /// Completion of every (or one) document in the target language
    pub fn status(&self, file: Option<&str>) -> Result<StatusReport> {
        let sources = self.source_paths(file)?;
        StatusReport::analyze(&sources, &self.config.paths.po_dir, &self.config.target_language)
    }

    /// Repair corrupted references in existing translations
    pub fn fix_refs(&self, file: Option<&str>, dry_run: bool) -> Result<Vec<RefFixReport>> {
        let mut reports = Vec::new();
        for path in self.catalog_paths(file)? {
            let mut catalog = Catalog::load(&path)?;
            let live: Vec<usize> = catalog
                .entries()
                .iter()
                .enumerate()
                .filter(|(_, e)| !e.is_header() && !e.is_obsolete() && !e.msgstr().is_empty())
                .map(|(i, _)| i)
                .collect();

            let mut changes = Vec::new();
            for index in live {
                let Some(entry) = catalog.get_mut(index) else { continue };
                let repaired = repair_references(entry.msgstr());
                if repaired != entry.msgstr() {
                    changes.push((entry.msgid().to_string(), entry.msgstr().to_string(), repaired.clone()));
                    if !dry_run {
                        entry.set_msgstr(repaired);
                    }
                }
            }

            if changes.is_empty() {
                continue;
            }
            if dry_run {
                info!("{}: {} reference(s) would be repaired", path.display(), changes.len());
            } else {
                catalog.save(&path)?;
                info!("{}: repaired {} reference(s)", path.display(), changes.len());
            }
            reports.push(RefFixReport { catalog: path, changes });
        }
        Ok(reports)
    }

    /// Clear fuzzy flags after review; returns flags cleared per catalog
    pub fn remove_fuzzy(&self, file: Option<&str>) -> Result<Vec<(PathBuf, usize)>> {
        let mut cleared = Vec::new();
        for path in self.catalog_paths(file)? {
            let mut catalog = Catalog::load(&path)?;
            let count = catalog.remove_fuzzy_flags();
            if count > 0 {
                catalog.save(&path)?;
                info!("{}: cleared {} fuzzy flag(s)", path.display(), count);
                cleared.push((path, count));
            }
        }
        Ok(cleared)
    }

    /// `:ref:` display texts and PascalCase product names across all sources,
    /// as glossary candidates
    pub fn glossary_terms(&self) -> Result<Vec<String>> {
        let sources = FileManager::source_files(&self.config.paths.source_dir)?;
        let mut terms = extract_reference_terms(&sources)?;
        terms.extend(extract_product_terms(&sources)?);
        terms.sort();
        terms.dedup();
        Ok(terms)
    }

    pub async fn cache_stats(&self) -> Result<CacheStats> {
        self.open_memory()?.stats().await
    }

    pub async fn cache_clear(&self) -> Result<usize> {
        self.open_memory()?.clear().await
    }

    pub async fn cache_prune(&self, days: i64) -> Result<usize> {
        if days < 0 {
            return Err(anyhow!("--days must not be negative"));
        }
        self.open_memory()?.prune_unused(days).await
    }

    /// Remove cache rows whose text matches `pattern` in the target language
    pub async fn cache_purge(
        &self,
        pattern: &str,
        kind: PatternKind,
        field: PurgeField,
        dry_run: bool,
    ) -> Result<PurgeReport> {
        let pattern = PurgePattern::new(pattern, kind)?;
        self.open_memory()?
            .purge(pattern, field, Some(&self.config.target_language), dry_run)
            .await
    }

    pub async fn cache_delete_containing(&self, text: &str) -> Result<usize> {
        if text.is_empty() {
            return Err(anyhow!("Refusing to delete with an empty search text"));
        }
        self.open_memory()?.delete_containing(text).await
    }
}
