/*!
 * The per-document translation driver.
 *
 * Documents are processed one after another and segments in source order,
 * with at most one translation call in flight. The catalog is saved after
 * each document, when an interrupt is noticed between segments, and before
 * a fatal service error ends the run.
 */

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, info, warn};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::app_config::Config;
use crate::catalog::Catalog;
use crate::document::Segment;
use crate::errors::PipelineError;
use crate::file_utils::FileManager;
use crate::glossary::Glossary;
use crate::providers::{Provider, TranslationRequest};
use crate::shield::{MarkupShield, RestoreOptions, RestoreOutcome};
use crate::translation::memory::{CacheKey, TranslationMemory};
use crate::translation::reconciler::{Reconciler, Resolution, apply_translation, ensure_entry};
use crate::translation::retry::{RetryMachine, RetryPolicy};

/// Characters of source text shown in reports
const PREVIEW_CHARS: usize = 60;

/// Settings for one run, independent of where they came from
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub source_language: String,
    pub target_language: String,
    /// Root of `<lang>/LC_MESSAGES/<stem>.po`
    pub po_dir: PathBuf,
    pub retry: RetryPolicy,
    /// Pause after every fresh translation call
    pub rate_limit_delay: Duration,
    pub restore: RestoreOptions,
    pub wrap_width: usize,
    pub project_id_version: String,
    /// Ignore catalog and cache, translate everything again
    pub force: bool,
    pub show_progress: bool,
}

impl PipelineSettings {
    pub fn from_config(config: &Config, force: bool) -> Self {
        let common = &config.translation.common;
        Self {
            source_language: config.source_language.clone(),
            target_language: config.target_language.clone(),
            po_dir: config.paths.po_dir.clone(),
            retry: RetryPolicy::new(common.retry_count, common.retry_backoff_ms, common.max_backoff_ms),
            rate_limit_delay: Duration::from_millis(common.rate_limit_delay_ms),
            restore: config.shield.restore_options(),
            wrap_width: config.catalog.wrap_width,
            project_id_version: config.catalog.project_id_version.clone(),
            force,
            show_progress: true,
        }
    }
}

/// Everything one run needs; dropped when the run ends
#[derive(Clone)]
pub struct RunContext {
    pub settings: PipelineSettings,
    pub provider: Arc<dyn Provider>,
    pub memory: TranslationMemory,
    pub glossary: Option<Arc<Glossary>>,
    /// Set by Ctrl-C; checked between segments
    pub interrupt: Arc<AtomicBool>,
}

impl RunContext {
    pub fn new(settings: PipelineSettings, provider: Arc<dyn Provider>, memory: TranslationMemory) -> Self {
        Self {
            settings,
            provider,
            memory,
            glossary: None,
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_glossary(mut self, glossary: Option<Glossary>) -> Self {
        self.glossary = glossary.filter(|g| !g.is_empty()).map(Arc::new);
        self
    }

    pub fn with_interrupt(mut self, interrupt: Arc<AtomicBool>) -> Self {
        self.interrupt = interrupt;
        self
    }

    fn interrupted(&self) -> bool {
        self.interrupt.load(Ordering::SeqCst)
    }
}

/// Segments of one document, named by the catalog they belong to
#[derive(Debug, Clone)]
pub struct DocumentJob {
    /// Catalog stem (`circulation` for `circulation.po`)
    pub name: String,
    pub segments: Vec<Segment>,
}

impl DocumentJob {
    pub fn new(name: impl Into<String>, segments: Vec<Segment>) -> Self {
        Self {
            name: name.into(),
            segments,
        }
    }
}

/// A segment worth a human's attention
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentReport {
    /// `file:line#ordinal`
    pub location: String,
    pub preview: String,
    pub reason: String,
}

impl SegmentReport {
    fn new(segment: &Segment, reason: impl Into<String>) -> Self {
        let mut preview: String = segment.source_text.chars().take(PREVIEW_CHARS).collect();
        if segment.source_text.chars().count() > PREVIEW_CHARS {
            preview.push_str("...");
        }
        Self {
            location: segment.location.to_string(),
            preview,
            reason: reason.into(),
        }
    }
}

/// Counts and problems of one run
#[derive(Debug, Default)]
pub struct RunSummary {
    pub documents: usize,
    pub segments: usize,
    pub translated: usize,
    pub reused_exact: usize,
    pub reused_fuzzy: usize,
    pub cache_hits: usize,
    /// Translation calls made, retries included
    pub api_calls: usize,
    pub failed: Vec<SegmentReport>,
    /// Written as fuzzy because restore or validation found problems
    pub flagged: Vec<SegmentReport>,
    pub catalogs_written: Vec<PathBuf>,
    pub interrupted: bool,
    /// Fatal error that ended the run early
    pub aborted: Option<PipelineError>,
}

impl RunSummary {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.flagged.is_empty() && !self.interrupted && self.aborted.is_none()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Documents processed: {}", self.documents)?;
        writeln!(f, "Segments: {}", self.segments)?;
        writeln!(f, "  translated: {}", self.translated)?;
        writeln!(f, "  reused (exact): {}", self.reused_exact)?;
        writeln!(f, "  reused (fuzzy, needs review): {}", self.reused_fuzzy)?;
        writeln!(f, "  from cache: {}", self.cache_hits)?;
        writeln!(f, "  failed: {}", self.failed.len())?;
        writeln!(f, "  flagged for review: {}", self.flagged.len())?;
        write!(f, "Translation calls: {}", self.api_calls)?;
        for report in &self.failed {
            write!(f, "\nFAILED  {} \"{}\": {}", report.location, report.preview, report.reason)?;
        }
        for report in &self.flagged {
            write!(f, "\nREVIEW  {} \"{}\": {}", report.location, report.preview, report.reason)?;
        }
        if self.interrupted {
            write!(f, "\nRun interrupted; progress so far was saved")?;
        }
        if let Some(error) = &self.aborted {
            write!(f, "\nRun aborted: {}", error)?;
        }
        Ok(())
    }
}

/// What became of a single segment
enum SegmentOutcome {
    Done,
    Abort(PipelineError),
}

fn bar_style(unit: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(&format!(
            "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{msg}}",
            unit
        ))
        .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░")
}

/// Sequential translation of documents into catalogs
pub struct TranslationPipeline {
    ctx: RunContext,
    shield: MarkupShield,
    progress: MultiProgress,
}

impl TranslationPipeline {
    pub fn new(ctx: RunContext) -> Self {
        let progress = if ctx.settings.show_progress {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };
        let shield = MarkupShield::new(ctx.settings.restore.clone());
        Self { ctx, shield, progress }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Catalog path for a document in the target language
    pub fn catalog_path(&self, name: &str) -> PathBuf {
        FileManager::catalog_path(&self.ctx.settings.po_dir, &self.ctx.settings.target_language, name)
    }

    fn open_catalog(&self, name: &str) -> Result<Catalog, PipelineError> {
        let path = self.catalog_path(name);
        let mut catalog = if FileManager::file_exists(&path) {
            Catalog::load(&path).map_err(|e| PipelineError::CatalogFailure(format!("{}: {}", path.display(), e)))?
        } else {
            debug!("Creating new catalog {}", path.display());
            Catalog::new(&self.ctx.settings.target_language, &self.ctx.settings.project_id_version)
        };
        catalog.set_wrap_width(self.ctx.settings.wrap_width);
        Ok(catalog)
    }

    fn save_catalog(&self, name: &str, catalog: &mut Catalog, summary: &mut RunSummary) -> Result<(), PipelineError> {
        if !catalog.is_dirty() {
            debug!("Catalog for {} unchanged, not rewriting", name);
            return Ok(());
        }
        let path = self.catalog_path(name);
        catalog
            .save(&path)
            .map_err(|e| PipelineError::CatalogFailure(format!("{}: {}", path.display(), e)))?;
        info!("Saved {}", path.display());
        summary.catalogs_written.push(path);
        Ok(())
    }

    /// Translate every document; per-segment failures end up in the summary
    pub async fn run(&self, documents: &[DocumentJob]) -> RunSummary {
        let mut summary = RunSummary::default();
        let files_bar = self.progress.add(ProgressBar::new(documents.len() as u64));
        files_bar.set_style(bar_style("files"));

        for document in documents {
            if self.ctx.interrupted() {
                summary.interrupted = true;
                break;
            }
            files_bar.set_message(document.name.clone());

            if let Err(error) = self.run_document(document, &mut summary).await {
                match error {
                    PipelineError::Interrupted => summary.interrupted = true,
                    other if other.aborts_run() => summary.aborted = Some(other),
                    other => {
                        // Catalog could not be read or written; skip the document
                        warn!("Skipping {}: {}", document.name, other);
                        summary.failed.push(SegmentReport {
                            location: document.name.clone(),
                            preview: String::new(),
                            reason: other.to_string(),
                        });
                        files_bar.inc(1);
                        continue;
                    }
                }
                break;
            }
            summary.documents += 1;
            files_bar.inc(1);
        }

        files_bar.finish_and_clear();
        summary
    }

    async fn run_document(&self, document: &DocumentJob, summary: &mut RunSummary) -> Result<(), PipelineError> {
        let mut catalog = self.open_catalog(&document.name)?;
        let mut reconciler = Reconciler::new(&catalog, self.ctx.settings.force);

        let segments_bar = self.progress.add(ProgressBar::new(document.segments.len() as u64));
        segments_bar.set_style(bar_style("segments"));
        segments_bar.set_message(document.name.clone());

        for segment in &document.segments {
            if self.ctx.interrupted() {
                info!("Interrupt received, saving {} before stopping", document.name);
                self.save_catalog(&document.name, &mut catalog, summary)?;
                segments_bar.finish_and_clear();
                return Err(PipelineError::Interrupted);
            }

            summary.segments += 1;
            let outcome = self.process_segment(segment, &mut catalog, &mut reconciler, summary).await;
            segments_bar.inc(1);

            if let SegmentOutcome::Abort(error) = outcome {
                warn!("Stopping run: {}", error);
                self.save_catalog(&document.name, &mut catalog, summary)?;
                segments_bar.finish_and_clear();
                return Err(error);
            }
        }

        segments_bar.finish_and_clear();
        self.save_catalog(&document.name, &mut catalog, summary)
    }

    async fn process_segment(
        &self,
        segment: &Segment,
        catalog: &mut Catalog,
        reconciler: &mut Reconciler,
        summary: &mut RunSummary,
    ) -> SegmentOutcome {
        let settings = &self.ctx.settings;
        let key = CacheKey::new(&segment.content_hash, &settings.source_language, &settings.target_language);

        match reconciler.resolve(catalog, segment, &self.ctx.memory, &key).await {
            Resolution::ReuseExact => {
                summary.reused_exact += 1;
                return SegmentOutcome::Done;
            }
            Resolution::ReuseFuzzy { msgstr } => {
                debug!("{}: reusing whitespace-variant translation as fuzzy", segment.location);
                apply_translation(catalog, segment, &msgstr, true);
                summary.reused_fuzzy += 1;
                return SegmentOutcome::Done;
            }
            Resolution::CacheHit { msgstr } => {
                apply_translation(catalog, segment, &msgstr, false);
                reconciler.record(segment, &msgstr);
                summary.cache_hits += 1;
                return SegmentOutcome::Done;
            }
            Resolution::Translate => {}
        }

        let _claim = self.ctx.memory.claim(&key).await;
        if !settings.force {
            // Another task may have finished this key while we waited
            if let Some(msgstr) = self.ctx.memory.lookup(&key).await {
                apply_translation(catalog, segment, &msgstr, false);
                reconciler.record(segment, &msgstr);
                summary.cache_hits += 1;
                return SegmentOutcome::Done;
            }
        }

        match self.translate_fresh(segment, summary).await {
            Ok(outcome) => {
                self.log_outcome(segment, &outcome);
                if outcome.needs_review {
                    apply_translation(catalog, segment, &outcome.text, true);
                    summary.flagged.push(SegmentReport::new(segment, review_reason(&outcome)));
                } else {
                    self.ctx.memory.store(&key, &segment.source_text, &outcome.text).await;
                    apply_translation(catalog, segment, &outcome.text, false);
                    reconciler.record(segment, &outcome.text);
                }
                summary.translated += 1;
                SegmentOutcome::Done
            }
            Err(error) if error.aborts_run() => SegmentOutcome::Abort(error),
            Err(error) => {
                warn!("{}: {}", segment.location, error);
                ensure_entry(catalog, segment);
                summary.failed.push(SegmentReport::new(segment, error.to_string()));
                SegmentOutcome::Done
            }
        }
    }

    /// protect → translate (with retries) → restore
    async fn translate_fresh(&self, segment: &Segment, summary: &mut RunSummary) -> Result<RestoreOutcome, PipelineError> {
        let settings = &self.ctx.settings;
        let (shielded, map) = self.shield.protect(&segment.source_text);
        for placeholder in map.malformed() {
            let error = PipelineError::MalformedMarkup {
                segment: segment.location.to_string(),
                detail: placeholder.original.clone(),
            };
            warn!("{}", error);
        }

        let request = TranslationRequest::new(shielded, &settings.source_language, &settings.target_language)
            .with_glossary(self.ctx.glossary.clone());

        let mut machine = RetryMachine::new(settings.retry);
        let mut calls = 0;
        let result = machine
            .run(|_| {
                calls += 1;
                self.ctx.provider.translate(&request)
            })
            .await;
        summary.api_calls += calls;

        if !settings.rate_limit_delay.is_zero() {
            tokio::time::sleep(settings.rate_limit_delay).await;
        }

        let translated = result?;
        Ok(self.shield.restore(&translated, &map))
    }

    fn log_outcome(&self, segment: &Segment, outcome: &RestoreOutcome) {
        for repair in &outcome.repairs {
            info!("{}: repaired {}", segment.location, repair);
        }
        if !outcome.unresolved.is_empty() {
            let error = PipelineError::RestorationFailure {
                segment: segment.location.to_string(),
                detail: format!("{} placeholder(s) re-inserted at a best-effort position", outcome.unresolved.len()),
            };
            warn!("{}", error);
        }
        if !outcome.validation.is_valid() {
            warn!("{}: {}", segment.location, outcome.validation.summary());
        }
    }
}

fn review_reason(outcome: &RestoreOutcome) -> String {
    let mut reasons = Vec::new();
    if !outcome.unresolved.is_empty() {
        reasons.push(format!("{} placeholder(s) re-inserted", outcome.unresolved.len()));
    }
    if !outcome.validation.is_valid() {
        reasons.push(outcome.validation.summary());
    }
    reasons.join("; ")
}
