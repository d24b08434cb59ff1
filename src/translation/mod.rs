/*!
 * Translation of extracted segments into PO catalogs.
 *
 * The module is split into several submodules:
 *
 * - `memory`: content-addressed translation memory over the SQLite cache
 * - `reconciler`: reuse decisions (catalog exact, catalog fuzzy, cache)
 * - `retry`: bounded retry state machine for service calls
 * - `pipeline`: the per-document driver tying it all together
 */

// Re-export main types for easier usage
pub use self::memory::{CacheKey, TranslationMemory};
pub use self::pipeline::{DocumentJob, PipelineSettings, RunContext, RunSummary, SegmentReport, TranslationPipeline};
pub use self::reconciler::{Reconciler, Resolution};
pub use self::retry::{RetryMachine, RetryPolicy, RetryState};

// Submodules
pub mod memory;
pub mod pipeline;
pub mod reconciler;
pub mod retry;
