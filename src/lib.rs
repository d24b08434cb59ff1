/*!
 * # docshield
 *
 * Machine translation of reStructuredText documentation into gettext PO
 * catalogs, without letting the translation service damage the markup.
 *
 * ## Features
 *
 * - Extract translatable paragraphs from `.rst` sources or `.pot` templates
 * - Shield inline markup (roles, references, literals, substitutions, links)
 *   behind placeholders and restore it after translation, repairing what the
 *   service mangled
 * - Reuse existing catalog translations and a persistent SQLite cache so
 *   unchanged text is never sent twice
 * - DeepL provider with glossary support, retries and backoff
 * - Catalog maintenance: status, reference repair, fuzzy flag removal
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `document`: Segment extraction and normalization
 * - `shield`: Markup protection, restoration and validation
 * - `catalog`: PO parsing, writing and completion status
 * - `database`: SQLite translation cache
 * - `translation`: Translation memory, reconciliation, retries and the pipeline
 * - `providers`: Translation service clients
 * - `glossary`: Term lists handed to the service
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod catalog;
pub mod database;
pub mod document;
pub mod errors;
pub mod file_utils;
pub mod glossary;
pub mod language_utils;
pub mod providers;
pub mod shield;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use catalog::{Catalog, CatalogEntry};
pub use document::{Segment, SourceLocation, extract_segments};
pub use errors::{AppError, CatalogError, PipelineError, ProviderError};
pub use language_utils::{get_language_name, language_codes_match};
pub use shield::MarkupShield;
pub use translation::{RunSummary, TranslationPipeline};
