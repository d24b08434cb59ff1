/*!
 * Database module for the persistent translation cache.
 *
 * SQLite (WAL mode) stores prior translations keyed on the content hash of
 * the source text and the language pair, so unchanged segments are never
 * sent to the translation service twice.
 */

pub mod connection;
pub mod models;
pub mod repository;
pub mod schema;

// Re-export main types
pub use connection::DatabaseConnection;
pub use models::{CacheRecord, CacheStats, PatternKind, PurgeField, PurgePattern, PurgeReport};
pub use repository::Repository;
