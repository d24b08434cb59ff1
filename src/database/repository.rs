/*!
 * Repository layer for database operations.
 *
 * This module provides a high-level API over the translation cache,
 * abstracting away the SQL details and providing type-safe access.
 */

use anyhow::Result;
use log::debug;
use rusqlite::{Connection, OptionalExtension, params};

use super::connection::DatabaseConnection;
use super::models::{CacheRecord, CacheStats, PurgeField, PurgePattern, PurgeReport};
use crate::document::content_hash;

/// Samples kept in a purge report
const PURGE_SAMPLE_LIMIT: usize = 5;

/// Repository for database operations
#[derive(Clone, Debug)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

fn record_from_row(row: &rusqlite::Row) -> rusqlite::Result<CacheRecord> {
    Ok(CacheRecord {
        id: row.get(0)?,
        source_text_hash: row.get(1)?,
        source_text: row.get(2)?,
        source_language: row.get(3)?,
        target_language: row.get(4)?,
        translated_text: row.get(5)?,
        created_at: row.get(6)?,
        last_used_at: row.get(7)?,
        hit_count: row.get(8)?,
    })
}

const SELECT_RECORD: &str = "SELECT id, source_text_hash, source_text, source_language, target_language, \
     translated_text, created_at, last_used_at, hit_count FROM translation_cache";

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with the default database location
    pub fn new_default() -> Result<Self> {
        let db = DatabaseConnection::new_default()?;
        Ok(Self::new(db))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Compute SHA256 hash of text
    pub fn hash_text(text: &str) -> String {
        content_hash(text)
    }

    /// Get a cached translation, touching its usage stamp on a hit
    pub async fn get_cached_translation(
        &self,
        source_text_hash: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<Option<String>> {
        let source_text_hash = source_text_hash.to_string();
        let source_language = source_language.to_string();
        let target_language = target_language.to_string();

        self.db
            .execute_async(move |conn| {
                let result: Option<(i64, String)> = conn
                    .query_row(
                        r#"
                        SELECT id, translated_text
                        FROM translation_cache
                        WHERE source_text_hash = ?1
                          AND source_language = ?2
                          AND target_language = ?3
                        "#,
                        params![source_text_hash, source_language, target_language],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?;

                if let Some((id, translated_text)) = result {
                    conn.execute(
                        "UPDATE translation_cache SET hit_count = hit_count + 1, last_used_at = ?2 WHERE id = ?1",
                        params![id, chrono::Utc::now().to_rfc3339()],
                    )?;
                    debug!("Cache hit for {}", &source_text_hash[..source_text_hash.len().min(12)]);
                    Ok(Some(translated_text))
                } else {
                    Ok(None)
                }
            })
            .await
    }

    /// Store a translation in the cache, replacing any previous text for the key
    pub async fn cache_translation(&self, record: &CacheRecord) -> Result<()> {
        let record = record.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO translation_cache (
                        source_text_hash, source_text, source_language, target_language,
                        translated_text, created_at, last_used_at, hit_count
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    ON CONFLICT(source_text_hash, source_language, target_language)
                    DO UPDATE SET translated_text = excluded.translated_text,
                                  source_text = excluded.source_text,
                                  last_used_at = excluded.last_used_at
                    "#,
                    params![
                        record.source_text_hash,
                        record.source_text,
                        record.source_language,
                        record.target_language,
                        record.translated_text,
                        record.created_at,
                        record.last_used_at,
                        record.hit_count,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    /// All records, optionally restricted to one target language
    pub async fn list_records(&self, target_language: Option<&str>) -> Result<Vec<CacheRecord>> {
        let target_language = target_language.map(str::to_string);

        self.db
            .execute_async(move |conn| Self::list_records_sync(conn, target_language.as_deref()))
            .await
    }

    fn list_records_sync(conn: &Connection, target_language: Option<&str>) -> Result<Vec<CacheRecord>> {
        let records = match target_language {
            Some(target) => {
                let mut stmt = conn.prepare(&format!("{} WHERE target_language = ?1 ORDER BY id", SELECT_RECORD))?;
                let rows = stmt.query_map([target], record_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!("{} ORDER BY id", SELECT_RECORD))?;
                let rows = stmt.query_map([], record_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(records)
    }

    /// Delete rows whose selected field matches `pattern`.
    ///
    /// With `dry_run` nothing is deleted; the report carries the same count.
    pub async fn purge(
        &self,
        pattern: PurgePattern,
        field: PurgeField,
        target_language: Option<&str>,
        dry_run: bool,
    ) -> Result<PurgeReport> {
        let target_language = target_language.map(str::to_string);

        self.db
            .transaction_async(move |tx| {
                let matching: Vec<CacheRecord> = Self::list_records_sync(tx, target_language.as_deref())?
                    .into_iter()
                    .filter(|record| field.matches(&pattern, record))
                    .collect();

                if !dry_run {
                    let mut stmt = tx.prepare("DELETE FROM translation_cache WHERE id = ?1")?;
                    for record in &matching {
                        stmt.execute([record.id])?;
                    }
                }

                Ok(PurgeReport {
                    matched: matching.len(),
                    dry_run,
                    samples: matching
                        .iter()
                        .take(PURGE_SAMPLE_LIMIT)
                        .map(|r| r.source_text.clone())
                        .collect(),
                })
            })
            .await
    }

    /// Delete entries whose translation contains `text`
    pub async fn delete_containing(&self, text: &str) -> Result<usize> {
        let text = text.to_string();

        self.db
            .execute_async(move |conn| {
                let deleted = conn.execute(
                    "DELETE FROM translation_cache WHERE instr(translated_text, ?1) > 0",
                    [text],
                )?;
                Ok(deleted)
            })
            .await
    }

    /// Delete entries not used in the last `days` days
    pub async fn prune_unused(&self, days: i64) -> Result<usize> {
        let cutoff = (chrono::Utc::now() - chrono::Duration::days(days)).to_rfc3339();

        self.db
            .execute_async(move |conn| {
                let deleted = conn.execute(
                    "DELETE FROM translation_cache WHERE last_used_at < ?1",
                    [cutoff],
                )?;
                Ok(deleted)
            })
            .await
    }

    /// Clear the translation cache
    pub async fn clear_cache(&self) -> Result<usize> {
        self.db
            .execute_async(|conn| {
                let deleted = conn.execute("DELETE FROM translation_cache", [])?;
                Ok(deleted)
            })
            .await
    }

    /// Get cache statistics
    pub async fn get_cache_stats(&self) -> Result<CacheStats> {
        let file_size_bytes = self.db.file_size();

        self.db
            .execute_async(move |conn| {
                let (total_entries, total_hits, oldest_entry, newest_entry) = conn.query_row(
                    "SELECT COUNT(*), COALESCE(SUM(hit_count), 0), MIN(created_at), MAX(created_at) FROM translation_cache",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                )?;

                let mut stmt = conn.prepare(
                    r#"
                    SELECT source_language, target_language, COUNT(*)
                    FROM translation_cache
                    GROUP BY source_language, target_language
                    ORDER BY source_language, target_language
                    "#,
                )?;
                let language_pairs = stmt
                    .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                Ok(CacheStats {
                    total_entries,
                    total_hits,
                    language_pairs,
                    oldest_entry,
                    newest_entry,
                    file_size_bytes,
                })
            })
            .await
    }
}
