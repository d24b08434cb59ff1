/*!
 * Translation memory: content-addressed reuse of earlier translations.
 *
 * Lookups go through an in-process map before reaching SQLite. Database
 * errors never block translation: a failed read is a miss and a failed write
 * is skipped, both with a warning.
 */

use anyhow::Result;
use log::{debug, warn};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::OwnedMutexGuard;

use crate::database::{CacheRecord, CacheStats, PurgeField, PurgePattern, PurgeReport, Repository};

/// Exact cache key; there are no fuzzy lookups
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub content_hash: String,
    pub source_language: String,
    pub target_language: String,
}

impl CacheKey {
    pub fn new(content_hash: &str, source_language: &str, target_language: &str) -> Self {
        Self {
            content_hash: content_hash.to_string(),
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
        }
    }
}

type ClaimRegistry = Arc<Mutex<HashMap<CacheKey, Arc<tokio::sync::Mutex<()>>>>>;

/// Exclusive right to translate one key; released on drop
pub struct ClaimGuard {
    key: CacheKey,
    registry: ClaimRegistry,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        let mut registry = self.registry.lock();
        // Registry and this guard hold the only references when nobody waits
        if registry
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) <= 2)
        {
            registry.remove(&self.key);
        }
    }
}

/// Translation memory backed by the SQLite cache
#[derive(Clone)]
pub struct TranslationMemory {
    repository: Repository,
    front: Arc<RwLock<HashMap<CacheKey, String>>>,
    inflight: ClaimRegistry,
    hits: Arc<AtomicUsize>,
    misses: Arc<AtomicUsize>,
}

impl std::fmt::Debug for TranslationMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationMemory")
            .field("repository", &self.repository)
            .field("front_entries", &self.front.read().len())
            .finish()
    }
}

impl TranslationMemory {
    pub fn new(repository: Repository) -> Self {
        Self {
            repository,
            front: Arc::new(RwLock::new(HashMap::new())),
            inflight: Arc::new(Mutex::new(HashMap::new())),
            hits: Arc::new(AtomicUsize::new(0)),
            misses: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Memory over a throwaway in-memory database
    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(Repository::new_in_memory()?))
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Cached translation for an exact key
    pub async fn lookup(&self, key: &CacheKey) -> Option<String> {
        if let Some(text) = self.front.read().get(key).cloned() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Some(text);
        }

        match self
            .repository
            .get_cached_translation(&key.content_hash, &key.source_language, &key.target_language)
            .await
        {
            Ok(Some(text)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                self.front.write().insert(key.clone(), text.clone());
                Some(text)
            }
            Ok(None) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                warn!("Translation cache read failed, treating as a miss: {}", e);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Remember a translation; `source_text` is the normalized msgid
    pub async fn store(&self, key: &CacheKey, source_text: &str, translated_text: &str) {
        self.front.write().insert(key.clone(), translated_text.to_string());

        let record = CacheRecord::new(
            key.content_hash.clone(),
            source_text.to_string(),
            key.source_language.clone(),
            key.target_language.clone(),
            translated_text.to_string(),
        );
        match self.repository.cache_translation(&record).await {
            Ok(()) => debug!("Cached translation for {}", &key.content_hash[..key.content_hash.len().min(12)]),
            Err(e) => warn!("Translation cache write failed, continuing without caching: {}", e),
        }
    }

    /// Wait until no other task is translating `key`, then hold it.
    ///
    /// Callers re-check the cache after the claim: the previous holder may
    /// have stored the result.
    pub async fn claim(&self, key: &CacheKey) -> ClaimGuard {
        let lock = {
            let mut registry = self.inflight.lock();
            Arc::clone(
                registry
                    .entry(key.clone())
                    .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
            )
        };
        let guard = lock.lock_owned().await;
        ClaimGuard {
            key: key.clone(),
            registry: Arc::clone(&self.inflight),
            _guard: guard,
        }
    }

    /// Delete rows matching `pattern`; nothing changes with `dry_run`
    pub async fn purge(
        &self,
        pattern: PurgePattern,
        field: PurgeField,
        target_language: Option<&str>,
        dry_run: bool,
    ) -> Result<PurgeReport> {
        let report = self.repository.purge(pattern, field, target_language, dry_run).await?;
        if !dry_run && report.matched > 0 {
            self.front.write().clear();
        }
        Ok(report)
    }

    pub async fn clear(&self) -> Result<usize> {
        self.front.write().clear();
        self.repository.clear_cache().await
    }

    /// Remove entries unused for `days` days
    pub async fn prune_unused(&self, days: i64) -> Result<usize> {
        let deleted = self.repository.prune_unused(days).await?;
        if deleted > 0 {
            self.front.write().clear();
        }
        Ok(deleted)
    }

    pub async fn delete_containing(&self, text: &str) -> Result<usize> {
        let deleted = self.repository.delete_containing(text).await?;
        if deleted > 0 {
            self.front.write().retain(|_, translated| !translated.contains(text));
        }
        Ok(deleted)
    }

    pub async fn stats(&self) -> Result<CacheStats> {
        self.repository.get_cache_stats().await
    }

    /// Hits and misses seen by this instance
    pub fn session_stats(&self) -> (usize, usize) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }
}
