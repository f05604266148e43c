//! Content-addressed response cache with TTL expiry.
//!
//! Entries are keyed by the request fingerprint. Expired entries are treated
//! as misses and evicted on read; [`ResponseCache::spawn_sweeper`] removes the
//! rest in the background. The sweep is housekeeping only, `get` never
//! depends on it.

mod fingerprint;

#[cfg(test)]
mod tests;

pub use fingerprint::compute_fingerprint;

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use switchyard_types::models::CacheConfig;
use switchyard_types::{CacheStats, CompletionResponse};

use crate::metrics;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub fingerprint: String,
    pub response: CompletionResponse,
    pub created_at: Instant,
    pub ttl: Duration,
    pub hit_count: u64,
}

impl CacheEntry {
    /// Still servable at exactly `created_at + ttl`, expired strictly after.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) > self.ttl
    }
}

pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
    default_ttl: Duration,
    max_entries: Option<usize>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResponseCache {
    pub fn new(default_ttl: Duration, max_entries: Option<usize>) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
            max_entries,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(Duration::from_secs(config.ttl_secs), config.max_entries)
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn get(&self, fingerprint: &str) -> Option<CacheEntry> {
        self.get_at(fingerprint, Instant::now())
    }

    /// A hit increments the entry's `hit_count` and returns a copy of it.
    pub fn get_at(&self, fingerprint: &str, now: Instant) -> Option<CacheEntry> {
        let hit = match self.entries.get_mut(fingerprint) {
            Some(mut entry) if !entry.is_expired_at(now) => {
                entry.hit_count += 1;
                Some(entry.value().clone())
            },
            _ => None,
        };

        match hit {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                metrics::record_cache_lookup(true);
                tracing::debug!(fingerprint = %fingerprint, hit_count = entry.hit_count, "Cache hit");
                Some(entry)
            },
            None => {
                // Re-check under the shard lock so a fresh `put` is never evicted
                if self.entries.remove_if(fingerprint, |_, e| e.is_expired_at(now)).is_some() {
                    tracing::debug!(fingerprint = %fingerprint, "Evicted expired cache entry");
                }
                self.misses.fetch_add(1, Ordering::Relaxed);
                metrics::record_cache_lookup(false);
                None
            },
        }
    }

    /// Store with the default TTL.
    pub fn insert(&self, fingerprint: &str, response: CompletionResponse) {
        self.put_at(fingerprint, response, self.default_ttl, Instant::now());
    }

    pub fn put(&self, fingerprint: &str, response: CompletionResponse, ttl: Duration) {
        self.put_at(fingerprint, response, ttl, Instant::now());
    }

    /// Last write wins. Beyond `max_entries` the oldest entries are evicted.
    pub fn put_at(&self, fingerprint: &str, response: CompletionResponse, ttl: Duration, now: Instant) {
        let entry = CacheEntry {
            fingerprint: fingerprint.to_string(),
            response,
            created_at: now,
            ttl,
            hit_count: 0,
        };
        self.entries.insert(fingerprint.to_string(), entry);

        if let Some(max) = self.max_entries {
            self.evict_oldest_beyond(max, fingerprint);
        }
    }

    fn evict_oldest_beyond(&self, max: usize, keep: &str) {
        while self.entries.len() > max {
            let oldest = self
                .entries
                .iter()
                .filter(|e| e.key() != keep)
                .min_by_key(|e| e.value().created_at)
                .map(|e| e.key().clone());

            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                    tracing::debug!(fingerprint = %key, "Evicted oldest cache entry (capacity)");
                },
                None => break,
            }
        }
    }

    /// Remove every entry, returning how many were removed.
    pub fn clear(&self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        tracing::info!("Cache cleared: {} entries removed", count);
        count
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.entries.len(),
            total_hits: self.hits.load(Ordering::Relaxed),
            total_misses: self.misses.load(Ordering::Relaxed),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Instant::now())
    }

    pub fn sweep_expired_at(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        before.saturating_sub(self.entries.len())
    }

    /// Periodically sweep expired entries until the handle is aborted.
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tracing::info!("Cache sweeper started (interval: {}s)", interval.as_secs());
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = self.sweep_expired();
                if removed > 0 {
                    tracing::debug!("Cache sweep removed {} expired entries", removed);
                }
            }
        })
    }
}
