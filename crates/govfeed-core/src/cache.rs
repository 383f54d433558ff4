//! Per-source cache of the last successful parse.
//!
//! Freshness is checked lazily on read. Nothing is ever evicted: a stale
//! entry stays readable until the next successful fetch replaces it, so a
//! caller can fall back to it when a refetch fails.
//!
//! Refetches of one source are serialized through [`FetchCache::fetch_lock`]
//! so overlapping searches share a single network fetch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::OwnedMutexGuard;
use tokio::time::Instant;

use crate::feed::RawItem;

/// Default freshness window
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct CachedFeed {
    entries: Arc<Vec<RawItem>>,
    fetched_at: Instant,
}

/// Result of a cache read
#[derive(Debug, Clone)]
pub struct CacheLookup {
    pub entries: Arc<Vec<RawItem>>,
    pub is_fresh: bool,
}

/// Shared, mutex-guarded fetch cache keyed by source id
#[derive(Debug)]
pub struct FetchCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CachedFeed>>,
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl Default for FetchCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl FetchCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    // A panic while holding the lock cannot leave a half-written entry
    // (puts replace the whole value), so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, CachedFeed>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Look up a source; `None` is a plain miss
    pub fn get(&self, source_id: &str) -> Option<CacheLookup> {
        let entries = self.lock();
        entries.get(source_id).map(|cached| CacheLookup {
            entries: Arc::clone(&cached.entries),
            is_fresh: cached.fetched_at.elapsed() < self.ttl,
        })
    }

    /// Wait for exclusive refetch rights on a source
    ///
    /// Callers re-check [`FetchCache::get`] after this resolves: another
    /// task may have refreshed the entry while this one was waiting.
    pub async fn fetch_lock(&self, source_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(in_flight.entry(source_id.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    /// Record a successful fetch, replacing any previous entry
    pub fn put(&self, source_id: &str, entries: Vec<RawItem>) -> Arc<Vec<RawItem>> {
        let entries = Arc::new(entries);
        self.lock().insert(
            source_id.to_string(),
            CachedFeed {
                entries: Arc::clone(&entries),
                fetched_at: Instant::now(),
            },
        );
        entries
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(link: &str) -> RawItem {
        RawItem {
            title: "title".to_string(),
            link: link.to_string(),
            description: String::new(),
            published_at: None,
        }
    }

    #[test]
    fn test_miss_then_fresh_hit() {
        let cache = FetchCache::default();
        assert!(cache.get("a").is_none());

        cache.put("a", vec![raw("https://a/1")]);
        let hit = cache.get("a").unwrap();
        assert!(hit.is_fresh);
        assert_eq!(hit.entries.len(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_goes_stale_but_stays_readable() {
        let cache = FetchCache::new(Duration::from_secs(300));
        cache.put("a", vec![raw("https://a/1")]);

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(cache.get("a").unwrap().is_fresh);

        tokio::time::advance(Duration::from_secs(2)).await;
        let stale = cache.get("a").unwrap();
        assert!(!stale.is_fresh);
        assert_eq!(stale.entries[0].link, "https://a/1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_replaces_whole_entry_and_resets_clock() {
        let cache = FetchCache::new(Duration::from_secs(10));
        cache.put("a", vec![raw("https://a/1"), raw("https://a/2")]);
        tokio::time::advance(Duration::from_secs(11)).await;

        cache.put("a", vec![raw("https://a/3")]);
        let hit = cache.get("a").unwrap();
        assert!(hit.is_fresh);
        assert_eq!(hit.entries.len(), 1);
        assert_eq!(hit.entries[0].link, "https://a/3");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_lock_serializes_one_source() {
        let cache = Arc::new(FetchCache::default());
        let held = cache.fetch_lock("a").await;

        let waiter = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                let _guard = cache.fetch_lock("a").await;
                cache.get("a").map(|hit| hit.is_fresh)
            })
        };

        // other sources are not blocked
        drop(cache.fetch_lock("b").await);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        cache.put("a", vec![raw("https://a/1")]);
        drop(held);
        assert_eq!(waiter.await.unwrap(), Some(true));
    }

    #[test]
    fn test_clear() {
        let cache = FetchCache::default();
        cache.put("a", Vec::new());
        cache.clear();
        assert!(cache.is_empty());
    }
}
