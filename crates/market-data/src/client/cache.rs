//! Response cache with request spacing for a single provider.
//!
//! Each provider client owns exactly one `RateLimitedCache`. The cache map
//! and the last granted request slot live behind one mutex, so concurrent
//! callers sharing a client never lose an update to either.
//!
//! Slots are reserved, not polled: `wait_for_slot` computes the next free
//! slot and records it while holding the lock, then sleeps until that slot
//! without the lock. Cache reads never queue behind a sleeping caller, and
//! every pair of granted slots is at least `min_interval` apart.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Cached provider payload.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub payload: Value,
    pub fetched_at: Instant,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    /// Most recently reserved request slot.
    last_slot: Option<Instant>,
}

/// TTL cache plus minimum-spacing rate limiter.
#[derive(Debug)]
pub struct RateLimitedCache {
    state: Mutex<CacheState>,
    ttl: Duration,
    min_interval: Duration,
}

impl RateLimitedCache {
    pub fn new(ttl: Duration, min_interval: Duration) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            ttl,
            min_interval,
        }
    }

    /// Lock the state mutex, recovering from poison if necessary.
    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("Provider cache mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Return the cached payload if it is younger than the TTL.
    pub fn get(&self, key: &str) -> Option<Value> {
        let state = self.lock_state();
        state
            .entries
            .get(key)
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.payload.clone())
    }

    /// Store a payload, replacing any previous entry for the key.
    pub fn put(&self, key: impl Into<String>, payload: Value) {
        let mut state = self.lock_state();
        state.entries.insert(
            key.into(),
            CacheEntry {
                payload,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Wait until this provider may send its next request.
    ///
    /// Dropping the returned future cancels the wait; the reserved slot is
    /// then simply left unused.
    pub async fn wait_for_slot(&self) {
        let slot = self.reserve_slot();
        let now = Instant::now();
        if slot > now {
            debug!("Rate limiting: sleeping {:?}", slot - now);
            tokio::time::sleep_until(slot).await;
        }
    }

    fn reserve_slot(&self) -> Instant {
        let mut state = self.lock_state();
        let now = Instant::now();
        let slot = match state.last_slot {
            Some(previous) => (previous + self.min_interval).max(now),
            None => now,
        };
        state.last_slot = Some(slot);
        slot
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.lock_state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop entries whose TTL has elapsed. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut state = self.lock_state();
        let before = state.entries.len();
        let ttl = self.ttl;
        state
            .entries
            .retain(|_, entry| entry.fetched_at.elapsed() < ttl);
        before - state.entries.len()
    }

    /// Snapshot of an entry regardless of age.
    pub fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.lock_state().entries.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn test_get_respects_ttl() {
        let cache = RateLimitedCache::new(Duration::from_secs(30), Duration::ZERO);
        cache.put("k", json!({"price": "1.0"}));

        tokio::time::advance(Duration::from_secs(29)).await;
        assert_eq!(cache.get("k"), Some(json!({"price": "1.0"})));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("k"), None);
        // Stale entries stay stored until overwritten or purged
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_overwrites_and_refreshes() {
        let cache = RateLimitedCache::new(Duration::from_secs(10), Duration::ZERO);
        cache.put("k", json!(1));
        tokio::time::advance(Duration::from_secs(8)).await;
        cache.put("k", json!(2));
        tokio::time::advance(Duration::from_secs(8)).await;
        assert_eq!(cache.get("k"), Some(json!(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = RateLimitedCache::new(Duration::from_secs(5), Duration::ZERO);
        cache.put("old", json!(1));
        tokio::time::advance(Duration::from_secs(6)).await;
        cache.put("new", json!(2));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.entry("old").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_slot_is_immediate() {
        let cache = RateLimitedCache::new(Duration::ZERO, Duration::from_secs(2));
        let start = Instant::now();
        cache.wait_for_slot().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slots_are_spaced() {
        let cache = RateLimitedCache::new(Duration::ZERO, Duration::from_millis(1200));
        let start = Instant::now();
        for _ in 0..4 {
            cache.wait_for_slot().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(3600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_time_counts_towards_spacing() {
        let cache = RateLimitedCache::new(Duration::ZERO, Duration::from_secs(2));
        cache.wait_for_slot().await;
        tokio::time::advance(Duration::from_secs(5)).await;

        let start = Instant::now();
        cache.wait_for_slot().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_waiters_get_distinct_slots() {
        let cache = std::sync::Arc::new(RateLimitedCache::new(
            Duration::ZERO,
            Duration::from_secs(1),
        ));
        let start = Instant::now();

        let waiters = (0..5).map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache.wait_for_slot().await;
                Instant::now()
            })
        });
        let mut granted: Vec<Instant> = futures::future::join_all(waiters)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        granted.sort();

        for pair in granted.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(1));
        }
        assert!(start.elapsed() >= Duration::from_secs(4));
    }
}
