use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

use super::CacheKey;

/// Token handed out when a fetch for a key starts. A write carrying a token
/// older than the newest one issued for that key is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(u64);

struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    written_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    /// Hit iff `now - written_at < ttl`. Reads never extend the TTL.
    fn is_live(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.written_at) < self.ttl
    }
}

/// A fetch that has not written back after this long is treated as
/// abandoned by [`EntityCache::purge_expired`]. A late write from it is dropped.
pub const ABANDONED_FETCH_AFTER: Duration = Duration::from_secs(300);

struct GenerationSlot {
    value: u64,
    /// Set while a fetch started by `begin` has not written back.
    pending_since: Option<Instant>,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    generations: HashMap<CacheKey, GenerationSlot>,
    next_generation: u64,
}

impl CacheState {
    /// Generations are drawn from one counter, so a token issued before a
    /// slot was pruned can never match a later slot for the same key.
    fn bump(&mut self, key: &CacheKey, pending_since: Option<Instant>) -> u64 {
        self.next_generation += 1;
        self.generations.insert(
            key.clone(),
            GenerationSlot {
                value: self.next_generation,
                pending_since,
            },
        );
        self.next_generation
    }

    /// Drop generation slots with no entry and no live fetch.
    fn prune_generations(&mut self, now: Instant) -> usize {
        let Self {
            entries,
            generations,
            ..
        } = self;
        let before = generations.len();
        generations.retain(|key, slot| {
            entries.contains_key(key)
                || slot
                    .pending_since
                    .is_some_and(|since| now.saturating_duration_since(since) < ABANDONED_FETCH_AFTER)
        });
        before - generations.len()
    }

    fn insert(&mut self, key: CacheKey, value: Arc<dyn Any + Send + Sync>, ttl: Duration) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                written_at: Instant::now(),
                ttl,
            },
        );
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entry_count: usize,
    pub keys: Vec<String>,
}

/// Process-local TTL cache keyed by `category` / `category:id`.
///
/// Clone is cheap and every clone sees the same entries. The lock is only
/// held for the duration of a single call; a read-then-write sequence that
/// spans an `.await` can interleave with another caller's writes, which is
/// what the generation tokens are for.
#[derive(Clone, Default)]
pub struct EntityCache {
    inner: Arc<RwLock<CacheState>>,
}

impl EntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the cached value if present, unexpired and of type `T`.
    pub fn get<T>(&self, key: impl Into<CacheKey>) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let key = key.into();
        let state = self.read();
        let entry = state.entries.get(&key)?;
        if !entry.is_live(Instant::now()) {
            return None;
        }
        match entry.value.downcast_ref::<T>() {
            Some(value) => Some(value.clone()),
            None => {
                debug!(key = %key, "Cached value has a different type, treating as miss");
                None
            }
        }
    }

    /// Unconditional write. Supersedes any fetch already in flight for the key.
    pub fn set<T>(&self, key: impl Into<CacheKey>, value: T, ttl: Duration)
    where
        T: Send + Sync + 'static,
    {
        let key = key.into();
        let mut state = self.write();
        state.bump(&key, None);
        state.insert(key, Arc::new(value), ttl);
    }

    /// Start a fetch for `key`; pass the token to [`set_if_current`](Self::set_if_current).
    pub fn begin(&self, key: impl Into<CacheKey>) -> Generation {
        let key = key.into();
        Generation(self.write().bump(&key, Some(Instant::now())))
    }

    /// Write only if no newer fetch, write or invalidation happened for `key`
    /// since `generation` was issued. Returns whether the value was stored.
    pub fn set_if_current<T>(
        &self,
        key: impl Into<CacheKey>,
        generation: Generation,
        value: T,
        ttl: Duration,
    ) -> bool
    where
        T: Send + Sync + 'static,
    {
        let key = key.into();
        let mut state = self.write();
        match state.generations.get_mut(&key) {
            Some(slot) if slot.value == generation.0 => slot.pending_since = None,
            _ => {
                debug!(key = %key, "Dropping superseded cache write");
                return false;
            }
        }
        state.insert(key, Arc::new(value), ttl);
        true
    }

    /// Drop `key`. A bare category drops every entry under it. Fetches in
    /// flight for the affected keys lose their right to write.
    pub fn invalidate(&self, key: impl Into<CacheKey>) {
        let key = key.into();
        let mut state = self.write();

        let before = state.entries.len();
        state.entries.retain(|k, _| !key.covers(k));
        let removed = before - state.entries.len();

        let affected: Vec<CacheKey> = state
            .generations
            .keys()
            .filter(|k| key.covers(k))
            .cloned()
            .collect();
        for k in &affected {
            state.bump(k, None);
        }
        if key.id().is_some() && affected.is_empty() {
            state.bump(&key, None);
        }

        debug!(key = %key, removed, "Cache invalidated");
    }

    /// Live entries only, keys sorted.
    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let state = self.read();
        let mut keys: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_live(now))
            .map(|(key, _)| key.to_string())
            .collect();
        keys.sort();
        CacheStats {
            entry_count: keys.len(),
            keys,
        }
    }

    /// Remaining lifetime of a live entry.
    pub fn time_to_live(&self, key: impl Into<CacheKey>) -> Option<Duration> {
        let key = key.into();
        let now = Instant::now();
        let state = self.read();
        let entry = state.entries.get(&key)?;
        entry
            .is_live(now)
            .then(|| entry.ttl - now.saturating_duration_since(entry.written_at))
    }

    /// Remove expired entries, and the generation bookkeeping of keys that
    /// have neither an entry nor a live fetch. Returns how many entries were
    /// dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut state = self.write();
        let before = state.entries.len();
        state.entries.retain(|_, entry| entry.is_live(now));
        let purged = before - state.entries.len();

        let pruned = state.prune_generations(now);
        if pruned > 0 {
            debug!(pruned, "Dropped idle generation slots");
        }
        purged
    }

    /// Drop everything, including generation bookkeeping.
    pub fn clear(&self) {
        let mut state = self.write();
        state.entries.clear();
        state.generations.clear();
    }
}

impl std::fmt::Debug for EntityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityCache").field("stats", &self.stats()).finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::categories::{EXPENSES, PROJECTS, ROOMS};

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = EntityCache::new();
        cache.set(PROJECTS, vec![1, 2, 3], Duration::from_millis(1000));

        assert_eq!(cache.get::<Vec<i32>>(PROJECTS), Some(vec![1, 2, 3]));

        tokio::time::advance(Duration::from_millis(999)).await;
        assert!(cache.get::<Vec<i32>>(PROJECTS).is_some());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(cache.get::<Vec<i32>>(PROJECTS), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reads_do_not_extend_ttl() {
        let cache = EntityCache::new();
        cache.set("dashboard", 7u32, Duration::from_secs(10));
        for _ in 0..9 {
            tokio::time::advance(Duration::from_secs(1)).await;
            assert_eq!(cache.get::<u32>("dashboard"), Some(7));
        }
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get::<u32>("dashboard"), None);
    }

    #[test]
    fn test_ttl_is_per_write() {
        let cache = EntityCache::new();
        cache.set("a", 1u8, Duration::ZERO);
        cache.set("b", 2u8, Duration::from_secs(60));
        assert_eq!(cache.get::<u8>("a"), None);
        assert_eq!(cache.get::<u8>("b"), Some(2));
    }

    #[test]
    fn test_invalidate_single_entity_keeps_siblings() {
        let cache = EntityCache::new();
        let ttl = Duration::from_secs(60);
        cache.set("expenses:1", "one".to_string(), ttl);
        cache.set("expenses:2", "two".to_string(), ttl);

        cache.invalidate("expenses:1");

        assert_eq!(cache.get::<String>("expenses:1"), None);
        assert_eq!(cache.get::<String>("expenses:2"), Some("two".to_string()));
    }

    #[test]
    fn test_invalidate_category_drops_all_entities() {
        let cache = EntityCache::new();
        let ttl = Duration::from_secs(60);
        cache.set((EXPENSES, 1), 1u8, ttl);
        cache.set((EXPENSES, 2), 2u8, ttl);
        cache.set((ROOMS, 1), 3u8, ttl);

        cache.invalidate(EXPENSES);

        assert_eq!(cache.get::<u8>((EXPENSES, 1)), None);
        assert_eq!(cache.get::<u8>((EXPENSES, 2)), None);
        assert_eq!(cache.get::<u8>((ROOMS, 1)), Some(3));
    }

    #[test]
    fn test_type_mismatch_is_a_miss() {
        let cache = EntityCache::new();
        cache.set(PROJECTS, 5u64, Duration::from_secs(60));
        assert_eq!(cache.get::<String>(PROJECTS), None);
        assert_eq!(cache.get::<u64>(PROJECTS), Some(5));
    }

    #[test]
    fn test_stale_generation_write_is_dropped() {
        let cache = EntityCache::new();
        let ttl = Duration::from_secs(60);

        let older = cache.begin(PROJECTS);
        let newer = cache.begin(PROJECTS);

        assert!(cache.set_if_current(PROJECTS, newer, "fresh", ttl));
        assert!(!cache.set_if_current(PROJECTS, older, "stale", ttl));
        assert_eq!(cache.get::<&str>(PROJECTS), Some("fresh"));
    }

    #[test]
    fn test_invalidation_revokes_in_flight_fetch() {
        let cache = EntityCache::new();
        let ttl = Duration::from_secs(60);

        let in_flight = cache.begin((EXPENSES, 4));
        cache.invalidate(EXPENSES);

        assert!(!cache.set_if_current((EXPENSES, 4), in_flight, 1u8, ttl));
        assert_eq!(cache.get::<u8>((EXPENSES, 4)), None);
    }

    #[test]
    fn test_direct_set_supersedes_in_flight_fetch() {
        let cache = EntityCache::new();
        let ttl = Duration::from_secs(60);

        let in_flight = cache.begin(PROJECTS);
        cache.set(PROJECTS, 2u8, ttl);

        assert!(!cache.set_if_current(PROJECTS, in_flight, 1u8, ttl));
        assert_eq!(cache.get::<u8>(PROJECTS), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_and_purge() {
        let cache = EntityCache::new();
        cache.set("rooms:2", 1u8, Duration::from_secs(5));
        cache.set(PROJECTS, 1u8, Duration::from_secs(60));
        cache.set("expenses:1", 1u8, Duration::from_secs(60));

        let stats = cache.stats();
        assert_eq!(stats.entry_count, 3);
        assert_eq!(stats.keys, vec!["expenses:1", "projects", "rooms:2"]);

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(cache.stats().entry_count, 2);
        assert_eq!(cache.time_to_live(PROJECTS), Some(Duration::from_secs(54)));
        assert_eq!(cache.purge_expired(), 1);

        cache.clear();
        assert_eq!(cache.stats(), CacheStats::default());
    }

    fn tracked_generations(cache: &EntityCache) -> usize {
        cache.read().generations.len()
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_drops_idle_generations() {
        let cache = EntityCache::new();
        let ttl = Duration::from_secs(5);
        for id in 0..50 {
            cache.set((EXPENSES, id), 1u8, ttl);
        }
        cache.invalidate("rooms:7");
        cache.set(PROJECTS, 1u8, Duration::from_secs(60));
        assert_eq!(tracked_generations(&cache), 52);

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(cache.purge_expired(), 50);
        assert_eq!(tracked_generations(&cache), 1);
        assert_eq!(cache.get::<u8>(PROJECTS), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_keeps_in_flight_fetch() {
        let cache = EntityCache::new();
        let ttl = Duration::from_secs(60);

        let in_flight = cache.begin((ROOMS, 3));
        cache.purge_expired();
        assert_eq!(tracked_generations(&cache), 1);
        assert!(cache.set_if_current((ROOMS, 3), in_flight, 1u8, ttl));

        // Once written back, the slot lives as long as the entry.
        cache.invalidate((ROOMS, 3));
        cache.purge_expired();
        assert_eq!(tracked_generations(&cache), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_drops_abandoned_fetch() {
        let cache = EntityCache::new();
        let abandoned = cache.begin((ROOMS, 3));

        tokio::time::advance(ABANDONED_FETCH_AFTER).await;
        cache.purge_expired();
        assert_eq!(tracked_generations(&cache), 0);

        assert!(!cache.set_if_current((ROOMS, 3), abandoned, 1u8, Duration::from_secs(60)));
        let fresh = cache.begin((ROOMS, 3));
        assert!(cache.set_if_current((ROOMS, 3), fresh, 2u8, Duration::from_secs(60)));
        assert_eq!(cache.get::<u8>((ROOMS, 3)), Some(2));
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = EntityCache::new();
        let other = cache.clone();
        other.set(PROJECTS, 9u8, Duration::from_secs(60));
        assert_eq!(cache.get::<u8>(PROJECTS), Some(9));
    }
}
