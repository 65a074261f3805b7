use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

use crate::roster::GameRoster;

/// Resolved rosters keyed by game id.
pub type RosterCache = QueryCache<i64, GameRoster>;

struct Entry<V> {
    value: V,
    inserted: Instant,
    ttl: Duration,
}

impl<V> Entry<V> {
    fn is_fresh(&self, now: Instant) -> bool {
        now.duration_since(self.inserted) < self.ttl
    }
}

struct Slots<K, V> {
    entries: HashMap<K, Entry<V>>,
    /// Bumped by every invalidation.
    version: u64,
}

/// Process-local read cache with per-entry expiry.
///
/// Advisory only: write paths call [`QueryCache::invalidate`] for every key
/// they touch, and losing the cache never changes a result. Readers that
/// load from the database take [`QueryCache::version`] first and store with
/// [`QueryCache::insert_if_current`], so a value loaded before a concurrent
/// invalidation is never cached.
pub struct QueryCache<K, V> {
    slots: Arc<RwLock<Slots<K, V>>>,
    default_ttl: Duration,
}

impl<K, V> Clone for QueryCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
            default_ttl: self.default_ttl,
        }
    }
}

impl<K, V> QueryCache<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            slots: Arc::new(RwLock::new(Slots { entries: HashMap::new(), version: 0 })),
            default_ttl,
        }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        let slots = self.slots.read().await;
        slots
            .entries
            .get(key)
            .filter(|e| e.is_fresh(Instant::now()))
            .map(|e| e.value.clone())
    }

    pub async fn insert(&self, key: K, value: V) {
        self.insert_with_ttl(key, value, self.default_ttl).await;
    }

    pub async fn insert_with_ttl(&self, key: K, value: V, ttl: Duration) {
        let mut slots = self.slots.write().await;
        Self::store(&mut slots, key, value, ttl);
    }

    /// Current invalidation count. Take it before loading a value.
    pub async fn version(&self) -> u64 {
        self.slots.read().await.version
    }

    /// Stores `value` only if nothing was invalidated since `seen` was read
    /// from [`QueryCache::version`]. Returns whether it was stored.
    pub async fn insert_if_current(&self, key: K, value: V, seen: u64) -> bool {
        let mut slots = self.slots.write().await;
        if slots.version != seen {
            debug!("Skipping cache insert for {key:?}: invalidated while loading");
            return false;
        }
        let ttl = self.default_ttl;
        Self::store(&mut slots, key, value, ttl);
        true
    }

    /// Drops `key`. Returns whether an entry was present.
    pub async fn invalidate(&self, key: &K) -> bool {
        let mut slots = self.slots.write().await;
        slots.version += 1;
        let removed = slots.entries.remove(key).is_some();
        if removed {
            debug!("Invalidated cache entry {key:?}");
        }
        removed
    }

    pub async fn cleanup_expired(&self) {
        let mut slots = self.slots.write().await;
        Self::cleanup_expired_internal(&mut slots.entries);
    }

    fn store(slots: &mut Slots<K, V>, key: K, value: V, ttl: Duration) {
        slots.entries.insert(key, Entry { value, inserted: Instant::now(), ttl });

        // Clean up expired entries while we have the write lock
        Self::cleanup_expired_internal(&mut slots.entries);
    }

    fn cleanup_expired_internal(entries: &mut HashMap<K, Entry<V>>) {
        let now = Instant::now();
        entries.retain(|key, entry| {
            let fresh = entry.is_fresh(now);
            if !fresh {
                debug!("Removing expired cache entry {key:?}");
            }
            fresh
        });
    }

    pub async fn len(&self) -> usize {
        self.slots.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn clear(&self) {
        let mut slots = self.slots.write().await;
        slots.version += 1;
        slots.entries.clear();
    }
}
