use indexmap::IndexMap;
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;

/// A finalized response together with the instant it stops being served
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Bounded, TTL-expiring store for finalized responses
///
/// Entries are kept in recency order inside an `IndexMap`: the front is the least recently
/// used entry and is the first to go when the store is full. Reads move an entry to the back.
#[derive(Debug)]
pub struct RequestCache<K, V> {
    entries: IndexMap<K, CacheEntry<V>>,
    max_entries: usize,
}

impl<K, V> RequestCache<K, V>
where
    K: Hash + Eq,
    V: Clone,
{
    /// Creates an empty store holding at most `max_entries` entries (at least one)
    pub fn new(max_entries: usize) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            entries: IndexMap::with_capacity(max_entries),
            max_entries,
        }
    }

    /// Returns the cached value if present and not yet expired
    ///
    /// An expired entry is dropped on the spot. A hit becomes the most recently used entry.
    pub fn get(&mut self, key: &K) -> Option<V> {
        let now = Instant::now();
        let (key, entry) = self.entries.shift_remove_entry(key)?;

        if entry.is_expired(now) {
            return None;
        }

        let value = entry.value.clone();
        self.entries.insert(key, entry);
        Some(value)
    }

    /// Stores `value` under `key` until `now + ttl`
    pub fn set(&mut self, key: K, value: V, ttl: Duration) {
        let expires_at = Instant::now() + ttl;

        if self.entries.shift_remove(&key).is_none() {
            self.evict_if_full();
        }

        self.entries.insert(key, CacheEntry { value, expires_at });
    }

    /// Drops a single entry
    pub fn remove(&mut self, key: &K) -> bool {
        self.entries.shift_remove(key).is_some()
    }

    /// Drops every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    /// Makes room for one more entry: expired entries go first, then the least recently used.
    fn evict_if_full(&mut self) {
        if self.entries.len() < self.max_entries {
            return;
        }

        let now = Instant::now();
        self.entries.retain(|_, entry| !entry.is_expired(now));

        while self.entries.len() >= self.max_entries {
            self.entries.shift_remove_index(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn test_get_before_and_after_expiry() {
        let mut cache = RequestCache::new(10);
        cache.set("k", 1, Duration::from_millis(100));

        assert_eq!(cache.get(&"k"), Some(1));

        tokio::time::advance(Duration::from_millis(150)).await;

        assert_eq!(cache.get(&"k"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_is_inclusive_of_the_deadline() {
        let mut cache = RequestCache::new(10);
        cache.set("k", 1, Duration::from_millis(100));

        tokio::time::advance(Duration::from_millis(100)).await;

        assert_eq!(cache.get(&"k"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl_is_stale_on_next_read() {
        let mut cache = RequestCache::new(10);
        cache.set("k", 1, Duration::ZERO);

        assert_eq!(cache.get(&"k"), None);
    }

    #[test]
    fn test_capacity_is_never_exceeded() {
        let mut cache = RequestCache::new(3);
        for i in 0..10 {
            cache.set(i, i, TTL);
            assert!(cache.len() <= 3);
        }

        assert_eq!(cache.get(&7), Some(7));
        assert_eq!(cache.get(&8), Some(8));
        assert_eq!(cache.get(&9), Some(9));
        assert_eq!(cache.get(&6), None);
    }

    #[test]
    fn test_read_refreshes_recency() {
        let mut cache = RequestCache::new(2);
        cache.set("a", 1, TTL);
        cache.set("b", 2, TTL);

        // "a" becomes most recently used, so "b" is evicted next
        assert_eq!(cache.get(&"a"), Some(1));
        cache.set("c", 3, TTL);

        assert_eq!(cache.get(&"b"), None);
        assert_eq!(cache.get(&"a"), Some(1));
        assert_eq!(cache.get(&"c"), Some(3));
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let mut cache = RequestCache::new(2);
        cache.set("a", 1, TTL);
        cache.set("b", 2, TTL);
        cache.set("a", 10, TTL);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"a"), Some(10));
        assert_eq!(cache.get(&"b"), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_are_evicted_before_live_ones() {
        let mut cache = RequestCache::new(2);
        cache.set("live", 1, TTL);
        cache.set("short", 2, Duration::from_millis(10));

        tokio::time::advance(Duration::from_millis(20)).await;
        cache.set("new", 3, TTL);

        assert_eq!(cache.get(&"live"), Some(1));
        assert_eq!(cache.get(&"new"), Some(3));
    }

    #[test]
    fn test_clear_and_remove() {
        let mut cache = RequestCache::new(4);
        cache.set("a", 1, TTL);
        cache.set("b", 2, TTL);

        assert!(cache.remove(&"a"));
        assert!(!cache.remove(&"a"));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut cache = RequestCache::new(0);
        cache.set("a", 1, TTL);

        assert_eq!(cache.capacity(), 1);
        assert_eq!(cache.get(&"a"), Some(1));
    }
}
