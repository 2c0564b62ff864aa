//! Bounded string-keyed caches.
//!
//! The engine keeps three of these per instance: tokenized selector groups, compiled
//! selectors, and class-name patterns. Each cache holds a fixed number of entries and evicts
//! in insertion order (FIFO); a lookup hit does not refresh an entry's position.
//!
//! Values are handed out by clone, so callers store `Arc`s and a hit returns the identical
//! allocation that was inserted.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use tracing::debug;

/// Cache capacities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of tokenized selector groups
    pub token_capacity: usize,

    /// Maximum number of compiled selectors
    pub compiled_capacity: usize,

    /// Maximum number of class-name patterns
    pub class_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            token_capacity: 50,
            compiled_capacity: 50,
            class_capacity: 50,
        }
    }
}

/// Cache performance statistics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Total cache lookups
    pub lookups: usize,
    /// Lookups answered from the cache
    pub hits: usize,
    /// Lookups that found nothing
    pub misses: usize,
    /// Entries added
    pub insertions: usize,
    /// Entries dropped to respect the capacity
    pub evictions: usize,
}

impl CacheStats {
    /// Fraction of lookups answered from the cache.
    pub fn hit_ratio(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            self.hits as f64 / self.lookups as f64
        }
    }
}

/// Statistics for all engine caches.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineCacheStats {
    pub tokens: CacheStats,
    pub compiled: CacheStats,
    pub classes: CacheStats,
}

/// Fixed-capacity map with FIFO eviction.
#[derive(Debug)]
pub struct BoundedCache<K, V> {
    name: &'static str,
    capacity: usize,
    entries: HashMap<K, V>,
    order: VecDeque<K>,
    stats: CacheStats,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an empty cache; a capacity of zero is raised to one.
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            name,
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            stats: CacheStats::default(),
        }
    }

    /// Look up a value, recording a hit or a miss.
    pub fn get<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.stats.lookups += 1;
        match self.entries.get(key) {
            Some(value) => {
                self.stats.hits += 1;
                Some(value.clone())
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Look up without touching the statistics.
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key)
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.contains_key(key)
    }

    /// Insert a value and return it.
    ///
    /// Replacing an existing key keeps its original insertion position. Inserting a new key
    /// into a full cache evicts the oldest entry first.
    pub fn insert(&mut self, key: K, value: V) -> V {
        if let Some(slot) = self.entries.get_mut(&key) {
            *slot = value.clone();
            return value;
        }

        while self.order.len() >= self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
            self.stats.evictions += 1;
            debug!(cache = self.name, "evicted oldest cache entry");
        }

        self.order.push_back(key.clone());
        self.entries.insert(key, value.clone());
        self.stats.insertions += 1;
        value
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Drop every entry; statistics are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Keys in eviction order, oldest first.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.order.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_cache_basic_functionality() {
        let mut cache: BoundedCache<String, Arc<String>> = BoundedCache::new("test", 4);

        assert!(cache.get("a").is_none());
        let inserted = cache.insert("a".to_string(), Arc::new("alpha".to_string()));
        let fetched = cache.get("a").unwrap();

        assert!(Arc::ptr_eq(&inserted, &fetched));
        assert_eq!(cache.len(), 1);

        let stats = cache.stats();
        assert_eq!(stats.lookups, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.insertions, 1);
        assert!((stats.hit_ratio() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cache_eviction_is_fifo() {
        let mut cache: BoundedCache<String, usize> = BoundedCache::new("test", 3);
        for (i, key) in ["a", "b", "c"].iter().enumerate() {
            cache.insert(key.to_string(), i);
        }

        // A hit must not protect "a" from eviction.
        assert_eq!(cache.get("a"), Some(0));

        cache.insert("d".to_string(), 3);
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
        assert!(cache.contains("d"));
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.stats().evictions, 1);

        let keys: Vec<&String> = cache.keys().collect();
        assert_eq!(keys, vec!["b", "c", "d"]);
    }

    #[test]
    fn test_replacing_keeps_position() {
        let mut cache: BoundedCache<String, usize> = BoundedCache::new("test", 2);
        cache.insert("a".to_string(), 1);
        cache.insert("b".to_string(), 2);
        cache.insert("a".to_string(), 10);

        assert_eq!(cache.peek("a"), Some(&10));
        assert_eq!(cache.stats().evictions, 0);

        cache.insert("c".to_string(), 3);
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let mut cache: BoundedCache<String, usize> = BoundedCache::new("test", 0);
        assert_eq!(cache.capacity(), 1);
        cache.insert("a".to_string(), 1);
        cache.insert("b".to_string(), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("b"));
    }

    #[test]
    fn test_clear_keeps_stats() {
        let mut cache: BoundedCache<String, usize> = BoundedCache::new("test", 2);
        cache.insert("a".to_string(), 1);
        let _ = cache.get("a");
        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(cache.stats().hits, 1);
        assert!(cache.get("a").is_none());
    }
}
