//! LRU cache of sentence embeddings keyed by encoder input text.
//!
//! SMS traffic repeats itself (broadcasts, templated OTP notices), so the
//! same cleaned text is often encoded many times within and across runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use ndarray::Array1;
use parking_lot::Mutex;

/// Thread-safe bounded LRU of embeddings.
pub struct EmbeddingCache {
    inner: Mutex<CacheInner>,
    hits: AtomicU64,
    misses: AtomicU64,
}

struct CacheInner {
    entries: HashMap<String, Array1<f32>>,
    /// Least recently used first.
    order: Vec<String>,
    capacity: usize,
}

impl CacheInner {
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            let key = self.order.remove(pos);
            self.order.push(key);
        }
    }
}

impl EmbeddingCache {
    pub const DEFAULT_CAPACITY: usize = 10_000;

    /// A capacity of 0 disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::with_capacity(capacity.min(1024)),
                order: Vec::with_capacity(capacity.min(1024)),
                capacity,
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, text: &str) -> Option<Array1<f32>> {
        let mut inner = self.inner.lock();
        let found = inner.entries.get(text).cloned();
        match found {
            Some(embedding) => {
                inner.touch(text);
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(embedding)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn put(&self, text: String, embedding: Array1<f32>) {
        let mut inner = self.inner.lock();
        if inner.capacity == 0 {
            return;
        }

        if inner.entries.insert(text.clone(), embedding).is_some() {
            inner.touch(&text);
            return;
        }

        inner.order.push(text);
        while inner.entries.len() > inner.capacity && !inner.order.is_empty() {
            let oldest = inner.order.remove(0);
            inner.entries.remove(&oldest);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// (hits, misses) since creation.
    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
    }
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_hit_and_miss() {
        let cache = EmbeddingCache::new(10);
        assert!(cache.get("promo").is_none());

        cache.put("promo".into(), array![1.0, 2.0]);
        assert_eq!(cache.get("promo"), Some(array![1.0, 2.0]));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats(), (1, 1));
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = EmbeddingCache::new(2);
        cache.put("a".into(), array![1.0]);
        cache.put("b".into(), array![2.0]);

        // Touch "a" so "b" becomes the oldest.
        assert!(cache.get("a").is_some());
        cache.put("c".into(), array![3.0]);

        assert_eq!(cache.len(), 2);
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_overwrite_keeps_size() {
        let cache = EmbeddingCache::new(2);
        cache.put("a".into(), array![1.0]);
        cache.put("a".into(), array![5.0]);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a"), Some(array![5.0]));
    }

    #[test]
    fn test_zero_capacity_disables() {
        let cache = EmbeddingCache::new(0);
        cache.put("a".into(), array![1.0]);
        assert!(cache.is_empty());
        cache.clear();
        assert!(cache.get("a").is_none());
    }
}
