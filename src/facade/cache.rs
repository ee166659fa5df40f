//! Per-façade implementation caches.
//!
//! A cache is shared by every caller of one façade. Its lock covers map
//! updates only: creating an implementation runs outside it, so a slow
//! extension `init` for one key never stalls calls served from another,
//! already cached key. Creators of the same key queue on a per-key guard and
//! the first one to finish serves the rest.

use crate::error::Result;
use crate::observability::FacadeMetrics;
use lru::LruCache;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Eviction policy of a façade's implementation cache.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CachePolicy {
    /// Keep every implementation for the lifetime of the façade.
    #[default]
    Unbounded,
    /// Keep at most this many implementations, evicting the least recently
    /// used one. Evicted implementations are deinitialized once no call is
    /// using them.
    Lru(NonZeroUsize),
}

enum Store<K, V> {
    Unbounded(HashMap<K, V>),
    Lru(LruCache<K, V>),
}

impl<K: Hash + Eq, V: Clone> Store<K, V> {
    fn get(&mut self, key: &K) -> Option<V> {
        match self {
            Store::Unbounded(map) => map.get(key).cloned(),
            Store::Lru(cache) => cache.get(key).cloned(),
        }
    }

    /// Insert `value`, returning whatever left the store: the previous value
    /// for `key` or an evicted entry.
    fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        match self {
            Store::Unbounded(map) => {
                let old = map.remove_entry(&key);
                map.insert(key, value);
                old
            }
            Store::Lru(cache) => cache.push(key, value),
        }
    }

    fn contains(&self, key: &K) -> bool {
        match self {
            Store::Unbounded(map) => map.contains_key(key),
            Store::Lru(cache) => cache.contains(key),
        }
    }

    fn len(&self) -> usize {
        match self {
            Store::Unbounded(map) => map.len(),
            Store::Lru(cache) => cache.len(),
        }
    }
}

struct Entries<K, V> {
    store: Store<K, V>,
    /// Creation guards of keys currently being created.
    pending: HashMap<K, Arc<Mutex<()>>>,
}

/// Map from a resolved key to the implementation serving it.
pub struct ImplementationCache<K: Hash + Eq, V> {
    entries: Mutex<Entries<K, V>>,
    metrics: FacadeMetrics,
}

impl<K: Hash + Eq + Clone + fmt::Debug, V: Clone> ImplementationCache<K, V> {
    /// Create an empty cache for `family`.
    pub fn new(family: &'static str, policy: CachePolicy) -> Self {
        let store = match policy {
            CachePolicy::Unbounded => Store::Unbounded(HashMap::new()),
            CachePolicy::Lru(capacity) => Store::Lru(LruCache::new(capacity)),
        };
        Self {
            entries: Mutex::new(Entries {
                store,
                pending: HashMap::new(),
            }),
            metrics: FacadeMetrics::new(family),
        }
    }

    /// Cached value for `key`, marking it recently used.
    pub fn get(&self, key: &K) -> Option<V> {
        self.lock().store.get(key)
    }

    /// Insert `value` for `key`.
    pub fn insert(&self, key: K, value: V) {
        let displaced = self.lock().store.insert(key.clone(), value);
        self.log_displaced(&key, displaced);
    }

    /// Cached value for `key`, or the result of `create` inserted under it.
    ///
    /// `create` runs without the cache lock held. Concurrent callers for the
    /// same key wait for the first creation instead of creating their own;
    /// callers for other keys are not affected. Failed creations are not
    /// cached, and the next waiter tries again.
    pub fn get_or_try_insert_with(
        &self,
        key: &K,
        create: impl FnOnce() -> Result<V>,
    ) -> Result<V> {
        let guard = {
            let mut entries = self.lock();
            if let Some(found) = entries.store.get(key) {
                self.metrics.record_hit();
                return Ok(found);
            }
            self.metrics.record_miss();
            Arc::clone(entries.pending.entry(key.clone()).or_default())
        };

        let _creating = guard.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(found) = self.get(key) {
            return Ok(found);
        }

        let created = create()?;
        let displaced = {
            let mut entries = self.lock();
            if let Some(current) = entries.pending.get(key) {
                if Arc::ptr_eq(current, &guard) {
                    entries.pending.remove(key);
                }
            }
            entries.store.insert(key.clone(), created.clone())
        };
        // Displaced implementations are dropped here, outside the lock.
        self.log_displaced(key, displaced);
        Ok(created)
    }

    /// Returns true if `key` is cached. Does not touch recency.
    pub fn contains(&self, key: &K) -> bool {
        self.lock().store.contains(key)
    }

    /// Number of cached implementations.
    pub fn len(&self) -> usize {
        self.lock().store.len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached implementation.
    pub fn clear(&self) {
        let store = {
            let mut entries = self.lock();
            let empty = match &entries.store {
                Store::Unbounded(_) => Store::Unbounded(HashMap::new()),
                Store::Lru(cache) => Store::Lru(LruCache::new(cache.cap())),
            };
            entries.pending.clear();
            std::mem::replace(&mut entries.store, empty)
        };
        // Deinitialize outside the lock.
        drop(store);
    }

    fn log_displaced(&self, key: &K, displaced: Option<(K, V)>) {
        if let Some((evicted, _)) = displaced {
            if &evicted != key {
                tracing::debug!(
                    "{} cache evicted implementation for {:?}",
                    self.metrics.family(),
                    evicted
                );
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries<K, V>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K: Hash + Eq, V> fmt::Debug for ImplementationCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let (policy, len) = match &entries.store {
            Store::Unbounded(map) => ("unbounded", map.len()),
            Store::Lru(cache) => ("lru", cache.len()),
        };
        f.debug_struct("ImplementationCache")
            .field("family", &self.metrics.family())
            .field("policy", &policy)
            .field("len", &len)
            .finish()
    }
}
