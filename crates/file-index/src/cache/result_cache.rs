//! Bounded TTL cache with bulk eviction and latency metrics.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fnv::FnvHashMap;
use parking_lot::Mutex;

use super::footprint::MemoryFootprint;
use super::metrics::{CacheAnomaly, CacheMetrics, CacheOperation, PerformanceReport};
use crate::config::{CacheConfig, EvictionPolicy};
use crate::error::CacheError;

/// Receives rejected writes.
pub type CacheErrorCallback = Arc<dyn Fn(&CacheError) + Send + Sync>;

#[derive(Debug)]
struct CacheSlot<V> {
    value: V,
    expires_at: Instant,
    inserted_seq: u64,
    accessed_seq: u64,
    bytes: usize,
}

impl<V> CacheSlot<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

#[derive(Debug)]
struct CacheInner<K, V> {
    slots: FnvHashMap<K, CacheSlot<V>>,
    seq: u64,
    /// Bumped by `clear`; writes tagged with an older generation are dropped.
    generation: u64,
    metrics: CacheMetrics,
    config: CacheConfig,
}

impl<K: Eq + Hash + Clone, V> CacheInner<K, V> {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn purge_expired(&mut self, now: Instant) -> usize {
        let before = self.slots.len();
        self.slots.retain(|_, slot| !slot.is_expired(now));
        let removed = before - self.slots.len();
        self.metrics.expirations += removed as u64;
        removed
    }

    /// Makes room for one new key.
    fn evict_for_insert(&mut self, now: Instant) {
        if self.slots.len() < self.config.max_size {
            return;
        }
        self.purge_expired(now);
        if self.slots.len() < self.config.max_size {
            return;
        }
        let count = ((self.config.cleanup_threshold * self.slots.len() as f64).ceil() as usize)
            .max(1)
            .min(self.slots.len());
        self.evict(count);
    }

    fn evict(&mut self, count: usize) {
        let policy = self.config.eviction_policy;
        let mut order: Vec<(u64, K)> = self
            .slots
            .iter()
            .map(|(key, slot)| {
                let rank = match policy {
                    EvictionPolicy::InsertionOrder => slot.inserted_seq,
                    EvictionPolicy::LeastRecentlyUsed => slot.accessed_seq,
                };
                (rank, key.clone())
            })
            .collect();
        order.sort_unstable_by_key(|(rank, _)| *rank);
        let mut evicted = 0usize;
        for (_, key) in order.into_iter().take(count) {
            if self.slots.remove(&key).is_some() {
                evicted += 1;
            }
        }
        self.metrics.evictions += evicted as u64;
        log::debug!("result cache evicted count={} policy={:?}", evicted, policy);
    }

    fn memory_bytes(&self) -> usize {
        self.slots.values().map(|slot| slot.bytes).sum()
    }
}

/// Keyed cache of search results.
///
/// Every operation takes one short lock; values are cloned out so callers
/// never hold the lock.
pub struct ResultCache<K, V> {
    inner: Mutex<CacheInner<K, V>>,
    on_error: Option<CacheErrorCallback>,
}

impl<K, V> fmt::Debug for ResultCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ResultCache")
            .field("len", &inner.slots.len())
            .field("config", &inner.config)
            .field("on_error", &self.on_error.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl<K, V> ResultCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + MemoryFootprint,
{
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                slots: FnvHashMap::default(),
                seq: 0,
                generation: 0,
                metrics: CacheMetrics::default(),
                config,
            }),
            on_error: None,
        }
    }

    pub fn with_error_callback(mut self, callback: CacheErrorCallback) -> Self {
        self.on_error = Some(callback);
        self
    }

    /// Returns a clone of the live value for `key`.
    ///
    /// An expired value counts as a miss and is dropped.
    pub fn get(&self, key: &K) -> Option<V> {
        let started = Instant::now();
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let seq = inner.next_seq();

        if inner
            .slots
            .get(key)
            .is_some_and(|slot| slot.is_expired(started))
        {
            inner.slots.remove(key);
            inner.metrics.expirations += 1;
        }
        let value = inner.slots.get_mut(key).map(|slot| {
            slot.accessed_seq = seq;
            slot.value.clone()
        });

        if value.is_some() {
            inner.metrics.record_hit();
        } else {
            inner.metrics.record_miss();
        }
        inner.metrics.record(CacheOperation::Get, started.elapsed());
        value
    }

    /// Stores `value` with the configured TTL.
    pub fn set(&self, key: K, value: V) -> bool {
        let ttl = self.inner.lock().config.ttl();
        self.set_with_ttl(key, value, ttl)
    }

    /// Stores `value` for `ttl`. Invalid writes are reported, not stored.
    pub fn set_with_ttl(&self, key: K, value: V, ttl: Duration) -> bool {
        self.store(key, value, ttl, None)
    }

    /// Current clear generation. Pass it to `set_if_current` to store a value
    /// computed from state that a later `clear` may have invalidated.
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// Stores `value` with the configured TTL unless `clear` ran since
    /// `generation` was read.
    pub fn set_if_current(&self, key: K, value: V, generation: u64) -> bool {
        let ttl = self.inner.lock().config.ttl();
        self.store(key, value, ttl, Some(generation))
    }

    fn store(&self, key: K, value: V, ttl: Duration, generation: Option<u64>) -> bool {
        let started = Instant::now();
        if ttl.is_zero() {
            self.report(CacheError::ZeroTtl);
            return false;
        }
        let bytes = value.footprint_bytes();
        let mut inner = self.inner.lock();
        if generation.is_some_and(|generation| generation != inner.generation) {
            log::debug!("result cache dropped write from a cleared generation");
            return false;
        }
        let limit = inner.config.max_entry_bytes;
        if bytes > limit {
            drop(inner);
            self.report(CacheError::EntryTooLarge { bytes, limit });
            return false;
        }

        if !inner.slots.contains_key(&key) {
            inner.evict_for_insert(started);
        }
        let seq = inner.next_seq();
        let inserted_seq = inner
            .slots
            .get(&key)
            .map_or(seq, |existing| existing.inserted_seq);
        inner.slots.insert(
            key,
            CacheSlot {
                value,
                expires_at: started + ttl,
                inserted_seq,
                accessed_seq: seq,
                bytes,
            },
        );
        inner.metrics.record(CacheOperation::Set, started.elapsed());
        true
    }

    pub fn delete(&self, key: &K) -> bool {
        let started = Instant::now();
        let mut inner = self.inner.lock();
        let removed = inner.slots.remove(key).is_some();
        inner.metrics.record(CacheOperation::Delete, started.elapsed());
        removed
    }

    /// Drops every value; metrics are kept.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.slots.clear();
        inner.generation += 1;
    }

    /// Drops expired values and returns how many were removed.
    pub fn cleanup(&self) -> usize {
        self.inner.lock().purge_expired(Instant::now())
    }

    /// Inserts a batch of values, returning how many were stored.
    pub fn warm_up(&self, entries: impl IntoIterator<Item = (K, V)>) -> usize {
        entries
            .into_iter()
            .map(|(key, value)| self.set(key, value))
            .filter(|stored| *stored)
            .count()
    }

    /// Applies new limits; shrinking capacity evicts down to the new size.
    pub fn reconfigure(&self, config: CacheConfig) {
        let mut inner = self.inner.lock();
        inner.config = config;
        let excess = inner.slots.len().saturating_sub(inner.config.max_size);
        if excess > 0 {
            inner.evict(excess);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &K) -> bool {
        let inner = self.inner.lock();
        inner
            .slots
            .get(key)
            .is_some_and(|slot| !slot.is_expired(Instant::now()))
    }

    pub fn metrics(&self) -> CacheMetrics {
        self.inner.lock().metrics.clone()
    }

    pub fn hit_rate(&self) -> f64 {
        self.inner.lock().metrics.hit_rate()
    }

    pub fn reset_metrics(&self) {
        self.inner.lock().metrics.reset();
    }

    pub fn detect_anomalies(&self) -> Vec<CacheAnomaly> {
        let inner = self.inner.lock();
        inner.metrics.detect_anomalies(inner.config.anomaly_factor)
    }

    pub fn generate_performance_report(&self) -> PerformanceReport {
        let inner = self.inner.lock();
        let metrics = &inner.metrics;
        PerformanceReport {
            size: inner.slots.len(),
            capacity: inner.config.max_size,
            memory_bytes: inner.memory_bytes(),
            hit_rate: metrics.hit_rate(),
            average_response_micros: metrics.average_response_micros(),
            total_requests: metrics.total_requests,
            hits: metrics.hits,
            misses: metrics.misses,
            sets: metrics.sets,
            deletes: metrics.deletes,
            evictions: metrics.evictions,
            expirations: metrics.expirations,
            anomalies: metrics.detect_anomalies(inner.config.anomaly_factor),
        }
    }

    fn report(&self, error: CacheError) {
        log::debug!("result cache rejected write: {}", error);
        if let Some(callback) = &self.on_error {
            callback(&error);
        }
    }
}
