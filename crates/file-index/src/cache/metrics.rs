//! Cache counters, latency samples and anomaly detection.

use std::collections::VecDeque;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Latency samples kept for averages and anomaly detection.
pub const LATENCY_WINDOW: usize = 1000;

/// Anomaly detection stays quiet until this many samples exist.
pub const MIN_ANOMALY_SAMPLES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheOperation {
    Get,
    Set,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LatencySample {
    operation: CacheOperation,
    latency: Duration,
}

/// A sample much slower than the window average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheAnomaly {
    pub operation: CacheOperation,
    pub latency_micros: u64,
    pub average_micros: f64,
}

/// Point-in-time view of the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub size: usize,
    pub capacity: usize,
    pub memory_bytes: usize,
    pub hit_rate: f64,
    pub average_response_micros: f64,
    pub total_requests: u64,
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub anomalies: Vec<CacheAnomaly>,
}

#[derive(Debug, Clone, Default)]
pub struct CacheMetrics {
    pub total_requests: u64,
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub evictions: u64,
    pub expirations: u64,
    samples: VecDeque<LatencySample>,
}

impl CacheMetrics {
    pub fn record(&mut self, operation: CacheOperation, latency: Duration) {
        self.total_requests += 1;
        match operation {
            CacheOperation::Get => {}
            CacheOperation::Set => self.sets += 1,
            CacheOperation::Delete => self.deletes += 1,
        }
        if self.samples.len() == LATENCY_WINDOW {
            self.samples.pop_front();
        }
        self.samples.push_back(LatencySample { operation, latency });
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    /// Hits over lookups, 0 before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn average_response_micros(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let total: f64 = self
            .samples
            .iter()
            .map(|sample| sample.latency.as_secs_f64() * 1_000_000.0)
            .sum();
        total / self.samples.len() as f64
    }

    /// Samples slower than `factor` times the window average.
    pub fn detect_anomalies(&self, factor: f64) -> Vec<CacheAnomaly> {
        if self.samples.len() < MIN_ANOMALY_SAMPLES {
            return Vec::new();
        }
        let average = self.average_response_micros();
        let limit = average * factor;
        self.samples
            .iter()
            .filter_map(|sample| {
                let micros = sample.latency.as_secs_f64() * 1_000_000.0;
                (micros > limit).then(|| CacheAnomaly {
                    operation: sample.operation,
                    latency_micros: sample.latency.as_micros() as u64,
                    average_micros: average,
                })
            })
            .collect()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
