use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub default_ttl: Duration,
    /// Interval of the background sweep purging expired entries.
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 256,
            default_ttl: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub approx_bytes: usize,
}

struct CacheRecord {
    value: Value,
    stored_at: Instant,
    ttl: Duration,
    hits: u64,
    last_accessed: Instant,
    approx_bytes: usize,
}

struct State {
    map: HashMap<String, CacheRecord>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// TTL + LRU memoization for idempotent reads. Expiry wins over recency: an
/// entry past its TTL is a miss even if it was just touched.
pub struct ResponseCache {
    config: CacheConfig,
    state: Mutex<State>,
}

impl ResponseCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            state: Mutex::new(State {
                map: HashMap::new(),
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
        }
    }

    /// Canonical key for an operation call: parameter maps are sorted, so the
    /// same logical call always produces the same key.
    pub fn key(operation: &str, params: &Value) -> String {
        format!("{operation}:{params}")
    }

    /// Hit only if present and unexpired; a hit refreshes recency, an
    /// expired-at-read entry is evicted and counted as a miss.
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        let mut state = self.lock();
        enum Lookup {
            Hit(Value),
            Expired,
            Absent,
        }
        let lookup = match state.map.get_mut(key) {
            Some(record) if now < record.stored_at + record.ttl => {
                record.hits += 1;
                record.last_accessed = now;
                Lookup::Hit(record.value.clone())
            }
            Some(_) => Lookup::Expired,
            None => Lookup::Absent,
        };
        match lookup {
            Lookup::Hit(value) => {
                state.hits += 1;
                Some(value)
            }
            Lookup::Expired => {
                state.map.remove(key);
                state.misses += 1;
                state.evictions += 1;
                None
            }
            Lookup::Absent => {
                state.misses += 1;
                None
            }
        }
    }

    /// Store with the given TTL (falling back to the configured default). At
    /// capacity the single least-recently-used entry is evicted first.
    pub fn set(&self, key: &str, value: Value, ttl: Option<Duration>) {
        let now = Instant::now();
        let approx_bytes = value.to_string().len();
        let mut state = self.lock();
        if !state.map.contains_key(key) && state.map.len() >= self.config.max_entries {
            let lru = state
                .map
                .iter()
                .min_by_key(|(_, r)| r.last_accessed)
                .map(|(k, _)| k.clone());
            if let Some(lru) = lru {
                state.map.remove(&lru);
                state.evictions += 1;
            }
        }
        state.map.insert(
            key.to_string(),
            CacheRecord {
                value,
                stored_at: now,
                ttl: ttl.unwrap_or(self.config.default_ttl),
                hits: 0,
                last_accessed: now,
                approx_bytes,
            },
        );
    }

    /// Purge expired entries; returns how many were removed. Runs from the
    /// background sweeper but is callable directly.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut state = self.lock();
        let before = state.map.len();
        state.map.retain(|_, r| now < r.stored_at + r.ttl);
        let removed = before - state.map.len();
        state.evictions += removed as u64;
        if removed > 0 {
            debug!(removed, "cache sweep purged expired entries");
        }
        removed
    }

    /// Spawn the periodic sweep, independent of read traffic. The task runs
    /// until the cache is dropped by everyone else or the handle is aborted.
    pub fn spawn_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let cache = Arc::downgrade(self);
        let interval = self.config.sweep_interval;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let Some(cache) = cache.upgrade() else {
                    return;
                };
                cache.sweep();
            }
        })
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            entries: state.map.len(),
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
            approx_bytes: state.map.values().map(|r| r.approx_bytes).sum(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
