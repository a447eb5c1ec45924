//! Cache manager.

use super::backend::{DurableStore, NullStore};
use super::entry::{now_ms, CacheEntry, DurableRecord, EntryMetadata};
use super::pattern::KeyPattern;
use super::strategy::{default_strategies, storage_key, CacheStrategy, StrategyRegistry};
use crate::utils::duration_ms;
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    #[serde(rename = "sweep_interval_ms", with = "duration_ms")]
    pub sweep_interval: Duration,
    /// Version tag stamped on every entry written by this process.
    pub version: String,
    pub strategies: Vec<CacheStrategy>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sweep_interval: Duration::from_secs(60),
            version: "1".to_string(),
            strategies: default_strategies(),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
    pub fn with_strategies(mut self, strategies: Vec<CacheStrategy>) -> Self {
        self.strategies = strategies;
        self
    }
    pub fn with_strategy(mut self, strategy: CacheStrategy) -> Self {
        self.strategies.retain(|s| s.name != strategy.name);
        self.strategies.push(strategy);
        self
    }
}

/// Point-in-time copy of the cache counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub sets: u64,
    pub durable_errors: u64,
    pub total_requests: u64,
    /// Running mean over every `get`.
    pub avg_response_time: Duration,
}

impl CacheMetrics {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    sets: AtomicU64,
    durable_errors: AtomicU64,
}

impl AtomicStats {
    fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            sets: AtomicU64::new(0),
            durable_errors: AtomicU64::new(0),
        }
    }
}

#[derive(Default)]
struct ResponseTimer {
    samples: u64,
    mean_micros: f64,
}

impl ResponseTimer {
    fn record(&mut self, elapsed: Duration) {
        self.samples += 1;
        let sample = elapsed.as_secs_f64() * 1_000_000.0;
        self.mean_micros += (sample - self.mean_micros) / self.samples as f64;
    }
}

/// Handle to a best-effort durable-tier write.
///
/// Dropping it detaches the write; awaiting [`Replication::wait`] reports whether it landed.
#[derive(Debug)]
pub struct Replication {
    handle: Option<JoinHandle<bool>>,
}

impl Replication {
    fn skipped() -> Self {
        Self { handle: None }
    }
    pub fn is_scheduled(&self) -> bool {
        self.handle.is_some()
    }
    pub async fn wait(self) -> bool {
        match self.handle {
            Some(h) => h.await.unwrap_or(false),
            None => false,
        }
    }
}

type Partitions = HashMap<String, HashMap<String, CacheEntry>>;

/// Orders durable writes for one storage key. A write whose sequence is below the
/// floor has been superseded by a newer write or an invalidation and is skipped.
struct WriteGate {
    key: String,
    floor: Arc<tokio::sync::Mutex<u64>>,
}

/// Two-tier, strategy-driven cache.
///
/// The fast tier is an in-process map partitioned by strategy; the durable tier is an
/// injected [`DurableStore`] that is consulted on fast-tier misses and written on a
/// best-effort basis.
pub struct CacheManager {
    config: CacheConfig,
    strategies: StrategyRegistry,
    fast: RwLock<Partitions>,
    durable: Arc<dyn DurableStore>,
    stats: Arc<AtomicStats>,
    timer: std::sync::Mutex<ResponseTimer>,
    sequence: AtomicU64,
    /// Bumped by every `invalidate`, under the fast-tier write lock.
    invalidations: AtomicU64,
    gates: std::sync::Mutex<HashMap<String, WriteGate>>,
}

impl CacheManager {
    pub fn new(config: CacheConfig, durable: Arc<dyn DurableStore>) -> Result<Self> {
        let strategies = StrategyRegistry::new(config.strategies.clone())?;
        Ok(Self {
            config,
            strategies,
            fast: RwLock::new(HashMap::new()),
            durable,
            stats: Arc::new(AtomicStats::new()),
            timer: std::sync::Mutex::new(ResponseTimer::default()),
            sequence: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
            gates: std::sync::Mutex::new(HashMap::new()),
        })
    }

    /// Fast tier only.
    pub fn in_memory(config: CacheConfig) -> Result<Self> {
        Self::new(config, Arc::new(NullStore::new()))
    }

    pub fn strategy(&self, name: &str) -> Option<&CacheStrategy> {
        self.strategies.get(name)
    }
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }
    pub fn durable_name(&self) -> &'static str {
        self.durable.name()
    }

    pub async fn get(&self, key: &str, strategy: &str) -> Option<Value> {
        if !self.config.enabled {
            return None;
        }
        let started = Instant::now();
        let found = self.lookup(key, strategy).await;
        if found.is_some() {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
        }
        if let Ok(mut timer) = self.timer.lock() {
            timer.record(started.elapsed());
        }
        found
    }

    async fn lookup(&self, key: &str, strategy: &str) -> Option<Value> {
        let Some(policy) = self.strategies.get(strategy) else {
            warn!(strategy, key, "cache lookup with unknown strategy");
            return None;
        };
        let observed = self.observe();
        let now = now_ms();
        let mut stale = false;
        {
            let fast = self.fast.read().await;
            if let Some(entry) = fast.get(strategy).and_then(|p| p.get(key)) {
                if !entry.is_expired_at(now) {
                    return Some(entry.value.clone());
                }
                stale = true;
            }
        }
        if stale {
            let mut fast = self.fast.write().await;
            if let Some(partition) = fast.get_mut(strategy) {
                if partition.get(key).map(|e| e.is_expired_at(now)).unwrap_or(false) {
                    partition.remove(key);
                }
            }
        }
        self.load_from_durable(key, policy, observed).await
    }

    /// Sequence and invalidation epoch taken before a fast-tier miss.
    fn observe(&self) -> (u64, u64) {
        (
            self.sequence.load(Ordering::SeqCst),
            self.invalidations.load(Ordering::SeqCst),
        )
    }

    /// Read `key` from the durable tier and repopulate the fast tier.
    ///
    /// A `set` that landed while the read was in flight wins over the durable record,
    /// and an `invalidate` that ran meanwhile turns the read into a miss.
    async fn load_from_durable(
        &self,
        key: &str,
        policy: &CacheStrategy,
        (observed_seq, observed_epoch): (u64, u64),
    ) -> Option<Value> {
        let skey = storage_key(&policy.name, key);
        let bytes = match self.durable.get(&skey).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                self.stats.durable_errors.fetch_add(1, Ordering::Relaxed);
                warn!(store = self.durable.name(), key = %skey, error = %e, "durable cache read failed");
                return None;
            }
        };
        let record: DurableRecord = match serde_json::from_slice(&bytes) {
            Ok(r) => r,
            Err(e) => {
                self.stats.durable_errors.fetch_add(1, Ordering::Relaxed);
                warn!(key = %skey, error = %e, "undecodable durable cache record");
                return None;
            }
        };
        if record.is_expired_at(now_ms()) {
            return None;
        }
        let mut fast = self.fast.write().await;
        if self.invalidations.load(Ordering::SeqCst) != observed_epoch {
            debug!(key = %skey, "durable read raced an invalidation, treated as miss");
            return None;
        }
        let partition = fast.entry(policy.name.clone()).or_default();
        if let Some(current) = partition.get(key) {
            if current.sequence >= observed_seq && !current.is_expired_at(now_ms()) {
                return Some(current.value.clone());
            }
        }
        let entry = record.into_entry(key, &policy.name, self.next_sequence());
        let value = entry.value.clone();
        partition.insert(key.to_string(), entry);
        self.enforce_bound(partition, policy);
        debug!(key = %skey, "fast tier repopulated from durable tier");
        Some(value)
    }

    pub async fn set(
        &self,
        key: &str,
        value: Value,
        strategy: &str,
        metadata: Option<EntryMetadata>,
    ) -> Replication {
        if !self.config.enabled {
            return Replication::skipped();
        }
        let Some(policy) = self.strategies.get(strategy) else {
            warn!(strategy, key, "cache write with unknown strategy ignored");
            return Replication::skipped();
        };
        let skey = storage_key(&policy.name, key);
        let (record, sequence, gate) = {
            let mut fast = self.fast.write().await;
            // Sequenced under the lock so `invalidate` sees every earlier write's gate.
            let entry = CacheEntry {
                key: key.to_string(),
                strategy: policy.name.clone(),
                value,
                created_at_ms: now_ms(),
                ttl: policy.ttl,
                version: self.config.version.clone(),
                metadata,
                sequence: self.next_sequence(),
            };
            let record = entry.to_record();
            let sequence = entry.sequence;
            let partition = fast.entry(policy.name.clone()).or_default();
            partition.insert(key.to_string(), entry);
            self.enforce_bound(partition, policy);
            (record, sequence, self.gate(&skey, key))
        };
        self.stats.sets.fetch_add(1, Ordering::Relaxed);
        self.replicate(skey, record, policy.ttl, sequence, gate)
    }

    fn gate(&self, skey: &str, key: &str) -> Arc<tokio::sync::Mutex<u64>> {
        let mut gates = match self.gates.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        let gate = gates.entry(skey.to_string()).or_insert_with(|| WriteGate {
            key: key.to_string(),
            floor: Arc::new(tokio::sync::Mutex::new(0)),
        });
        Arc::clone(&gate.floor)
    }

    fn replicate(
        &self,
        skey: String,
        record: DurableRecord,
        ttl: Duration,
        sequence: u64,
        gate: Arc<tokio::sync::Mutex<u64>>,
    ) -> Replication {
        let bytes = match serde_json::to_vec(&record) {
            Ok(b) => b,
            Err(e) => {
                self.stats.durable_errors.fetch_add(1, Ordering::Relaxed);
                warn!(key = %skey, error = %e, "cache record not serializable, durable write skipped");
                return Replication::skipped();
            }
        };
        let durable = Arc::clone(&self.durable);
        let stats = Arc::clone(&self.stats);
        let handle = tokio::spawn(async move {
            let mut floor = gate.lock().await;
            if sequence < *floor {
                debug!(key = %skey, sequence, "superseded durable cache write skipped");
                return false;
            }
            *floor = sequence + 1;
            match durable.set(&skey, &bytes, ttl).await {
                Ok(()) => true,
                Err(e) => {
                    stats.durable_errors.fetch_add(1, Ordering::Relaxed);
                    warn!(store = durable.name(), key = %skey, error = %e, "durable cache write failed");
                    false
                }
            }
        });
        Replication {
            handle: Some(handle),
        }
    }

    /// Remove oldest entries (creation time, then insertion order) until within `max_size`.
    fn enforce_bound(&self, partition: &mut HashMap<String, CacheEntry>, policy: &CacheStrategy) {
        let excess = partition.len().saturating_sub(policy.max_size);
        if excess == 0 {
            return;
        }
        let mut order: Vec<(u64, u64, String)> = partition
            .values()
            .map(|e| (e.created_at_ms, e.sequence, e.key.clone()))
            .collect();
        order.sort_unstable();
        for (_, _, key) in order.into_iter().take(excess) {
            partition.remove(&key);
        }
        self.stats
            .evictions
            .fetch_add(excess as u64, Ordering::Relaxed);
        debug!(strategy = %policy.name, evicted = excess, "cache size bound enforced");
    }

    /// Remove matching keys from both tiers; returns the number of distinct keys removed.
    pub async fn invalidate(&self, pattern: &KeyPattern) -> usize {
        let mut removed: HashSet<String> = HashSet::new();
        let (barrier, gates) = {
            let mut fast = self.fast.write().await;
            self.invalidations.fetch_add(1, Ordering::SeqCst);
            let barrier = self.sequence.load(Ordering::SeqCst);
            for (strategy, partition) in fast.iter_mut() {
                partition.retain(|key, _| {
                    if pattern.matches(key) {
                        removed.insert(storage_key(strategy, key));
                        false
                    } else {
                        true
                    }
                });
            }
            (barrier, self.matching_gates(pattern))
        };
        // Pending writes sequenced before the barrier must not land after the delete.
        let mut held = Vec::with_capacity(gates.len());
        for gate in &gates {
            let mut floor = gate.lock().await;
            *floor = (*floor).max(barrier);
            held.push(floor);
        }
        match self.durable.delete_matching(pattern).await {
            Ok(keys) => removed.extend(keys),
            Err(e) => {
                self.stats.durable_errors.fetch_add(1, Ordering::Relaxed);
                warn!(store = self.durable.name(), error = %e, "durable cache invalidation failed");
            }
        }
        drop(held);
        debug!(removed = removed.len(), "cache invalidated");
        removed.len()
    }

    /// Gates of matching keys, sorted by storage key so concurrent invalidations lock in
    /// the same order.
    fn matching_gates(&self, pattern: &KeyPattern) -> Vec<Arc<tokio::sync::Mutex<u64>>> {
        let gates = match self.gates.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut matching: Vec<(&String, &WriteGate)> = gates
            .iter()
            .filter(|(_, gate)| pattern.matches(&gate.key))
            .collect();
        matching.sort_by(|a, b| a.0.cmp(b.0));
        matching
            .into_iter()
            .map(|(_, gate)| Arc::clone(&gate.floor))
            .collect()
    }

    /// Drop gates no pending write holds.
    fn prune_gates(&self) {
        let mut gates = match self.gates.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        gates.retain(|_, gate| Arc::strong_count(&gate.floor) > 1);
    }

    /// Preload keys from the durable tier; returns how many were loaded.
    pub async fn warm_up(&self, keys: &[&str], strategy: &str) -> usize {
        if !self.config.enabled {
            return 0;
        }
        let Some(policy) = self.strategies.get(strategy) else {
            warn!(strategy, "cache warm-up with unknown strategy ignored");
            return 0;
        };
        let mut loaded = 0;
        for key in keys {
            let observed = self.observe();
            if self.contains(key, strategy).await {
                continue;
            }
            if self.load_from_durable(key, policy, observed).await.is_some() {
                loaded += 1;
            }
        }
        debug!(strategy, requested = keys.len(), loaded, "cache warm-up finished");
        loaded
    }

    /// Drop every fast-tier entry whose age has reached its ttl.
    pub async fn sweep_expired(&self) -> usize {
        let now = now_ms();
        let mut fast = self.fast.write().await;
        let mut removed = 0;
        for partition in fast.values_mut() {
            let before = partition.len();
            partition.retain(|_, e| !e.is_expired_at(now));
            removed += before - partition.len();
        }
        drop(fast);
        self.prune_gates();
        if removed > 0 {
            debug!(removed, "expired cache entries swept");
        }
        removed
    }

    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        cache.sweep_expired().await;
                    }
                }
            }
            debug!("cache sweeper stopped");
        })
    }

    pub async fn contains(&self, key: &str, strategy: &str) -> bool {
        let now = now_ms();
        self.fast
            .read()
            .await
            .get(strategy)
            .and_then(|p| p.get(key))
            .map(|e| !e.is_expired_at(now))
            .unwrap_or(false)
    }

    /// Number of fast-tier entries, expired or not.
    pub async fn len(&self) -> usize {
        self.fast.read().await.values().map(HashMap::len).sum()
    }

    pub async fn len_for(&self, strategy: &str) -> usize {
        self.fast
            .read()
            .await
            .get(strategy)
            .map(HashMap::len)
            .unwrap_or(0)
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Clear the fast tier. The durable tier is left untouched.
    pub async fn clear(&self) {
        self.fast.write().await.clear();
    }

    pub fn metrics(&self) -> CacheMetrics {
        let hits = self.stats.hits.load(Ordering::Relaxed);
        let misses = self.stats.misses.load(Ordering::Relaxed);
        let avg_micros = self.timer.lock().map(|t| t.mean_micros).unwrap_or(0.0);
        CacheMetrics {
            hits,
            misses,
            evictions: self.stats.evictions.load(Ordering::Relaxed),
            sets: self.stats.sets.load(Ordering::Relaxed),
            durable_errors: self.stats.durable_errors.load(Ordering::Relaxed),
            total_requests: hits + misses,
            avg_response_time: Duration::from_secs_f64(avg_micros.max(0.0) / 1_000_000.0),
        }
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }
}
