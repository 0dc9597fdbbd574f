// pii-mask-core/src/cache/mod.rs
//! Content-addressed response cache with single-flight computation.
//!
//! A [`ResponseCache`] maps the digest of normalized input text to the
//! [`MaskedResult`] computed for it. Entries live for an absolute TTL counted
//! from insertion and are never refreshed; above capacity the least recently
//! used entry is evicted after expired ones have been purged.
//!
//! Concurrent misses for the same key share one computation. The computation
//! runs in its own task, so a caller that gives up waiting does not cancel it
//! for the others. Failed computations are not cached and every waiter gets
//! the same error.
//!
//! The state lock is a `std::sync::Mutex` that is never held across an
//! `.await`.
//!
//! License: MIT OR APACHE 2.0

pub mod backend;
pub mod key;

pub use backend::{decode_result, encode_result, CacheBackend, InMemoryBackend};
pub use key::{is_valid_cache_key, CacheKey, KEY_PREFIX};

use log::{debug, warn};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};

use crate::config::CacheConfig;
use crate::errors::MaskError;
use crate::result::MaskedResult;

/// Result of a computation as seen by its waiters: the value and whether it
/// was served by the backend tier.
type Outcome = Option<Result<(MaskedResult, bool), MaskError>>;

/// Counters since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Computations actually started; at most one per key at a time.
    pub computations: u64,
    /// Callers that joined a computation started by someone else.
    pub shared: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub backend_hits: u64,
    pub backend_errors: u64,
}

#[derive(Debug)]
struct Entry {
    value: MaskedResult,
    expires_at: Instant,
    tick: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<CacheKey, Entry>,
    /// Last-use tick to key; the first element is the LRU entry.
    recency: BTreeMap<u64, CacheKey>,
    tick: u64,
    in_flight: HashMap<CacheKey, watch::Receiver<Outcome>>,
    stats: CacheStats,
}

impl CacheState {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn remove(&mut self, key: &CacheKey) -> Option<Entry> {
        let entry = self.entries.remove(key)?;
        self.recency.remove(&entry.tick);
        Some(entry)
    }

    /// Returns a live entry, touching its recency. Drops it if expired.
    fn lookup(&mut self, key: &CacheKey, now: Instant) -> Option<MaskedResult> {
        let expired = self.entries.get(key)?.expires_at <= now;
        if expired {
            self.remove(key);
            self.stats.expirations += 1;
            return None;
        }
        let tick = self.next_tick();
        let entry = self.entries.get_mut(key)?;
        self.recency.remove(&entry.tick);
        entry.tick = tick;
        self.recency.insert(tick, *key);
        Some(entry.value.clone())
    }

    fn purge_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.expires_at <= now)
            .map(|(key, _)| *key)
            .collect();
        for key in &expired {
            self.remove(key);
        }
        self.stats.expirations += expired.len() as u64;
        expired.len()
    }

    fn insert(&mut self, key: CacheKey, value: MaskedResult, ttl: Duration, capacity: usize) {
        let now = Instant::now();
        self.remove(&key);
        if self.entries.len() >= capacity {
            self.purge_expired(now);
        }
        while self.entries.len() >= capacity {
            let Some((_, oldest)) = self.recency.pop_first() else {
                break;
            };
            self.entries.remove(&oldest);
            self.stats.evictions += 1;
            debug!("Evicted least recently used cache entry {}.", oldest);
        }
        let tick = self.next_tick();
        self.recency.insert(tick, key);
        self.entries.insert(
            key,
            Entry {
                value: value.with_cached(false),
                expires_at: now + ttl,
                tick,
            },
        );
    }
}

struct CacheInner {
    ttl: Duration,
    capacity: usize,
    state: Mutex<CacheState>,
    backend: Option<Arc<dyn CacheBackend>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl CacheInner {
    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stop_sweeper(&self) {
        let handle = self.sweeper.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

impl Drop for CacheInner {
    fn drop(&mut self) {
        self.stop_sweeper();
    }
}

/// Cloneable handle to a shared cache.
#[derive(Clone)]
pub struct ResponseCache {
    inner: Arc<CacheInner>,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("ttl", &self.inner.ttl)
            .field("capacity", &self.inner.capacity)
            .field("len", &self.len())
            .field("has_backend", &self.inner.backend.is_some())
            .finish()
    }
}

impl ResponseCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self::build(config, None)
    }

    pub fn with_backend(config: &CacheConfig, backend: Arc<dyn CacheBackend>) -> Self {
        Self::build(config, Some(backend))
    }

    fn build(config: &CacheConfig, backend: Option<Arc<dyn CacheBackend>>) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                ttl: config.ttl(),
                capacity: config.capacity.max(1),
                state: Mutex::new(CacheState::default()),
                backend,
                sweeper: Mutex::new(None),
            }),
        }
    }

    /// Returns the cached value for `key`, or runs `compute` once for all
    /// concurrent callers and caches a successful result.
    ///
    /// The flag is true only when this caller was served from a cache tier.
    /// Callers that waited on someone else's computation get `false`.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: CacheKey,
        compute: F,
    ) -> Result<(MaskedResult, bool), MaskError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<MaskedResult, MaskError>> + Send + 'static,
    {
        let (mut rx, leader) = {
            let mut state = self.inner.state();
            if let Some(value) = state.lookup(&key, Instant::now()) {
                state.stats.hits += 1;
                debug!("Cache hit for {}.", key);
                return Ok((value.with_cached(true), true));
            }
            let existing = state.in_flight.get(&key).cloned();
            match existing {
                Some(rx) => {
                    state.stats.shared += 1;
                    debug!("Joining in-flight computation for {}.", key);
                    (rx, false)
                }
                None => {
                    let (tx, rx) = watch::channel(None);
                    state.in_flight.insert(key, rx.clone());
                    state.stats.misses += 1;
                    state.stats.computations += 1;
                    drop(state);
                    self.spawn_computation(key, tx, compute());
                    (rx, true)
                }
            }
        };

        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => None,
        };
        match outcome {
            Some(Ok((value, from_backend))) => {
                let hit = leader && from_backend;
                Ok((value.with_cached(hit), hit))
            }
            Some(Err(e)) => Err(e),
            None => Err(MaskError::Internal(
                "cache computation ended without a result".to_string(),
            )),
        }
    }

    fn spawn_computation<Fut>(&self, key: CacheKey, tx: watch::Sender<Outcome>, computation: Fut)
    where
        Fut: Future<Output = Result<MaskedResult, MaskError>> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let mut guard = InFlightGuard {
                inner: Arc::clone(&inner),
                key,
                tx: Some(tx),
            };

            if let Some(value) = backend_lookup(&inner, &key).await {
                guard.complete(Ok((value, true)));
                return;
            }

            let result = computation.await;
            if let Ok(value) = &result {
                backend_store(&inner, &key, value).await;
            }
            guard.complete(result.map(|value| (value, false)));
        });
    }

    /// Peeks at a live entry without touching recency or counters.
    pub fn get(&self, key: &CacheKey) -> Option<MaskedResult> {
        let state = self.inner.state();
        state
            .entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone())
    }

    pub fn insert(&self, key: CacheKey, value: MaskedResult) {
        self.inner
            .state()
            .insert(key, value, self.inner.ttl, self.inner.capacity);
    }

    pub fn len(&self) -> usize {
        self.inner.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.state().stats
    }

    pub fn clear(&self) {
        let mut state = self.inner.state();
        state.entries.clear();
        state.recency.clear();
    }

    /// Removes every expired entry and returns how many were dropped.
    pub fn clear_expired(&self) -> usize {
        self.inner.state().purge_expired(Instant::now())
    }

    /// Starts a background task that purges expired entries every `period`.
    /// The task stops by itself once the last handle is dropped.
    pub fn start_sweeper(&self, period: Duration) {
        let weak: Weak<CacheInner> = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let removed = inner.state().purge_expired(Instant::now());
                if removed > 0 {
                    debug!("Cache sweep removed {} expired entries.", removed);
                }
            }
        });

        let previous = self
            .inner
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Stops the sweeper and drops every entry.
    pub fn shutdown(&self) {
        self.inner.stop_sweeper();
        self.clear();
        debug!("Response cache shut down.");
    }
}

/// Publishes the outcome of a computation and releases its in-flight slot.
/// If the computation panics, waiters receive an internal error instead.
struct InFlightGuard {
    inner: Arc<CacheInner>,
    key: CacheKey,
    tx: Option<watch::Sender<Outcome>>,
}

impl InFlightGuard {
    fn complete(&mut self, result: Result<(MaskedResult, bool), MaskError>) {
        let Some(tx) = self.tx.take() else {
            return;
        };
        {
            let mut state = self.inner.state();
            if let Ok((value, _)) = &result {
                state.insert(self.key, value.clone(), self.inner.ttl, self.inner.capacity);
            }
            state.in_flight.remove(&self.key);
        }
        // No receivers left is fine: the value is already in the cache.
        let _ = tx.send(Some(result));
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.tx.is_some() {
            warn!("Cache computation for {} did not finish.", self.key);
            self.complete(Err(MaskError::Internal(
                "cache computation aborted".to_string(),
            )));
        }
    }
}

async fn backend_lookup(inner: &CacheInner, key: &CacheKey) -> Option<MaskedResult> {
    let backend = inner.backend.as_ref()?;
    let bytes = match backend.get(&key.backend_key()).await {
        Ok(bytes) => bytes?,
        Err(e) => {
            warn!("{}; computing directly.", e);
            inner.state().stats.backend_errors += 1;
            return None;
        }
    };
    match decode_result(&bytes) {
        Ok(value) => {
            inner.state().stats.backend_hits += 1;
            Some(value)
        }
        Err(e) => {
            warn!("{}; treating as a miss.", e);
            inner.state().stats.backend_errors += 1;
            None
        }
    }
}

async fn backend_store(inner: &CacheInner, key: &CacheKey, value: &MaskedResult) {
    let Some(backend) = inner.backend.as_ref() else {
        return;
    };
    let stored = match encode_result(&value.clone().with_cached(false)) {
        Ok(bytes) => backend.set(&key.backend_key(), bytes, inner.ttl).await,
        Err(e) => Err(e),
    };
    if let Err(e) = stored {
        warn!("{}; result not stored in the backend.", e);
        inner.state().stats.backend_errors += 1;
    }
}
