//! Keyed async query cache with request de-duplication.
//!
//! DESIGN
//! ======
//! Each key holds either a settled value (with the instant it was fetched) or
//! an in-flight fetch wrapped in `futures::future::Shared`, so concurrent
//! readers await one request. Every slot carries a generation number; a fetch
//! only writes its result back if its slot has not been replaced by `set` or
//! removed by `invalidate` in the meantime.
//!
//! TRADE-OFFS
//! ==========
//! Failures are never cached: the next read after an error fetches again.
//! The slot map sits behind a `std::sync::Mutex` that is never held across an
//! `.await`.

#[cfg(test)]
#[path = "cache_test.rs"]
mod cache_test;

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

type SharedFetch<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

enum Slot<V, E> {
    Ready { value: V, fetched_at: Instant, generation: u64 },
    Loading { fetch: SharedFetch<V, E>, generation: u64 },
}

impl<V, E> Slot<V, E> {
    fn generation(&self) -> u64 {
        match self {
            Self::Ready { generation, .. } | Self::Loading { generation, .. } => *generation,
        }
    }
}

struct CacheInner<K, V, E> {
    slots: HashMap<K, Slot<V, E>>,
    next_generation: u64,
}

impl<K, V, E> CacheInner<K, V, E> {
    fn bump(&mut self) -> u64 {
        self.next_generation = self.next_generation.wrapping_add(1);
        self.next_generation
    }
}

pub struct QueryCache<K, V, E> {
    inner: Mutex<CacheInner<K, V, E>>,
    stale_after: Duration,
}

impl<K, V, E> QueryCache<K, V, E>
where
    K: Eq + Hash + Clone,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create a cache whose values stay fresh for `stale_after`.
    #[must_use]
    pub fn new(stale_after: Duration) -> Self {
        Self {
            inner: Mutex::new(CacheInner { slots: HashMap::new(), next_generation: 0 }),
            stale_after,
        }
    }

    #[must_use]
    pub fn stale_after(&self) -> Duration {
        self.stale_after
    }

    /// Return the fresh value for `key`, join its in-flight fetch, or start a
    /// new fetch with `fetcher`.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; every caller sharing the fetch sees the same one.
    pub async fn fetch<F, Fut>(&self, key: K, fetcher: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        self.fetch_at(key, Instant::now(), fetcher).await
    }

    /// [`QueryCache::fetch`] with an explicit clock reading.
    ///
    /// # Errors
    ///
    /// Same as [`QueryCache::fetch`].
    pub async fn fetch_at<F, Fut>(&self, key: K, now: Instant, fetcher: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let (fetch, generation) = {
            let mut inner = self.lock();
            match inner.slots.get(&key) {
                Some(Slot::Ready { value, fetched_at, .. }) if self.is_fresh_since(*fetched_at, now) => {
                    return Ok(value.clone());
                }
                Some(Slot::Loading { fetch, generation }) => (fetch.clone(), *generation),
                _ => {
                    let generation = inner.bump();
                    let fetch = fetcher().boxed().shared();
                    inner
                        .slots
                        .insert(key.clone(), Slot::Loading { fetch: fetch.clone(), generation });
                    (fetch, generation)
                }
            }
        };

        let result = fetch.await;
        self.settle(&key, generation, &result, now);
        result
    }

    /// Store a known-fresh value, superseding any in-flight fetch.
    pub fn set(&self, key: K, value: V) {
        self.set_at(key, value, Instant::now());
    }

    pub fn set_at(&self, key: K, value: V, now: Instant) {
        let mut inner = self.lock();
        let generation = inner.bump();
        inner
            .slots
            .insert(key, Slot::Ready { value, fetched_at: now, generation });
    }

    /// Remove the entry so the next read fetches. An in-flight fetch keeps
    /// running for its current waiters but its result is not stored.
    pub fn invalidate(&self, key: &K) {
        self.lock().slots.remove(key);
    }

    /// Drop a settled value but leave an in-flight fetch alone, so a forced
    /// refresh joins a request that is already running.
    pub fn mark_stale(&self, key: &K) {
        let mut inner = self.lock();
        if matches!(inner.slots.get(key), Some(Slot::Ready { .. })) {
            inner.slots.remove(key);
        }
    }

    /// The settled value for `key`, fresh or not.
    #[must_use]
    pub fn peek(&self, key: &K) -> Option<V> {
        match self.lock().slots.get(key) {
            Some(Slot::Ready { value, .. }) => Some(value.clone()),
            Some(Slot::Loading { .. }) | None => None,
        }
    }

    #[must_use]
    pub fn is_fresh(&self, key: &K) -> bool {
        self.is_fresh_at(key, Instant::now())
    }

    #[must_use]
    pub fn is_fresh_at(&self, key: &K, now: Instant) -> bool {
        match self.lock().slots.get(key) {
            Some(Slot::Ready { fetched_at, .. }) => self.is_fresh_since(*fetched_at, now),
            Some(Slot::Loading { .. }) | None => false,
        }
    }

    /// Whether a fetch for `key` is currently running.
    #[must_use]
    pub fn is_fetching(&self, key: &K) -> bool {
        matches!(self.lock().slots.get(key), Some(Slot::Loading { .. }))
    }

    fn settle(&self, key: &K, generation: u64, result: &Result<V, E>, fetched_at: Instant) {
        let mut inner = self.lock();
        let current = inner.slots.get(key);
        if current.is_none_or(|slot| slot.generation() != generation) {
            return;
        }
        if !matches!(current, Some(Slot::Loading { .. })) {
            return;
        }
        match result {
            Ok(value) => {
                inner
                    .slots
                    .insert(key.clone(), Slot::Ready { value: value.clone(), fetched_at, generation });
            }
            Err(_) => {
                inner.slots.remove(key);
            }
        }
    }

    fn is_fresh_since(&self, fetched_at: Instant, now: Instant) -> bool {
        now.saturating_duration_since(fetched_at) < self.stale_after
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheInner<K, V, E>> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
