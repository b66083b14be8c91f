use futures::channel::oneshot;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;

use super::store::RequestCache;
use crate::error::{FetchError, FetchResult};

type Outcome<V> = Shared<BoxFuture<'static, FetchResult<V>>>;
type SharedRegistry<K, V> = Arc<Mutex<Registry<K, V>>>;

/// What happens to a coalesced request once every waiter has canceled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CancelPolicy {
    /// Let the request finish and throw its result away
    #[default]
    Detach,
    /// Abort the underlying task immediately
    Abort,
}

/// The single in-progress operation for one key
struct PendingRequest<V> {
    id: u64,
    outcome: Outcome<V>,
    waiters: usize,
    task: AbortHandle,
}

struct Registry<K, V> {
    cache: RequestCache<K, V>,
    in_flight: HashMap<K, PendingRequest<V>>,
}

fn lock<K, V>(registry: &Mutex<Registry<K, V>>) -> MutexGuard<'_, Registry<K, V>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cache-backed, coalescing request executor
///
/// Every remote call in the crate goes through [`QueryClient::fetch`]:
///
/// 1. a live cache entry is returned without running the executor,
/// 2. otherwise an in-flight request for the same key is joined,
/// 3. otherwise the executor runs as a spawned task registered under the key.
///
/// Successful results are cached for `ttl`; failures are not, so the next call retries.
/// Cache and in-flight map share one mutex that is never held across an `.await`.
pub struct QueryClient<K, V> {
    name: &'static str,
    registry: SharedRegistry<K, V>,
    ttl: Duration,
    cancel_policy: CancelPolicy,
    next_id: Arc<AtomicU64>,
}

impl<K, V> Clone for QueryClient<K, V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            registry: Arc::clone(&self.registry),
            ttl: self.ttl,
            cancel_policy: self.cancel_policy,
            next_id: Arc::clone(&self.next_id),
        }
    }
}

impl<K, V> QueryClient<K, V>
where
    K: Clone + Eq + Hash + Display + Send + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(
        name: &'static str,
        max_entries: usize,
        ttl: Duration,
        cancel_policy: CancelPolicy,
    ) -> Self {
        Self {
            name,
            registry: Arc::new(Mutex::new(Registry {
                cache: RequestCache::new(max_entries),
                in_flight: HashMap::new(),
            })),
            ttl,
            cancel_policy,
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Resolves `key` from cache, from an in-flight request, or by running `executor`
    ///
    /// When `cancel` fires this caller gets [`FetchError::Canceled`]. The shared request
    /// keeps running for other waiters; once the last waiter is gone it is unregistered
    /// and handled according to the [`CancelPolicy`].
    pub async fn fetch<F, Fut>(
        &self,
        key: K,
        cancel: &CancellationToken,
        executor: F,
    ) -> FetchResult<V>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = FetchResult<V>> + Send + 'static,
    {
        let (id, outcome) = {
            let mut registry = lock(&self.registry);

            if let Some(value) = registry.cache.get(&key) {
                tracing::debug!(client = self.name, key = %key, "Cache hit");
                return Ok(value);
            }

            if cancel.is_cancelled() {
                return Err(FetchError::Canceled);
            }

            if let Some(pending) = registry.in_flight.get_mut(&key) {
                pending.waiters += 1;
                tracing::debug!(
                    client = self.name,
                    key = %key,
                    waiters = pending.waiters,
                    "Joined in-flight request"
                );
                (pending.id, pending.outcome.clone())
            } else {
                tracing::debug!(client = self.name, key = %key, "Cache miss");

                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let (outcome, task) = self.spawn(key.clone(), id, executor());
                registry.in_flight.insert(
                    key.clone(),
                    PendingRequest {
                        id,
                        outcome: outcome.clone(),
                        waiters: 1,
                        task,
                    },
                );
                (id, outcome)
            }
        };

        let _waiter = Waiter {
            name: self.name,
            registry: Arc::clone(&self.registry),
            key,
            id,
            cancel_policy: self.cancel_policy,
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Canceled),
            result = outcome => result,
        }
    }

    /// Runs `work` in its own task so it can outlive any single waiter.
    fn spawn<Fut>(&self, key: K, id: u64, work: Fut) -> (Outcome<V>, AbortHandle)
    where
        Fut: Future<Output = FetchResult<V>> + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let settle = Settle {
            name: self.name,
            registry: Arc::clone(&self.registry),
            key,
            id,
        };
        let ttl = self.ttl;

        let handle = tokio::spawn(async move {
            let result = work.await;
            settle.finish(&result, ttl);
            let _ = sender.send(result);
        });

        let outcome = receiver
            .map(|received| {
                received.unwrap_or_else(|_| {
                    Err(FetchError::NetworkFailure(
                        "request task ended before settling".to_string(),
                    ))
                })
            })
            .boxed()
            .shared();

        (outcome, handle.abort_handle())
    }

    /// Drops a cached response so the next fetch goes to the network
    pub fn invalidate(&self, key: &K) -> bool {
        lock(&self.registry).cache.remove(key)
    }

    /// Drops every cached response; in-flight requests are left alone
    pub fn clear(&self) {
        lock(&self.registry).cache.clear();
    }

    pub fn in_flight_len(&self) -> usize {
        lock(&self.registry).in_flight.len()
    }

    pub fn cached_len(&self) -> usize {
        lock(&self.registry).cache.len()
    }
}

/// Settles a pending request from inside its task
///
/// Also runs on drop, so a panicking or aborted task never leaves a stale registration.
struct Settle<K: Eq + Hash, V> {
    name: &'static str,
    registry: SharedRegistry<K, V>,
    key: K,
    id: u64,
}

impl<K, V> Settle<K, V>
where
    K: Clone + Eq + Hash + Display,
    V: Clone,
{
    fn finish(&self, result: &FetchResult<V>, ttl: Duration) {
        let mut registry = lock(&self.registry);

        let registered = registry
            .in_flight
            .get(&self.key)
            .is_some_and(|pending| pending.id == self.id);

        if !registered {
            tracing::debug!(
                client = self.name,
                key = %self.key,
                "Discarding result of detached request"
            );
            return;
        }

        registry.in_flight.remove(&self.key);

        match result {
            Ok(value) => registry.cache.set(self.key.clone(), value.clone(), ttl),
            Err(e) => {
                tracing::debug!(client = self.name, key = %self.key, error = %e, "Request failed")
            }
        }
    }
}

impl<K: Eq + Hash, V> Drop for Settle<K, V> {
    fn drop(&mut self) {
        let mut registry = lock(&self.registry);
        if registry
            .in_flight
            .get(&self.key)
            .is_some_and(|pending| pending.id == self.id)
        {
            registry.in_flight.remove(&self.key);
        }
    }
}

/// One caller waiting on a pending request; dropping it releases the caller's interest.
struct Waiter<K: Eq + Hash + Display, V> {
    name: &'static str,
    registry: SharedRegistry<K, V>,
    key: K,
    id: u64,
    cancel_policy: CancelPolicy,
}

impl<K: Eq + Hash + Display, V> Drop for Waiter<K, V> {
    fn drop(&mut self) {
        let mut registry = lock(&self.registry);

        let orphaned = match registry.in_flight.get_mut(&self.key) {
            Some(pending) if pending.id == self.id => {
                pending.waiters = pending.waiters.saturating_sub(1);
                pending.waiters == 0
            }
            _ => false,
        };

        if !orphaned {
            return;
        }

        if let Some(pending) = registry.in_flight.remove(&self.key) {
            match self.cancel_policy {
                CancelPolicy::Abort => {
                    pending.task.abort();
                    tracing::debug!(client = self.name, key = %self.key, "Aborted orphaned request");
                }
                CancelPolicy::Detach => {
                    tracing::debug!(
                        client = self.name,
                        key = %self.key,
                        "Detached orphaned request, its result will be discarded"
                    );
                }
            }
        }
    }
}
