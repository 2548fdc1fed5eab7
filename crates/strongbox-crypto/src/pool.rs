//! Background pre-generation of RSA key pairs
//!
//! 4096-bit key generation takes from hundreds of milliseconds to seconds, so
//! a [`KeyPairPool`] keeps up to `target_size` generations queued, ready or in
//! flight. [`KeyPairPool::get`] takes the head of the queue and kicks off a
//! refill that runs on its own task.
//!
//! A refill enqueues one generation at a time and waits for it before
//! deciding whether another is needed. A failed generation ends the refill
//! with a warning; the next `get` starts a new one.

use crate::{
    config::CryptoConfig,
    keys::{EncryptionKeyPair, SigningKeyPair},
    CryptoError, Result,
};
use futures::future::{self, BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

type Generator<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T>> + Send + Sync>;

/// A queued generation; errors are kept as text so the result can be cloned
type Pending<T> = Shared<BoxFuture<'static, std::result::Result<T, String>>>;

struct PoolState<T: Clone> {
    queue: VecDeque<Pending<T>>,
    refilling: bool,
}

struct PoolInner<T: Clone> {
    name: String,
    target_size: usize,
    generator: Generator<T>,
    state: Mutex<PoolState<T>>,
}

/// Bounded queue of pre-generated items
pub struct KeyPairPool<T: Clone + Send + Sync + 'static> {
    inner: Arc<PoolInner<T>>,
}

impl<T: Clone + Send + Sync + 'static> KeyPairPool<T> {
    /// Create a pool and start filling it
    ///
    /// Filling needs a Tokio runtime. Outside one, the pool starts empty and
    /// fills on the first [`KeyPairPool::get`].
    pub fn new<F, Fut>(name: impl Into<String>, target_size: usize, generator: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let inner = Arc::new(PoolInner {
            name: name.into(),
            target_size,
            generator: Arc::new(move || generator().boxed()),
            state: Mutex::new(PoolState {
                queue: VecDeque::with_capacity(target_size + 1),
                refilling: false,
            }),
        });
        if tokio::runtime::Handle::try_current().is_ok() {
            inner.trigger_refill();
        } else {
            tracing::debug!(pool = %inner.name, "no runtime yet, deferring initial fill");
        }
        Self { inner }
    }

    /// Take the next item, generating one if the pool is empty
    ///
    /// A failed generation is returned to the caller; the refill started here
    /// keeps the pool from staying drained.
    pub async fn get(&self) -> Result<T> {
        let pending = loop {
            let mut state = self.inner.state.lock();
            match state.queue.pop_front() {
                Some(pending) => break pending,
                None => {
                    tracing::debug!(pool = %self.inner.name, "pool empty, generating on demand");
                    let pending = self.inner.spawn_generation();
                    state.queue.push_back(pending);
                }
            }
        };
        self.inner.trigger_refill();
        pending.await.map_err(CryptoError::KeyGeneration)
    }

    /// Return an unused item to the front of the queue
    ///
    /// If that takes the pool over its target size the entry at the back is
    /// dropped.
    pub fn put_back(&self, item: T) {
        self.inner
            .push_front(future::ready(Ok::<T, String>(item)).boxed().shared());
    }

    /// Return a generation still in flight to the front of the queue
    ///
    /// The future is not spawned; it runs when the `get` that dequeues it
    /// awaits it. Eviction works as for [`KeyPairPool::put_back`].
    pub fn put_back_pending<Fut>(&self, pending: Fut)
    where
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.inner.push_front(
            async move { pending.await.map_err(|e| e.to_string()) }
                .boxed()
                .shared(),
        );
    }

    /// Entries currently queued, ready or still generating
    pub fn len(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn target_size(&self) -> usize {
        self.inner.target_size
    }
}

impl<T: Clone + Send + Sync + 'static> Clone for KeyPairPool<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> fmt::Debug for KeyPairPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPairPool")
            .field("name", &self.inner.name)
            .field("target_size", &self.inner.target_size)
            .field("len", &self.len())
            .finish()
    }
}

impl<T: Clone + Send + Sync + 'static> PoolInner<T> {
    /// Start one generation on its own task so it progresses unobserved
    fn spawn_generation(&self) -> Pending<T> {
        let handle = tokio::spawn((self.generator)());
        async move {
            match handle.await {
                Ok(Ok(item)) => Ok(item),
                Ok(Err(e)) => Err(e.to_string()),
                Err(e) => Err(format!("generation task failed: {}", e)),
            }
        }
        .boxed()
        .shared()
    }

    fn push_front(&self, pending: Pending<T>) {
        let mut state = self.state.lock();
        state.queue.push_front(pending);
        while state.queue.len() > self.target_size {
            state.queue.pop_back();
            tracing::debug!(pool = %self.name, "pool over target, evicted oldest entry");
        }
    }

    /// Start a refill unless one is running or the pool is full
    fn trigger_refill(self: &Arc<Self>) {
        let first = {
            let mut state = self.state.lock();
            if state.refilling || state.queue.len() >= self.target_size {
                return;
            }
            state.refilling = true;
            let pending = self.spawn_generation();
            state.queue.push_back(pending.clone());
            pending
        };
        // built before spawning so a task dropped unpolled still releases the flag
        let guard = RefillGuard {
            inner: Arc::clone(self),
            armed: true,
        };
        tokio::spawn(guard.run(first));
    }
}

/// Owns the `refilling` flag for one refill task
///
/// A refill that finishes clears the flag under the same lock as its last
/// size check. One that is dropped first, e.g. by its runtime shutting down,
/// clears it on drop so the next `get` can start another.
struct RefillGuard<T: Clone + Send + Sync + 'static> {
    inner: Arc<PoolInner<T>>,
    armed: bool,
}

impl<T: Clone + Send + Sync + 'static> RefillGuard<T> {
    async fn run(mut self, first: Pending<T>) {
        let inner = Arc::clone(&self.inner);
        let mut pending = first;
        loop {
            if let Err(e) = pending.await {
                inner.state.lock().refilling = false;
                self.armed = false;
                tracing::warn!(pool = %inner.name, error = %e, "background key generation failed");
                return;
            }
            let mut state = inner.state.lock();
            if state.queue.len() >= inner.target_size {
                state.refilling = false;
                self.armed = false;
                tracing::debug!(pool = %inner.name, size = state.queue.len(), "pool full");
                return;
            }
            pending = inner.spawn_generation();
            state.queue.push_back(pending.clone());
            tracing::debug!(pool = %inner.name, size = state.queue.len(), "topping up pool");
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Drop for RefillGuard<T> {
    fn drop(&mut self) {
        if self.armed {
            self.inner.state.lock().refilling = false;
            tracing::debug!(pool = %self.inner.name, "refill cancelled");
        }
    }
}

/// The two independent pools: encryption pairs and signing pairs
#[derive(Clone, Debug)]
pub struct KeyPools {
    pub encryption: KeyPairPool<EncryptionKeyPair>,
    pub signing: KeyPairPool<SigningKeyPair>,
}

impl KeyPools {
    /// Build both pools, minting ids in the configured namespace
    pub fn from_config(config: &CryptoConfig) -> Self {
        let namespace = config.key_namespace.clone();
        let encryption = KeyPairPool::new("encryption", config.encryption_pool_size, move || {
            EncryptionKeyPair::generate_async(namespace.clone())
        });
        let namespace = config.key_namespace.clone();
        let signing = KeyPairPool::new("signing", config.signing_pool_size, move || {
            SigningKeyPair::generate_async(namespace.clone())
        });
        Self {
            encryption,
            signing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::{Duration, Instant};

    const GENERATION_TIME: Duration = Duration::from_millis(150);

    fn counting_pool(target_size: usize) -> (KeyPairPool<u32>, Arc<AtomicU32>) {
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();
        let pool = KeyPairPool::new("counter", target_size, move || {
            let n = c.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                tokio::time::sleep(GENERATION_TIME).await;
                Ok(n)
            }
        });
        (pool, counter)
    }

    #[tokio::test]
    async fn test_pregenerated_items_are_immediate() {
        let (pool, _) = counting_pool(2);
        tokio::time::sleep(GENERATION_TIME * 2 + Duration::from_millis(100)).await;
        assert_eq!(pool.len(), 2);

        let start = Instant::now();
        assert_eq!(pool.get().await.unwrap(), 1);
        assert_eq!(pool.get().await.unwrap(), 2);
        assert!(start.elapsed() < Duration::from_millis(50));

        let start = Instant::now();
        assert_eq!(pool.get().await.unwrap(), 3);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_pool_refills_to_target() {
        let (pool, counter) = counting_pool(3);
        tokio::time::sleep(GENERATION_TIME * 3 + Duration::from_millis(100)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);

        pool.get().await.unwrap();
        tokio::time::sleep(GENERATION_TIME + Duration::from_millis(100)).await;
        assert_eq!(pool.len(), 3);
        // refills never overshoot
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_failed_generation_recovers() {
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();
        let pool = KeyPairPool::new("flaky", 1, move || {
            let n = c.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n == 1 {
                    Err(CryptoError::KeyGeneration("entropy unavailable".into()))
                } else {
                    Ok(n)
                }
            }
        });

        let err = pool.get().await.unwrap_err();
        assert!(matches!(err, CryptoError::KeyGeneration(msg) if msg.contains("entropy")));
        assert_eq!(pool.get().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_empty_pool_generates_on_demand() {
        let (pool, counter) = counting_pool(0);
        assert!(pool.is_empty());
        assert_eq!(pool.get().await.unwrap(), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn test_put_back_goes_first_and_evicts_tail() {
        let (pool, _) = counting_pool(2);
        tokio::time::sleep(GENERATION_TIME * 2 + Duration::from_millis(100)).await;

        pool.put_back(99);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.get().await.unwrap(), 99);
        assert_eq!(pool.get().await.unwrap(), 1);
    }

    #[test]
    fn test_construction_outside_runtime_defers_fill() {
        let (pool, counter) = counting_pool(2);
        assert!(pool.is_empty());
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        assert_eq!(rt.block_on(pool.get()).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_put_back_pending_is_awaited_by_next_get() {
        let (pool, _) = counting_pool(1);
        tokio::time::sleep(GENERATION_TIME + Duration::from_millis(100)).await;

        pool.put_back_pending(async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(77)
        });
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.get().await.unwrap(), 77);

        pool.put_back_pending(async { Err(CryptoError::KeyGeneration("stale".into())) });
        let err = pool.get().await.unwrap_err();
        assert!(matches!(err, CryptoError::KeyGeneration(msg) if msg.contains("stale")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_gets_hand_out_distinct_items() {
        let (pool, _) = counting_pool(3);
        tokio::time::sleep(GENERATION_TIME * 3 + Duration::from_millis(100)).await;

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let pool = pool.clone();
                tokio::spawn(async move { pool.get().await.unwrap() })
            })
            .collect();
        let mut items = Vec::new();
        for handle in handles {
            items.push(handle.await.unwrap());
        }
        items.sort_unstable();
        items.dedup();
        assert_eq!(items.len(), 20);

        tokio::time::sleep(GENERATION_TIME * 3 + Duration::from_millis(300)).await;
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_refill_restarts_after_runtime_shutdown() {
        let runtime = || {
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap()
        };
        let first = runtime();
        let (pool, _) = first.block_on(async { counting_pool(2) });
        drop(first);

        runtime().block_on(async {
            // the generation cut off by the shutdown surfaces once
            assert!(pool.get().await.is_err());
            tokio::time::sleep(GENERATION_TIME * 2 + Duration::from_millis(200)).await;
            assert_eq!(pool.len(), 2);
            assert!(pool.get().await.is_ok());
        });
    }

    #[tokio::test]
    async fn test_key_pools_from_config() {
        let config = CryptoConfig::default().with_pool_sizes(0, 0);
        let pools = KeyPools::from_config(&config);
        assert_eq!(pools.encryption.target_size(), 0);
        assert_eq!(pools.signing.target_size(), 0);
        assert!(pools.encryption.is_empty());
    }
}
