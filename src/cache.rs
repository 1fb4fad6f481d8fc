//! Content-addressed memoization of conversions.
//!
//! Keys are SHA-256 digests of the raw container bytes, so the same workbook
//! read from two paths shares one entry and an edited file at the same path
//! misses. A computation in flight is parked in a pending map as a shared
//! [`OnceCell`]: the first caller for a key runs it while concurrent callers
//! for that key await the same cell. Only completed values enter the LRU, so
//! a failing key never takes a slot or evicts a live entry. The lock is only
//! held long enough to look up or move an entry, so different keys never wait
//! on each other's computations.

use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::OnceCell;

/// Capacity used when none (or zero) is configured.
pub const DEFAULT_CAPACITY: usize = 100;

/// SHA-256 digest of a container's bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn of(bytes: &[u8]) -> Self {
        Self(Sha256::digest(bytes).into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..12])
    }
}

struct Entries<V> {
    ready: LruCache<Fingerprint, V>,
    pending: HashMap<Fingerprint, Arc<OnceCell<V>>>,
}

/// Bounded LRU cache with single-flight computation per key.
pub struct ConversionCache<V> {
    entries: Mutex<Entries<V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone> ConversionCache<V> {
    /// Create a cache holding at most `capacity` entries (zero falls back to
    /// [`DEFAULT_CAPACITY`]).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or(NonZeroUsize::new(DEFAULT_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(Entries {
                ready: LruCache::new(capacity),
                pending: HashMap::new(),
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Return the cached value for `fingerprint`, running `compute` if no
    /// value exists yet. Errors are returned to the caller that hit them and
    /// are not cached; the next caller retries.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        fingerprint: Fingerprint,
        compute: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let cell = {
            let mut entries = self.entries.lock();
            if let Some(value) = entries.ready.get(&fingerprint) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(%fingerprint, "conversion cache hit");
                return Ok(value.clone());
            }
            Arc::clone(entries.pending.entry(fingerprint).or_default())
        };

        let mut computed = false;
        let result = cell
            .get_or_try_init(|| {
                computed = true;
                compute()
            })
            .await;

        if computed {
            let mut entries = self.entries.lock();
            if entries
                .pending
                .get(&fingerprint)
                .is_some_and(|pending| Arc::ptr_eq(pending, &cell))
            {
                entries.pending.remove(&fingerprint);
            }
            if let Ok(value) = &result {
                if let Some((evicted, _)) = entries.ready.push(fingerprint, V::clone(value)) {
                    if evicted != fingerprint {
                        tracing::debug!(%evicted, "evicted least recently used conversion");
                    }
                }
            }
        }

        let value = result?;
        if computed {
            self.misses.fetch_add(1, Ordering::Relaxed);
        } else {
            // Waited on another caller's in-flight computation.
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        Ok(value.clone())
    }

    /// Whether a completed value is cached for `fingerprint`. Does not touch
    /// the LRU order.
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.entries.lock().ready.contains(fingerprint)
    }

    /// Number of completed values held.
    pub fn len(&self) -> usize {
        self.entries.lock().ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().ready.cap().get()
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Drop every completed value. Computations in flight still finish and
    /// are stored.
    pub fn clear(&self) {
        self.entries.lock().ready.clear();
    }
}

impl<V: Clone> Default for ConversionCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn fingerprint_depends_on_bytes_only() {
        let a = Fingerprint::of(b"PK\x05\x06 workbook");
        let b = Fingerprint::of(b"PK\x05\x06 workbook");
        let c = Fingerprint::of(b"PK\x05\x06 workbook!");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_hex().len(), 64);
        assert_eq!(
            Fingerprint::of(b"").to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_share_one_computation() {
        let cache = Arc::new(ConversionCache::<Arc<String>>::new(8));
        let calls = Arc::new(AtomicUsize::new(0));
        let key = Fingerprint::of(b"same bytes");

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute(key, || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok::<_, std::io::Error>(Arc::new("workbook".to_string()))
                    })
                    .await
                    .unwrap()
            }));
        }

        let mut values = Vec::new();
        for handle in handles {
            values.push(handle.await.unwrap());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(values.iter().all(|v| Arc::ptr_eq(v, &values[0])));
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.hits(), 15);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let cache = ConversionCache::<u32>::new(4);
        let key = Fingerprint::of(b"flaky");

        let first: Result<u32, String> = cache
            .get_or_compute(key, || async { Err("boom".to_string()) })
            .await;
        assert_eq!(first, Err("boom".to_string()));
        assert!(!cache.contains(&key));

        let second: Result<u32, String> = cache.get_or_compute(key, || async { Ok(7) }).await;
        assert_eq!(second, Ok(7));
        assert!(cache.contains(&key));
    }

    #[tokio::test]
    async fn failed_keys_do_not_take_a_slot() {
        let cache = ConversionCache::<u32>::new(2);
        let [a, b, bad] = [b"a", b"b", b"x"].map(|k| Fingerprint::of(k));

        for (key, value) in [(a, 1), (b, 2)] {
            cache
                .get_or_compute(key, || async move { Ok::<_, String>(value) })
                .await
                .unwrap();
        }
        for _ in 0..3 {
            let failed = cache
                .get_or_compute(bad, || async { Err::<u32, _>("corrupt".to_string()) })
                .await;
            assert!(failed.is_err());
        }

        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&a));
        assert!(cache.contains(&b));
        assert!(!cache.contains(&bad));
        assert_eq!(cache.misses(), 2);
        assert_eq!(cache.entries.lock().pending.len(), 0);
    }

    #[tokio::test]
    async fn evicts_least_recently_used() {
        let cache = ConversionCache::<u32>::new(2);
        let [a, b, c] = [b"a", b"b", b"c"].map(|k| Fingerprint::of(k));

        for (key, value) in [(a, 1), (b, 2)] {
            cache
                .get_or_compute(key, || async move { Ok::<_, ()>(value) })
                .await
                .unwrap();
        }
        // Touch `a` so `b` becomes the eviction candidate.
        cache.get_or_compute(a, || async { Ok::<_, ()>(0) }).await.unwrap();
        cache.get_or_compute(c, || async { Ok::<_, ()>(3) }).await.unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&a));
        assert!(!cache.contains(&b));
        assert!(cache.contains(&c));

        let recomputed = cache
            .get_or_compute(b, || async { Ok::<_, ()>(20) })
            .await
            .unwrap();
        assert_eq!(recomputed, 20);
    }

    #[test]
    fn zero_capacity_falls_back_to_default() {
        assert_eq!(ConversionCache::<u8>::new(0).capacity(), DEFAULT_CAPACITY);
    }
}
