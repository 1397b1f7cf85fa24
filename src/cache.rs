//! In-memory keyed cache with get-or-load semantics.
//!
//! [`Cache`] sits in front of a slower source (the credential store) and
//! remembers both hits and misses: a loader that resolves to `None` stores an
//! absence marker, so repeated lookups for an unknown key do not go back to
//! the source until the entry expires or is evicted.
//!
//! Entries are held in a [`moka`] cache bounded by `capacity`, so a stream of
//! lookups for distinct unknown keys cannot grow memory without limit. Once
//! the bound is reached moka evicts by its TinyLFU policy.
//!
//! # Generations
//!
//! Entries live in a [`Generation`]. [`Cache::load_all`] and [`Cache::clear`]
//! build a complete replacement generation and swap it in under a single
//! write lock, so a concurrent reader sees either the old contents or the new
//! ones, never a half-populated map. Reloads are serialized through
//! `reloads`.
//!
//! A load that started against a generation that has since been replaced
//! writes its result into the retired generation, where nobody will read it.
//! This keeps a slow loader from resurrecting data that a reload already
//! superseded.
//!
//! # Evictions
//!
//! [`Cache::remove`] always wins over a load that was in flight when it ran:
//! a single-key load re-checks the generation's eviction counter after
//! storing its result, and a [`Cache::load_all`] replays every eviction
//! logged while its loader ran onto the generation it installs.
//!
//! Concurrent misses on the same key may each invoke the loader; there is no
//! single-flight de-duplication. The last completed load wins.

use std::{
    future::Future,
    hash::Hash,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use moka::sync::Cache as Entries;
use parking_lot::{Mutex, RwLock};

/// Default maximum number of entries, absence markers included.
pub const DEFAULT_CAPACITY: u64 = 10_000;

/// One complete set of cache contents.
struct Generation<K, V> {
    id: u64,
    /// `None` values record that the loader found nothing for the key.
    entries: Entries<K, Option<V>>,
    evictions: AtomicU64,
}

impl<K, V> Generation<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn new(id: u64, capacity: u64, ttl: Option<Duration>) -> Self {
        let mut builder = Entries::<K, Option<V>>::builder().max_capacity(capacity);
        if let Some(ttl) = ttl {
            builder = builder.time_to_live(ttl);
        }

        Self {
            id,
            entries: builder.build(),
            evictions: AtomicU64::new(0),
        }
    }

    /// Outer `None` is a miss, `Some(None)` a cached absence.
    fn lookup(&self, key: &K) -> Option<Option<V>> {
        self.entries.get(key)
    }

    fn eviction_mark(&self) -> u64 {
        self.evictions.load(Ordering::SeqCst)
    }

    /// Stores a loader result unless `key` may have been evicted since `mark`.
    fn store_loaded(&self, key: K, value: Option<V>, mark: u64) {
        self.entries.insert(key.clone(), value);
        if self.eviction_mark() != mark {
            self.entries.invalidate(&key);
        }
    }

    fn evict(&self, key: &K) {
        self.evictions.fetch_add(1, Ordering::SeqCst);
        self.entries.invalidate(key);
    }

    fn live_count(&self) -> usize {
        self.entries.run_pending_tasks();
        self.entries.entry_count() as usize
    }
}

/// Bookkeeping for reloads whose loader is still running.
struct ReloadLog<K> {
    in_flight: usize,
    evicted: Vec<K>,
}

impl<K> ReloadLog<K> {
    fn finish(&mut self) {
        self.in_flight -= 1;
        if self.in_flight == 0 {
            self.evicted.clear();
        }
    }
}

/// Process-wide cache shared by all request handlers.
///
/// # Expiration
///
/// The entry lifetime is fixed at construction: either every entry expires
/// `ttl` after it was stored, or entries never expire.
///
/// # Thread Safety
///
/// `Cache` is `Send + Sync`; wrap it in an [`Arc`] to share it. Loaders run
/// without any lock held, so a slow store call never blocks other keys.
pub struct Cache<K, V> {
    current: RwLock<Arc<Generation<K, V>>>,
    reloads: Mutex<ReloadLog<K>>,
    next_generation: AtomicU64,
    capacity: u64,
    ttl: Option<Duration>,
}

impl<K, V> Default for Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a cache of [`DEFAULT_CAPACITY`] whose entries never expire.
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_CAPACITY, None)
    }

    /// Creates a cache whose entries expire `ttl` after being stored.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self::with_limits(DEFAULT_CAPACITY, Some(ttl))
    }

    pub fn with_limits(capacity: u64, ttl: Option<Duration>) -> Self {
        Self {
            current: RwLock::new(Arc::new(Generation::new(0, capacity, ttl))),
            reloads: Mutex::new(ReloadLog {
                in_flight: 0,
                evicted: Vec::new(),
            }),
            next_generation: AtomicU64::new(1),
            capacity,
            ttl,
        }
    }

    /// Entry lifetime this cache was built with.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Maximum number of entries held at once.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Identifier of the generation currently served. Changes on every
    /// [`load_all`](Self::load_all) and [`clear`](Self::clear).
    pub fn generation(&self) -> u64 {
        self.snapshot().id
    }

    /// Returns the cached value for `key`, running `loader` on a miss.
    ///
    /// Whatever the loader returns is stored, including `None`.
    pub fn get_with<F>(&self, key: &K, loader: F) -> Option<V>
    where
        F: FnOnce(&K) -> Option<V>,
    {
        let generation = self.snapshot();
        if let Some(cached) = generation.lookup(key) {
            return cached;
        }

        let mark = generation.eviction_mark();
        let loaded = loader(key);
        generation.store_loaded(key.clone(), loaded.clone(), mark);
        loaded
    }

    /// Async variant of [`get_with`](Self::get_with) for fallible loaders.
    ///
    /// A loader error is returned to the caller and nothing is cached, so the
    /// next lookup retries the source.
    pub async fn try_get_with<F, Fut, E>(&self, key: &K, loader: F) -> Result<Option<V>, E>
    where
        F: FnOnce(K) -> Fut,
        Fut: Future<Output = Result<Option<V>, E>>,
    {
        let generation = self.snapshot();
        if let Some(cached) = generation.lookup(key) {
            return Ok(cached);
        }

        let mark = generation.eviction_mark();
        let loaded = loader(key.clone()).await?;
        generation.store_loaded(key.clone(), loaded.clone(), mark);
        Ok(loaded)
    }

    /// Cached state of `key` without loading: `None` on a miss,
    /// `Some(None)` when an absence is cached.
    pub fn peek(&self, key: &K) -> Option<Option<V>> {
        self.snapshot().lookup(key)
    }

    /// Stores `value` under `key`, replacing any previous entry.
    pub fn set(&self, key: K, value: V) {
        let _reloads = self.reloads.lock();
        self.current.read().entries.insert(key, Some(value));
    }

    /// Evicts a single key from the generation being served, and from any
    /// generation a running [`load_all`](Self::load_all) is about to install.
    pub fn remove(&self, key: &K) {
        let mut reloads = self.reloads.lock();
        if reloads.in_flight > 0 {
            reloads.evicted.push(key.clone());
        }
        self.current.read().evict(key);
    }

    /// Replaces the entire contents with the result of `loader`.
    ///
    /// The loader runs before the swap; if it fails the current contents are
    /// left untouched. Returns the number of entries installed.
    pub async fn load_all<F, Fut, E>(&self, loader: F) -> Result<usize, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<(K, V)>, E>>,
    {
        let pending = PendingReload::begin(self);
        let items = loader().await?;
        Ok(pending.install(items))
    }

    /// Synchronous form of [`load_all`](Self::load_all) for data already in hand.
    pub fn replace_all<I>(&self, items: I) -> usize
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let generation = self.build(items);
        let _reloads = self.reloads.lock();
        self.install(generation)
    }

    /// Evicts everything.
    pub fn clear(&self) {
        self.replace_all(std::iter::empty());
    }

    /// Number of live entries, cached absences included.
    pub fn count(&self) -> usize {
        self.snapshot().live_count()
    }

    fn build<I>(&self, items: I) -> Generation<K, V>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let id = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let generation = Generation::new(id, self.capacity, self.ttl);
        for (key, value) in items {
            generation.entries.insert(key, Some(value));
        }
        generation
    }

    /// Swaps `generation` in. Callers hold `reloads`.
    fn install(&self, generation: Generation<K, V>) -> usize {
        let installed = generation.live_count();
        *self.current.write() = Arc::new(generation);
        installed
    }

    fn snapshot(&self) -> Arc<Generation<K, V>> {
        Arc::clone(&self.current.read())
    }
}

/// A [`Cache::load_all`] whose loader has not finished yet.
///
/// Dropping it without installing (loader error or cancellation) releases
/// its hold on the eviction log.
struct PendingReload<'a, K, V> {
    cache: &'a Cache<K, V>,
    mark: usize,
    finished: bool,
}

impl<'a, K, V> PendingReload<'a, K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn begin(cache: &'a Cache<K, V>) -> Self {
        let mut reloads = cache.reloads.lock();
        reloads.in_flight += 1;
        Self {
            cache,
            mark: reloads.evicted.len(),
            finished: false,
        }
    }

    fn install(mut self, items: Vec<(K, V)>) -> usize {
        let generation = self.cache.build(items);

        let mut reloads = self.cache.reloads.lock();
        for key in &reloads.evicted[self.mark..] {
            generation.evict(key);
        }
        let installed = self.cache.install(generation);
        reloads.finish();
        self.finished = true;
        installed
    }
}

impl<K, V> Drop for PendingReload<'_, K, V> {
    fn drop(&mut self) {
        if !self.finished {
            self.cache.reloads.lock().finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn miss_invokes_loader_and_caches_result() {
        let cache: Cache<String, u32> = Cache::new();
        let calls = AtomicUsize::new(0);

        let first = cache.get_with(&"a".to_string(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Some(7)
        });
        let second = cache.get_with(&"a".to_string(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Some(99)
        });

        assert_eq!(first, Some(7));
        assert_eq!(second, Some(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn absence_is_cached() {
        let cache: Cache<String, u32> = Cache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache.get_with(&"ghost".to_string(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                None
            });
            assert_eq!(value, None);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.peek(&"ghost".to_string()), Some(None));
        assert_eq!(cache.count(), 1);
    }

    #[tokio::test]
    async fn loader_errors_are_not_cached() {
        let cache: Cache<String, u32> = Cache::new();

        let failed: Result<Option<u32>, &str> = cache
            .try_get_with(&"k".to_string(), |_| async { Err("store down") })
            .await;
        assert_eq!(failed, Err("store down"));
        assert_eq!(cache.peek(&"k".to_string()), None);

        let loaded: Result<Option<u32>, &str> = cache
            .try_get_with(&"k".to_string(), |_| async { Ok(Some(3)) })
            .await;
        assert_eq!(loaded, Ok(Some(3)));
        assert_eq!(cache.peek(&"k".to_string()), Some(Some(3)));
    }

    #[tokio::test]
    async fn concurrent_misses_converge() {
        let cache: Arc<Cache<String, u32>> = Arc::new(Cache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .try_get_with(&"shared".to_string(), |_| async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        Ok::<_, ()>(Some(42))
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(Some(42)));
        }
        assert!(calls.load(Ordering::SeqCst) >= 1);
        assert_eq!(cache.peek(&"shared".to_string()), Some(Some(42)));
        assert_eq!(cache.count(), 1);
    }

    #[test]
    fn set_overwrites_and_remove_evicts() {
        let cache: Cache<&'static str, &'static str> = Cache::new();

        cache.set("k", "v1");
        cache.set("k", "v2");
        assert_eq!(cache.peek(&"k"), Some(Some("v2")));

        cache.remove(&"k");
        assert_eq!(cache.peek(&"k"), None);
        assert_eq!(cache.count(), 0);
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache: Cache<&'static str, u32> = Cache::with_ttl(Duration::from_millis(1));

        cache.set("k", 1);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.peek(&"k"), None);
        assert_eq!(cache.count(), 0);

        let reloaded = cache.get_with(&"k", |_| Some(2));
        assert_eq!(reloaded, Some(2));
    }

    #[test]
    fn entries_without_ttl_never_expire() {
        let cache: Cache<&'static str, u32> = Cache::new();
        assert_eq!(cache.ttl(), None);
        assert_eq!(cache.capacity(), DEFAULT_CAPACITY);

        cache.set("k", 1);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.peek(&"k"), Some(Some(1)));
    }

    #[tokio::test]
    async fn load_all_replaces_contents() {
        let cache: Cache<String, u32> = Cache::new();
        cache.set("stale".to_string(), 0);
        let before = cache.generation();

        let installed = cache
            .load_all(|| async { Ok::<_, ()>(vec![("a".to_string(), 1), ("b".to_string(), 2)]) })
            .await
            .unwrap();

        assert_eq!(installed, 2);
        assert_eq!(cache.count(), 2);
        assert_eq!(cache.peek(&"stale".to_string()), None);
        assert_eq!(cache.peek(&"b".to_string()), Some(Some(2)));
        assert_ne!(cache.generation(), before);
    }

    #[tokio::test]
    async fn failed_load_all_keeps_current_contents() {
        let cache: Cache<String, u32> = Cache::new();
        cache.set("kept".to_string(), 5);
        let before = cache.generation();

        let result = cache
            .load_all(|| async { Err::<Vec<(String, u32)>, _>("boom") })
            .await;

        assert_eq!(result, Err("boom"));
        assert_eq!(cache.peek(&"kept".to_string()), Some(Some(5)));
        assert_eq!(cache.generation(), before);
    }

    #[test]
    fn clear_evicts_everything() {
        let cache: Cache<u32, u32> = Cache::new();
        cache.replace_all((0..10).map(|i| (i, i * 2)));
        assert_eq!(cache.count(), 10);

        cache.clear();
        assert_eq!(cache.count(), 0);
    }

    #[tokio::test]
    async fn load_started_before_reload_does_not_leak_into_new_generation() {
        let cache: Arc<Cache<String, u32>> = Arc::new(Cache::new());
        let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let slow = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                cache
                    .try_get_with(&"k".to_string(), |_| async move {
                        let _ = started_tx.send(());
                        let _ = release_rx.await;
                        Ok::<_, ()>(Some(1))
                    })
                    .await
            })
        };

        started_rx.await.unwrap();
        cache.replace_all(vec![("k".to_string(), 2)]);
        release_tx.send(()).unwrap();

        assert_eq!(slow.await.unwrap(), Ok(Some(1)));
        assert_eq!(cache.peek(&"k".to_string()), Some(Some(2)));
    }

    #[test]
    fn readers_see_whole_generations_during_reloads() {
        let cache: Arc<Cache<u32, u32>> = Arc::new(Cache::new());
        cache.replace_all((0..100).map(|i| (i, 0)));

        let writer = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                for round in 1..50 {
                    cache.replace_all((0..100).map(|i| (i, round)));
                }
            })
        };

        for _ in 0..200 {
            // Every generation is installed fully populated.
            assert_eq!(cache.count(), 100);
        }
        writer.join().unwrap();
    }

    #[test]
    fn unknown_key_flood_stays_within_capacity() {
        let cache: Cache<u32, u32> = Cache::with_limits(100, None);

        for key in 0..5_000 {
            assert_eq!(cache.get_with(&key, |_| None), None);
        }

        assert!(cache.count() <= 100, "count {}", cache.count());
    }

    #[test]
    fn reload_larger_than_capacity_is_bounded() {
        let cache: Cache<u32, u32> = Cache::with_limits(10, None);

        let installed = cache.replace_all((0..50).map(|i| (i, i)));

        assert!(installed <= 10);
        assert!(cache.count() <= 10);
    }

    #[tokio::test]
    async fn eviction_during_a_miss_load_wins() {
        let cache: Arc<Cache<String, u32>> = Arc::new(Cache::new());
        let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let slow = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                cache
                    .try_get_with(&"k".to_string(), |_| async move {
                        let _ = started_tx.send(());
                        let _ = release_rx.await;
                        Ok::<_, ()>(Some(1))
                    })
                    .await
            })
        };

        started_rx.await.unwrap();
        cache.remove(&"k".to_string());
        release_tx.send(()).unwrap();

        // The caller still gets what it loaded; the cache does not keep it.
        assert_eq!(slow.await.unwrap(), Ok(Some(1)));
        assert_eq!(cache.peek(&"k".to_string()), None);
    }

    #[tokio::test]
    async fn eviction_during_load_all_survives_the_swap() {
        let cache: Arc<Cache<String, u32>> = Arc::new(Cache::new());
        cache.set("k".to_string(), 1);
        let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let reload = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                cache
                    .load_all(|| async move {
                        let _ = started_tx.send(());
                        let _ = release_rx.await;
                        Ok::<_, ()>(vec![("k".to_string(), 1), ("other".to_string(), 2)])
                    })
                    .await
            })
        };

        started_rx.await.unwrap();
        let before = cache.generation();
        cache.remove(&"k".to_string());
        release_tx.send(()).unwrap();

        assert_eq!(reload.await.unwrap(), Ok(1));
        assert_ne!(cache.generation(), before);
        assert_eq!(cache.peek(&"k".to_string()), None);
        assert_eq!(cache.peek(&"other".to_string()), Some(Some(2)));
    }

    #[tokio::test]
    async fn failed_load_all_releases_the_eviction_log() {
        let cache: Cache<String, u32> = Cache::new();

        let _ = cache.load_all(|| async { Err::<Vec<(String, u32)>, _>("boom") }).await;
        cache.remove(&"k".to_string());

        let reloads = cache.reloads.lock();
        assert_eq!(reloads.in_flight, 0);
        assert!(reloads.evicted.is_empty());
    }
}
