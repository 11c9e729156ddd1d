//! In-memory content cache.
//!
//! Entries are keyed by string: file entries by their path, static and
//! dynamic entries by whatever key the caller picks. A [`ContentCache`] is a
//! cheap handle; clones share the same store.
//!
//! Timers (expiration and dynamic refresh) run as Tokio tasks holding only a
//! weak reference to the store. Every entry carries a generation number and
//! a timer only acts on the generation it was armed for, so replacing or
//! removing a key can never be undone by a timer that fires late.

pub mod entry;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use bytes::Bytes;
use dashmap::DashMap;
use tokio::io::AsyncReadExt;
use tokio::sync::Mutex;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::config::CacheConfig;
pub use entry::{CacheEntry, EntryKind, Generator, Lifetime};

struct Timer {
    generation: u64,
    handle: AbortHandle,
}

struct Inner {
    entries: DashMap<String, CacheEntry>,
    /// One lock per key currently being populated from disk.
    loading: DashMap<String, Arc<Mutex<()>>>,
    timers: DashMap<String, Timer>,
    generation: AtomicU64,
    config: CacheConfig,
}

impl Inner {
    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed)
    }

    /// Removes `key` if it still holds the entry of `generation`.
    fn expire(&self, key: &str, generation: u64) {
        if self
            .entries
            .remove_if(key, |_, entry| entry.generation == generation)
            .is_some()
        {
            debug!(key = %key, "cache entry expired");
        }
        self.timers.remove_if(key, |_, timer| timer.generation == generation);
    }

    /// Replaces the content of `key` if it still holds `generation`.
    fn refresh(&self, key: &str, generation: u64, content: Bytes) -> bool {
        match self.entries.get_mut(key) {
            Some(mut entry) if entry.generation == generation => {
                entry.content = content;
                true
            }
            _ => false,
        }
    }

    fn cancel_timer(&self, key: &str) {
        if let Some((_, timer)) = self.timers.remove(key) {
            timer.handle.abort();
        }
    }

    fn sweep(&self) {
        let now = Instant::now();
        let mut evicted = Vec::new();

        self.entries.retain(|key, entry| {
            let keep = !entry.is_expired(now);
            if !keep {
                evicted.push(key.clone());
            }
            keep
        });

        for key in &evicted {
            self.cancel_timer(key);
        }
        if !evicted.is_empty() {
            debug!(count = evicted.len(), "evicted idle cache entries");
        }
    }
}

/// Shared content cache. See the module docs.
#[derive(Clone)]
pub struct ContentCache {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ContentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentCache")
            .field("entries", &self.inner.entries.len())
            .field("config", &self.inner.config)
            .finish()
    }
}

impl Default for ContentCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl ContentCache {
    /// Creates an empty cache.
    ///
    /// Inside a Tokio runtime this also starts the idle sweeper, which stops
    /// on its own once the last handle is dropped. Outside one, idle entries
    /// are still dropped when read after their timeout.
    pub fn new(config: CacheConfig) -> Self {
        let sweep_interval = config.sweep_interval();
        let inner = Arc::new(Inner {
            entries: DashMap::new(),
            loading: DashMap::new(),
            timers: DashMap::new(),
            generation: AtomicU64::new(0),
            config,
        });

        if tokio::runtime::Handle::try_current().is_ok() {
            spawn_sweeper(Arc::downgrade(&inner), sweep_interval);
        } else {
            warn!("content cache created outside a runtime; idle sweeper not started");
        }

        Self { inner }
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Whether `key` holds an entry that has not expired.
    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.inner
            .entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// Returns the content for `key`, loading it from disk on a miss.
    ///
    /// On a miss `key` is treated as a file path; a file that cannot be read
    /// yields `None`. Concurrent misses on the same key read the file once.
    pub async fn get(&self, key: &str) -> Option<Bytes> {
        if let Some(content) = self.lookup(key) {
            return Some(content);
        }
        self.populate(key).await
    }

    /// Caches `content` under `key` until `expiration`, or forever.
    pub fn cache_static(&self, key: &str, content: impl Into<Bytes>, expiration: Option<Instant>) {
        let generation = self.inner.next_generation();
        self.install(
            key,
            CacheEntry {
                content: content.into(),
                kind: EntryKind::Static,
                lifetime: lifetime_until(expiration),
                last_access: Instant::now(),
                generation,
            },
        );

        if let Some(at) = expiration {
            self.arm_expiration(key, generation, at);
        }
    }

    /// Caches the output of `generator` under `key`, regenerating it every
    /// `interval` until `expiration` (or until the key is replaced or
    /// removed).
    ///
    /// The generator runs once before this returns.
    pub fn cache_dynamic<F>(
        &self,
        key: &str,
        interval: Duration,
        expiration: Option<Instant>,
        generator: F,
    ) where
        F: Fn() -> Bytes + Send + Sync + 'static,
    {
        let generator: Generator = Arc::new(generator);
        let content = generator();
        let generation = self.inner.next_generation();

        self.install(
            key,
            CacheEntry {
                content,
                kind: EntryKind::Dynamic {
                    generator: Arc::clone(&generator),
                    interval,
                },
                lifetime: lifetime_until(expiration),
                last_access: Instant::now(),
                generation,
            },
        );

        let weak = Arc::downgrade(&self.inner);
        let owned_key = key.to_string();
        self.spawn_timer(key, generation, async move {
            loop {
                tokio::time::sleep(interval).await;
                let Some(inner) = weak.upgrade() else { break };

                if expiration.is_some_and(|at| Instant::now() >= at) {
                    inner.expire(&owned_key, generation);
                    break;
                }
                // keep a slow generator off the runtime's worker threads
                let generate = Arc::clone(&generator);
                let content = match tokio::task::spawn_blocking(move || generate()).await {
                    Ok(content) => content,
                    Err(e) => {
                        warn!(key = %owned_key, error = %e, "dynamic cache generator failed");
                        break;
                    }
                };
                if !inner.refresh(&owned_key, generation, content) {
                    break;
                }
                trace!(key = %owned_key, "dynamic cache entry refreshed");
            }
        });
    }

    /// Reads `path` into the cache, replacing any entry for it.
    ///
    /// Without `expiration` the entry is evicted after the idle timeout.
    /// Returns the content, or `None` if the file cannot be read.
    pub async fn cache_file(&self, path: impl AsRef<Path>, expiration: Option<Instant>) -> Option<Bytes> {
        let path = path.as_ref();
        let key = path.to_string_lossy().into_owned();
        let lifetime = match expiration {
            Some(at) => Lifetime::Until(at),
            None => Lifetime::Idle(self.inner.config.idle_timeout()),
        };

        let (content, generation) = self.load_file(&key, path, lifetime).await?;
        if let (Some(at), Some(generation)) = (expiration, generation) {
            self.arm_expiration(&key, generation, at);
        }
        Some(content)
    }

    /// Evicts `key` and cancels its timers.
    pub fn remove(&self, key: &str) -> bool {
        self.inner.cancel_timer(key);
        let removed = self.inner.entries.remove(key).is_some();
        if removed {
            debug!(key = %key, "cache entry removed");
        }
        removed
    }

    /// The open file handle behind a file entry.
    pub fn file_handle(&self, key: &str) -> Option<Arc<std::fs::File>> {
        match &self.inner.entries.get(key)?.kind {
            EntryKind::File { handle, .. } => Some(Arc::clone(handle)),
            _ => None,
        }
    }

    fn lookup(&self, key: &str) -> Option<Bytes> {
        let now = Instant::now();
        let mut entry = self.inner.entries.get_mut(key)?;

        if entry.is_expired(now) {
            let generation = entry.generation;
            drop(entry);
            self.inner.expire(key, generation);
            return None;
        }

        entry.last_access = now;
        Some(entry.content.clone())
    }

    async fn populate(&self, key: &str) -> Option<Bytes> {
        let gate = self
            .inner
            .loading
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();

        let result = {
            let _guard = gate.lock().await;
            // another task may have loaded it while we waited
            match self.lookup(key) {
                Some(content) => Some(content),
                None => {
                    let lifetime = Lifetime::Idle(self.inner.config.idle_timeout());
                    self.load_file(key, Path::new(key), lifetime)
                        .await
                        .map(|(content, _)| content)
                }
            }
        };

        // the map and this task hold the only references when no one waits
        self.inner
            .loading
            .remove_if(key, |_, g| Arc::ptr_eq(g, &gate) && Arc::strong_count(g) <= 2);

        result
    }

    /// Reads a file and stores it under `key` unless it is too large.
    ///
    /// Returns the content and, when stored, the entry's generation.
    async fn load_file(&self, key: &str, path: &Path, lifetime: Lifetime) -> Option<(Bytes, Option<u64>)> {
        let (handle, content) = match read_file(path).await {
            Ok(loaded) => loaded,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "file not cacheable");
                return None;
            }
        };

        if content.len() as u64 > self.inner.config.max_file_size {
            debug!(path = %path.display(), size = content.len(), "file too large to cache");
            return Some((content, None));
        }

        let generation = self.inner.next_generation();
        self.install(
            key,
            CacheEntry {
                content: content.clone(),
                kind: EntryKind::File {
                    path: PathBuf::from(path),
                    handle: Arc::new(handle),
                },
                lifetime,
                last_access: Instant::now(),
                generation,
            },
        );
        debug!(path = %path.display(), size = content.len(), "file cached");

        Some((content, Some(generation)))
    }

    fn install(&self, key: &str, entry: CacheEntry) {
        self.inner.cancel_timer(key);
        self.inner.entries.insert(key.to_string(), entry);
    }

    fn arm_expiration(&self, key: &str, generation: u64, at: Instant) {
        let weak = Arc::downgrade(&self.inner);
        let owned_key = key.to_string();
        self.spawn_timer(key, generation, async move {
            tokio::time::sleep_until(at).await;
            if let Some(inner) = weak.upgrade() {
                inner.expire(&owned_key, generation);
            }
        });
    }

    /// Runs `timer` for the entry `generation` of `key` on the current
    /// runtime.
    ///
    /// Outside a runtime nothing is scheduled: entries with an expiration
    /// still disappear when read after it, and dynamic entries keep the
    /// content generated when they were cached.
    fn spawn_timer<F>(&self, key: &str, generation: u64, timer: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!(key = %key, "no runtime, cache timer not scheduled");
            return;
        };
        let task = runtime.spawn(timer);

        self.inner.timers.insert(
            key.to_string(),
            Timer {
                generation,
                handle: task.abort_handle(),
            },
        );
    }
}

fn lifetime_until(expiration: Option<Instant>) -> Lifetime {
    expiration.map_or(Lifetime::Forever, Lifetime::Until)
}

async fn read_file(path: &Path) -> std::io::Result<(std::fs::File, Bytes)> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut data = Vec::new();
    file.read_to_end(&mut data).await?;
    Ok((file.into_std().await, Bytes::from(data)))
}

fn spawn_sweeper(inner: Weak<Inner>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // the first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(inner) = inner.upgrade() else { break };
            inner.sweep();
        }
    });
}
