use std::fmt;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;

/// Produces fresh content for a dynamic entry.
pub type Generator = Arc<dyn Fn() -> Bytes + Send + Sync>;

/// Where an entry's content comes from.
#[derive(Clone)]
pub enum EntryKind {
    /// Loaded from disk; the handle stays open while the entry lives.
    File { path: PathBuf, handle: Arc<File> },
    /// Supplied once by the caller.
    Static,
    /// Regenerated every `interval`.
    Dynamic { generator: Generator, interval: Duration },
}

impl fmt::Debug for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::File { path, .. } => f.debug_struct("File").field("path", path).finish(),
            EntryKind::Static => f.write_str("Static"),
            EntryKind::Dynamic { interval, .. } => {
                f.debug_struct("Dynamic").field("interval", interval).finish()
            }
        }
    }
}

/// When an entry stops being served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    Forever,
    /// Evicted once unread for this long.
    Idle(Duration),
    /// Evicted at this instant.
    Until(Instant),
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub content: Bytes,
    pub kind: EntryKind,
    pub lifetime: Lifetime,
    pub last_access: Instant,
    /// Distinguishes this entry from later ones under the same key, so a
    /// timer armed for it never touches a replacement.
    pub(crate) generation: u64,
}

impl CacheEntry {
    pub fn is_expired(&self, now: Instant) -> bool {
        match self.lifetime {
            Lifetime::Forever => false,
            Lifetime::Idle(timeout) => now.duration_since(self.last_access) >= timeout,
            Lifetime::Until(at) => now >= at,
        }
    }
}
