use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::types::PreviewOptions;

/// Cached preview text with insertion timestamp for TTL-based eviction.
struct CacheEntry {
    text: Arc<str>,
    inserted_at: Instant,
}

/// Preview cache keyed by (storage key, limits, mtime). If the object changes,
/// mtime changes, old entry is never hit, gets evicted on next prune.
pub struct PreviewCache {
    entries: DashMap<(String, PreviewOptions, SystemTime), CacheEntry>,
}

impl Default for PreviewCache {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl PreviewCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get cached text or compute and cache it. Errors are returned, not cached.
    /// Uses `entry()` API to avoid TOCTOU race between get and insert.
    pub fn get_or_try_compute<E>(
        &self,
        key: &str,
        options: PreviewOptions,
        mtime: SystemTime,
        compute: impl FnOnce() -> Result<String, E>,
    ) -> Result<Arc<str>, E> {
        match self.entries.entry((key.to_string(), options, mtime)) {
            Entry::Occupied(e) => {
                tracing::trace!(key, "preview cache hit");
                Ok(Arc::clone(&e.get().text))
            }
            Entry::Vacant(e) => {
                let text: Arc<str> = compute()?.into();
                e.insert(CacheEntry {
                    text: Arc::clone(&text),
                    inserted_at: Instant::now(),
                });
                Ok(text)
            }
        }
    }

    /// Evict entries that were cached more than `max_age` ago.
    pub fn prune(&self, max_age: Duration) {
        let Some(cutoff) = Instant::now().checked_sub(max_age) else {
            return;
        };
        self.entries.retain(|_, entry| entry.inserted_at > cutoff);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
