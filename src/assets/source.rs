use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use crate::assets::decode::decode_source;
use crate::compile::keys::source_key_for_bytes;
use crate::foundation::cancel::CancellationToken;
use crate::foundation::core::Surface;
use crate::foundation::error::{FilmError, FilmResult, RenderStage};

/// Where the source image comes from.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SourceInput {
    /// Encoded image bytes held in memory.
    Bytes {
        /// Encoded bytes (PNG, JPEG, WebP, ...).
        data: Arc<[u8]>,
    },
    /// Encoded image on disk.
    Path {
        /// File path.
        path: PathBuf,
    },
}

impl SourceInput {
    /// In-memory source.
    pub fn bytes(data: impl Into<Arc<[u8]>>) -> Self {
        Self::Bytes { data: data.into() }
    }

    /// On-disk source.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path { path: path.into() }
    }

    /// Cache identity: `cache_key` when given, else a content hash for bytes or
    /// path + mtime + length for files.
    pub fn cache_key(&self, cache_key: Option<&str>) -> FilmResult<String> {
        match self {
            Self::Bytes { data } => Ok(source_key_for_bytes(data, cache_key)),
            Self::Path { path } => {
                if let Some(k) = cache_key.filter(|k| !k.is_empty()) {
                    return Ok(source_key_for_bytes(&[], Some(k)));
                }
                let meta = std::fs::metadata(path).map_err(|e| {
                    FilmError::decode(format!("stat source '{}': {e}", path.display()))
                })?;
                let mtime = meta
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                    .map_or(0, |d| d.as_nanos());
                Ok(format!(
                    "{}:p#{}@{mtime}:{}",
                    RenderStage::Source.tag(),
                    path.display(),
                    meta.len()
                ))
            }
        }
    }

    fn read(&self) -> FilmResult<Arc<[u8]>> {
        match self {
            Self::Bytes { data } => Ok(Arc::clone(data)),
            Self::Path { path } => std::fs::read(path).map(Arc::from).map_err(|e| {
                FilmError::decode(format!("read source '{}': {e}", path.display()))
            }),
        }
    }
}

/// Counters exposed through [`crate::RenderStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BitmapCacheStats {
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that decoded.
    pub misses: u64,
    /// Entries pushed out by the entry or byte budget.
    pub evictions: u64,
    /// Evicted while still leased; freed once the last lease drops.
    pub deferred_releases: u64,
    /// Bitmaps actually freed.
    pub released: u64,
    /// Live entries.
    pub entries: usize,
    /// Decoded bytes held by live entries.
    pub bytes: usize,
}

/// Bounded LRU of decoded sources, shared by every slot and mode.
///
/// Entries are handed out as `Arc` leases. Eviction never frees a bitmap that a render still
/// holds: leased bitmaps move to a pending list and are released by [`BitmapCache::reap`].
pub(crate) struct BitmapCache {
    entries: HashMap<String, Arc<Surface>>,
    lru: VecDeque<String>,
    max_entries: usize,
    max_bytes: usize,
    bytes: usize,
    pending: Vec<Arc<Surface>>,
    stats: BitmapCacheStats,
}

impl BitmapCache {
    pub(crate) fn new(max_entries: usize, max_bytes: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru: VecDeque::new(),
            max_entries: max_entries.max(1),
            max_bytes,
            bytes: 0,
            pending: Vec::new(),
            stats: BitmapCacheStats::default(),
        }
    }

    pub(crate) fn stats(&self) -> BitmapCacheStats {
        BitmapCacheStats {
            entries: self.entries.len(),
            bytes: self.bytes,
            ..self.stats
        }
    }

    #[cfg(test)]
    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn get(&mut self, key: &str) -> Option<Arc<Surface>> {
        let hit = self.entries.get(key).cloned();
        match hit {
            Some(s) => {
                self.stats.hits += 1;
                self.touch(key);
                Some(s)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    pub(crate) fn insert(&mut self, key: String, surface: Surface) -> Arc<Surface> {
        if let Some(existing) = self.entries.get(&key) {
            let existing = Arc::clone(existing);
            self.touch(&key);
            return existing;
        }
        let lease = Arc::new(surface);
        self.bytes = self.bytes.saturating_add(lease.byte_len());
        self.entries.insert(key.clone(), Arc::clone(&lease));
        self.touch(&key);
        self.evict_over_budget();
        self.reap();
        lease
    }

    /// Drop one entry, e.g. when its asset is deleted.
    pub(crate) fn remove(&mut self, key: &str) {
        if let Some(pos) = self.lru.iter().position(|k| k == key) {
            self.lru.remove(pos);
        }
        if let Some(s) = self.entries.remove(key) {
            self.bytes = self.bytes.saturating_sub(s.byte_len());
            self.release(s);
        }
    }

    pub(crate) fn clear(&mut self) {
        let keys: Vec<String> = self.lru.iter().cloned().collect();
        for k in keys {
            self.remove(&k);
        }
    }

    /// Free pending bitmaps whose leases have all been dropped. Returns how many were freed.
    pub(crate) fn reap(&mut self) -> usize {
        let before = self.pending.len();
        self.pending.retain(|s| Arc::strong_count(s) > 1);
        let freed = before - self.pending.len();
        self.stats.released += freed as u64;
        freed
    }

    fn evict_over_budget(&mut self) {
        while self.lru.len() > 1
            && (self.lru.len() > self.max_entries || self.bytes > self.max_bytes)
        {
            let Some(old) = self.lru.pop_front() else {
                break;
            };
            if let Some(s) = self.entries.remove(&old) {
                self.bytes = self.bytes.saturating_sub(s.byte_len());
                self.stats.evictions += 1;
                tracing::debug!(key = %old, "evicted source bitmap");
                self.release(s);
            }
        }
    }

    fn release(&mut self, s: Arc<Surface>) {
        if Arc::strong_count(&s) > 1 {
            self.stats.deferred_releases += 1;
            self.pending.push(s);
        } else {
            self.stats.released += 1;
        }
    }

    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.lru.iter().position(|k| k == key) {
            self.lru.remove(pos);
        }
        self.lru.push_back(key.to_string());
    }
}

/// Decodes sources through the shared [`BitmapCache`].
pub(crate) struct SourceLoader {
    cache: Mutex<BitmapCache>,
}

impl SourceLoader {
    pub(crate) fn new(max_entries: usize, max_bytes: usize) -> Self {
        Self {
            cache: Mutex::new(BitmapCache::new(max_entries, max_bytes)),
        }
    }

    fn cache(&self) -> std::sync::MutexGuard<'_, BitmapCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Leased, decoded, oriented source for `key`. Decoding runs outside the cache lock.
    pub(crate) fn load(
        &self,
        input: &SourceInput,
        key: &str,
        cancel: &CancellationToken,
    ) -> FilmResult<Arc<Surface>> {
        if let Some(hit) = self.cache().get(key) {
            return Ok(hit);
        }
        cancel.check()?;
        let bytes = input.read()?;
        let surface = decode_source(&bytes)?;
        cancel.check()?;
        tracing::debug!(
            key,
            width = surface.width,
            height = surface.height,
            "decoded source"
        );
        Ok(self.cache().insert(key.to_string(), surface))
    }

    pub(crate) fn forget(&self, key: &str) {
        self.cache().remove(key);
    }

    pub(crate) fn reap(&self) -> usize {
        self.cache().reap()
    }

    pub(crate) fn clear(&self) {
        self.cache().clear();
    }

    pub(crate) fn stats(&self) -> BitmapCacheStats {
        self.cache().stats()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/source.rs"]
mod tests;
