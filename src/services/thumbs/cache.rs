//! Content-addressed thumbnail store.
//!
//! Layout: `{root}/{session|persistent}/{64|128|256|512}/{hash}.{ext}`.
//! Read-through on demand, falling back to larger cached sizes before a
//! full generation. Writes go to a temp file first and are renamed into
//! place, so a failed generation never leaves a partial file. Per-hash
//! generation is serialised by a lock map.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use image::DynamicImage;

use crate::services::config::{self, CacheConfig, CacheTier};
use crate::services::files::descriptor::FileDescriptor;
use crate::services::files::format::ThumbnailSize;
use crate::services::thumbs::render;
use crate::types::errors::{CoreError, CoreResult};

pub struct ThumbnailCache {
    config: CacheConfig,
    generation_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ThumbnailCache {
    pub fn new(config: CacheConfig) -> ThumbnailCache {
        ThumbnailCache {
            config,
            generation_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Slot a thumbnail of `hash` at `size` would occupy in `tier`.
    pub fn slot_path(&self, tier: CacheTier, size: ThumbnailSize, hash: &str) -> PathBuf {
        self.config.size_dir(tier, size).join(format!(
            "{hash}.{}",
            self.config.thumbnail_format().extension()
        ))
    }

    /// Return the thumbnail for a descriptor at `size` (the configured
    /// default when `None`).
    ///
    /// With `use_cache`: an exact-size hit is returned as stored; a hit at
    /// a larger size is downscaled on the fly and not persisted; a miss
    /// generates from the source, stores into the session tier and
    /// returns the stored rendition. Without `use_cache` the thumbnail is
    /// computed from the source and nothing is written.
    pub fn thumbnail(
        &self,
        descriptor: &FileDescriptor,
        size: Option<ThumbnailSize>,
        use_cache: bool,
    ) -> CoreResult<DynamicImage> {
        let size = size.unwrap_or_else(|| self.config.default_size());
        let hash = descriptor.hash();
        if hash.is_empty() {
            return Err(CoreError::Cache(format!(
                "descriptor for {} has no hash",
                descriptor.full_path_name()
            )));
        }

        if !use_cache {
            let source = render::load_source_image(descriptor)?;
            return Ok(render::downscale(&source, size));
        }

        if let Some(image) = self.read_through(hash, size)? {
            return Ok(image);
        }

        // Coalesce concurrent generations of the same hash.
        let lock = self.lock_for(hash);
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        // Another reader may have generated while we waited.
        if let Some(image) = self.read_through(hash, size)? {
            return Ok(image);
        }

        let source = render::load_source_image(descriptor)?;
        let thumbnail = render::downscale(&source, size);
        let encoded = render::encode(&thumbnail, self.config.thumbnail_format(), size)?;

        // A failed write is logged, not fatal: the computed thumbnail is
        // still returned, only the cache entry is skipped.
        if let Err(e) = self.write_slot(CacheTier::Session, size, hash, &encoded) {
            log::warn!("unable to cache thumbnail for {hash}: {e}");
            return Ok(thumbnail);
        }
        self.evict_session();

        // Return the stored rendition so repeated reads are
        // pixel-identical.
        render::decode(&encoded)
    }

    /// Exact slot, then larger sizes (persistent tier first).
    fn read_through(&self, hash: &str, size: ThumbnailSize) -> CoreResult<Option<DynamicImage>> {
        for tier in [CacheTier::Persistent, CacheTier::Session] {
            let slot = self.slot_path(tier, size, hash);
            if slot.is_file() {
                return render::decode(&std::fs::read(&slot)?).map(Some);
            }
        }

        let mut larger = size.larger();
        while let Some(source_size) = larger {
            for tier in [CacheTier::Persistent, CacheTier::Session] {
                let slot = self.slot_path(tier, source_size, hash);
                if slot.is_file() {
                    let image = render::decode(&std::fs::read(&slot)?)?;
                    // Derived rendition is not persisted.
                    return Ok(Some(render::downscale(&image, size)));
                }
            }
            larger = source_size.larger();
        }
        Ok(None)
    }

    fn lock_for(&self, hash: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .generation_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(hash.to_string()).or_default().clone()
    }

    /// Temp-file write then rename, atomic on the same filesystem.
    fn write_slot(
        &self,
        tier: CacheTier,
        size: ThumbnailSize,
        hash: &str,
        bytes: &[u8],
    ) -> CoreResult<()> {
        let slot = self.slot_path(tier, size, hash);
        let dir = self.config.size_dir(tier, size);
        let mut temp = tempfile::NamedTempFile::new_in(&dir)
            .map_err(|e| CoreError::Cache(format!("unable to create temp file: {e}")))?;
        temp.write_all(bytes)
            .map_err(|e| CoreError::Cache(format!("unable to write thumbnail: {e}")))?;
        temp.persist(&slot)
            .map_err(|e| CoreError::Cache(format!("unable to publish thumbnail: {e}")))?;
        Ok(())
    }

    /// Move every `{hash}.*` file to the other tier when the flag
    /// changes. Returns the number of files moved.
    pub fn set_persistent(&self, hash: &str, persistent: bool) -> CoreResult<usize> {
        let to = if persistent {
            CacheTier::Persistent
        } else {
            CacheTier::Session
        };
        config::move_hash_files(&self.config, hash, to)
    }

    /// Remove every cached file of a tier.
    pub fn flush(&self, tier: CacheTier) -> CoreResult<usize> {
        let mut removed = 0;
        for file in config::tier_files(&self.config.tier_dir(tier)) {
            std::fs::remove_file(&file)?;
            removed += 1;
        }
        Ok(removed)
    }

    /// `(file count, total bytes)` of a tier.
    pub fn tier_size(&self, tier: CacheTier) -> (usize, u64) {
        let mut count = 0;
        let mut bytes = 0;
        for file in config::tier_files(&self.config.tier_dir(tier)) {
            if let Ok(meta) = std::fs::metadata(&file) {
                count += 1;
                bytes += meta.len();
            }
        }
        (count, bytes)
    }

    /// Drop the oldest session files until the tier fits the configured
    /// ceiling. The persistent tier is never touched.
    fn evict_session(&self) {
        let ceiling = self.config.session_max_bytes();
        let (_, mut bytes) = self.tier_size(CacheTier::Session);
        if bytes <= ceiling {
            return;
        }

        let mut files: Vec<(PathBuf, std::time::SystemTime, u64)> =
            config::tier_files(&self.config.tier_dir(CacheTier::Session))
                .into_iter()
                .filter_map(|path| {
                    let meta = std::fs::metadata(&path).ok()?;
                    Some((path, meta.modified().ok()?, meta.len()))
                })
                .collect();
        files.sort_by_key(|(_, modified, _)| *modified);

        for (path, _, len) in files {
            if bytes <= ceiling {
                break;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => bytes = bytes.saturating_sub(len),
                Err(e) => log::warn!("unable to evict {}: {e}", path.display()),
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/cache_tests.rs"]
mod tests;
