//! Cache configuration: an explicit value constructed at startup and
//! threaded through the thumbnail cache and clipboard pool. Construction
//! owns the directory layout; teardown is implicit on drop.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::services::files::format::{ThumbnailFormat, ThumbnailSize};
use crate::types::errors::{CoreError, CoreResult};

/// Default ceiling for the session tier, 1 GiB.
pub const DEFAULT_SESSION_MAX_BYTES: u64 = 1024 * 1024 * 1024;

/// Storage partition of the cache. Session entries are flushed on startup;
/// persistent entries survive process restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheTier {
    Session,
    Persistent,
}

impl CacheTier {
    pub fn dir_name(&self) -> &'static str {
        match self {
            CacheTier::Session => "session",
            CacheTier::Persistent => "persistent",
        }
    }

    pub fn other(&self) -> CacheTier {
        match self {
            CacheTier::Session => CacheTier::Persistent,
            CacheTier::Persistent => CacheTier::Session,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    root: PathBuf,
    thumbnail_format: ThumbnailFormat,
    default_size: ThumbnailSize,
    session_max_bytes: u64,
}

impl CacheConfig {
    /// Build the config and materialise the cache layout under `root`:
    /// `{root}/{session|persistent}/{64|128|256|512}/` plus a transient
    /// `{root}/downloading/`, which is purged here.
    ///
    /// An unusable root is the single terminal startup error of the core.
    pub fn new(root: &Path) -> CoreResult<CacheConfig> {
        let config = CacheConfig {
            root: root.to_path_buf(),
            thumbnail_format: ThumbnailFormat::Jpeg,
            default_size: ThumbnailSize::Medium,
            session_max_bytes: DEFAULT_SESSION_MAX_BYTES,
        };
        config.init_layout()?;
        Ok(config)
    }

    pub fn with_thumbnail_format(mut self, format: ThumbnailFormat) -> CacheConfig {
        self.thumbnail_format = format;
        self
    }

    pub fn with_default_size(mut self, size: ThumbnailSize) -> CacheConfig {
        self.default_size = size;
        self
    }

    pub fn with_session_max_bytes(mut self, bytes: u64) -> CacheConfig {
        self.session_max_bytes = bytes;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn thumbnail_format(&self) -> ThumbnailFormat {
        self.thumbnail_format
    }

    pub fn default_size(&self) -> ThumbnailSize {
        self.default_size
    }

    pub fn session_max_bytes(&self) -> u64 {
        self.session_max_bytes
    }

    pub fn tier_dir(&self, tier: CacheTier) -> PathBuf {
        self.root.join(tier.dir_name())
    }

    pub fn size_dir(&self, tier: CacheTier, size: ThumbnailSize) -> PathBuf {
        self.tier_dir(tier).join(size.pixels().to_string())
    }

    pub fn downloading_dir(&self) -> PathBuf {
        self.root.join("downloading")
    }

    fn init_layout(&self) -> CoreResult<()> {
        for tier in [CacheTier::Session, CacheTier::Persistent] {
            for size in ThumbnailSize::ALL {
                std::fs::create_dir_all(self.size_dir(tier, size)).map_err(|e| {
                    CoreError::Io(format!(
                        "unable to create cache directory under {}: {e}",
                        self.root.display()
                    ))
                })?;
            }
        }
        let downloading = self.downloading_dir();
        std::fs::create_dir_all(&downloading).map_err(|e| {
            CoreError::Io(format!(
                "unable to create {}: {e}",
                downloading.display()
            ))
        })?;

        // In-progress downloads do not survive a restart.
        if let Ok(entries) = std::fs::read_dir(&downloading) {
            for entry in entries.flatten() {
                if entry.path().is_file() {
                    if let Err(e) = std::fs::remove_file(entry.path()) {
                        log::warn!(
                            "unable to purge stale download {}: {e}",
                            entry.path().display()
                        );
                    }
                }
            }
        }
        Ok(())
    }
}

/// All regular files under a tier directory.
pub fn tier_files(tier_dir: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(tier_dir)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect()
}

/// Files whose stem is exactly `hash` (any extension), across a tier.
pub fn hash_files(tier_dir: &Path, hash: &str) -> Vec<PathBuf> {
    tier_files(tier_dir)
        .into_iter()
        .filter(|path| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy() == hash)
                .unwrap_or(false)
        })
        .collect()
}

/// Move every `{hash}.*` file into `tier`, preserving the tier-relative
/// layout (tier root and size directories alike). Returns the number of
/// files moved.
pub fn move_hash_files(config: &CacheConfig, hash: &str, tier: CacheTier) -> CoreResult<usize> {
    let from = config.tier_dir(tier.other());
    let to = config.tier_dir(tier);

    let mut moved = 0;
    for entry in hash_files(&from, hash) {
        let relative = entry
            .strip_prefix(&from)
            .map_err(|e| CoreError::Cache(format!("foreign cache path: {e}")))?
            .to_path_buf();
        let target = to.join(&relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::rename(&entry, &target)
            .map_err(|e| CoreError::Cache(format!("unable to move {}: {e}", entry.display())))?;
        moved += 1;
    }
    Ok(moved)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
