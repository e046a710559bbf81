//! The clipboard pool: turns clipboard payloads handed over by the host
//! shell into cache entries equivalent to file entries.
//!
//! The host owns the actual clipboard; the core classifies the extracted
//! payload, creates at most one entry per distinct content hash, and
//! refreshes the timestamp when the same content reappears. Session
//! entries are flushed at startup, before the persistent pool is
//! reloaded from its sidecars.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use image::RgbaImage;
use regex::Regex;

use crate::services::clipboard::download;
use crate::services::clipboard::entry::{ClipboardEntry, EntryKind};
use crate::services::config::{self, CacheConfig, CacheTier};
use crate::services::files::quick_hash::payload_hash;
use crate::types::errors::{CoreError, CoreResult};
use crate::types::events::{ClipboardEvent, ClipboardObserver};

/// Largest edge stored for raster payloads; bigger images are downscaled
/// before caching.
const STORED_IMAGE_EDGE: u32 = 512;

#[derive(Debug, Clone, Copy)]
pub struct ClipboardOptions {
    /// Scan text/html payloads for raster URLs.
    pub parse_text_html: bool,
    /// Download URL entries as soon as they are created. Downloads block
    /// the calling thread; hosts that care run `ingest` off their
    /// coordinator.
    pub url_autoload: bool,
    /// Tier for newly created entries.
    pub default_persistent: bool,
}

impl Default for ClipboardOptions {
    fn default() -> Self {
        ClipboardOptions {
            parse_text_html: true,
            url_autoload: false,
            default_persistent: false,
        }
    }
}

/// Raw RGBA pixels handed over by the host.
#[derive(Debug, Clone)]
pub struct RasterPayload {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// One clipboard change, as extracted by the host shell.
#[derive(Debug, Clone)]
pub enum ClipboardPayload {
    /// File URLs, local paths, or http(s) URLs.
    Urls(Vec<String>),
    Image(RasterPayload),
    Svg {
        data: Vec<u8>,
        raster: Option<RasterPayload>,
    },
    /// A Krita node or selection blob; only forms an entry when a raster
    /// companion is present.
    KritaNode {
        blob: Vec<u8>,
        raster: Option<RasterPayload>,
    },
    Html {
        html: String,
        raster: Option<RasterPayload>,
    },
    Text(String),
}

pub struct ClipboardPool {
    config: CacheConfig,
    options: ClipboardOptions,
    observer: Arc<dyn ClipboardObserver>,
    entries: HashMap<String, ClipboardEntry>,
    enabled: bool,
    html_img: Regex,
    html_link: Regex,
    text_url: Regex,
}

impl ClipboardPool {
    /// Flushes the session payloads, then reloads the persistent pool
    /// from its sidecars.
    pub fn new(
        config: CacheConfig,
        options: ClipboardOptions,
        observer: Arc<dyn ClipboardObserver>,
    ) -> CoreResult<ClipboardPool> {
        let mut pool = ClipboardPool {
            config,
            options,
            observer,
            entries: HashMap::new(),
            enabled: true,
            html_img: Regex::new(
                r#"(?i)<img[^>]*\ssrc=["'](https?://[^"']+?\.(?:jpeg|jpg|png|gif|svg)[^"']*?)["']"#,
            )
            .expect("static pattern"),
            html_link: Regex::new(
                r#"(?i)<a[^>]*\shref=["'](https?://[^"']+?\.(?:jpeg|jpg|png|gif|svg)[^"']*?)["']"#,
            )
            .expect("static pattern"),
            text_url: Regex::new(
                r#"(?i)https?://[^\s"'<>]+\.(?:jpeg|jpg|png|svg|gif)(?:\?[^\s"'<>]*)?"#,
            )
            .expect("static pattern"),
        };
        pool.flush_tier_payloads(CacheTier::Session)?;
        pool.reload_persistent()?;
        Ok(pool)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, hash: &str) -> Option<&ClipboardEntry> {
        self.entries.get(hash)
    }

    pub fn hashes(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// While disabled, `ingest` is a no-op and produces no events.
    pub fn set_enabled(&mut self, value: bool) {
        self.enabled = value;
    }

    /// Path of an entry's payload file, when one exists on disk.
    pub fn payload_path(&self, hash: &str) -> Option<PathBuf> {
        let entry = self.entries.get(hash)?;
        self.root_hash_files(tier_of(entry), hash)
            .into_iter()
            .find(|path| path.extension().map(|e| e != "json").unwrap_or(false))
    }

    /// `{hash}.*` files directly at a tier root. Payloads and sidecars
    /// live there; the size directories hold thumbnail renditions owned
    /// by the thumbnail cache under the same key space, so the pool
    /// never walks into them.
    fn root_hash_files(&self, tier: CacheTier, hash: &str) -> Vec<PathBuf> {
        let dir = self.config.tier_dir(tier);
        let Ok(entries) = std::fs::read_dir(&dir) else {
            return Vec::new();
        };
        entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.file_stem()
                    .map(|stem| stem.to_string_lossy() == hash)
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Classify one clipboard change and create/refresh entries.
    /// Returns the affected hashes; emits `Added` when non-empty.
    pub fn ingest(&mut self, payload: ClipboardPayload) -> CoreResult<Vec<String>> {
        if !self.enabled {
            return Ok(Vec::new());
        }

        let hashes = match payload {
            ClipboardPayload::Urls(urls) => self.ingest_urls(&urls, "URI list")?,
            ClipboardPayload::Image(raster) => {
                self.ingest_image(raster, None, String::new())?.into_iter().collect()
            }
            ClipboardPayload::Svg { data, raster } => self.ingest_svg(&data, raster)?,
            ClipboardPayload::KritaNode { blob, raster } => match raster {
                Some(raster) => self.ingest_kra(&blob, raster)?,
                // A bare blob without pixels has nothing to preview.
                None => Vec::new(),
            },
            ClipboardPayload::Html { html, raster } => match raster {
                Some(raster) => {
                    let url_origin = self
                        .html_img
                        .captures(&html)
                        .and_then(|c| c.get(1))
                        .map(|m| m.as_str().to_string());
                    self.ingest_image(raster, url_origin, "HTML link".to_string())?
                        .into_iter()
                        .collect()
                }
                None => {
                    if self.options.parse_text_html {
                        let urls = self.extract_html_urls(&html);
                        self.ingest_urls(&urls, "HTML page")?
                    } else {
                        Vec::new()
                    }
                }
            },
            ClipboardPayload::Text(text) => {
                if self.options.parse_text_html {
                    let urls: Vec<String> = self
                        .text_url
                        .find_iter(&text)
                        .map(|m| m.as_str().to_string())
                        .collect();
                    self.ingest_urls(&dedup(urls), "Text document")?
                } else {
                    Vec::new()
                }
            }
        };

        if !hashes.is_empty() {
            self.evict_session()?;
            self.observer.on_event(ClipboardEvent::Added {
                hashes: hashes.clone(),
            });
        }
        Ok(hashes)
    }

    fn ingest_urls(&mut self, urls: &[String], origin: &str) -> CoreResult<Vec<String>> {
        let mut hashes = Vec::new();
        for url in urls {
            if url.starts_with("http://") || url.starts_with("https://") {
                let hash = payload_hash(url.as_bytes());
                if self.refresh(&hash, origin)? {
                    hashes.push(hash);
                    continue;
                }
                let mut entry = self.new_entry(&hash, EntryKind::UrlEntry);
                entry.origin = origin.to_string();
                entry.url = Some(url.to_string());
                self.store_entry(entry)?;
                if self.options.url_autoload {
                    if let Err(e) = self.download_entry(&hash) {
                        log::warn!("autoload failed for {url}: {e}");
                    }
                }
                hashes.push(hash);
            } else {
                // file:// URL or plain local path
                let path = url.strip_prefix("file://").unwrap_or(url);
                let canonical =
                    crate::services::fs_utils::path_utils::canonical(std::path::Path::new(path));
                let hash = payload_hash(canonical.to_string_lossy().as_bytes());
                if self.refresh(&hash, origin)? {
                    hashes.push(hash);
                    continue;
                }
                let mut entry = self.new_entry(&hash, EntryKind::FileEntry);
                entry.origin = origin.to_string();
                entry.file_name = Some(canonical.to_string_lossy().to_string());
                self.store_entry(entry)?;
                hashes.push(hash);
            }
        }
        Ok(hashes)
    }

    fn ingest_image(
        &mut self,
        raster: RasterPayload,
        url_origin: Option<String>,
        origin: String,
    ) -> CoreResult<Option<String>> {
        let hash = payload_hash(&raster.pixels);
        if let Some(entry) = self.entries.get_mut(&hash) {
            entry.timestamp = now();
            if url_origin.is_some() {
                entry.url_origin = url_origin;
            }
            if !origin.is_empty() {
                entry.origin = origin;
            }
            let entry = entry.clone();
            self.write_sidecar(&entry)?;
            return Ok(Some(hash));
        }

        let image = decode_raster(&raster)?;
        let mut entry = self.new_entry(&hash, EntryKind::ImageEntry);
        entry.origin = origin;
        entry.url_origin = url_origin;
        entry.image_size = Some((raster.width as i32, raster.height as i32));
        self.store_png(&hash, &image, entry.persistent)?;
        self.store_entry(entry)?;
        Ok(Some(hash))
    }

    fn ingest_svg(
        &mut self,
        data: &[u8],
        raster: Option<RasterPayload>,
    ) -> CoreResult<Vec<String>> {
        let hash = payload_hash(data);
        if self.refresh(&hash, "")? {
            return Ok(vec![hash]);
        }

        let mut entry = self.new_entry(&hash, EntryKind::SvgEntry);
        let tier = tier_of(&entry);
        std::fs::write(
            self.config.tier_dir(tier).join(format!("{hash}.svg")),
            data,
        )?;
        if let Some(raster) = raster {
            entry.image_size = Some((raster.width as i32, raster.height as i32));
            let image = decode_raster(&raster)?;
            self.store_png(&hash, &image, entry.persistent)?;
        }
        self.store_entry(entry)?;
        Ok(vec![hash])
    }

    fn ingest_kra(&mut self, blob: &[u8], raster: RasterPayload) -> CoreResult<Vec<String>> {
        let hash = payload_hash(blob);
        if self.refresh(&hash, "application/x-krita-node")? {
            return Ok(vec![hash]);
        }

        let mut entry = self.new_entry(&hash, EntryKind::KraEntry);
        entry.origin = "application/x-krita-node".to_string();
        entry.image_size = Some((raster.width as i32, raster.height as i32));
        let tier = tier_of(&entry);
        std::fs::write(
            self.config.tier_dir(tier).join(format!("{hash}.kra")),
            blob,
        )?;
        let image = decode_raster(&raster)?;
        self.store_png(&hash, &image, entry.persistent)?;
        self.store_entry(entry)?;
        Ok(vec![hash])
    }

    /// Timestamp refresh for an already-pooled hash. Returns true when
    /// the hash was present.
    fn refresh(&mut self, hash: &str, origin: &str) -> CoreResult<bool> {
        let Some(entry) = self.entries.get_mut(hash) else {
            return Ok(false);
        };
        entry.timestamp = now();
        if !origin.is_empty() {
            entry.origin = origin.to_string();
        }
        let entry = entry.clone();
        self.write_sidecar(&entry)?;
        Ok(true)
    }

    /// Run the pending download of one URL entry, updating its sidecar
    /// with the received size (and dimensions when decodable).
    pub fn download_entry(&mut self, hash: &str) -> CoreResult<PathBuf> {
        let (url, tier) = {
            let entry = self
                .entries
                .get(hash)
                .ok_or_else(|| CoreError::Cache(format!("no entry for {hash}")))?;
            let url = entry
                .url
                .clone()
                .ok_or_else(|| CoreError::Cache(format!("{hash} is not a url entry")))?;
            (url, tier_of(entry))
        };

        let (path, received) =
            download::download(&self.config, hash, &url, tier, self.observer.as_ref())?;

        if let Some(entry) = self.entries.get_mut(hash) {
            entry.download_size = Some(received);
            if let Ok(bytes) = std::fs::read(&path) {
                if let Ok(image) = image::load_from_memory(&bytes) {
                    entry.image_size = Some((image.width() as i32, image.height() as i32));
                }
            }
            let entry = entry.clone();
            self.write_sidecar(&entry)?;
        }
        Ok(path)
    }

    /// Download every URL entry that has no payload on disk yet.
    pub fn start_downloads(&mut self) -> Vec<String> {
        let pending: Vec<String> = self
            .entries
            .values()
            .filter(|e| e.kind == EntryKind::UrlEntry)
            .map(|e| e.hash.clone())
            .filter(|hash| self.payload_path(hash).is_none())
            .collect();

        let mut finished = Vec::new();
        for hash in pending {
            match self.download_entry(&hash) {
                Ok(_) => finished.push(hash),
                Err(e) => log::warn!("download failed for {hash}: {e}"),
            }
        }
        finished
    }

    /// Move an entry between tiers; every `{hash}.*` file follows the
    /// flag. Emits `PersistentChanged`.
    pub fn set_persistent(&mut self, hash: &str, value: bool) -> CoreResult<bool> {
        let Some(entry) = self.entries.get_mut(hash) else {
            return Ok(false);
        };
        if entry.persistent == value {
            return Ok(false);
        }
        entry.persistent = value;
        let entry = entry.clone();

        let to = if value {
            CacheTier::Persistent
        } else {
            CacheTier::Session
        };
        config::move_hash_files(&self.config, hash, to)?;
        self.write_sidecar(&entry)?;
        self.observer.on_event(ClipboardEvent::PersistentChanged {
            hash: hash.to_string(),
            persistent: value,
        });
        Ok(true)
    }

    /// `(entry count, payload bytes)` of a tier, counted over the pool.
    pub fn cache_size(&self, tier: CacheTier) -> (usize, u64) {
        let mut count = 0;
        let mut bytes = 0;
        for entry in self.entries.values() {
            if tier_of(entry) != tier {
                continue;
            }
            count += 1;
            bytes += self.entry_bytes(&entry.hash, tier);
        }
        (count, bytes)
    }

    fn entry_bytes(&self, hash: &str, tier: CacheTier) -> u64 {
        self.root_hash_files(tier, hash)
            .iter()
            .filter_map(|path| std::fs::metadata(path).ok())
            .map(|meta| meta.len())
            .sum()
    }

    /// Drop session entries and their files.
    pub fn flush_session(&mut self) -> CoreResult<usize> {
        let removed = self.flush_tier_payloads(CacheTier::Session)?;
        self.entries.retain(|_, entry| entry.persistent);
        Ok(removed)
    }

    /// Drop persistent entries and their files.
    pub fn flush_persistent(&mut self) -> CoreResult<usize> {
        let removed = self.flush_tier_payloads(CacheTier::Persistent)?;
        self.entries.retain(|_, entry| !entry.persistent);
        Ok(removed)
    }

    /// Oldest session entries are dropped until the tier fits the
    /// ceiling. Persistent entries are never candidates. Emits
    /// `Removed` when anything was dropped.
    fn evict_session(&mut self) -> CoreResult<()> {
        let ceiling = self.config.session_max_bytes();
        let (_, mut bytes) = self.cache_size(CacheTier::Session);
        if bytes <= ceiling {
            return Ok(());
        }

        let mut session: Vec<(String, f64)> = self
            .entries
            .values()
            .filter(|e| !e.persistent)
            .map(|e| (e.hash.clone(), e.timestamp))
            .collect();
        session.sort_by(|a, b| a.1.total_cmp(&b.1));

        let mut removed = Vec::new();
        for (hash, _) in session {
            if bytes <= ceiling {
                break;
            }
            let entry_bytes = self.entry_bytes(&hash, CacheTier::Session);
            for file in self.root_hash_files(CacheTier::Session, &hash) {
                if let Err(e) = std::fs::remove_file(&file) {
                    log::warn!("unable to evict {}: {e}", file.display());
                }
            }
            self.entries.remove(&hash);
            bytes = bytes.saturating_sub(entry_bytes);
            removed.push(hash);
        }

        if !removed.is_empty() {
            self.observer
                .on_event(ClipboardEvent::Removed { hashes: removed });
        }
        Ok(())
    }

    fn new_entry(&self, hash: &str, kind: EntryKind) -> ClipboardEntry {
        ClipboardEntry::new(hash, kind, now(), self.options.default_persistent)
    }

    fn store_entry(&mut self, entry: ClipboardEntry) -> CoreResult<()> {
        self.write_sidecar(&entry)?;
        self.entries.insert(entry.hash.clone(), entry);
        Ok(())
    }

    fn write_sidecar(&self, entry: &ClipboardEntry) -> CoreResult<()> {
        let tier = tier_of(entry);
        let path = self
            .config
            .tier_dir(tier)
            .join(format!("{}.json", entry.hash));
        let json = serde_json::to_string_pretty(&entry.to_sidecar())
            .map_err(|e| CoreError::Cache(format!("unable to render sidecar: {e}")))?;
        std::fs::write(&path, json)?;
        Ok(())
    }

    /// Store a raster payload as PNG, downscaled to the cache edge.
    fn store_png(
        &self,
        hash: &str,
        image: &image::DynamicImage,
        persistent: bool,
    ) -> CoreResult<()> {
        let tier = if persistent {
            CacheTier::Persistent
        } else {
            CacheTier::Session
        };
        let stored = if image.width() > STORED_IMAGE_EDGE || image.height() > STORED_IMAGE_EDGE {
            image.resize(
                STORED_IMAGE_EDGE,
                STORED_IMAGE_EDGE,
                image::imageops::FilterType::Lanczos3,
            )
        } else {
            image.clone()
        };
        let path = self.config.tier_dir(tier).join(format!("{hash}.png"));
        stored
            .save_with_format(&path, image::ImageFormat::Png)
            .map_err(|e| CoreError::Cache(format!("unable to store {hash}: {e}")))?;
        Ok(())
    }

    /// Remove payloads and sidecars stored directly at a tier root.
    /// Thumbnail renditions in the size directories belong to the
    /// thumbnail cache and are left alone.
    fn flush_tier_payloads(&self, tier: CacheTier) -> CoreResult<usize> {
        let mut removed = 0;
        let dir = self.config.tier_dir(tier);
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.path().is_file() {
                std::fs::remove_file(entry.path())?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn reload_persistent(&mut self) -> CoreResult<()> {
        let dir = self.config.tier_dir(CacheTier::Persistent);
        for file in std::fs::read_dir(&dir)? {
            let file = file?;
            let path = file.path();
            if !path.is_file() || path.extension().map(|e| e != "json").unwrap_or(true) {
                continue;
            }
            let Some(hash) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
                continue;
            };
            let json = std::fs::read_to_string(&path)?;
            let sidecar: serde_json::Value = match serde_json::from_str(&json) {
                Ok(value) => value,
                Err(e) => {
                    log::warn!("unreadable sidecar {}: {e}", path.display());
                    continue;
                }
            };
            match ClipboardEntry::from_sidecar(&hash, &sidecar) {
                Ok(entry) => {
                    self.entries.insert(hash, entry);
                }
                Err(e) => log::warn!("skipping sidecar {}: {e}", path.display()),
            }
        }
        Ok(())
    }

    fn extract_html_urls(&self, html: &str) -> Vec<String> {
        let mut urls = Vec::new();
        for regex in [&self.html_img, &self.html_link] {
            for captures in regex.captures_iter(html) {
                if let Some(url) = captures.get(1) {
                    urls.push(url.as_str().to_string());
                }
            }
        }
        dedup(urls)
    }
}

fn tier_of(entry: &ClipboardEntry) -> CacheTier {
    if entry.persistent {
        CacheTier::Persistent
    } else {
        CacheTier::Session
    }
}

fn now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

fn dedup(urls: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    urls.into_iter().filter(|u| seen.insert(u.clone())).collect()
}

fn decode_raster(raster: &RasterPayload) -> CoreResult<image::DynamicImage> {
    let buffer = RgbaImage::from_raw(raster.width, raster.height, raster.pixels.clone())
        .ok_or_else(|| {
            CoreError::Format(format!(
                "raster payload does not fit {}x{}",
                raster.width, raster.height
            ))
        })?;
    Ok(image::DynamicImage::ImageRgba8(buffer))
}

#[cfg(test)]
#[path = "tests/pool_tests.rs"]
mod tests;
