//! URL entry downloads.
//!
//! Payloads stream into `{root}/downloading/` first, so switching an
//! entry's tier mid-download needs no coordination; the finished file is
//! renamed into the target tier atomically. A size mismatch against the
//! announced length deletes the partial file.

use std::io::{Read, Write};
use std::path::PathBuf;

use crate::services::config::{CacheConfig, CacheTier};
use crate::types::errors::{CoreError, CoreResult};
use crate::types::events::{ClipboardEvent, ClipboardObserver};

/// Chunk size for streaming reads.
const READ_CHUNK: usize = 64 * 1024;

/// Raster extensions recognised in URLs; anything else stores as `bin`.
const URL_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "gif", "svg"];

/// File extension to store a downloaded URL payload under.
pub fn extension_for_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let extension = path
        .rsplit('.')
        .next()
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if URL_EXTENSIONS.contains(&extension.as_str()) {
        extension
    } else {
        "bin".to_string()
    }
}

/// Download `url` for the entry `hash`, landing in `tier`'s root.
///
/// Progress and completion are reported through `observer`. Returns the
/// final payload path and the byte count.
pub fn download(
    config: &CacheConfig,
    hash: &str,
    url: &str,
    tier: CacheTier,
    observer: &dyn ClipboardObserver,
) -> CoreResult<(PathBuf, u64)> {
    let extension = extension_for_url(url);
    let partial = config.downloading_dir().join(format!("{hash}.{extension}"));

    let outcome = stream_to(&partial, hash, url, observer);
    let total = match outcome {
        Ok(total) => total,
        Err(e) => {
            // No partial files survive a failed download.
            let _ = std::fs::remove_file(&partial);
            observer.on_event(ClipboardEvent::DownloadFinished {
                hash: hash.to_string(),
                ok: false,
            });
            return Err(e);
        }
    };

    let target = config.tier_dir(tier).join(format!("{hash}.{extension}"));
    std::fs::rename(&partial, &target)
        .map_err(|e| CoreError::Download(format!("unable to publish {url}: {e}")))?;

    observer.on_event(ClipboardEvent::DownloadFinished {
        hash: hash.to_string(),
        ok: true,
    });
    Ok((target, total))
}

fn stream_to(
    partial: &PathBuf,
    hash: &str,
    url: &str,
    observer: &dyn ClipboardObserver,
) -> CoreResult<u64> {
    let response = reqwest::blocking::get(url)
        .map_err(|e| CoreError::Download(format!("unable to fetch {url}: {e}")))?;
    if !response.status().is_success() {
        return Err(CoreError::Download(format!(
            "{url} answered {}",
            response.status()
        )));
    }

    let expected = response.content_length();
    let mut reader = response;
    let mut file = std::fs::File::create(partial)
        .map_err(|e| CoreError::Download(format!("unable to create {}: {e}", partial.display())))?;

    let mut received: u64 = 0;
    let mut buffer = vec![0u8; READ_CHUNK];
    loop {
        let read = reader
            .read(&mut buffer)
            .map_err(|e| CoreError::Download(format!("read failed for {url}: {e}")))?;
        if read == 0 {
            break;
        }
        file.write_all(&buffer[..read])
            .map_err(|e| CoreError::Download(format!("write failed: {e}")))?;
        received += read as u64;
        observer.on_event(ClipboardEvent::DownloadProgress {
            hash: hash.to_string(),
            received,
            total: expected,
        });
    }

    if let Some(expected) = expected {
        if received != expected {
            return Err(CoreError::Download(format!(
                "{url}: expected {expected} bytes, received {received}"
            )));
        }
    }
    Ok(received)
}

#[cfg(test)]
#[path = "tests/download_tests.rs"]
mod tests;
