//! Quick content fingerprint used as the thumbnail cache key.
//!
//! Hashes only the first and last 8 KiB of a file: image containers keep
//! their technical properties near the start, and the trailing block keeps
//! the collision risk low enough for cache addressing. Two files with
//! identical head and tail blocks but different middle bytes collide; that
//! is accepted, this is not an integrity proof.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::types::errors::{CoreError, CoreResult};

/// Bytes read from each end of the file.
pub const CHUNK_SIZE: u64 = 8192;

/// Compute the quick hash of the file at `path`.
///
/// Files of `CHUNK_SIZE` bytes or less are hashed whole (no tail seek).
/// Returns a 64-character lowercase hex digest (blake3, 32 bytes).
pub fn quick_hash(path: &Path) -> CoreResult<String> {
    let mut file = File::open(path)
        .map_err(|e| CoreError::Io(format!("unable to open {}: {e}", path.display())))?;
    let size = file
        .metadata()
        .map_err(|e| CoreError::Io(format!("unable to stat {}: {e}", path.display())))?
        .len();

    let mut hasher = blake3::Hasher::new();

    let head_len = size.min(CHUNK_SIZE) as usize;
    let mut head = vec![0u8; head_len];
    file.read_exact(&mut head)
        .map_err(|e| CoreError::Io(format!("unable to read {}: {e}", path.display())))?;
    hasher.update(&head);

    if size > CHUNK_SIZE {
        file.seek(SeekFrom::Start(size - CHUNK_SIZE))
            .map_err(|e| CoreError::Io(format!("unable to seek {}: {e}", path.display())))?;
        let mut tail = vec![0u8; CHUNK_SIZE as usize];
        file.read_exact(&mut tail)
            .map_err(|e| CoreError::Io(format!("unable to read {}: {e}", path.display())))?;
        hasher.update(&tail);
    }

    Ok(hasher.finalize().to_hex().to_string())
}

/// Hash an in-memory payload with the same digest as [`quick_hash`], so
/// clipboard entries and file entries share one key space.
pub fn payload_hash(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

#[cfg(test)]
#[path = "tests/quick_hash_tests.rs"]
mod tests;
