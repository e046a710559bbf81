//! Path helpers shared by the enumerator and the caches.

use std::path::{Path, PathBuf};

/// Canonical form used for cross-path deduplication. Falls back to the
/// input when the file vanished between enumeration and canonicalisation.
pub fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Hidden-file convention: a dotted final component. Host-filesystem
/// hidden attributes (NTFS) are the shell's concern; the dot convention is
/// what the core can decide portably.
pub fn is_hidden_name(name: &str) -> bool {
    name.starts_with('.')
}

/// Lowercase extension without the dot; `kra~` keeps its backup marker.
pub fn extension_of(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if name.ends_with(crate::BACKUP_SUFFIX) {
        return "kra~".to_string();
    }
    Path::new(&name)
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "tests/path_utils_tests.rs"]
mod tests;
