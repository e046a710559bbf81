//! File descriptors: the value objects flowing through the pipeline.
//!
//! A descriptor summarises identity, location, size, timestamp, detected
//! format, image dimensions and read status. Directories share the struct
//! through [`FileDescriptor::directory`]; their numeric properties are
//! undefined.

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};

use crate::services::files::format::{FileProperty, FormatTag};
use crate::services::files::probe;
use crate::services::files::quick_hash;

/// Value returned by the uniform [`FileDescriptor::property`] accessor.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Str(String),
    Int(i64),
    Date(f64),
    Format(FormatTag),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    full_path: String,
    directory: String,
    name: String,
    /// Last modification time, POSIX seconds.
    modified: f64,
    format: FormatTag,
    readable: bool,
    size: u64,
    /// `(-1, -1)` when unknown or not applicable.
    image_size: (i32, i32),
    /// Empty when the file is unreadable.
    hash: String,
}

impl FileDescriptor {
    /// Build a descriptor for a regular file: stat, probe, quick-hash.
    ///
    /// Existence and is-a-file checks are the caller's concern (the
    /// enumerator has already made them); per-file I/O failures degrade to
    /// an unreadable descriptor rather than an error.
    pub fn from_file(path: &Path) -> FileDescriptor {
        let (modified, size) = stat(path);
        let extension = extension_hint(path);
        let result = probe::probe(path, &extension);

        let hash = if result.readable {
            match quick_hash::quick_hash(path) {
                Ok(hash) => hash,
                Err(e) => {
                    log::debug!("quick hash failed for {}: {e}", path.display());
                    String::new()
                }
            }
        } else {
            String::new()
        };
        // A file without a fingerprint has no metadata identity.
        let readable = result.readable && !hash.is_empty();

        FileDescriptor {
            full_path: path.to_string_lossy().to_string(),
            directory: parent_of(path),
            name: name_of(path),
            modified,
            format: result.format,
            readable,
            size,
            image_size: result.image_size.unwrap_or((-1, -1)),
            hash,
        }
    }

    /// Build a descriptor for a directory row.
    pub fn directory(path: &Path) -> FileDescriptor {
        let (modified, _) = stat(path);
        FileDescriptor {
            full_path: path.to_string_lossy().to_string(),
            directory: parent_of(path),
            name: name_of(path),
            modified,
            format: FormatTag::Directory,
            readable: true,
            size: 0,
            image_size: (-1, -1),
            hash: String::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.directory
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn full_path_name(&self) -> &str {
        &self.full_path
    }

    pub fn format(&self) -> FormatTag {
        self.format
    }

    pub fn modified(&self) -> f64 {
        self.modified
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn image_size(&self) -> (i32, i32) {
        self.image_size
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn readable(&self) -> bool {
        self.readable
    }

    pub fn is_directory(&self) -> bool {
        self.format.is_directory()
    }

    /// Width/height ratio, `None` for directories or unknown dimensions.
    pub fn image_ratio(&self) -> Option<f64> {
        let (w, h) = self.image_size;
        if w > 0 && h > 0 {
            Some(w as f64 / h as f64)
        } else {
            None
        }
    }

    /// Total pixel count, `None` for directories or unknown dimensions.
    pub fn image_pixels(&self) -> Option<i64> {
        let (w, h) = self.image_size;
        if w > 0 && h > 0 {
            Some(w as i64 * h as i64)
        } else {
            None
        }
    }

    /// Uniform property accessor. Numeric properties return `None` for
    /// directories; image dimensions return `None` when unknown.
    pub fn property(&self, property: FileProperty) -> Option<PropertyValue> {
        match property {
            FileProperty::Path => Some(PropertyValue::Str(self.directory.clone())),
            FileProperty::FullPathname => Some(PropertyValue::Str(self.full_path.clone())),
            FileProperty::FileName => Some(PropertyValue::Str(self.name.clone())),
            FileProperty::FileFormat => Some(PropertyValue::Format(self.format)),
            FileProperty::FileDate => Some(PropertyValue::Date(self.modified)),
            FileProperty::FileSize => {
                if self.is_directory() {
                    None
                } else {
                    Some(PropertyValue::Int(self.size as i64))
                }
            }
            FileProperty::ImageWidth => {
                if self.is_directory() || self.image_size.0 < 0 {
                    None
                } else {
                    Some(PropertyValue::Int(self.image_size.0 as i64))
                }
            }
            FileProperty::ImageHeight => {
                if self.is_directory() || self.image_size.1 < 0 {
                    None
                } else {
                    Some(PropertyValue::Int(self.image_size.1 as i64))
                }
            }
        }
    }
}

fn stat(path: &Path) -> (f64, u64) {
    match std::fs::metadata(path) {
        Ok(meta) => {
            let modified = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs_f64())
                .unwrap_or(0.0);
            (modified, meta.len())
        }
        Err(e) => {
            log::debug!("unable to stat {}: {e}", path.display());
            (0.0, 0)
        }
    }
}

fn parent_of(path: &Path) -> String {
    path.parent()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Lowercase, dot-prefixed extension hint for the probe. `.kra~` backups
/// keep their full marker; everything else is the final extension.
fn extension_hint(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if name.ends_with(crate::BACKUP_SUFFIX) {
        return crate::BACKUP_SUFFIX.to_string();
    }
    match PathBuf::from(&name).extension() {
        Some(ext) => format!(".{}", ext.to_string_lossy()),
        None => String::new(),
    }
}

#[cfg(test)]
#[path = "tests/descriptor_tests.rs"]
mod tests;
