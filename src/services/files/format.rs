//! Closed enumerations shared by the probe, the query engine and the
//! thumbnail cache: managed file formats, thumbnail sizes/formats and the
//! uniform descriptor property set.

use serde::{Deserialize, Serialize};

use crate::types::errors::{CoreError, CoreResult};

/// File format detected for a descriptor. Closed set; `jpg` is normalised
/// to [`FormatTag::Jpeg`] at every boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatTag {
    Png,
    Jpeg,
    Svg,
    Kra,
    Ora,
    Directory,
    Unknown,
}

impl FormatTag {
    /// Parse a user/wire format name. Accepts the managed names plus the
    /// `jpg` alias; anything else is an input error.
    pub fn parse(value: &str) -> CoreResult<FormatTag> {
        match value.to_ascii_lowercase().as_str() {
            "png" => Ok(FormatTag::Png),
            "jpg" | "jpeg" => Ok(FormatTag::Jpeg),
            "svg" => Ok(FormatTag::Svg),
            "kra" => Ok(FormatTag::Kra),
            "ora" => Ok(FormatTag::Ora),
            other => Err(CoreError::InvalidRule(format!(
                "unknown file format: {other}"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FormatTag::Png => "png",
            FormatTag::Jpeg => "jpeg",
            FormatTag::Svg => "svg",
            FormatTag::Kra => "kra",
            FormatTag::Ora => "ora",
            FormatTag::Directory => "directory",
            FormatTag::Unknown => "unknown",
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, FormatTag::Directory)
    }
}

/// Extensions recognised for graphical-content handling. `kra~` backups are
/// only managed when the search path asks for them.
pub const MANAGED_EXTENSIONS: &[&str] = &["kra", "png", "jpg", "jpeg", "ora", "svg"];

/// Returns true when `extension` (lowercase, without dot) belongs to the
/// managed set, honouring the backup opt-in.
pub fn is_managed_extension(extension: &str, include_backups: bool) -> bool {
    if MANAGED_EXTENSIONS.contains(&extension) {
        return true;
    }
    include_backups && extension == "kra~"
}

/// Canonical thumbnail sizes. Each size owns a subdirectory of a cache
/// tier; `larger()`/`smaller()` give the successor order used by the
/// read-through fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ThumbnailSize {
    Small,
    Medium,
    Large,
    Huge,
}

impl ThumbnailSize {
    pub const ALL: [ThumbnailSize; 4] = [
        ThumbnailSize::Small,
        ThumbnailSize::Medium,
        ThumbnailSize::Large,
        ThumbnailSize::Huge,
    ];

    /// Edge length in pixels.
    pub fn pixels(&self) -> u32 {
        match self {
            ThumbnailSize::Small => 64,
            ThumbnailSize::Medium => 128,
            ThumbnailSize::Large => 256,
            ThumbnailSize::Huge => 512,
        }
    }

    pub fn larger(&self) -> Option<ThumbnailSize> {
        match self {
            ThumbnailSize::Small => Some(ThumbnailSize::Medium),
            ThumbnailSize::Medium => Some(ThumbnailSize::Large),
            ThumbnailSize::Large => Some(ThumbnailSize::Huge),
            ThumbnailSize::Huge => None,
        }
    }

    pub fn smaller(&self) -> Option<ThumbnailSize> {
        match self {
            ThumbnailSize::Small => None,
            ThumbnailSize::Medium => Some(ThumbnailSize::Small),
            ThumbnailSize::Large => Some(ThumbnailSize::Medium),
            ThumbnailSize::Huge => Some(ThumbnailSize::Large),
        }
    }
}

/// On-disk encoding for cached thumbnails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThumbnailFormat {
    Png,
    Jpeg,
}

impl ThumbnailFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ThumbnailFormat::Png => "png",
            ThumbnailFormat::Jpeg => "jpeg",
        }
    }

    /// Encoding quality for a given thumbnail size. JPEG artifacts are more
    /// visible on small images, so small/medium keep a higher quality; PNG
    /// is lossless.
    pub fn quality(&self, size: ThumbnailSize) -> u8 {
        match self {
            ThumbnailFormat::Png => 100,
            ThumbnailFormat::Jpeg => match size {
                ThumbnailSize::Small | ThumbnailSize::Medium => 95,
                ThumbnailSize::Large | ThumbnailSize::Huge => 85,
            },
        }
    }
}

/// Uniform property selector over file descriptors, used by predicates,
/// sort keys and the export surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FileProperty {
    Path,
    #[serde(rename = "fullPathName")]
    FullPathname,
    FileName,
    FileFormat,
    FileSize,
    FileDate,
    ImageWidth,
    ImageHeight,
}

impl FileProperty {
    pub fn parse(value: &str) -> CoreResult<FileProperty> {
        match value {
            "path" => Ok(FileProperty::Path),
            "fullPathName" => Ok(FileProperty::FullPathname),
            "fileName" => Ok(FileProperty::FileName),
            "fileFormat" => Ok(FileProperty::FileFormat),
            "fileSize" => Ok(FileProperty::FileSize),
            "fileDate" => Ok(FileProperty::FileDate),
            "imageWidth" => Ok(FileProperty::ImageWidth),
            "imageHeight" => Ok(FileProperty::ImageHeight),
            other => Err(CoreError::InvalidQuery(format!(
                "unknown file property: {other}"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileProperty::Path => "path",
            FileProperty::FullPathname => "fullPathName",
            FileProperty::FileName => "fileName",
            FileProperty::FileFormat => "fileFormat",
            FileProperty::FileSize => "fileSize",
            FileProperty::FileDate => "fileDate",
            FileProperty::ImageWidth => "imageWidth",
            FileProperty::ImageHeight => "imageHeight",
        }
    }

    /// Human readable name, used in sort descriptions and report headers.
    pub fn label(&self) -> &'static str {
        match self {
            FileProperty::Path => "path",
            FileProperty::FullPathname => "full path/file name",
            FileProperty::FileName => "file name",
            FileProperty::FileFormat => "file format",
            FileProperty::FileSize => "file size",
            FileProperty::FileDate => "file date",
            FileProperty::ImageWidth => "image width",
            FileProperty::ImageHeight => "image height",
        }
    }
}

#[cfg(test)]
#[path = "tests/format_tests.rs"]
mod tests;
