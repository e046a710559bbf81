//! Clipboard cache entries and their JSON sidecars.
//!
//! Every entry owns a `{hash}.json` sidecar at its tier root; payload
//! files sit next to it as `{hash}.{ext}`. The sidecar uses flat dotted
//! keys (`imageSize.width`, `url.url`) so kind-specific fields stay
//! greppable.

use serde_json::{json, Map, Value};

use crate::types::errors::{CoreError, CoreResult};

/// Entry kinds, serialised verbatim into the sidecar `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    FileEntry,
    UrlEntry,
    ImageEntry,
    SvgEntry,
    KraEntry,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::FileEntry => "FileEntry",
            EntryKind::UrlEntry => "UrlEntry",
            EntryKind::ImageEntry => "ImageEntry",
            EntryKind::SvgEntry => "SvgEntry",
            EntryKind::KraEntry => "KraEntry",
        }
    }

    pub fn parse(value: &str) -> CoreResult<EntryKind> {
        match value {
            "FileEntry" => Ok(EntryKind::FileEntry),
            "UrlEntry" => Ok(EntryKind::UrlEntry),
            "ImageEntry" => Ok(EntryKind::ImageEntry),
            "SvgEntry" => Ok(EntryKind::SvgEntry),
            "KraEntry" => Ok(EntryKind::KraEntry),
            other => Err(CoreError::Cache(format!("unknown entry type: {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClipboardEntry {
    pub hash: String,
    pub kind: EntryKind,
    /// Creation/refresh time, POSIX seconds.
    pub timestamp: f64,
    /// Free-text description of where the payload came from.
    pub origin: String,
    pub persistent: bool,
    /// `None` when the payload has no raster dimensions (yet).
    pub image_size: Option<(i32, i32)>,
    /// `UrlEntry`: the source URL.
    pub url: Option<String>,
    /// `UrlEntry`: expected payload size once known.
    pub download_size: Option<u64>,
    /// `ImageEntry`: URL the raster was captured from, when known.
    pub url_origin: Option<String>,
    /// `FileEntry`: the referenced local path.
    pub file_name: Option<String>,
}

impl ClipboardEntry {
    pub fn new(hash: &str, kind: EntryKind, timestamp: f64, persistent: bool) -> ClipboardEntry {
        ClipboardEntry {
            hash: hash.to_string(),
            kind,
            timestamp,
            origin: String::new(),
            persistent,
            image_size: None,
            url: None,
            download_size: None,
            url_origin: None,
            file_name: None,
        }
    }

    /// Sidecar rendering. Dimensions serialise as `-1` when unknown.
    pub fn to_sidecar(&self) -> Value {
        let (width, height) = self.image_size.unwrap_or((-1, -1));
        let mut map = Map::new();
        map.insert("timestamp".to_string(), json!(self.timestamp));
        map.insert("origin".to_string(), json!(self.origin));
        map.insert("type".to_string(), json!(self.kind.as_str()));
        map.insert("imageSize.width".to_string(), json!(width));
        map.insert("imageSize.height".to_string(), json!(height));
        map.insert("persistent".to_string(), json!(self.persistent));
        if let Some(url) = &self.url {
            map.insert("url.url".to_string(), json!(url));
        }
        if let Some(size) = self.download_size {
            map.insert("url.downloadSize".to_string(), json!(size));
        }
        if let Some(origin) = &self.url_origin {
            map.insert("url.origin".to_string(), json!(origin));
        }
        if let Some(file_name) = &self.file_name {
            map.insert("fileName".to_string(), json!(file_name));
        }
        Value::Object(map)
    }

    /// Rebuild an entry from its sidecar.
    pub fn from_sidecar(hash: &str, sidecar: &Value) -> CoreResult<ClipboardEntry> {
        let kind = sidecar
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::Cache(format!("sidecar for {hash} has no type")))?;
        let kind = EntryKind::parse(kind)?;

        let width = sidecar
            .get("imageSize.width")
            .and_then(Value::as_i64)
            .unwrap_or(-1) as i32;
        let height = sidecar
            .get("imageSize.height")
            .and_then(Value::as_i64)
            .unwrap_or(-1) as i32;

        Ok(ClipboardEntry {
            hash: hash.to_string(),
            kind,
            timestamp: sidecar
                .get("timestamp")
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
            origin: sidecar
                .get("origin")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            persistent: sidecar
                .get("persistent")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            image_size: if width >= 0 && height >= 0 {
                Some((width, height))
            } else {
                None
            },
            url: sidecar
                .get("url.url")
                .and_then(Value::as_str)
                .map(str::to_string),
            download_size: sidecar.get("url.downloadSize").and_then(Value::as_u64),
            url_origin: sidecar
                .get("url.origin")
                .and_then(Value::as_str)
                .map(str::to_string),
            file_name: sidecar
                .get("fileName")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}

#[cfg(test)]
#[path = "tests/entry_tests.rs"]
mod tests;
