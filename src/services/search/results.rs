//! Result set: the pipeline's output vector and its serialisation
//! helpers for the export surface.

use serde_json::json;

use crate::services::files::descriptor::FileDescriptor;
use crate::services::files::format::FormatTag;
use crate::services::query::sort::{self, SortKey};

/// Owns the matched descriptors exclusively; dropped when cleared.
#[derive(Debug, Default)]
pub struct ResultList {
    files: Vec<FileDescriptor>,
}

impl ResultList {
    pub fn new(files: Vec<FileDescriptor>) -> ResultList {
        ResultList { files }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn files(&self) -> &[FileDescriptor] {
        &self.files
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub(crate) fn sort(&mut self, keys: &[SortKey]) {
        sort::sort_descriptors(&mut self.files, keys);
    }

    /// JSON rendering of the result rows. Directories serialise without
    /// size and dimensions, unknown-format files without dimensions.
    pub fn to_json(&self, pretty: bool) -> String {
        let rows: Vec<serde_json::Value> = self.files.iter().map(row_json).collect();
        let document = json!({
            "count": self.files.len(),
            "files": rows,
        });
        if pretty {
            serde_json::to_string_pretty(&document).unwrap_or_default()
        } else {
            document.to_string()
        }
    }

    /// CSV rendering with a configurable separator; directories keep
    /// their cells empty where values are undefined.
    pub fn to_csv(&self, separator: char, header: bool) -> String {
        let mut lines = Vec::with_capacity(self.files.len() + 1);
        if header {
            lines.push(
                [
                    "Path",
                    "File name",
                    "File size",
                    "File date",
                    "Image format",
                    "Image width",
                    "Image height",
                ]
                .join(&separator.to_string()),
            );
        }
        for file in &self.files {
            lines.push(csv_row(file).join(&separator.to_string()));
        }
        lines.join("\n")
    }
}

/// `YYYY-MM-DD HH:MM:SS` rendering of a POSIX timestamp.
fn format_timestamp(timestamp: f64) -> String {
    chrono::DateTime::from_timestamp(timestamp as i64, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

fn row_json(file: &FileDescriptor) -> serde_json::Value {
    match file.format() {
        FormatTag::Directory => json!({
            "path": file.path(),
            "name": file.name(),
            "date": format_timestamp(file.modified()),
            "dateTs": file.modified(),
            "format": "<dir>",
        }),
        FormatTag::Unknown => json!({
            "path": file.path(),
            "name": file.name(),
            "size": file.size(),
            "date": format_timestamp(file.modified()),
            "dateTs": file.modified(),
            "format": "unknown",
        }),
        format => json!({
            "path": file.path(),
            "name": file.name(),
            "size": file.size(),
            "date": format_timestamp(file.modified()),
            "dateTs": file.modified(),
            "format": format.as_str(),
            "width": file.image_size().0,
            "height": file.image_size().1,
        }),
    }
}

fn csv_row(file: &FileDescriptor) -> [String; 7] {
    match file.format() {
        FormatTag::Directory => [
            file.path().to_string(),
            file.name().to_string(),
            String::new(),
            format_timestamp(file.modified()),
            "<dir>".to_string(),
            String::new(),
            String::new(),
        ],
        FormatTag::Unknown => [
            file.path().to_string(),
            file.name().to_string(),
            file.size().to_string(),
            format_timestamp(file.modified()),
            String::new(),
            String::new(),
            String::new(),
        ],
        format => [
            file.path().to_string(),
            file.name().to_string(),
            file.size().to_string(),
            format_timestamp(file.modified()),
            format.as_str().to_string(),
            file.image_size().0.to_string(),
            file.image_size().1.to_string(),
        ],
    }
}

#[cfg(test)]
#[path = "tests/results_tests.rs"]
mod tests;
