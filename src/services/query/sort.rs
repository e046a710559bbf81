//! Multi-key ordering of result descriptors.
//!
//! Keys apply left to right, ties fall through to the next key, and
//! directories always precede files regardless of keys. The sort is
//! stable: equal keys preserve input order.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::services::files::descriptor::{FileDescriptor, PropertyValue};
use crate::services::files::format::FileProperty;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortKey {
    pub property: FileProperty,
    pub ascending: bool,
    /// Case-insensitive comparison for string-valued properties.
    #[serde(default)]
    pub ignore_case: bool,
}

impl SortKey {
    pub fn new(property: FileProperty, ascending: bool) -> SortKey {
        SortKey {
            property,
            ascending,
            ignore_case: false,
        }
    }

    pub fn describe(&self) -> String {
        format!(
            "[{}] {}",
            self.property.as_str(),
            if self.ascending { "ascending" } else { "descending" }
        )
    }
}

/// Stable multi-key sort, in place.
pub fn sort_descriptors(files: &mut [FileDescriptor], keys: &[SortKey]) {
    files.sort_by(|a, b| compare(a, b, keys));
}

fn compare(a: &FileDescriptor, b: &FileDescriptor, keys: &[SortKey]) -> Ordering {
    // Directories come first whatever the keys say.
    match (a.is_directory(), b.is_directory()) {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }

    for key in keys {
        let va = a.property(key.property);
        let vb = b.property(key.property);

        let ordering = match (va, vb) {
            (None, None) => Ordering::Equal,
            // A missing value sorts first when ascending, last when
            // descending; the direction flip below restores that.
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(va), Some(vb)) => compare_values(&va, &vb, key.ignore_case),
        };

        let ordering = if key.ascending {
            ordering
        } else {
            ordering.reverse()
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

fn compare_values(a: &PropertyValue, b: &PropertyValue, ignore_case: bool) -> Ordering {
    match (a, b) {
        (PropertyValue::Int(a), PropertyValue::Int(b)) => a.cmp(b),
        (PropertyValue::Date(a), PropertyValue::Date(b)) => a.total_cmp(b),
        (PropertyValue::Str(a), PropertyValue::Str(b)) => {
            if ignore_case {
                a.to_lowercase().cmp(&b.to_lowercase())
            } else {
                a.cmp(b)
            }
        }
        (PropertyValue::Format(a), PropertyValue::Format(b)) => a.as_str().cmp(b.as_str()),
        // Mixed types cannot order; treat as a tie and fall through.
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
#[path = "tests/sort_tests.rs"]
mod tests;
