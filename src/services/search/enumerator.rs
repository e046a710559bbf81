//! Path enumeration: turns search path definitions into a deduplicated
//! stream of candidate files and directories.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::services::files::format::is_managed_extension;
use crate::services::fs_utils::path_utils;

/// One directory to scan, with its inclusion policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPath {
    pub path: PathBuf,
    /// Walk the whole tree instead of the first level.
    pub recursive: bool,
    pub include_hidden: bool,
    /// Restrict files to the managed extension set.
    pub include_managed_only: bool,
    /// Let `kra~` backups into the managed set.
    pub include_backups: bool,
}

impl SearchPath {
    pub fn new(path: &Path) -> SearchPath {
        SearchPath {
            path: path.to_path_buf(),
            recursive: false,
            include_hidden: false,
            include_managed_only: false,
            include_backups: false,
        }
    }

    pub fn recursive(mut self, value: bool) -> SearchPath {
        self.recursive = value;
        self
    }

    pub fn include_hidden(mut self, value: bool) -> SearchPath {
        self.include_hidden = value;
        self
    }

    pub fn include_managed_only(mut self, value: bool) -> SearchPath {
        self.include_managed_only = value;
        self
    }

    pub fn include_backups(mut self, value: bool) -> SearchPath {
        self.include_backups = value;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    File,
    Directory,
}

#[derive(Debug, Clone)]
pub struct Candidate {
    pub path: PathBuf,
    pub kind: CandidateKind,
}

/// Per-path enumeration outcome, reported through `PathScanned` events.
#[derive(Debug, Clone)]
pub struct PathScan {
    pub path: PathBuf,
    pub recursive: bool,
    pub found: usize,
}

#[derive(Debug, Default)]
pub struct Enumeration {
    pub candidates: Vec<Candidate>,
    pub scans: Vec<PathScan>,
    pub files: usize,
    pub directories: usize,
}

/// Enumerate every search path, yielding each distinct canonical path
/// exactly once across all of them. Directory rows are produced only when
/// `include_directories` is set.
pub fn enumerate(paths: &[SearchPath], include_directories: bool) -> Enumeration {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut result = Enumeration::default();

    for search_path in paths {
        let before = result.candidates.len();
        scan_path(search_path, include_directories, &mut seen, &mut result);
        result.scans.push(PathScan {
            path: search_path.path.clone(),
            recursive: search_path.recursive,
            found: result.candidates.len() - before,
        });
    }

    result
}

fn scan_path(
    search_path: &SearchPath,
    include_directories: bool,
    seen: &mut HashSet<PathBuf>,
    result: &mut Enumeration,
) {
    let max_depth = if search_path.recursive {
        usize::MAX
    } else {
        1
    };

    let walker = WalkDir::new(&search_path.path)
        .min_depth(1)
        .max_depth(max_depth)
        .follow_links(false)
        .into_iter();

    // Pruning hidden directories here keeps the walk from descending into
    // them at all when hidden entries are excluded.
    let include_hidden = search_path.include_hidden;
    let walker = walker.filter_entry(move |entry| {
        if include_hidden {
            return true;
        }
        let name = entry.file_name().to_string_lossy();
        !path_utils::is_hidden_name(&name)
    });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::debug!("skipping unreadable entry: {e}");
                continue;
            }
        };

        let path = entry.path();
        if entry.file_type().is_dir() {
            if !include_directories {
                continue;
            }
            push_candidate(path, CandidateKind::Directory, seen, result);
        } else if entry.file_type().is_file() {
            if search_path.include_managed_only {
                let extension = path_utils::extension_of(path);
                if !is_managed_extension(&extension, search_path.include_backups) {
                    continue;
                }
            }
            push_candidate(path, CandidateKind::File, seen, result);
        }
    }
}

fn push_candidate(
    path: &Path,
    kind: CandidateKind,
    seen: &mut HashSet<PathBuf>,
    result: &mut Enumeration,
) {
    let canonical = path_utils::canonical(path);
    if !seen.insert(canonical) {
        return;
    }
    match kind {
        CandidateKind::File => result.files += 1,
        CandidateKind::Directory => result.directories += 1,
    }
    result.candidates.push(Candidate {
        path: path.to_path_buf(),
        kind,
    });
}

#[cfg(test)]
#[path = "tests/enumerator_tests.rs"]
mod tests;
