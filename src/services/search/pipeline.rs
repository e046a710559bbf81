//! The search pipeline: enumerate, analyse, filter, build, sort.
//!
//! Metadata analysis and filtering fan out over the process-wide rayon
//! pool in bounded chunks; the coordinator thread serialises result
//! assembly, event emission and cancellation checks. Workers check the
//! cancellation token between files, the coordinator between phases.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;

use crate::services::files::descriptor::FileDescriptor;
use crate::services::query::graph::ResolvedQuery;
use crate::services::query::rule_tree::RuleTree;
use crate::services::query::sort::SortKey;
use crate::services::search::enumerator::{self, Candidate, CandidateKind, SearchPath};
use crate::services::search::results::ResultList;
use crate::types::errors::CoreResult;
use crate::types::events::{PipelineEvent, PipelineObserver};

/// Chunk multiplier: the pool never sees more pending chunks than
/// `cpus × CHUNK_FACTOR`.
const CHUNK_FACTOR: usize = 10;

/// Cooperative cancellation token shared with every worker. Cancelling is
/// idempotent.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    Completed,
    Cancelled,
}

/// Pipeline outcome. On cancellation the partial accumulation is
/// discarded; the caller keeps whatever result set it had before.
#[derive(Debug)]
pub struct SearchOutcome {
    pub status: SearchStatus,
    pub results: ResultList,
}

impl SearchOutcome {
    fn cancelled() -> SearchOutcome {
        SearchOutcome {
            status: SearchStatus::Cancelled,
            results: ResultList::default(),
        }
    }
}

/// Renderer boundary: the pipeline hands over the sorted descriptors and
/// forwards the renderer's progress as events; everything else (format,
/// page size, field list) belongs to the renderer.
pub trait ResultRenderer {
    /// Number of pages the render will produce, -1 when the output has no
    /// page structure.
    fn page_count(&self, results: &ResultList) -> i64;

    /// Render, reporting page completions through `progress`. Returns the
    /// sink description (a file name, `@clipboard`, a panel reference).
    fn render(
        &self,
        results: &ResultList,
        progress: &mut dyn FnMut(i64),
    ) -> CoreResult<String>;
}

#[derive(Debug, Default)]
pub struct SearchPipeline {
    paths: Vec<SearchPath>,
    rule_tree: RuleTree,
    sort_keys: Vec<SortKey>,
    include_directories: bool,
    cancel: CancelToken,
}

impl SearchPipeline {
    pub fn new() -> SearchPipeline {
        SearchPipeline::default()
    }

    /// Build a pipeline from a resolved query snapshot.
    pub fn from_query(query: &ResolvedQuery) -> SearchPipeline {
        SearchPipeline {
            paths: query.paths.clone(),
            rule_tree: query.rule_tree.clone(),
            sort_keys: query.sort_keys.clone(),
            include_directories: false,
            cancel: CancelToken::new(),
        }
    }

    pub fn add_path(mut self, path: SearchPath) -> SearchPipeline {
        self.paths.push(path);
        self
    }

    pub fn with_rule_tree(mut self, rule_tree: RuleTree) -> SearchPipeline {
        self.rule_tree = rule_tree;
        self
    }

    pub fn with_sort_keys(mut self, keys: Vec<SortKey>) -> SearchPipeline {
        self.sort_keys = keys;
        self
    }

    pub fn with_directories(mut self, value: bool) -> SearchPipeline {
        self.include_directories = value;
        self
    }

    /// Token shared with every worker; cancel it from any thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Human readable query description for report headers.
    pub fn describe(&self) -> String {
        let mut lines = Vec::new();
        for path in &self.paths {
            let mut line = format!("search from directory \"{}\"", path.path.display());
            if path.recursive {
                line.push_str(" (and sub-directories)");
            }
            lines.push(line);
        }
        if self.include_directories {
            lines.push("include directories".to_string());
        }
        if !self.rule_tree.is_empty() {
            lines.push(format!("matching rule {}", self.rule_tree.describe()));
        }
        if !self.sort_keys.is_empty() {
            let keys: Vec<String> = self.sort_keys.iter().map(|k| k.describe()).collect();
            lines.push(format!("sort by {}", keys.join(", ")));
        }
        lines.join("\n")
    }

    /// Run the pipeline. Events are delivered on this thread, in phase
    /// order; progress events of a phase always precede its terminal
    /// event.
    pub fn execute(&self, observer: &dyn PipelineObserver) -> SearchOutcome {
        let started = Instant::now();

        // ── Enumerate ────────────────────────────────────────────────
        let enumeration = enumerator::enumerate(&self.paths, self.include_directories);
        for scan in &enumeration.scans {
            observer.on_event(PipelineEvent::PathScanned {
                path: scan.path.to_string_lossy().to_string(),
                recursive: scan.recursive,
                found: scan.found,
            });
        }
        observer.on_event(PipelineEvent::EnumDone {
            files: enumeration.files,
            directories: enumeration.directories,
            total: enumeration.candidates.len(),
            elapsed_ms: elapsed_ms(started),
        });

        if self.check_cancelled(observer) {
            return SearchOutcome::cancelled();
        }

        // ── Analyse metadata ─────────────────────────────────────────
        let phase = Instant::now();
        let descriptors = match self.analyse(&enumeration.candidates, observer) {
            Some(descriptors) => descriptors,
            None => return SearchOutcome::cancelled(),
        };
        observer.on_event(PipelineEvent::AnalyseDone {
            elapsed_ms: elapsed_ms(phase),
        });

        if self.check_cancelled(observer) {
            return SearchOutcome::cancelled();
        }

        // ── Filter ───────────────────────────────────────────────────
        let phase = Instant::now();
        let kept = match self.filter(descriptors, observer) {
            Some(kept) => kept,
            None => return SearchOutcome::cancelled(),
        };
        observer.on_event(PipelineEvent::FilterDone {
            kept: kept.len(),
            elapsed_ms: elapsed_ms(phase),
        });

        if self.check_cancelled(observer) {
            return SearchOutcome::cancelled();
        }

        // ── Build results ────────────────────────────────────────────
        let phase = Instant::now();
        let mut results = ResultList::new(kept);
        observer.on_event(PipelineEvent::BuildDone {
            elapsed_ms: elapsed_ms(phase),
        });

        // ── Sort ─────────────────────────────────────────────────────
        if !self.sort_keys.is_empty() {
            let phase = Instant::now();
            results.sort(&self.sort_keys);
            observer.on_event(PipelineEvent::SortDone {
                keys: self.sort_keys.iter().map(|k| k.describe()).collect(),
                elapsed_ms: elapsed_ms(phase),
            });
        }

        SearchOutcome {
            status: SearchStatus::Completed,
            results,
        }
    }

    /// Export through an external renderer, forwarding its progress.
    pub fn export(
        &self,
        results: &ResultList,
        renderer: &dyn ResultRenderer,
        observer: &dyn PipelineObserver,
    ) -> CoreResult<String> {
        let started = Instant::now();
        observer.on_event(PipelineEvent::ExportStart {
            pages: renderer.page_count(results),
        });
        let sink = renderer.render(results, &mut |page| {
            observer.on_event(PipelineEvent::ExportProgress { page });
        })?;
        observer.on_event(PipelineEvent::ExportEnd {
            elapsed_ms: elapsed_ms(started),
            sink: sink.clone(),
        });
        Ok(sink)
    }

    fn check_cancelled(&self, observer: &dyn PipelineObserver) -> bool {
        if self.cancel.is_cancelled() {
            observer.on_event(PipelineEvent::Cancelled);
            return true;
        }
        false
    }

    /// Fan candidates out across the pool, chunked so progress can be
    /// reported from the coordinator between chunks.
    fn analyse(
        &self,
        candidates: &[Candidate],
        observer: &dyn PipelineObserver,
    ) -> Option<Vec<FileDescriptor>> {
        let total = candidates.len();
        let mut descriptors = Vec::with_capacity(total);
        let mut last_pct = 0u8;

        for chunk in candidates.chunks(chunk_size(total)) {
            if self.check_cancelled(observer) {
                return None;
            }
            let cancel = self.cancel.clone();
            let mut part: Vec<FileDescriptor> = chunk
                .par_iter()
                .filter_map(|candidate| {
                    if cancel.is_cancelled() {
                        return None;
                    }
                    Some(match candidate.kind {
                        CandidateKind::File => FileDescriptor::from_file(&candidate.path),
                        CandidateKind::Directory => FileDescriptor::directory(&candidate.path),
                    })
                })
                .collect();
            descriptors.append(&mut part);
            emit_progress(observer, descriptors.len(), total, &mut last_pct, true);
        }
        Some(descriptors)
    }

    fn filter(
        &self,
        descriptors: Vec<FileDescriptor>,
        observer: &dyn PipelineObserver,
    ) -> Option<Vec<FileDescriptor>> {
        if self.rule_tree.is_empty() {
            return Some(descriptors);
        }

        let total = descriptors.len();
        let mut kept = Vec::with_capacity(total);
        let mut processed = 0usize;
        let mut last_pct = 0u8;

        for chunk in descriptors.chunks(chunk_size(total)) {
            if self.check_cancelled(observer) {
                return None;
            }
            let cancel = self.cancel.clone();
            let tree = &self.rule_tree;
            let mut part: Vec<FileDescriptor> = chunk
                .par_iter()
                .filter(|descriptor| !cancel.is_cancelled() && tree.matches(descriptor))
                .cloned()
                .collect();
            processed += chunk.len();
            kept.append(&mut part);
            emit_progress(observer, processed, total, &mut last_pct, false);
        }
        Some(kept)
    }
}

fn chunk_size(total: usize) -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (total / (cpus * CHUNK_FACTOR)).max(1)
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

/// Throttle progress to whole-percent steps.
fn emit_progress(
    observer: &dyn PipelineObserver,
    done: usize,
    total: usize,
    last_pct: &mut u8,
    analyse: bool,
) {
    if total == 0 {
        return;
    }
    let pct = ((done * 100) / total) as u8;
    if pct == *last_pct {
        return;
    }
    *last_pct = pct;
    observer.on_event(if analyse {
        PipelineEvent::ProgressAnalyse { pct }
    } else {
        PipelineEvent::ProgressFilter { pct }
    });
}

#[cfg(test)]
#[path = "tests/pipeline_tests.rs"]
mod tests;
