//! Streaming event contracts for the search pipeline and the clipboard pool.
//!
//! Events are emitted from the coordinator thread only; all `Progress*`
//! events of a phase precede that phase's terminal event.

use serde::{Deserialize, Serialize};

/// Progress/terminal notification emitted on search pipeline phase transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "event", content = "data")]
pub enum PipelineEvent {
    /// Emitted after each input search path has been scanned.
    #[serde(rename_all = "camelCase")]
    PathScanned {
        path: String,
        recursive: bool,
        found: usize,
    },
    /// Terminal event of the enumeration phase.
    #[serde(rename_all = "camelCase")]
    EnumDone {
        files: usize,
        directories: usize,
        total: usize,
        elapsed_ms: u64,
    },
    /// Throttled whole-percent progress of the metadata analysis phase.
    #[serde(rename_all = "camelCase")]
    ProgressAnalyse { pct: u8 },
    #[serde(rename_all = "camelCase")]
    AnalyseDone { elapsed_ms: u64 },
    /// Throttled whole-percent progress of the filter phase.
    #[serde(rename_all = "camelCase")]
    ProgressFilter { pct: u8 },
    #[serde(rename_all = "camelCase")]
    FilterDone { kept: usize, elapsed_ms: u64 },
    #[serde(rename_all = "camelCase")]
    BuildDone { elapsed_ms: u64 },
    /// Terminal event of the sort phase; `keys` are human-readable key
    /// descriptions in application order.
    #[serde(rename_all = "camelCase")]
    SortDone { keys: Vec<String>, elapsed_ms: u64 },
    /// Forwarded from the external renderer; `pages` is -1 when the output
    /// has no page structure.
    #[serde(rename_all = "camelCase")]
    ExportStart { pages: i64 },
    #[serde(rename_all = "camelCase")]
    ExportProgress { page: i64 },
    #[serde(rename_all = "camelCase")]
    ExportEnd { elapsed_ms: u64, sink: String },
    /// The run was cancelled; no further events follow.
    Cancelled,
}

/// Observer callback for pipeline events. Delivered on the coordinator
/// thread that drives the pipeline.
pub trait PipelineObserver: Send + Sync {
    fn on_event(&self, event: PipelineEvent);
}

impl<F> PipelineObserver for F
where
    F: Fn(PipelineEvent) + Send + Sync,
{
    fn on_event(&self, event: PipelineEvent) {
        self(event)
    }
}

/// Notifications emitted by the clipboard pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "event", content = "data")]
pub enum ClipboardEvent {
    /// New entries were created (or refreshed) for the given hashes.
    #[serde(rename_all = "camelCase")]
    Added { hashes: Vec<String> },
    /// Entries were evicted from the session tier.
    #[serde(rename_all = "camelCase")]
    Removed { hashes: Vec<String> },
    /// An entry moved between the session and persistent tiers.
    #[serde(rename_all = "camelCase")]
    PersistentChanged { hash: String, persistent: bool },
    #[serde(rename_all = "camelCase")]
    DownloadProgress {
        hash: String,
        received: u64,
        total: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    DownloadFinished { hash: String, ok: bool },
}

/// Observer callback for clipboard pool events.
pub trait ClipboardObserver: Send + Sync {
    fn on_event(&self, event: ClipboardEvent);
}

impl<F> ClipboardObserver for F
where
    F: Fn(ClipboardEvent) + Send + Sync,
{
    fn on_event(&self, event: ClipboardEvent) {
        self(event)
    }
}
