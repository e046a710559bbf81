pub mod download;
pub mod entry;
pub mod pool;

pub use entry::{ClipboardEntry, EntryKind};
pub use pool::{ClipboardOptions, ClipboardPayload, ClipboardPool, RasterPayload};
