pub mod descriptor;
pub mod format;
pub mod probe;
pub mod quick_hash;

pub use descriptor::{FileDescriptor, PropertyValue};
pub use format::{FileProperty, FormatTag, ThumbnailFormat, ThumbnailSize};
