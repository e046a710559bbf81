pub mod cache;
pub mod render;

pub use cache::ThumbnailCache;
