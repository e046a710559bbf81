pub mod enumerator;
pub mod pipeline;
pub mod results;

pub use enumerator::SearchPath;
pub use pipeline::{CancelToken, ResultRenderer, SearchOutcome, SearchPipeline, SearchStatus};
pub use results::ResultList;
