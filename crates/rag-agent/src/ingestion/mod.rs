//! Document ingestion: loading, chunking and the offline index build

mod chunker;
mod loader;
mod pipeline;

pub use chunker::{TextChunker, DEFAULT_SEPARATORS};
pub use loader::DocumentLoader;
pub use pipeline::{BuildSummary, IndexBuilder};
