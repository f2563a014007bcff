//! Vector index and nearest-neighbour retrieval

pub mod index;

pub use index::{IndexInfo, SearchResult, VectorIndex};
