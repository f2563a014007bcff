//! Query result types

use serde::{Deserialize, Serialize};

use super::document::Chunk;

/// Number of characters kept in a source preview
pub const PREVIEW_CHARS: usize = 240;

/// One retrieved chunk as shown to the caller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourcePreview {
    /// Source filename
    pub source: String,
    /// First [`PREVIEW_CHARS`] characters of the chunk
    pub preview: String,
}

impl SourcePreview {
    /// Build a preview from a retrieved chunk
    pub fn from_chunk(chunk: &Chunk) -> Self {
        Self {
            source: chunk.metadata.source.clone(),
            preview: chunk.content.chars().take(PREVIEW_CHARS).collect(),
        }
    }
}

/// Answer plus the chunks that grounded it, in retrieval order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResult {
    /// Generated answer
    pub answer: String,
    /// Supporting sources
    pub sources: Vec<SourcePreview>,
}

impl QueryResult {
    /// Create a query result from an answer and retrieved chunks
    pub fn new<'a>(answer: String, chunks: impl IntoIterator<Item = &'a Chunk>) -> Self {
        Self {
            answer,
            sources: chunks.into_iter().map(SourcePreview::from_chunk).collect(),
        }
    }
}
