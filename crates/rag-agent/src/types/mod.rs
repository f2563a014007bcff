//! Core types for the RAG agent

pub mod document;
pub mod response;

pub use document::{Chunk, Document, FileType, SourceMetadata};
pub use response::{QueryResult, SourcePreview, PREVIEW_CHARS};
