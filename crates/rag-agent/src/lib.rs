//! rag-agent: retrieval-augmented question answering over a directory of documents
//!
//! Build time loads text files, chunks them with overlap, embeds the chunks and
//! persists a vector index. Query time extracts a question from an inbound
//! event, retrieves the closest chunks, and asks the language model for an
//! answer grounded in them.

pub mod config;
pub mod error;
pub mod generation;
pub mod handler;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

#[cfg(test)]
mod testing;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use handler::{AgentHandler, ResponseEnvelope};
pub use types::{Chunk, Document, QueryResult, SourcePreview};
