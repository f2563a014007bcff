//! Offline index build: load, chunk, embed, persist

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::retrieval::VectorIndex;

use super::chunker::TextChunker;
use super::loader::DocumentLoader;

/// Outcome of a completed build
#[derive(Debug, Clone, Serialize)]
pub struct BuildSummary {
    pub documents: usize,
    pub chunks: usize,
    pub dimensions: usize,
    pub index_path: PathBuf,
    pub elapsed_ms: u64,
}

impl fmt::Display for BuildSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Indexed {} chunks from {} documents into {} ({} dims, {}ms)",
            self.chunks,
            self.documents,
            self.index_path.display(),
            self.dimensions,
            self.elapsed_ms
        )
    }
}

/// Full-rebuild index builder
///
/// Every entry point that creates an index (CLI build, auto-build on startup)
/// goes through [`IndexBuilder::build`], so the empty-corpus rule is applied
/// in one place.
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    loader: DocumentLoader,
    chunker: TextChunker,
    batch_size: usize,
    data_path: PathBuf,
    index_path: PathBuf,
}

impl IndexBuilder {
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Ok(Self {
            loader: DocumentLoader::from_config(&config.chunking),
            chunker: TextChunker::from_config(&config.chunking)?,
            batch_size: config.embedding.batch_size,
            data_path: config.paths.data_path.clone(),
            index_path: config.paths.index_path.clone(),
        })
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Build an in-memory index from the data directory
    pub async fn build(&self, embedder: &dyn EmbeddingProvider) -> Result<(VectorIndex, BuildSummary)> {
        let start = Instant::now();

        tracing::info!(
            "Building index from {} (chunk_size={}, chunk_overlap={})",
            self.data_path.display(),
            self.chunker.chunk_size(),
            self.chunker.chunk_overlap()
        );

        let documents = self.loader.load(&self.data_path)?;
        if documents.is_empty() {
            return Err(Error::EmptyCorpus(self.data_path.display().to_string()));
        }

        let chunks = self.chunker.split_documents(&documents);
        // Only empty files were found
        if chunks.is_empty() {
            return Err(Error::EmptyCorpus(self.data_path.display().to_string()));
        }
        let chunk_count = chunks.len();

        let index = VectorIndex::build(chunks, embedder, self.batch_size).await?;

        let summary = BuildSummary {
            documents: documents.len(),
            chunks: chunk_count,
            dimensions: index.dimensions(),
            index_path: self.index_path.clone(),
            elapsed_ms: start.elapsed().as_millis() as u64,
        };
        Ok((index, summary))
    }

    /// Build and write the index to the configured index path
    pub async fn build_and_persist(
        &self,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<(VectorIndex, BuildSummary)> {
        let start = Instant::now();
        let (index, mut summary) = self.build(embedder).await?;
        index.persist(&self.index_path)?;
        summary.elapsed_ms = start.elapsed().as_millis() as u64;

        tracing::info!("{}", summary);
        Ok((index, summary))
    }
}
