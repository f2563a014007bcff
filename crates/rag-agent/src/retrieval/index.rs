//! Flat cosine-similarity vector index with directory persistence
//!
//! An index is built once from a full chunk set and is immutable afterwards.
//! Queries score every vector, so results are exact and a loaded index answers
//! exactly like the one that was persisted.
//! On disk it is a directory holding three files:
//!
//! - `manifest.json`: format version, embedding model, dimensions, counts and
//!   SHA-256 digests of the other two files
//! - `chunks.json`: chunk payloads, in index order
//! - `vectors.bin`: bincode-encoded vectors, in the same order
//!
//! Index directories are trusted input. The digests catch truncation and
//! accidental corruption; they do not authenticate the writer, so never load
//! an index that came from an unauthenticated source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::path::Path;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::types::Chunk;

const MANIFEST_FILE: &str = "manifest.json";
const CHUNKS_FILE: &str = "chunks.json";
const VECTORS_FILE: &str = "vectors.bin";
const FORMAT_VERSION: u32 = 1;

/// Search result with chunk and similarity
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// The retrieved chunk
    pub chunk: Chunk,
    /// Cosine similarity (-1.0 to 1.0, higher is better)
    pub similarity: f32,
}

/// Descriptive information about a built index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexInfo {
    /// Unique id assigned at build time
    pub index_id: Uuid,
    /// Build timestamp
    pub built_at: DateTime<Utc>,
    /// Embedding model the vectors were produced with
    pub embed_model: String,
    /// Vector dimensions
    pub dimensions: usize,
    /// Number of (vector, chunk) pairs
    pub chunk_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    format_version: u32,
    metric: String,
    #[serde(flatten)]
    info: IndexInfo,
    chunks_sha256: String,
    vectors_sha256: String,
}

/// In-memory vector index over embedded chunks
#[derive(Debug, Clone)]
pub struct VectorIndex {
    info: IndexInfo,
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
    norms: Vec<f32>,
}

impl VectorIndex {
    /// Embed every chunk and build the index
    ///
    /// Any embedding failure aborts the build; no partial index is produced.
    pub async fn build(
        chunks: Vec<Chunk>,
        embedder: &dyn EmbeddingProvider,
        batch_size: usize,
    ) -> Result<Self> {
        if chunks.is_empty() {
            return Err(Error::vector_db("cannot build an index from zero chunks"));
        }

        let batch_size = batch_size.max(1);
        let mut vectors = Vec::with_capacity(chunks.len());

        for (batch_no, batch) in chunks.chunks(batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let first = batch_no * batch_size;

            let embeddings = embedder.embed_batch(&texts).await.map_err(|e| {
                tracing::error!(
                    "Embedding failed for chunks {}..{} (first source '{}'): {}",
                    first,
                    first + batch.len(),
                    batch[0].source(),
                    e
                );
                match e {
                    Error::Embedding(_) | Error::Timeout { .. } => e,
                    other => Error::embedding(format!(
                        "chunks {}..{}: {}",
                        first,
                        first + batch.len(),
                        other
                    )),
                }
            })?;

            if embeddings.len() != batch.len() {
                return Err(Error::embedding(format!(
                    "provider returned {} vectors for {} chunks (chunks {}..{})",
                    embeddings.len(),
                    batch.len(),
                    first,
                    first + batch.len()
                )));
            }
            vectors.extend(embeddings);
            tracing::debug!("Embedded {}/{} chunks", vectors.len(), chunks.len());
        }

        let dimensions = vectors[0].len();
        if dimensions == 0 {
            return Err(Error::embedding("provider returned empty vectors"));
        }
        if let Some(pos) = vectors.iter().position(|v| v.len() != dimensions) {
            return Err(Error::embedding(format!(
                "vector for chunk {} has {} dimensions, expected {}",
                pos,
                vectors[pos].len(),
                dimensions
            )));
        }

        let info = IndexInfo {
            index_id: Uuid::new_v4(),
            built_at: Utc::now(),
            embed_model: embedder.model().to_string(),
            dimensions,
            chunk_count: chunks.len(),
        };

        tracing::info!(
            "Built index {} with {} chunks ({} dims, model {})",
            info.index_id,
            info.chunk_count,
            info.dimensions,
            info.embed_model
        );

        Ok(Self::from_parts(info, chunks, vectors))
    }

    fn from_parts(info: IndexInfo, chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Self {
        let norms = vectors.iter().map(|v| l2_norm(v)).collect();
        Self {
            info,
            chunks,
            vectors,
            norms,
        }
    }

    /// Index description
    pub fn info(&self) -> &IndexInfo {
        &self.info
    }

    /// Number of stored chunks
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Vector dimensions
    pub fn dimensions(&self) -> usize {
        self.info.dimensions
    }

    /// Stored chunks in index order
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Return up to `k` chunks most similar to `query`, best first
    ///
    /// Ties keep index order. Asking for more results than the index holds
    /// simply returns every chunk.
    pub fn query(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if query.len() != self.info.dimensions {
            return Err(Error::vector_db(format!(
                "query vector has {} dimensions, index expects {}",
                query.len(),
                self.info.dimensions
            )));
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_norm = l2_norm(query);
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .zip(&self.norms)
            .enumerate()
            .map(|(i, (v, norm))| (i, cosine(query, query_norm, v, *norm)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, similarity)| SearchResult {
                chunk: self.chunks[i].clone(),
                similarity,
            })
            .collect())
    }

    /// Write the index to `dir`, creating it if needed and replacing any previous index files
    pub fn persist(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;

        let chunks_bytes = serde_json::to_vec_pretty(&self.chunks)?;
        let vectors_bytes =
            bincode::serde::encode_to_vec(&self.vectors, bincode::config::standard())
                .map_err(|e| Error::vector_db(format!("Failed to encode vectors: {}", e)))?;

        let manifest = Manifest {
            format_version: FORMAT_VERSION,
            metric: "cosine".to_string(),
            info: self.info.clone(),
            chunks_sha256: sha256_hex(&chunks_bytes),
            vectors_sha256: sha256_hex(&vectors_bytes),
        };

        // Manifest goes last so an interrupted write fails digest checks on load
        write_atomic(&dir.join(CHUNKS_FILE), &chunks_bytes)?;
        write_atomic(&dir.join(VECTORS_FILE), &vectors_bytes)?;
        write_atomic(&dir.join(MANIFEST_FILE), &serde_json::to_vec_pretty(&manifest)?)?;

        tracing::info!(
            "Persisted index {} ({} chunks) to {}",
            self.info.index_id,
            self.info.chunk_count,
            dir.display()
        );
        Ok(())
    }

    /// Load an index previously written by [`VectorIndex::persist`]
    ///
    /// `dir` must be trusted; see the module documentation.
    pub fn load(dir: &Path, embedder: &dyn EmbeddingProvider) -> Result<Self> {
        if !dir.exists() {
            return Err(Error::not_found("Vector index directory", dir));
        }

        let manifest_path = dir.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            return Err(Error::corrupt_index(dir, "manifest.json is missing"));
        }
        let manifest: Manifest = serde_json::from_slice(&std::fs::read(&manifest_path)?)
            .map_err(|e| Error::corrupt_index(dir, format!("unreadable manifest: {}", e)))?;

        if manifest.format_version != FORMAT_VERSION {
            return Err(Error::corrupt_index(
                dir,
                format!(
                    "unsupported format version {} (expected {})",
                    manifest.format_version, FORMAT_VERSION
                ),
            ));
        }

        let chunks_bytes = read_checked(dir, CHUNKS_FILE, &manifest.chunks_sha256)?;
        let vectors_bytes = read_checked(dir, VECTORS_FILE, &manifest.vectors_sha256)?;

        let chunks: Vec<Chunk> = serde_json::from_slice(&chunks_bytes)
            .map_err(|e| Error::corrupt_index(dir, format!("unreadable chunks: {}", e)))?;
        let (vectors, _): (Vec<Vec<f32>>, usize) =
            bincode::serde::decode_from_slice(&vectors_bytes, bincode::config::standard())
                .map_err(|e| Error::corrupt_index(dir, format!("unreadable vectors: {}", e)))?;

        let info = manifest.info;
        if chunks.len() != vectors.len() || chunks.len() != info.chunk_count {
            return Err(Error::corrupt_index(
                dir,
                format!(
                    "{} chunks and {} vectors, manifest declares {}",
                    chunks.len(),
                    vectors.len(),
                    info.chunk_count
                ),
            ));
        }
        if vectors.iter().any(|v| v.len() != info.dimensions) {
            return Err(Error::corrupt_index(
                dir,
                format!("vectors do not all have {} dimensions", info.dimensions),
            ));
        }

        if info.embed_model != embedder.model() {
            tracing::warn!(
                "Index at {} was built with embedding model '{}' but the active model is '{}'; \
                 rebuild the index if results look wrong",
                dir.display(),
                info.embed_model,
                embedder.model()
            );
        }
        if let Some(dims) = embedder.dimensions() {
            if dims != info.dimensions {
                tracing::warn!(
                    "Index dimensions ({}) differ from the embedding provider ({})",
                    info.dimensions,
                    dims
                );
            }
        }

        tracing::info!(
            "Loaded index {} ({} chunks, {} dims) from {}",
            info.index_id,
            info.chunk_count,
            info.dimensions,
            dir.display()
        );

        Ok(Self::from_parts(info, chunks, vectors))
    }
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn cosine(a: &[f32], a_norm: f32, b: &[f32], b_norm: f32) -> f32 {
    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let similarity = dot / (a_norm * b_norm);
    if similarity.is_nan() {
        f32::MIN
    } else {
        similarity
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn read_checked(dir: &Path, file: &str, expected_sha256: &str) -> Result<Vec<u8>> {
    let path = dir.join(file);
    if !path.exists() {
        return Err(Error::corrupt_index(dir, format!("{} is missing", file)));
    }
    let bytes = std::fs::read(&path)?;
    if sha256_hex(&bytes) != expected_sha256 {
        return Err(Error::corrupt_index(
            dir,
            format!("{} does not match its manifest digest", file),
        ));
    }
    Ok(bytes)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
