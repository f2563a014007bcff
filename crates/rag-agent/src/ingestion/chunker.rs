//! Recursive separator-based text chunking with overlap
//!
//! Text is first cut into contiguous pieces no longer than `chunk_size`:
//! paragraph breaks are tried first, and only pieces that are still too long
//! fall through to line breaks, then sentence ends, then a hard character
//! split. Separators stay attached to the end of the piece they terminate, so
//! the pieces tile the original text exactly.
//!
//! Pieces are then merged greedily into chunks. Each chunk after the first
//! re-starts at a piece boundary inside the previous chunk so that it carries
//! at most `chunk_overlap` characters of the previous chunk's tail, taken from
//! the original text rather than re-joined sub-chunks.

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::{Chunk, Document};

/// Separators in priority order: paragraph, line, sentence
pub const DEFAULT_SEPARATORS: [&str; 3] = ["\n\n", "\n", ". "];

/// A contiguous byte range of the source text
#[derive(Debug, Clone, Copy)]
struct Piece {
    start: usize,
    end: usize,
    chars: usize,
}

/// Text chunker with configurable size, overlap and separators
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Maximum chunk size in characters
    chunk_size: usize,
    /// Maximum characters shared with the previous chunk
    chunk_overlap: usize,
    /// Separators, highest priority first
    separators: Vec<String>,
}

impl TextChunker {
    /// Create a new chunker; `chunk_overlap` must be smaller than `chunk_size`
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::config("chunk_size must be greater than zero"));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Create from configuration
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Replace the separator list (empty separators are ignored)
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators = separators
            .into_iter()
            .map(Into::into)
            .filter(|s: &String| !s.is_empty())
            .collect();
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split every document, preserving order within each document
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for doc in documents {
            let before = chunks.len();
            chunks.extend(
                self.split_text(&doc.content)
                    .into_iter()
                    .map(|(start, text)| Chunk::new(text, doc.metadata.clone(), start)),
            );
            tracing::debug!(
                "Chunked '{}' ({} chars) into {} chunks",
                doc.metadata.source,
                doc.char_len(),
                chunks.len() - before
            );
        }

        chunks
    }

    /// Split text into `(char_offset, content)` pairs
    pub fn split_text<'a>(&self, text: &'a str) -> Vec<(usize, &'a str)> {
        let mut pieces = Vec::new();
        self.collect_pieces(text, 0, 0, &mut pieces);
        self.merge_pieces(text, &pieces)
    }

    /// Cut `text` (located at byte `offset` of the source) into pieces of at most `chunk_size` chars
    fn collect_pieces(&self, text: &str, offset: usize, level: usize, out: &mut Vec<Piece>) {
        if text.is_empty() {
            return;
        }

        let chars = text.chars().count();
        if chars <= self.chunk_size {
            out.push(Piece {
                start: offset,
                end: offset + text.len(),
                chars,
            });
            return;
        }

        match self.separators.get(level) {
            Some(separator) => {
                let mut cursor = offset;
                for part in text.split_inclusive(separator.as_str()) {
                    self.collect_pieces(part, cursor, level + 1, out);
                    cursor += part.len();
                }
            }
            None => self.hard_split(text, offset, out),
        }
    }

    /// Split at fixed character boundaries when no separator applies
    fn hard_split(&self, text: &str, offset: usize, out: &mut Vec<Piece>) {
        let mut start = 0;
        let mut count = 0;

        for (idx, _) in text.char_indices() {
            if count == self.chunk_size {
                out.push(Piece {
                    start: offset + start,
                    end: offset + idx,
                    chars: count,
                });
                start = idx;
                count = 0;
            }
            count += 1;
        }

        if count > 0 {
            out.push(Piece {
                start: offset + start,
                end: offset + text.len(),
                chars: count,
            });
        }
    }

    /// Greedily merge pieces into chunks with piece-aligned overlap
    fn merge_pieces<'a>(&self, text: &'a str, pieces: &[Piece]) -> Vec<(usize, &'a str)> {
        // Char offset at which each piece starts
        let mut char_starts = Vec::with_capacity(pieces.len());
        let mut total = 0;
        for piece in pieces {
            char_starts.push(total);
            total += piece.chars;
        }

        let mut chunks = Vec::new();
        let mut first = 0;

        while first < pieces.len() {
            let mut last = first;
            let mut len = 0;
            while last < pieces.len() && len + pieces[last].chars <= self.chunk_size {
                len += pieces[last].chars;
                last += 1;
            }

            chunks.push((
                char_starts[first],
                &text[pieces[first].start..pieces[last - 1].end],
            ));

            if last == pieces.len() {
                break;
            }

            // Walk back from the next unread piece while the carried tail still
            // fits the overlap budget and leaves room for that piece.
            let incoming = pieces[last].chars;
            let mut next = last;
            let mut overlap = 0;
            while next > first + 1 {
                let candidate = overlap + pieces[next - 1].chars;
                if candidate > self.chunk_overlap || candidate + incoming > self.chunk_size {
                    break;
                }
                overlap = candidate;
                next -= 1;
            }
            first = next;
        }

        chunks
    }
}
