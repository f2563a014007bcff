//! Document and chunk types with source tracking

use serde::{Deserialize, Serialize};

/// File types accepted by the loader
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// Plain text file
    Txt,
    /// Markdown file
    Markdown,
}

impl FileType {
    /// Detect file type from extension, `None` for anything unsupported
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "txt" | "text" => Some(Self::Txt),
            "md" | "markdown" => Some(Self::Markdown),
            _ => None,
        }
    }
}

/// Metadata carried from a document onto every chunk derived from it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceMetadata {
    /// Base name of the file the text came from
    pub source: String,
}

impl SourceMetadata {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// A loaded source document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Full text content
    pub content: String,
    /// Source metadata
    pub metadata: SourceMetadata,
}

impl Document {
    /// Create a new document
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: SourceMetadata::new(source),
        }
    }

    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// A bounded text segment of a document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// Chunk text, including the overlap carried from the previous chunk
    pub content: String,
    /// Metadata inherited unchanged from the source document
    pub metadata: SourceMetadata,
    /// Char offset of `content` within the source document
    #[serde(default)]
    pub start: usize,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(content: impl Into<String>, metadata: SourceMetadata, start: usize) -> Self {
        Self {
            content: content.into(),
            metadata,
            start,
        }
    }

    /// Source filename
    pub fn source(&self) -> &str {
        &self.metadata.source
    }

    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    /// Char offset one past the end of this chunk within the source document
    pub fn end(&self) -> usize {
        self.start + self.char_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_detection() {
        assert_eq!(FileType::from_extension("TXT"), Some(FileType::Txt));
        assert_eq!(FileType::from_extension("md"), Some(FileType::Markdown));
        assert_eq!(FileType::from_extension("pdf"), None);
    }

    #[test]
    fn test_chunk_offsets_count_chars() {
        let chunk = Chunk::new("férias", SourceMetadata::new("rh.txt"), 10);
        assert_eq!(chunk.char_len(), 6);
        assert_eq!(chunk.end(), 16);
        assert_eq!(chunk.source(), "rh.txt");
    }
}
