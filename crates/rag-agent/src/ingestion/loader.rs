//! Directory loader for plain-text documents

use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::{Document, FileType};

/// Loads supported files from a directory tree
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    include_markdown: bool,
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self::new(false)
    }
}

impl DocumentLoader {
    /// Create a loader; `.txt` is always accepted, markdown only when enabled
    pub fn new(include_markdown: bool) -> Self {
        Self { include_markdown }
    }

    /// Create from configuration
    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.include_markdown)
    }

    /// Check whether a path is on the extension allow-list
    pub fn is_supported(&self, path: &Path) -> bool {
        let file_type = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(FileType::from_extension);

        match file_type {
            Some(FileType::Txt) => true,
            Some(FileType::Markdown) => self.include_markdown,
            None => false,
        }
    }

    /// Recursively load every supported file under `dir`, sorted by path
    ///
    /// An empty result is returned as an empty list; whether that is an
    /// error is decided by the caller building the index.
    pub fn load(&self, dir: &Path) -> Result<Vec<Document>> {
        if !dir.is_dir() {
            return Err(Error::not_found("Data directory", dir));
        }

        let mut paths: Vec<PathBuf> = Vec::new();
        let walker = WalkDir::new(dir)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

        for entry in walker {
            let entry = entry.map_err(|e| {
                Error::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("Failed to walk '{}': {}", dir.display(), e),
                ))
            })?;
            if entry.file_type().is_file() && self.is_supported(entry.path()) {
                paths.push(entry.into_path());
            }
        }
        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let source = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());

            let bytes = std::fs::read(&path)?;
            let content = String::from_utf8(bytes)
                .map_err(|e| Error::file_parse(&source, format!("not valid UTF-8: {}", e)))?;

            documents.push(Document::new(content, source));
        }

        tracing::info!("Loaded {} documents from {}", documents.len(), dir.display());
        Ok(documents)
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}
