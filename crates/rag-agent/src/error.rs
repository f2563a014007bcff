//! Error types for the RAG agent

use std::path::Path;
use thiserror::Error;

/// Result type alias for RAG operations
pub type Result<T> = std::result::Result<T, Error>;

/// RAG agent errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (missing credential, unsupported provider, bad value)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source directory or index directory is missing
    #[error("Not found: {0}")]
    NotFound(String),

    /// No supported documents in the source directory
    #[error("No supported documents found in '{0}'")]
    EmptyCorpus(String),

    /// Request did not carry a usable question
    #[error("no question supplied")]
    NoQuestion,

    /// Request was malformed
    #[error("Invalid request: {0}")]
    ClientInput(String),

    /// File could not be read as text
    #[error("Failed to parse file '{filename}': {message}")]
    FileParse { filename: String, message: String },

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// LLM generation error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Provider refused the request itself, e.g. an invalid API key
    #[error("{operation} rejected with HTTP {status}: {message}")]
    Rejected {
        operation: String,
        status: u16,
        message: String,
    },

    /// External call exceeded its deadline
    #[error("Timed out after {secs}s: {operation}")]
    Timeout { operation: String, secs: u64 },

    /// Vector index error
    #[error("Vector index error: {0}")]
    VectorDb(String),

    /// Persisted index failed validation on load
    #[error("Corrupt index at '{path}': {message}")]
    CorruptIndex { path: String, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a not-found error for a filesystem path
    pub fn not_found(what: &str, path: &Path) -> Self {
        Self::NotFound(format!("{} '{}' does not exist", what, path.display()))
    }

    /// Create a file parse error
    pub fn file_parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileParse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create a vector index error
    pub fn vector_db(message: impl Into<String>) -> Self {
        Self::VectorDb(message.into())
    }

    /// Create a corrupt index error
    pub fn corrupt_index(path: &Path, message: impl Into<String>) -> Self {
        Self::CorruptIndex {
            path: path.display().to_string(),
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Stable taxonomy tag exposed in response bodies
    pub fn tag(&self) -> &'static str {
        match self {
            Error::Config(_) => "configuration_error",
            Error::NotFound(_) => "not_found",
            Error::EmptyCorpus(_) => "empty_corpus",
            Error::NoQuestion | Error::ClientInput(_) => "client_input_error",
            Error::FileParse { .. } => "parse_error",
            Error::Embedding(_) => "embedding_error",
            Error::Llm(_) => "generation_error",
            Error::Rejected { .. } => "provider_rejected",
            Error::Timeout { .. } => "timeout",
            Error::VectorDb(_) => "vector_index_error",
            Error::CorruptIndex { .. } => "corrupt_index",
            Error::Io(_) => "io_error",
            Error::Json(_) => "json_error",
            Error::Http(_) => "http_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// HTTP status used when this error ends a request
    pub fn status_code(&self) -> u16 {
        match self {
            Error::NoQuestion | Error::ClientInput(_) => 400,
            Error::Embedding(_) | Error::Llm(_) | Error::Rejected { .. } | Error::Http(_) => 502,
            Error::Timeout { .. } => 504,
            _ => 500,
        }
    }

    /// Whether a caller may reasonably retry the same request
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Timeout { .. } | Error::Embedding(_) | Error::Llm(_) | Error::Http(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(Error::ClientInput("x".into()).status_code(), 400);
        assert_eq!(Error::embedding("x").status_code(), 502);
        assert_eq!(
            Error::Timeout { operation: "generate".into(), secs: 5 }.status_code(),
            504
        );
        assert_eq!(Error::not_found("Index", Path::new("/nope")).status_code(), 500);
    }

    #[test]
    fn test_timeout_is_retryable() {
        let err = Error::Timeout { operation: "embed".into(), secs: 1 };
        assert!(err.is_retryable());
        assert_eq!(err.tag(), "timeout");
        assert!(!Error::config("bad").is_retryable());
    }

    #[test]
    fn test_rejected_is_final() {
        let err = Error::Rejected {
            operation: "google embedding".into(),
            status: 403,
            message: "API key not valid".into(),
        };
        assert!(!err.is_retryable());
        assert_eq!(err.status_code(), 502);
        assert_eq!(err.tag(), "provider_rejected");
    }

    #[test]
    fn test_no_question_is_client_input() {
        assert_eq!(Error::NoQuestion.status_code(), 400);
        assert_eq!(Error::NoQuestion.tag(), "client_input_error");
        assert_eq!(Error::NoQuestion.to_string(), "no question supplied");
    }
}
