//! Configuration for the RAG agent
//!
//! Settings are resolved once at startup: an optional TOML file, then
//! environment overrides, then [`RagConfig::validate`]. The resolved value is
//! read-only for the rest of the process.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Main RAG agent configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RagConfig {
    /// LLM / embedding backend
    pub provider: Provider,
    /// Model and credential configuration
    pub llm: LlmConfig,
    /// Source data and index locations
    pub paths: PathsConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Embedding batch configuration
    pub embedding: EmbeddingConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Request handler behaviour
    pub handler: HandlerConfig,
    /// HTTP server configuration
    pub server: ServerConfig,
}

/// Backend provider selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Google Generative Language API (Gemini + text-embedding)
    #[default]
    Google,
    /// Local Ollama server
    Ollama,
}

impl Provider {
    /// Name used in logs and configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Ollama => "ollama",
        }
    }
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "google" | "gemini" => Ok(Provider::Google),
            "ollama" => Ok(Provider::Ollama),
            other => Err(Error::config(format!(
                "Unsupported LLM provider '{}' (expected 'google' or 'ollama')",
                other
            ))),
        }
    }
}

/// LLM configuration shared by the embedding and generation ports
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API credential (required for Google)
    pub api_key: Option<String>,
    /// Override for the provider base URL
    pub base_url: Option<String>,
    /// Generation model name (provider default when unset)
    pub generate_model: Option<String>,
    /// Embedding model name (provider default when unset)
    pub embed_model: Option<String>,
    /// Temperature for generation
    pub temperature: f32,
    /// Per-call timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            generate_model: None,
            embed_model: None,
            temperature: 0.2,
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

impl LlmConfig {
    /// Base URL for the given provider
    pub fn base_url(&self, provider: Provider) -> String {
        if let Some(url) = &self.base_url {
            return url.trim_end_matches('/').to_string();
        }
        match provider {
            Provider::Google => "https://generativelanguage.googleapis.com/v1beta".to_string(),
            Provider::Ollama => "http://localhost:11434".to_string(),
        }
    }

    /// Generation model for the given provider
    pub fn generate_model(&self, provider: Provider) -> String {
        self.generate_model.clone().unwrap_or_else(|| match provider {
            Provider::Google => "gemini-2.5-flash".to_string(),
            Provider::Ollama => "phi3".to_string(),
        })
    }

    /// Embedding model for the given provider
    pub fn embed_model(&self, provider: Provider) -> String {
        self.embed_model.clone().unwrap_or_else(|| match provider {
            Provider::Google => "models/text-embedding-004".to_string(),
            Provider::Ollama => "nomic-embed-text".to_string(),
        })
    }
}

/// Filesystem locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding the source documents
    pub data_path: PathBuf,
    /// Directory holding the persisted vector index
    pub index_path: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("rag_data"),
            index_path: PathBuf::from("vector_store"),
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    pub chunk_overlap: usize,
    /// Also load `.md` / `.markdown` files
    pub include_markdown: bool,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 750,
            chunk_overlap: 120,
            include_markdown: false,
        }
    }
}

/// Embedding batch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Number of chunks per embedding call during index build
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { batch_size: 32 }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks retrieved per question
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 5 }
    }
}

/// Request handler configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HandlerConfig {
    /// Build the index from `data_path` when it is missing at startup
    pub auto_build: bool,
    /// Reject request bodies that are not JSON instead of using them as the question
    pub strict_body: bool,
    /// Override for the built-in system prompt
    pub system_prompt: Option<String>,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_cors: true,
        }
    }
}

impl RagConfig {
    /// Resolve configuration from an optional TOML file plus the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::not_found("Config file", path));
        }
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| Error::config(format!("Invalid config file '{}': {}", path.display(), e)))
    }

    /// Apply environment overrides using the given lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |keys: &[&str]| {
            keys.iter()
                .find_map(|key| lookup(*key))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(v) = var(&["LLM_PROVIDER"]) {
            self.provider = v.parse()?;
        }
        if let Some(v) = var(&["GOOGLE_API_KEY", "LLM_API_KEY"]) {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = var(&["LLM_BASE_URL"]) {
            self.llm.base_url = Some(v);
        }
        if let Some(v) = var(&["LLM_MODEL", "GOOGLE_LLM_MODEL"]) {
            self.llm.generate_model = Some(v);
        }
        if let Some(v) = var(&["EMBEDDING_MODEL", "GOOGLE_EMBEDDING_MODEL"]) {
            self.llm.embed_model = Some(v);
        }
        if let Some(v) = var(&["LLM_TEMPERATURE"]) {
            self.llm.temperature = parse_number("LLM_TEMPERATURE", &v)?;
        }
        if let Some(v) = var(&["LLM_TIMEOUT_SECS"]) {
            self.llm.timeout_secs = parse_number("LLM_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = var(&["LLM_MAX_RETRIES"]) {
            self.llm.max_retries = parse_number("LLM_MAX_RETRIES", &v)?;
        }
        if let Some(v) = var(&["RAG_DATA_PATH"]) {
            self.paths.data_path = PathBuf::from(v);
        }
        if let Some(v) = var(&["VECTOR_STORE_PATH"]) {
            self.paths.index_path = PathBuf::from(v);
        }
        if let Some(v) = var(&["RAG_TOP_K"]) {
            self.retrieval.top_k = parse_number("RAG_TOP_K", &v)?;
        }
        if let Some(v) = var(&["CHUNK_SIZE"]) {
            self.chunking.chunk_size = parse_number("CHUNK_SIZE", &v)?;
        }
        if let Some(v) = var(&["CHUNK_OVERLAP"]) {
            self.chunking.chunk_overlap = parse_number("CHUNK_OVERLAP", &v)?;
        }
        if let Some(v) = var(&["RAG_INCLUDE_MARKDOWN"]) {
            self.chunking.include_markdown = str_to_bool(&v);
        }
        if let Some(v) = var(&["EMBEDDING_BATCH_SIZE"]) {
            self.embedding.batch_size = parse_number("EMBEDDING_BATCH_SIZE", &v)?;
        }
        if let Some(v) = var(&["AUTO_BUILD_VECTOR_STORE"]) {
            self.handler.auto_build = str_to_bool(&v);
        }
        if let Some(v) = var(&["RAG_STRICT_BODY"]) {
            self.handler.strict_body = str_to_bool(&v);
        }
        if let Some(v) = var(&["RAG_SYSTEM_PROMPT"]) {
            self.handler.system_prompt = Some(v);
        }
        if let Some(v) = var(&["AGENT_SERVER_HOST"]) {
            self.server.host = v;
        }
        if let Some(v) = var(&["AGENT_SERVER_PORT"]) {
            self.server.port = parse_number("AGENT_SERVER_PORT", &v)?;
        }

        Ok(())
    }

    /// Check cross-field invariants; any failure is fatal at startup
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::config("chunk_size must be greater than zero"));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::config("top_k must be at least 1"));
        }
        if self.embedding.batch_size == 0 {
            return Err(Error::config("embedding batch_size must be at least 1"));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(Error::config(format!(
                "temperature {} is outside 0.0..=2.0",
                self.llm.temperature
            )));
        }
        if self.provider == Provider::Google
            && self.llm.api_key.as_deref().map_or(true, |k| k.trim().is_empty())
        {
            return Err(Error::config(
                "GOOGLE_API_KEY must be set to use the Google provider",
            ));
        }
        Ok(())
    }
}

/// Interpret common truthy strings ("1", "true", "t", "yes", "y")
pub fn str_to_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "t" | "yes" | "y"
    )
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::config(format!("{} has invalid value '{}'", key, value)))
}
