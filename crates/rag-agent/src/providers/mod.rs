//! Provider abstractions for embeddings and generation
//!
//! The embedding and LLM ports are traits so the pipeline can switch between
//! a local Ollama server and the Google Generative Language API.

pub mod embedding;
pub mod google;
pub mod llm;
pub mod ollama;
pub mod retry;

use serde::Serialize;
use std::sync::Arc;

pub use embedding::EmbeddingProvider;
pub use google::{GeminiLlm, GoogleClient, GoogleEmbedder};
pub use llm::LlmProvider;
pub use ollama::{OllamaClient, OllamaEmbedder, OllamaLlm};
pub use retry::RetryPolicy;

use crate::config::{Provider, RagConfig};
use crate::error::Result;

/// The pair of ports the pipeline runs against
#[derive(Clone)]
pub struct Providers {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub llm: Arc<dyn LlmProvider>,
}

impl Providers {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, llm: Arc<dyn LlmProvider>) -> Self {
        Self { embedder, llm }
    }

    /// Health-check both backends concurrently
    pub async fn health(&self) -> ProviderHealth {
        let (embedding, generation) =
            tokio::join!(self.embedder.health_check(), self.llm.health_check());

        ProviderHealth {
            embedding: ProviderStatus::new(
                self.embedder.name(),
                self.embedder.model(),
                embedding,
            ),
            generation: ProviderStatus::new(self.llm.name(), self.llm.model(), generation),
        }
    }
}

/// Result of one provider health check
#[derive(Debug, Clone, Serialize)]
pub struct ProviderStatus {
    pub provider: String,
    pub model: String,
    pub healthy: bool,
}

impl ProviderStatus {
    fn new(provider: &str, model: &str, check: Result<bool>) -> Self {
        let healthy = match check {
            Ok(healthy) => healthy,
            Err(e) => {
                tracing::warn!("Health check for {} ({}) failed: {}", provider, model, e);
                false
            }
        };
        Self {
            provider: provider.to_string(),
            model: model.to_string(),
            healthy,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderHealth {
    pub embedding: ProviderStatus,
    pub generation: ProviderStatus,
}

impl ProviderHealth {
    pub fn is_healthy(&self) -> bool {
        self.embedding.healthy && self.generation.healthy
    }
}

/// Construct the configured backend
pub fn build_providers(config: &RagConfig) -> Result<Providers> {
    let providers = match config.provider {
        Provider::Google => {
            let (embedder, llm) = google::google_providers(&config.llm)?;
            Providers::new(Arc::new(embedder), Arc::new(llm))
        }
        Provider::Ollama => {
            let (embedder, llm) = ollama::ollama_providers(&config.llm)?;
            Providers::new(Arc::new(embedder), Arc::new(llm))
        }
    };

    tracing::info!(
        "Using {} providers (embedding: {}, generation: {})",
        config.provider.as_str(),
        providers.embedder.model(),
        providers.llm.model()
    );

    Ok(providers)
}
