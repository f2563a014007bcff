//! Request handling: the context object shared by every entry point
//!
//! [`AgentHandler`] owns the resolved configuration, the provider ports and
//! the lazily-constructed [`RetrievalQa`]. Construction runs at most once at a
//! time; a failed attempt leaves the cell empty so a later warmup or request
//! can succeed once the index exists.

pub mod request;
pub mod response;

use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::generation::{PromptTemplate, RetrievalQa};
use crate::ingestion::IndexBuilder;
use crate::providers::{build_providers, Providers};
use crate::retrieval::VectorIndex;

pub use request::{extract_question, BodyMode};
pub use response::ResponseEnvelope;

/// Shared request handler
pub struct AgentHandler {
    config: Arc<RagConfig>,
    providers: Providers,
    qa: OnceCell<Arc<RetrievalQa>>,
}

impl AgentHandler {
    /// Create a handler over already-built providers
    pub fn new(config: RagConfig, providers: Providers) -> Self {
        Self {
            config: Arc::new(config),
            providers,
            qa: OnceCell::new(),
        }
    }

    /// Create a handler with the providers selected by `config`
    pub fn from_config(config: RagConfig) -> Result<Self> {
        config.validate()?;
        let providers = build_providers(&config)?;
        Ok(Self::new(config, providers))
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn providers(&self) -> &Providers {
        &self.providers
    }

    /// Whether the orchestrator has been constructed
    pub fn is_ready(&self) -> bool {
        self.qa.initialized()
    }

    /// Construct the orchestrator now instead of on the first request
    ///
    /// Concurrent callers wait for the single in-flight construction.
    pub async fn warmup(&self) -> Result<Arc<RetrievalQa>> {
        self.qa
            .get_or_try_init(|| self.construct())
            .await
            .map(Arc::clone)
    }

    async fn construct(&self) -> Result<Arc<RetrievalQa>> {
        let index = self.open_index().await?;

        tracing::info!(
            "Retrieval QA ready: {} chunks, top_k={}, generation model {}",
            index.len(),
            self.config.retrieval.top_k,
            self.providers.llm.model()
        );

        Ok(Arc::new(RetrievalQa::new(
            Arc::new(index),
            Arc::clone(&self.providers.embedder),
            Arc::clone(&self.providers.llm),
            PromptTemplate::with_override(self.config.handler.system_prompt.as_deref()),
            self.config.retrieval.top_k,
        )))
    }

    /// Load the persisted index, building it first when allowed
    async fn open_index(&self) -> Result<VectorIndex> {
        let index_path = self.config.paths.index_path.clone();

        if !index_path.exists() {
            if !self.config.handler.auto_build {
                return Err(Error::NotFound(format!(
                    "vector index not found at '{}'; run `rag-agent build` before serving \
                     or set AUTO_BUILD_VECTOR_STORE=true",
                    index_path.display()
                )));
            }

            tracing::info!(
                "No index at {}, building from {}",
                index_path.display(),
                self.config.paths.data_path.display()
            );
            let builder = IndexBuilder::from_config(&self.config)?;
            let (index, _) = builder
                .build_and_persist(self.providers.embedder.as_ref())
                .await?;
            return Ok(index);
        }

        let embedder = Arc::clone(&self.providers.embedder);
        tokio::task::spawn_blocking(move || VectorIndex::load(&index_path, embedder.as_ref()))
            .await
            .map_err(|e| Error::internal(format!("Index load task failed: {}", e)))?
    }

    /// Handle one inbound event
    pub async fn handle(&self, event: &Value) -> ResponseEnvelope {
        let mode = BodyMode::from_strict(self.config.handler.strict_body);
        let question = match extract_question(event, mode) {
            Ok(question) => question,
            Err(e) => {
                tracing::warn!("Rejected request: {}", e);
                return ResponseEnvelope::bad_request(&e);
            }
        };

        let qa = match self.warmup().await {
            Ok(qa) => qa,
            Err(e) => {
                tracing::error!("Retrieval QA unavailable: {}", e);
                return ResponseEnvelope::index_unavailable(&e);
            }
        };

        match qa.answer(&question).await {
            Ok(result) => ResponseEnvelope::ok(&result),
            Err(e) => {
                tracing::error!("Query \"{}\" failed: {}", question, e);
                ResponseEnvelope::from_error(&e)
            }
        }
    }

    /// Handle a bare question
    pub async fn ask(&self, question: &str) -> ResponseEnvelope {
        self.handle(&json!({ "question": question })).await
    }
}
