//! Google Generative Language API providers (Gemini + text-embedding)
//!
//! Authenticates with an API key sent in the `x-goog-api-key` header.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{LlmConfig, Provider};
use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;
use super::llm::LlmProvider;
use super::retry::{status_error, RetryPolicy};

/// The API rejects batch embedding requests larger than this
pub const MAX_EMBED_BATCH: usize = 100;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Generative Language API client
pub struct GoogleClient {
    client: Client,
    base_url: String,
    api_key: String,
    temperature: f32,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

impl<'a> Content<'a> {
    fn text(role: Option<&'a str>, text: &'a str) -> Self {
        Self {
            role,
            parts: vec![Part { text }],
        }
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    content: Content<'a>,
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedRequest<'a>>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

/// Model names must carry the `models/` prefix in request paths and bodies
pub fn qualified_model(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    }
}

impl GoogleClient {
    /// Create a new client; the API key is mandatory
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::config("GOOGLE_API_KEY is required for the google provider"))?;

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(5)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url(Provider::Google),
            api_key,
            temperature: config.temperature,
            retry: RetryPolicy::from_config(config),
        })
    }

    /// Check that the key can list models
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models", self.base_url);

        match self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Embed a single text
    pub async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        let model = qualified_model(model);
        let url = format!("{}/{}:embedContent", self.base_url, model);
        let (url, model, this) = (url.as_str(), model.as_str(), self);

        self.retry
            .run("google embedding", || async move {
                let request = EmbedRequest {
                    model,
                    content: Content::text(None, text),
                };

                let response = this
                    .client
                    .post(url)
                    .header(API_KEY_HEADER, &this.api_key)
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| Error::embedding(format!("Embedding request failed: {}", e)))?;

                if !response.status().is_success() {
                    return Err(
                        status_error("google embedding", response, Error::Embedding).await,
                    );
                }

                let embed_response: EmbedResponse = response.json().await.map_err(|e| {
                    Error::embedding(format!("Failed to parse embedding response: {}", e))
                })?;

                Ok(embed_response.embedding.values)
            })
            .await
    }

    /// Embed many texts, splitting into API-sized requests
    pub async fn embed_batch(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = qualified_model(model);
        let url = format!("{}/{}:batchEmbedContents", self.base_url, model);
        let (url, model, this) = (url.as_str(), model.as_str(), self);

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(MAX_EMBED_BATCH) {
            let embeddings = self
                .retry
                .run("google batch embedding", || async move {
                    let request = BatchEmbedRequest {
                        requests: batch
                            .iter()
                            .map(|t| EmbedRequest {
                                model,
                                content: Content::text(None, t),
                            })
                            .collect(),
                    };

                    let response = this
                        .client
                        .post(url)
                        .header(API_KEY_HEADER, &this.api_key)
                        .json(&request)
                        .send()
                        .await
                        .map_err(|e| {
                            Error::embedding(format!("Batch embedding request failed: {}", e))
                        })?;

                    if !response.status().is_success() {
                        let err =
                            status_error("google batch embedding", response, Error::Embedding)
                                .await;
                        return Err(err);
                    }

                    let embed_response: BatchEmbedResponse =
                        response.json().await.map_err(|e| {
                            Error::embedding(format!(
                                "Failed to parse batch embedding response: {}",
                                e
                            ))
                        })?;

                    if embed_response.embeddings.len() != batch.len() {
                        return Err(Error::embedding(format!(
                            "Batch embedding returned {} vectors for {} texts",
                            embed_response.embeddings.len(),
                            batch.len()
                        )));
                    }

                    Ok(embed_response.embeddings)
                })
                .await?;

            all_embeddings.extend(embeddings.into_iter().map(|e| e.values));
        }

        Ok(all_embeddings)
    }

    /// Generate a completion for a rendered prompt
    pub async fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        let model = qualified_model(model);
        let url = format!("{}/{}:generateContent", self.base_url, model);
        let (url, this) = (url.as_str(), self);

        tracing::info!("Generating answer with model: {}", model);

        self.retry
            .run("google generation", || async move {
                let request = GenerateRequest {
                    contents: vec![Content::text(Some("user"), prompt)],
                    generation_config: GenerationConfig {
                        temperature: this.temperature,
                    },
                };

                let response = this
                    .client
                    .post(url)
                    .header(API_KEY_HEADER, &this.api_key)
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| Error::llm(format!("Gemini request failed: {}", e)))?;

                if !response.status().is_success() {
                    return Err(
                        status_error("google generation", response, Error::Llm).await,
                    );
                }

                let gen_response: GenerateResponse = response
                    .json()
                    .await
                    .map_err(|e| Error::llm(format!("Failed to parse Gemini response: {}", e)))?;

                extract_text(gen_response)
            })
            .await
    }
}

/// Concatenate the text parts of the first candidate
fn extract_text(response: GenerateResponse) -> Result<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(Error::llm("No text in Gemini response"));
    }
    Ok(text)
}

/// Embedding provider backed by the Generative Language API
pub struct GoogleEmbedder {
    client: Arc<GoogleClient>,
    model: String,
}

impl GoogleEmbedder {
    pub fn from_client(client: Arc<GoogleClient>, model: String) -> Self {
        Self {
            client,
            model: qualified_model(&model),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for GoogleEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.client.embed(&self.model, text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.client.embed_batch(&self.model, texts).await
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "google"
    }
}

/// Gemini generation provider
pub struct GeminiLlm {
    client: Arc<GoogleClient>,
    model: String,
}

impl GeminiLlm {
    pub fn from_client(client: Arc<GoogleClient>, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl LlmProvider for GeminiLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.client.generate(&self.model, prompt).await
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "google"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Build an embedder and LLM sharing one Google client
pub fn google_providers(config: &LlmConfig) -> Result<(GoogleEmbedder, GeminiLlm)> {
    let client = Arc::new(GoogleClient::new(config)?);
    Ok((
        GoogleEmbedder::from_client(Arc::clone(&client), config.embed_model(Provider::Google)),
        GeminiLlm::from_client(client, config.generate_model(Provider::Google)),
    ))
}
