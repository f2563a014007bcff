//! Deterministic provider doubles for unit tests

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, LlmProvider};

/// Bag-of-words embedder: each lowercase word is hashed into one bucket
pub struct HashEmbedder {
    dimensions: usize,
    model: String,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(256, "hash-256")
    }
}

impl HashEmbedder {
    pub fn new(dimensions: usize, model: &str) -> Self {
        Self {
            dimensions,
            model: model.to_string(),
        }
    }

    fn bucket(&self, word: &str) -> usize {
        // FNV-1a
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in word.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        (hash % self.dimensions as u64) as usize
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0; self.dimensions];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            vector[self.bucket(&word.to_lowercase())] += 1.0;
        }
        Ok(vector)
    }

    fn dimensions(&self) -> Option<usize> {
        Some(self.dimensions)
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// Embedder whose every call fails
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(Error::embedding("provider unavailable"))
    }

    fn model(&self) -> &str {
        "failing"
    }

    async fn health_check(&self) -> Result<bool> {
        Err(Error::embedding("connection refused"))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// LLM that records prompts and answers with a fixed reply
pub struct RecordingLlm {
    reply: String,
    prompts: Mutex<Vec<String>>,
}

impl RecordingLlm {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl LlmProvider for RecordingLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        Ok(self.reply.clone())
    }

    fn name(&self) -> &str {
        "recording"
    }

    fn model(&self) -> &str {
        "recording-1"
    }
}

/// LLM whose every call fails
pub struct FailingLlm;

#[async_trait]
impl LlmProvider for FailingLlm {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(Error::llm("model overloaded"))
    }

    fn name(&self) -> &str {
        "failing"
    }

    fn model(&self) -> &str {
        "failing"
    }
}
