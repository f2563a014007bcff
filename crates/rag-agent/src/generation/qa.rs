//! Retrieval-QA orchestration: embed, retrieve, prompt, generate

use std::sync::Arc;
use std::time::Instant;

use crate::error::Result;
use crate::providers::{EmbeddingProvider, LlmProvider};
use crate::retrieval::VectorIndex;
use crate::types::QueryResult;

use super::prompt::PromptTemplate;

/// Answers questions against an immutable index
///
/// Holds no per-request state, so one instance is shared by every request.
pub struct RetrievalQa {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    prompt: PromptTemplate,
    top_k: usize,
}

impl RetrievalQa {
    pub fn new(
        index: Arc<VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        prompt: PromptTemplate,
        top_k: usize,
    ) -> Self {
        Self {
            index,
            embedder,
            llm,
            prompt,
            top_k,
        }
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Answer one question
    pub async fn answer(&self, question: &str) -> Result<QueryResult> {
        let start = Instant::now();

        tracing::info!("Query: \"{}\"", question);

        let query_embedding = self.embedder.embed(question).await.map_err(|e| {
            tracing::error!("Failed to embed question \"{}\": {}", question, e);
            e
        })?;

        let results = self.index.query(&query_embedding, self.top_k)?;
        tracing::debug!(
            "Retrieved {} chunks (best similarity {:.3})",
            results.len(),
            results.first().map(|r| r.similarity).unwrap_or(0.0)
        );

        let context = PromptTemplate::build_context(results.iter().map(|r| &r.chunk));
        let prompt = self.prompt.render(&context, question);

        let answer = self.llm.generate(&prompt).await.map_err(|e| {
            tracing::error!(
                "Generation failed for question \"{}\" with {}: {}",
                question,
                self.llm.model(),
                e
            );
            e
        })?;

        let result = QueryResult::new(answer, results.iter().map(|r| &r.chunk));

        tracing::info!(
            "Query completed in {}ms, {} sources",
            start.elapsed().as_millis(),
            result.sources.len()
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::testing::{FailingEmbedder, FailingLlm, HashEmbedder, RecordingLlm};
    use crate::types::{Chunk, SourceMetadata};

    async fn sample_index(embedder: &HashEmbedder) -> Arc<VectorIndex> {
        let chunks = vec![
            Chunk::new(
                "Paid vacation is 30 days per year.",
                SourceMetadata::new("vacation.txt"),
                0,
            ),
            Chunk::new(
                "Expense reports are due by the fifth business day.",
                SourceMetadata::new("finance.txt"),
                0,
            ),
            Chunk::new(
                "Parental leave lasts 120 days.",
                SourceMetadata::new("leave.txt"),
                0,
            ),
        ];
        Arc::new(VectorIndex::build(chunks, embedder, 2).await.unwrap())
    }

    #[tokio::test]
    async fn test_answer_uses_retrieved_context() {
        let embedder = Arc::new(HashEmbedder::default());
        let index = sample_index(&embedder).await;
        let llm = Arc::new(RecordingLlm::new("Key insight: 30 days."));

        let qa = RetrievalQa::new(
            index,
            embedder,
            llm.clone(),
            PromptTemplate::new("Be brief."),
            1,
        );
        let result = qa.answer("How many paid vacation days per year?").await.unwrap();

        assert_eq!(result.answer, "Key insight: 30 days.");
        assert_eq!(result.sources.len(), 1);
        assert_eq!(result.sources[0].source, "vacation.txt");

        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].starts_with("Be brief."));
        assert!(prompts[0].contains("Paid vacation is 30 days per year."));
        assert!(prompts[0].contains("How many paid vacation days per year?"));
        assert!(!prompts[0].contains("Expense reports"));
    }

    #[tokio::test]
    async fn test_top_k_larger_than_index() {
        let embedder = Arc::new(HashEmbedder::default());
        let index = sample_index(&embedder).await;
        let qa = RetrievalQa::new(
            index,
            embedder,
            Arc::new(RecordingLlm::new("ok")),
            PromptTemplate::default(),
            10,
        );

        let result = qa.answer("leave").await.unwrap();
        assert_eq!(result.sources.len(), 3);
        assert_eq!(result.sources[0].source, "leave.txt");
    }

    #[tokio::test]
    async fn test_port_failures_propagate() {
        let embedder = Arc::new(HashEmbedder::default());
        let index = sample_index(&embedder).await;

        let qa = RetrievalQa::new(
            index.clone(),
            Arc::new(FailingEmbedder),
            Arc::new(RecordingLlm::new("unused")),
            PromptTemplate::default(),
            2,
        );
        assert!(matches!(qa.answer("q").await, Err(Error::Embedding(_))));

        let qa = RetrievalQa::new(
            index,
            embedder,
            Arc::new(FailingLlm),
            PromptTemplate::default(),
            2,
        );
        assert!(matches!(qa.answer("vacation").await, Err(Error::Llm(_))));
    }
}
