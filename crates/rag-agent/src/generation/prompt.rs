//! Prompt template for retrieval-augmented answers

use crate::types::Chunk;

/// System instructions used when no override is configured
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a multi-department corporate assistant \
(HR and Financial Products) that answers from the internal documents provided. \
Summarize and explain clearly, cite benefits when applicable, \
and say so when no relevant information is found.";

const QA_TEMPLATE: &str = "{system_prompt}

Context:
{context}

Question:
{question}

Structured answer:
- Key insight:
- Relevant internal references:
- Recommended next steps:";

/// QA prompt with the system prompt bound at construction
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    system_prompt: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}

impl PromptTemplate {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
        }
    }

    /// Use `system_prompt` when set and non-blank, the built-in prompt otherwise
    pub fn with_override(system_prompt: Option<&str>) -> Self {
        match system_prompt.map(str::trim).filter(|s| !s.is_empty()) {
            Some(prompt) => Self::new(prompt),
            None => Self::default(),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Concatenate retrieved chunk contents, separated by blank lines
    pub fn build_context<'a>(chunks: impl IntoIterator<Item = &'a Chunk>) -> String {
        chunks
            .into_iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Fill the template
    pub fn render(&self, context: &str, question: &str) -> String {
        // Single pass so placeholder-like text inside the context is left alone
        let mut out = String::with_capacity(
            QA_TEMPLATE.len() + self.system_prompt.len() + context.len() + question.len(),
        );
        let mut rest = QA_TEMPLATE;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let tail = &rest[open..];
            let (value, consumed) = if tail.starts_with("{system_prompt}") {
                (self.system_prompt.as_str(), "{system_prompt}".len())
            } else if tail.starts_with("{context}") {
                (context, "{context}".len())
            } else if tail.starts_with("{question}") {
                (question, "{question}".len())
            } else {
                ("{", 1)
            };
            out.push_str(value);
            rest = &tail[consumed..];
        }
        out.push_str(rest);

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceMetadata;

    #[test]
    fn test_render_fills_every_slot() {
        let prompt = PromptTemplate::new("Be brief.");
        let rendered = prompt.render("Paid vacation is 30 days per year.", "How many vacation days?");

        assert!(rendered.starts_with("Be brief.\n\nContext:\nPaid vacation is 30 days per year."));
        assert!(rendered.contains("Question:\nHow many vacation days?"));
        assert!(rendered.ends_with("- Recommended next steps:"));
        assert!(!rendered.contains("{context}"));
    }

    #[test]
    fn test_placeholders_in_context_are_not_expanded() {
        let prompt = PromptTemplate::default();
        let rendered = prompt.render("literal {question} braces", "Q?");
        assert!(rendered.contains("literal {question} braces"));
        assert_eq!(rendered.matches("Q?").count(), 1);
    }

    #[test]
    fn test_override_falls_back_when_blank() {
        assert_eq!(
            PromptTemplate::with_override(Some("  ")).system_prompt(),
            DEFAULT_SYSTEM_PROMPT
        );
        assert_eq!(
            PromptTemplate::with_override(Some("Answer in French.")).system_prompt(),
            "Answer in French."
        );
        assert_eq!(PromptTemplate::with_override(None).system_prompt(), DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn test_context_joins_chunks_in_order() {
        let meta = SourceMetadata::new("policy.txt");
        let chunks = vec![
            Chunk::new("first", meta.clone(), 0),
            Chunk::new("second", meta, 5),
        ];
        assert_eq!(PromptTemplate::build_context(&chunks), "first\n\nsecond");
    }
}
