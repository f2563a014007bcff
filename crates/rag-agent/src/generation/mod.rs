//! Answer generation: prompt rendering and retrieval-QA orchestration

pub mod prompt;
pub mod qa;

pub use prompt::{PromptTemplate, DEFAULT_SYSTEM_PROMPT};
pub use qa::RetrievalQa;
