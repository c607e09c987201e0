//! Runner contract and the default retrieve-then-generate pipeline.

use crate::error::Result;
use crate::llm::{ChatModel, Prompts};
use crate::store::{Passage, Retriever};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The output shape every runner must produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerOutput {
    /// The question that was asked.
    pub question: String,
    /// The generated answer.
    pub generation: String,
    /// Passages used to answer, in retrieval order.
    pub contexts: Vec<Passage>,
}

/// Capability contract for a question-to-answer workflow.
///
/// Each `invoke` is independent; implementations hold no per-call state.
/// Variants with extra stages (query rewriting, reranking, multi-hop
/// retrieval) satisfy the same contract by composing more steps before
/// generation.
#[async_trait]
pub trait Runner: Send + Sync {
    async fn invoke(&self, question: &str) -> Result<RunnerOutput>;
}

/// Default runner: retrieve `top_k` passages, then generate one answer
/// from the question and the concatenated passages.
pub struct RagRunner {
    retriever: Arc<dyn Retriever>,
    model: Arc<dyn ChatModel>,
    top_k: usize,
}

impl RagRunner {
    pub fn new(retriever: Arc<dyn Retriever>, model: Arc<dyn ChatModel>, top_k: usize) -> Self {
        Self {
            retriever,
            model,
            top_k,
        }
    }

    fn build_prompt(question: &str, contexts: &[Passage]) -> String {
        let context = contexts
            .iter()
            .map(|p| p.text())
            .collect::<Vec<_>>()
            .join("\n\n---\n\n");

        Prompts::rag_answer()
            .replace("{context}", &context)
            .replace("{question}", question)
    }
}

#[async_trait]
impl Runner for RagRunner {
    async fn invoke(&self, question: &str) -> Result<RunnerOutput> {
        let contexts = self.retriever.invoke(question, self.top_k).await?;

        let prompt = Self::build_prompt(question, &contexts);
        let generation = self.model.complete(None, &prompt).await?;

        Ok(RunnerOutput {
            question: question.to_string(),
            generation: generation.trim().to_string(),
            contexts,
        })
    }
}
