//! Metric definitions and the LLM-judge scoring backend.

use crate::error::{RagBenchError, Result};
use crate::executor::EvalRecord;
use crate::llm::{ChatModel, Prompts};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The supported RAG metrics. Every score is in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Is the answer supported by the retrieved context?
    Faithfulness,
    /// Does the answer address the question?
    AnswerRelevance,
    /// How much of the retrieved context was relevant?
    ContextPrecision,
    /// Was all needed context retrieved?
    ContextRecall,
}

impl Metric {
    /// All metrics, in display order.
    pub const ALL: [Metric; 4] = [
        Metric::Faithfulness,
        Metric::AnswerRelevance,
        Metric::ContextPrecision,
        Metric::ContextRecall,
    ];

    /// Stable snake_case name, used in config, CSV columns and summaries.
    pub fn name(self) -> &'static str {
        match self {
            Metric::Faithfulness => "faithfulness",
            Metric::AnswerRelevance => "answer_relevance",
            Metric::ContextPrecision => "context_precision",
            Metric::ContextRecall => "context_recall",
        }
    }

    /// Parse a configured metric name.
    pub fn parse(name: &str) -> Option<Metric> {
        Metric::ALL.into_iter().find(|m| m.name() == name)
    }

    fn prompt_template(self) -> &'static str {
        match self {
            Metric::Faithfulness => Prompts::faithfulness(),
            Metric::AnswerRelevance => Prompts::answer_relevance(),
            Metric::ContextPrecision => Prompts::context_precision(),
            Metric::ContextRecall => Prompts::context_recall(),
        }
    }

    /// Fill the metric's judge prompt from a record.
    pub fn render_prompt(self, record: &EvalRecord) -> String {
        self.prompt_template()
            .replace("{contexts}", &format_contexts(&record.contexts))
            .replace("{ground_truth}", &record.ground_truth)
            .replace("{answer}", &record.answer)
            .replace("{question}", &record.question)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn format_contexts(contexts: &[String]) -> String {
    if contexts.is_empty() {
        return "(no context retrieved)".to_string();
    }
    contexts
        .iter()
        .enumerate()
        .map(|(i, c)| format!("[{}] {}", i + 1, c))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Capability contract for the scoring backend.
///
/// The engine depends only on this trait; the default implementation is an
/// LLM judge, and tests substitute deterministic scorers.
#[async_trait]
pub trait MetricScorer: Send + Sync {
    /// Score one record on one metric, in [0, 1].
    async fn score(&self, metric: Metric, record: &EvalRecord) -> Result<f64>;
}

/// LLM-as-judge scorer: one prompt per (metric, record) pair, expecting a
/// strict JSON `{"score": ..., "reasoning": ...}` response.
pub struct JudgeScorer {
    model: Arc<dyn ChatModel>,
}

impl JudgeScorer {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// Parse a judge response, clamping the score into [0, 1].
    fn parse_score(response: &str) -> Result<f64> {
        let json_str = Self::extract_json(response);

        #[derive(Deserialize)]
        struct RawScore {
            score: f64,
            #[serde(default)]
            #[allow(dead_code)]
            reasoning: Option<String>,
        }

        let raw: RawScore = serde_json::from_str(&json_str).map_err(|e| {
            RagBenchError::LlmParse(format!(
                "Failed to parse judge response: {}. Response: {}",
                e, response
            ))
        })?;

        if !raw.score.is_finite() {
            return Err(RagBenchError::LlmParse(format!(
                "Non-finite score in judge response: {}",
                response
            )));
        }

        Ok(raw.score.clamp(0.0, 1.0))
    }

    /// Extract JSON from a response that may be fenced or surrounded by
    /// prose.
    fn extract_json(response: &str) -> String {
        let response = response.trim();

        if response.starts_with("```json") {
            if let Some(end) = response.rfind("```") {
                let start = "```json".len();
                if end > start {
                    return response[start..end].trim().to_string();
                }
            }
        }

        if response.starts_with("```") {
            if let Some(end) = response.rfind("```") {
                let start = response.find('\n').map(|n| n + 1).unwrap_or(3);
                if end > start {
                    return response[start..end].trim().to_string();
                }
            }
        }

        if let Some(start) = response.find('{') {
            if let Some(end) = response.rfind('}') {
                if end > start {
                    return response[start..=end].to_string();
                }
            }
        }

        response.to_string()
    }
}

#[async_trait]
impl MetricScorer for JudgeScorer {
    async fn score(&self, metric: Metric, record: &EvalRecord) -> Result<f64> {
        let prompt = metric.render_prompt(record);
        let response = self.model.complete(None, &prompt).await?;
        Self::parse_score(&response)
    }
}
