//! Evaluation engine: scores normalized records and aggregates results.

use crate::error::{RagBenchError, Result};
use crate::eval::metrics::{Metric, MetricScorer};
use crate::executor::EvalRecord;
use futures::{StreamExt, stream};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// One record's scores, keyed by metric name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleScores {
    pub record: EvalRecord,
    pub scores: BTreeMap<String, f64>,
}

/// Immutable snapshot of one evaluation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvalResult {
    /// Per-record scores, in record order.
    pub per_sample: Vec<SampleScores>,
    /// Mean score per metric across all records.
    pub aggregate: BTreeMap<String, f64>,
}

impl EvalResult {
    /// Metric column names, in stable (sorted) order.
    pub fn metric_names(&self) -> Vec<String> {
        self.aggregate.keys().cloned().collect()
    }
}

/// Scores records through a [`MetricScorer`] and aggregates the results.
///
/// The engine owns shape adaptation and aggregation only; the actual
/// metric computation is delegated to the scorer. A scorer failure is
/// fatal for the run.
pub struct EvalEngine {
    scorer: Arc<dyn MetricScorer>,
    metrics: Vec<Metric>,
    concurrency: usize,
}

impl EvalEngine {
    pub fn new(scorer: Arc<dyn MetricScorer>, metrics: Vec<Metric>) -> Self {
        Self {
            scorer,
            metrics,
            concurrency: 4,
        }
    }

    /// Set the number of concurrent scoring calls.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// The metrics this engine scores.
    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    /// Score every record on every configured metric.
    ///
    /// Returns one [`SampleScores`] per record in input order, plus the
    /// per-metric mean. Fails with an evaluation backend error if any
    /// scoring call fails; partial scores are not returned.
    pub async fn evaluate(&self, records: &[EvalRecord]) -> Result<EvalResult> {
        let tasks = records.iter().enumerate().flat_map(|(idx, record)| {
            self.metrics.iter().map(move |&metric| {
                let scorer = Arc::clone(&self.scorer);
                async move { (idx, metric, scorer.score(metric, record).await) }
            })
        });

        let outcomes: Vec<(usize, Metric, Result<f64>)> = stream::iter(tasks)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut tables: Vec<BTreeMap<String, f64>> = vec![BTreeMap::new(); records.len()];
        for (idx, metric, outcome) in outcomes {
            let score = outcome.map_err(|e| {
                RagBenchError::Evaluation(format!(
                    "{} scoring failed for record {}: {}",
                    metric, idx, e
                ))
            })?;
            tables[idx].insert(metric.name().to_string(), score);
        }

        let mut aggregate = BTreeMap::new();
        if !records.is_empty() {
            for metric in &self.metrics {
                let sum: f64 = tables
                    .iter()
                    .filter_map(|t| t.get(metric.name()))
                    .sum();
                aggregate.insert(metric.name().to_string(), sum / records.len() as f64);
            }
        }

        let per_sample = records
            .iter()
            .cloned()
            .zip(tables)
            .map(|(record, scores)| SampleScores { record, scores })
            .collect();

        Ok(EvalResult {
            per_sample,
            aggregate,
        })
    }
}
