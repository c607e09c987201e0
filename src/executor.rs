//! Batch executor: runs a runner over every sample in a dataset.
//!
//! Samples are independent, so invocations fan out over a bounded worker
//! pool; results are reassembled in input order, not completion order. A
//! failing invocation is recorded as a flagged sentinel record instead of
//! aborting the batch.

use crate::dataset::Sample;
use crate::error::Result;
use crate::runner::{Runner, RunnerOutput};
use futures::{StreamExt, stream};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// The normalized record consumed by the evaluation engine: one sample's
/// ground truth zipped with its runner output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalRecord {
    /// The question that was asked.
    pub question: String,
    /// The runner's generated answer.
    pub answer: String,
    /// Ground truth answer from the dataset.
    pub ground_truth: String,
    /// Retrieved passage texts, in retrieval order.
    pub contexts: Vec<String>,
}

impl EvalRecord {
    /// Zip a sample with its runner output.
    pub fn from_parts(sample: &Sample, output: RunnerOutput) -> Self {
        Self {
            question: sample.question.clone(),
            answer: output.generation,
            ground_truth: sample.ground_truth.clone(),
            contexts: output
                .contexts
                .into_iter()
                .map(|p| p.text)
                .collect(),
        }
    }

    /// Sentinel record for a failed invocation: empty generation, empty
    /// contexts. The matching [`BatchError`] carries the cause.
    pub fn errored(sample: &Sample) -> Self {
        Self {
            question: sample.question.clone(),
            answer: String::new(),
            ground_truth: sample.ground_truth.clone(),
            contexts: Vec::new(),
        }
    }
}

/// A per-sample failure, kept alongside the records so the operator can
/// tell "failed to run" apart from "scored zero".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    pub sample_id: String,
    /// Index of the sentinel record in [`BatchOutput::records`].
    pub index: usize,
    pub message: String,
}

/// Result of one batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchOutput {
    /// One record per sample, in input order.
    pub records: Vec<EvalRecord>,
    /// Failures, in input order.
    pub errors: Vec<BatchError>,
}

/// Run `runner` over every sample with up to `concurrency` invocations in
/// flight. Returns exactly one record per sample, in input order.
pub async fn run_batch(samples: &[Sample], runner: &dyn Runner, concurrency: usize) -> BatchOutput {
    let concurrency = concurrency.max(1);

    let tasks = samples.iter().enumerate().map(|(idx, sample)| async move {
        (idx, sample, runner.invoke(&sample.question).await)
    });

    let mut outcomes: Vec<(usize, &Sample, Result<RunnerOutput>)> = stream::iter(tasks)
        .buffer_unordered(concurrency)
        .collect()
        .await;
    outcomes.sort_by_key(|(idx, _, _)| *idx);

    let mut output = BatchOutput::default();
    for (idx, sample, outcome) in outcomes {
        match outcome {
            Ok(result) => {
                if result.contexts.is_empty() {
                    warn!(sample = %sample.id, "runner returned no contexts");
                }
                output.records.push(EvalRecord::from_parts(sample, result));
            }
            Err(e) => {
                warn!(sample = %sample.id, error = %e, "runner invocation failed");
                output.errors.push(BatchError {
                    sample_id: sample.id.clone(),
                    index: idx,
                    message: e.to_string(),
                });
                output.records.push(EvalRecord::errored(sample));
            }
        }
    }

    output
}
