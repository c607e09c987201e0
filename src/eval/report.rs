//! Run reports: console summary, CSV export and the saved JSON consumed
//! by the `inspect` command.

use crate::error::{RagBenchError, Result};
use crate::eval::engine::EvalResult;
use crate::executor::BatchError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Everything one run produced: scores plus the per-sample failures that
/// were flagged instead of aborting the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Dataset name.
    pub dataset: String,
    /// Scores for the run.
    pub result: EvalResult,
    /// Samples whose runner invocation failed.
    pub errors: Vec<BatchError>,
    /// Wall-clock run time in seconds.
    pub elapsed_secs: f64,
}

impl RunReport {
    /// Print an aggregate summary to stdout.
    pub fn print_summary(&self) {
        println!("\n========== Evaluation Results ==========");
        println!("Dataset: {}", self.dataset);
        println!("Records: {}", self.result.per_sample.len());
        println!("----------------------------------------");

        if self.result.aggregate.is_empty() {
            println!("(no scores)");
        } else {
            for (metric, score) in &self.result.aggregate {
                println!("{:<22} {:.3}", metric, score);
            }
        }

        println!("----------------------------------------");
        println!("Total time: {:.1}s", self.elapsed_secs);
        println!("========================================");

        if !self.errors.is_empty() {
            println!("\n{} sample(s) failed to run (scored as empty):", self.errors.len());
            for error in &self.errors {
                println!("  {}: {}", error.sample_id, error.message);
            }
        }
        println!();
    }

    /// Print one record's full detail, keyed by 0-based index.
    pub fn print_record(&self, index: usize) -> Result<()> {
        let scores = self.result.per_sample.get(index).ok_or_else(|| {
            RagBenchError::Evaluation(format!(
                "Record index {} out of range (run has {} records)",
                index,
                self.result.per_sample.len()
            ))
        })?;

        println!("Record {} of {}", index, self.result.per_sample.len());
        println!("{}", "─".repeat(60));
        println!("Question:     {}", scores.record.question);
        println!("Generation:   {}", scores.record.answer);
        println!("Ground truth: {}", scores.record.ground_truth);

        println!("Contexts ({}):", scores.record.contexts.len());
        for (i, context) in scores.record.contexts.iter().enumerate() {
            println!("  [{}] {}", i + 1, context);
        }

        println!("Scores:");
        for (metric, score) in &scores.scores {
            println!("  {:<22} {:.3}", metric, score);
        }

        if let Some(error) = self.errors.iter().find(|e| e.index == index) {
            println!("FAILED TO RUN ({}): {}", error.sample_id, error.message);
        }

        Ok(())
    }

    /// Save the report as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| RagBenchError::io(parent, e))?;
            }
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| RagBenchError::Serialization(e.to_string()))?;
        fs::write(path, content).map_err(|e| RagBenchError::io(path, e))?;
        Ok(())
    }

    /// Load a previously saved report.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| RagBenchError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| RagBenchError::Serialization(e.to_string()))
    }
}

/// Export per-record scores as CSV: fixed columns, then one column per
/// metric, one row per record.
pub fn write_csv(result: &EvalResult, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| RagBenchError::io(parent, e))?;
        }
    }

    let mut writer =
        csv::Writer::from_path(path).map_err(|e| RagBenchError::Serialization(e.to_string()))?;

    let metric_names = result.metric_names();

    let mut header = vec![
        "question".to_string(),
        "generation".to_string(),
        "ground_truth".to_string(),
        "contexts".to_string(),
    ];
    header.extend(metric_names.iter().cloned());
    writer
        .write_record(&header)
        .map_err(|e| RagBenchError::Serialization(e.to_string()))?;

    for scores in &result.per_sample {
        let mut row = vec![
            scores.record.question.clone(),
            scores.record.answer.clone(),
            scores.record.ground_truth.clone(),
            scores.record.contexts.join("\n---\n"),
        ];
        for name in &metric_names {
            let score = scores.scores.get(name).copied().unwrap_or(0.0);
            row.push(format!("{:.4}", score));
        }
        writer
            .write_record(&row)
            .map_err(|e| RagBenchError::Serialization(e.to_string()))?;
    }

    writer
        .flush()
        .map_err(|e| RagBenchError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::engine::SampleScores;
    use crate::executor::EvalRecord;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn result_with_two_records() -> EvalResult {
        let record = |q: &str| EvalRecord {
            question: q.to_string(),
            answer: "answer".to_string(),
            ground_truth: "truth".to_string(),
            contexts: vec!["c1".to_string(), "c2".to_string()],
        };

        let scores = |f: f64, r: f64| {
            let mut m = BTreeMap::new();
            m.insert("faithfulness".to_string(), f);
            m.insert("answer_relevance".to_string(), r);
            m
        };

        let mut aggregate = BTreeMap::new();
        aggregate.insert("faithfulness".to_string(), 0.6);
        aggregate.insert("answer_relevance".to_string(), 0.8);

        EvalResult {
            per_sample: vec![
                SampleScores {
                    record: record("q1"),
                    scores: scores(0.4, 0.7),
                },
                SampleScores {
                    record: record("q2"),
                    scores: scores(0.8, 0.9),
                },
            ],
            aggregate,
        }
    }

    #[test]
    fn test_csv_has_header_and_one_row_per_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.csv");

        write_csv(&result_with_two_records(), &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let mut reader = csv::Reader::from_reader(content.as_bytes());

        let header = reader.headers().unwrap().clone();
        assert!(header.iter().any(|h| h == "question"));
        assert!(header.iter().any(|h| h == "faithfulness"));
        assert!(header.iter().any(|h| h == "answer_relevance"));

        let rows: Vec<_> = reader.records().collect::<std::result::Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 2);

        // Metric cells are numeric and within [0, 1].
        let faith_col = header.iter().position(|h| h == "faithfulness").unwrap();
        for row in &rows {
            let value: f64 = row[faith_col].parse().unwrap();
            assert!((0.0..=1.0).contains(&value));
        }
    }

    #[test]
    fn test_report_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.json");

        let report = RunReport {
            dataset: "sample".to_string(),
            result: result_with_two_records(),
            errors: vec![BatchError {
                sample_id: "sample_2".to_string(),
                index: 1,
                message: "boom".to_string(),
            }],
            elapsed_secs: 1.5,
        };
        report.save(&path).unwrap();

        let loaded = RunReport::load(&path).unwrap();
        assert_eq!(loaded.dataset, "sample");
        assert_eq!(loaded.result.per_sample.len(), 2);
        assert_eq!(loaded.errors.len(), 1);
    }

    #[test]
    fn test_print_record_rejects_bad_index() {
        let report = RunReport {
            dataset: "sample".to_string(),
            result: result_with_two_records(),
            errors: Vec::new(),
            elapsed_secs: 0.0,
        };
        assert!(report.print_record(1).is_ok());
        assert!(report.print_record(5).is_err());
    }
}
