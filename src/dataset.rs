//! Dataset loading for evaluation runs.
//!
//! Supports:
//! - Normalized dataset files (JSON with a name, or JSONL with one sample
//!   per line, chosen by extension)
//! - One-time normalization of a raw benchmark JSONL into samples

use crate::error::{RagBenchError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// A single normalized evaluation sample. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    /// Unique identifier within the dataset file.
    pub id: String,
    /// The question to answer.
    pub question: String,
    /// Ground truth answer.
    pub ground_truth: String,
    /// Source passage the answer is grounded in.
    pub ground_truth_context: String,
}

/// An ordered collection of samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    /// Dataset name.
    pub name: String,
    /// Samples in file order.
    pub samples: Vec<Sample>,
}

/// Raw benchmark record shape accepted by [`Dataset::from_raw`].
#[derive(Debug, Deserialize)]
struct RawRecord {
    question: String,
    #[serde(alias = "ground_truth")]
    answer: String,
    context: String,
}

impl Dataset {
    /// Create a new empty dataset.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            samples: Vec::new(),
        }
    }

    /// Number of samples in the dataset.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Load a normalized dataset file.
    ///
    /// `.jsonl` files hold one sample per line; anything else is parsed as
    /// a whole JSON [`Dataset`]. `limit` keeps the first N samples in file
    /// order (fast iteration during development, not statistical sampling).
    pub fn load(path: &Path, limit: Option<usize>) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| RagBenchError::io(path, e))?;

        let mut dataset = match path.extension().and_then(|e| e.to_str()) {
            Some("jsonl") => {
                let name = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("dataset")
                    .to_string();
                let mut dataset = Dataset::new(&name);
                for (line_num, line) in content.lines().enumerate() {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let sample: Sample = serde_json::from_str(line).map_err(|e| {
                        RagBenchError::DatasetFormat(format!(
                            "Failed to parse sample at line {}: {}",
                            line_num + 1,
                            e
                        ))
                    })?;
                    dataset.samples.push(sample);
                }
                dataset
            }
            _ => serde_json::from_str(&content)
                .map_err(|e| RagBenchError::DatasetFormat(format!("Failed to parse {}: {}", path.display(), e)))?,
        };

        if let Some(n) = limit {
            dataset.samples.truncate(n);
        }

        dataset.check_samples()?;
        Ok(dataset)
    }

    /// Normalize a raw benchmark JSONL into a dataset.
    ///
    /// Each line must carry `question`, `answer` (or `ground_truth`) and
    /// `context`; samples get sequential ids in file order.
    pub fn from_raw(path: &Path, limit: Option<usize>) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| RagBenchError::io(path, e))?;

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("dataset")
            .to_string();
        let mut dataset = Dataset::new(&name);

        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(n) = limit {
                if dataset.samples.len() >= n {
                    break;
                }
            }

            let raw: RawRecord = serde_json::from_str(line).map_err(|e| {
                RagBenchError::DatasetFormat(format!(
                    "Failed to parse raw record at line {}: {}",
                    line_num + 1,
                    e
                ))
            })?;

            dataset.samples.push(Sample {
                id: format!("sample_{}", dataset.samples.len() + 1),
                question: raw.question,
                ground_truth: raw.answer,
                ground_truth_context: raw.context,
            });
        }

        dataset.check_samples()?;
        Ok(dataset)
    }

    /// Save the dataset as pretty-printed JSON.
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

    /// Reject blank required fields and duplicate ids.
    fn check_samples(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for sample in &self.samples {
            if sample.id.trim().is_empty() {
                return Err(RagBenchError::DatasetFormat(
                    "Sample with empty id".to_string(),
                ));
            }
            if sample.question.trim().is_empty() {
                return Err(RagBenchError::DatasetFormat(format!(
                    "Sample '{}' has an empty question",
                    sample.id
                )));
            }
            if !seen.insert(sample.id.as_str()) {
                return Err(RagBenchError::DatasetFormat(format!(
                    "Duplicate sample id '{}'",
                    sample.id
                )));
            }
        }
        Ok(())
    }
}

/// Create a small built-in dataset for quick runs and tests.
pub fn sample_dataset() -> Dataset {
    let mut dataset = Dataset::new("sample");

    dataset.samples.push(Sample {
        id: "sample_1".to_string(),
        question: "What mechanism does Rust use to achieve memory safety?".to_string(),
        ground_truth: "Rust uses an ownership system and borrow checker to achieve memory safety without garbage collection.".to_string(),
        ground_truth_context: "Rust is a systems programming language focused on safety, speed, and concurrency. \
It achieves memory safety without garbage collection through its ownership system. \
The borrow checker ensures references are valid and prevents data races at compile time. \
Rust was originally designed by Graydon Hoare at Mozilla Research. \
The first stable release, Rust 1.0, was announced in May 2015.".to_string(),
    });

    dataset.samples.push(Sample {
        id: "sample_2".to_string(),
        question: "Who created Python and when was it first released?".to_string(),
        ground_truth: "Python was created by Guido van Rossum and first released in 1991.".to_string(),
        ground_truth_context: "Python is a high-level, interpreted programming language known for its clear syntax. \
Created by Guido van Rossum, Python was first released in 1991. \
Python supports multiple programming paradigms including procedural, object-oriented, and functional programming. \
The Python Package Index (PyPI) hosts thousands of third-party packages. \
Python is widely used in data science, machine learning, and web development.".to_string(),
    });

    dataset.samples.push(Sample {
        id: "sample_3".to_string(),
        question: "What is the difference between supervised and unsupervised learning?".to_string(),
        ground_truth: "Supervised learning uses labeled data to train models, while unsupervised learning finds patterns in unlabeled data.".to_string(),
        ground_truth_context: "Machine learning is a subset of artificial intelligence that enables systems to learn from data. \
Supervised learning uses labeled data to train models, while unsupervised learning finds patterns in unlabeled data. \
Neural networks are computing systems inspired by biological neural networks in animal brains. \
Deep learning uses neural networks with many layers to model complex patterns. \
Common applications include image recognition, natural language processing, and recommendation systems.".to_string(),
    });

    dataset
}
