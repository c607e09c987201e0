//! Error types for the RAG benchmark scaffold.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom error.
pub type Result<T> = std::result::Result<T, RagBenchError>;

/// Errors that can occur in the benchmark pipeline.
#[derive(Error, Debug)]
pub enum RagBenchError {
    /// Error reading or writing files.
    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error during serialization/deserialization.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A dataset file is missing required fields or is malformed.
    #[error("Dataset format error: {0}")]
    DatasetFormat(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The named collection does not exist in the vector store.
    #[error("Collection not found: '{0}'")]
    CollectionNotFound(String),

    /// Remote embedding service error.
    #[error("Embedding service error: {0}")]
    Embedding(String),

    /// LLM API error.
    #[error("LLM API error: {0}")]
    LlmApi(String),

    /// LLM response parsing error.
    #[error("Failed to parse LLM response: {0}")]
    LlmParse(String),

    /// HTTP request error.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The metrics backend failed; the run's scores are unusable.
    #[error("Evaluation backend error: {0}")]
    Evaluation(String),
}

impl RagBenchError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<reqwest::Error> for RagBenchError {
    fn from(err: reqwest::Error) -> Self {
        RagBenchError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for RagBenchError {
    fn from(err: serde_json::Error) -> Self {
        RagBenchError::LlmParse(err.to_string())
    }
}
