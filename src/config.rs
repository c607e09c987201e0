//! Configuration for the benchmark pipeline.
//!
//! Supports both environment variables and a YAML config file.
//! Environment variables take precedence over config file values.
//! The configuration is loaded once at the entry point and handed to each
//! component by reference; no component performs its own config file I/O.

use crate::error::{RagBenchError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// LLM API configuration (chat and embeddings share one endpoint and key).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL for the API (e.g., "https://api.openai.com")
    pub api_base: String,

    /// API key for authentication
    pub api_key: String,

    /// Chat model name used for answer generation
    pub model: String,

    /// Maximum tokens for response
    pub max_tokens: u32,

    /// Temperature for generation
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 1024,
            temperature: 0.0,
        }
    }
}

/// Dataset file locations and the optional development-time sample cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Raw benchmark file to normalize when no samples file exists yet.
    pub raw_path: PathBuf,

    /// Normalized samples file (JSON dataset or JSONL).
    pub samples_path: PathBuf,

    /// Line-delimited chunk records produced by the chunk builder.
    pub chunks_path: PathBuf,

    /// Truncate to the first N samples in file order (fast iteration,
    /// not statistical sampling).
    pub sample_limit: Option<usize>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            raw_path: PathBuf::from("data/raw.jsonl"),
            samples_path: PathBuf::from("data/samples.json"),
            chunks_path: PathBuf::from("data/chunks.jsonl"),
            sample_limit: None,
        }
    }
}

/// Vector store location and embedding model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    /// Embedding model name sent to the embeddings endpoint.
    pub embedding_model: String,

    /// Directory holding one file per collection.
    pub persist_directory: PathBuf,

    /// Name of the collection the pipeline builds and queries.
    pub collection_name: String,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            embedding_model: "text-embedding-3-small".to_string(),
            persist_directory: PathBuf::from("data/collections"),
            collection_name: "rag_bench".to_string(),
        }
    }
}

/// Text chunking parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum characters per chunk.
    pub chunk_size: usize,

    /// Overlap between consecutive chunks. Must be smaller than `chunk_size`.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 50,
        }
    }
}

/// Retrieval parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of passages returned per retrieval call.
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

/// Evaluation outputs and judge model selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Per-record scores exported as CSV.
    pub output_csv: PathBuf,

    /// Full run report (records, scores, errors) as JSON, consumed by
    /// the `inspect` command.
    pub results_path: PathBuf,

    /// Judge model for metric scoring. Falls back to `llm.model` when unset.
    pub llm_model: Option<String>,

    /// Metric names to score. See [`crate::eval::Metric`].
    pub metrics: Vec<String>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            output_csv: PathBuf::from("data/results.csv"),
            results_path: PathBuf::from("data/results.json"),
            llm_model: None,
            metrics: vec![
                "faithfulness".to_string(),
                "answer_relevance".to_string(),
                "context_precision".to_string(),
                "context_recall".to_string(),
            ],
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// LLM API settings
    pub llm: LlmConfig,
    /// Dataset file locations
    pub dataset: DatasetConfig,
    /// Vector store settings
    pub vector_store: VectorStoreConfig,
    /// Chunking parameters
    pub chunking: ChunkingConfig,
    /// Retrieval parameters
    pub retrieval: RetrievalConfig,
    /// Evaluation settings
    pub evaluation: EvaluationConfig,
}

impl Config {
    /// Load configuration from an explicit file, the default config file
    /// location, or built-in defaults, then apply environment overrides.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (LLM_API_BASE, LLM_API_KEY, LLM_MODEL)
    /// 2. Config file (explicit path, or ~/.config/rag-bench/config.yaml)
    /// 3. Default values
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::load_from_file(p)?,
            None => match Self::config_file_path() {
                Some(p) if p.exists() => Self::load_from_file(&p)?,
                _ => Config::default(),
            },
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RagBenchError::io(path, e))?;

        serde_yaml::from_str(&content)
            .map_err(|e| RagBenchError::Config(format!("Failed to parse config file: {}", e)))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(api_base) = env::var("LLM_API_BASE") {
            self.llm.api_base = api_base;
        }

        if let Ok(api_key) = env::var("LLM_API_KEY") {
            self.llm.api_key = api_key;
        }

        if let Ok(model) = env::var("LLM_MODEL") {
            self.llm.model = model;
        }

        if let Ok(max_tokens) = env::var("LLM_MAX_TOKENS") {
            if let Ok(tokens) = max_tokens.parse() {
                self.llm.max_tokens = tokens;
            }
        }

        if let Ok(temperature) = env::var("LLM_TEMPERATURE") {
            if let Ok(temp) = temperature.parse() {
                self.llm.temperature = temp;
            }
        }
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "rag-bench")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Validate that required configuration is present. Called once at
    /// startup, before any pipeline step runs.
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_base.is_empty() {
            return Err(RagBenchError::Config(
                "API base URL is required. Set LLM_API_BASE environment variable or add to config file.".to_string()
            ));
        }

        if self.llm.api_key.is_empty() {
            return Err(RagBenchError::Config(
                "API key is required. Set LLM_API_KEY environment variable or add to config file."
                    .to_string(),
            ));
        }

        if self.llm.model.is_empty() {
            return Err(RagBenchError::Config(
                "Chat model is required. Set LLM_MODEL environment variable or add to config file."
                    .to_string(),
            ));
        }

        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(RagBenchError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }

        if self.retrieval.top_k == 0 {
            return Err(RagBenchError::Config(
                "retrieval.top_k must be at least 1".to_string(),
            ));
        }

        if self.evaluation.metrics.is_empty() {
            return Err(RagBenchError::Config(
                "evaluation.metrics must name at least one metric".to_string(),
            ));
        }

        for name in &self.evaluation.metrics {
            if crate::eval::Metric::parse(name).is_none() {
                return Err(RagBenchError::Config(format!(
                    "Unknown evaluation metric '{}'",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Create a config from explicit LLM values (useful for testing).
    pub fn with_llm(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            llm: LlmConfig {
                api_base: api_base.into(),
                api_key: api_key.into(),
                model: model.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}
