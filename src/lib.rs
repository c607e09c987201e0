//! Rust RAG Bench - a RAG evaluation scaffold.
//!
//! This library wires a benchmark dataset, a vector store, an
//! OpenAI-compatible chat/embedding API and an LLM-judged metrics layer
//! behind a small set of uniform contracts:
//!
//! 1. A [`store::Retriever`] turns a query into an ordered passage sequence
//! 2. A [`runner::Runner`] turns a question into `{question, generation, contexts}`
//! 3. The [`eval::EvalEngine`] turns normalized records into per-sample and
//!    aggregate scores
//!
//! Datasets and runners are pluggable; the evaluation layer only ever sees
//! the normalized [`executor::EvalRecord`] shape.
//!
//! # Quick Start
//!
//! ```no_run
//! use rust_rag_bench::{
//!     chunker,
//!     config::Config,
//!     dataset::Dataset,
//!     eval::{EvalEngine, JudgeScorer, Metric},
//!     executor,
//!     llm::LlmClient,
//!     runner::RagRunner,
//!     store::{RemoteEmbedder, VectorStore},
//! };
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Load configuration
//!     let config = Config::load(None)?;
//!     config.validate()?;
//!
//!     let client = LlmClient::new(config.llm.clone());
//!
//!     // Load samples and build the retrieval collection
//!     let dataset = Dataset::load(Path::new("data/samples.json"), None)?;
//!     let chunks = chunker::split_dataset(&dataset, &config.chunking)?;
//!
//!     let embedder = Arc::new(RemoteEmbedder::new(
//!         client.clone(),
//!         config.vector_store.embedding_model.clone(),
//!     ));
//!     let store = Arc::new(VectorStore::open(embedder, &config.vector_store).await?);
//!     store.build(&chunks, true).await?;
//!
//!     // Answer every question, then score the normalized records
//!     let runner = RagRunner::new(store, Arc::new(client.clone()), config.retrieval.top_k);
//!     let batch = executor::run_batch(&dataset.samples, &runner, 4).await;
//!
//!     let engine = EvalEngine::new(
//!         Arc::new(JudgeScorer::new(Arc::new(client))),
//!         Metric::ALL.to_vec(),
//!     );
//!     let result = engine.evaluate(&batch.records).await?;
//!
//!     for (metric, score) in &result.aggregate {
//!         println!("{}: {:.3}", metric, score);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **Dataset**: normalized `{id, question, ground_truth, context}` samples
//! - **Chunker**: fixed-stride character windowing over contexts
//! - **VectorStore**: embeds chunks and serves cosine top-k search over a
//!   persisted collection
//! - **RagRunner**: the default retrieve-then-generate workflow
//! - **Executor**: order-preserving batch runs with flagged failures
//! - **EvalEngine**: LLM-judged metric scoring and aggregation

pub mod chunker;
pub mod config;
pub mod dataset;
pub mod error;
pub mod eval;
pub mod executor;
pub mod llm;
pub mod runner;
pub mod store;

// Re-export commonly used types
pub use chunker::Chunk;
pub use config::Config;
pub use dataset::{Dataset, Sample};
pub use error::{RagBenchError, Result};
pub use eval::{EvalEngine, EvalResult, JudgeScorer, Metric, RunReport};
pub use executor::{BatchOutput, EvalRecord, run_batch};
pub use llm::LlmClient;
pub use runner::{RagRunner, Runner, RunnerOutput};
pub use store::{Passage, Retriever, VectorStore};
