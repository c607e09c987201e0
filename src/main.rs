//! RAG Bench CLI
//!
//! Builds a retrieval collection from a benchmark dataset, runs the
//! retrieve-then-generate workflow over every sample and scores the
//! results with LLM-judged metrics.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_rag_bench::{
    chunker,
    config::Config,
    dataset::{Dataset, sample_dataset},
    eval::{EvalEngine, JudgeScorer, Metric, RunReport, write_csv},
    executor,
    llm::LlmClient,
    runner::{RagRunner, Runner},
    store::{RemoteEmbedder, VectorStore},
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// RAG Bench - evaluate a RAG workflow against a benchmark dataset
#[derive(Parser)]
#[command(name = "rag-bench")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: build, answer, evaluate, export
    Run {
        /// Use the built-in sample dataset instead of configured paths
        #[arg(long)]
        sample: bool,

        /// Reuse the existing collection instead of rebuilding it
        #[arg(long)]
        skip_build: bool,

        /// Concurrent runner invocations
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
    },

    /// Chunk the dataset and (re)build the retrieval collection
    Build {
        /// Use the built-in sample dataset instead of configured paths
        #[arg(long)]
        sample: bool,
    },

    /// Ask a single ad-hoc question through the default runner
    Ask {
        /// The question to answer
        question: String,
    },

    /// Show one record of a saved run, keyed by 0-based index
    Inspect {
        /// Record index
        index: usize,

        /// Path to the results JSON (defaults to the configured path)
        #[arg(short, long)]
        results: Option<PathBuf>,
    },

    /// Test LLM connection
    Test,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.clone();

    match cli.command {
        Commands::Run {
            sample,
            skip_build,
            concurrency,
        } => cmd_run(config_path, sample, skip_build, concurrency).await,
        Commands::Build { sample } => cmd_build(config_path, sample).await,
        Commands::Ask { question } => cmd_ask(config_path, question).await,
        Commands::Inspect { index, results } => cmd_inspect(config_path, index, results),
        Commands::Test => cmd_test(config_path).await,
    }
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let config = Config::load(path.as_deref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Load samples from the configured files, normalizing the raw file when
/// no samples file exists yet.
fn load_samples(config: &Config, use_sample: bool) -> Result<Dataset> {
    if use_sample {
        println!("Using built-in sample dataset...");
        return Ok(sample_dataset());
    }

    let limit = config.dataset.sample_limit;

    if config.dataset.samples_path.exists() {
        println!("Loading samples from {}...", config.dataset.samples_path.display());
        return Dataset::load(&config.dataset.samples_path, limit)
            .context("Failed to load samples");
    }

    if config.dataset.raw_path.exists() {
        println!(
            "Normalizing raw dataset {} -> {}...",
            config.dataset.raw_path.display(),
            config.dataset.samples_path.display()
        );
        let dataset =
            Dataset::from_raw(&config.dataset.raw_path, limit).context("Failed to normalize raw dataset")?;
        dataset
            .save(&config.dataset.samples_path)
            .context("Failed to save normalized samples")?;
        return Ok(dataset);
    }

    anyhow::bail!(
        "No dataset found: neither '{}' nor '{}' exists. Use --sample for the built-in dataset.",
        config.dataset.samples_path.display(),
        config.dataset.raw_path.display()
    )
}

async fn open_store(config: &Config, client: &LlmClient) -> Result<VectorStore> {
    let embedder = Arc::new(RemoteEmbedder::new(
        client.clone(),
        config.vector_store.embedding_model.clone(),
    ));
    VectorStore::open(embedder, &config.vector_store)
        .await
        .context("Failed to open vector store")
}

async fn build_collection(config: &Config, store: &VectorStore, dataset: &Dataset) -> Result<usize> {
    let chunks = chunker::split_dataset(dataset, &config.chunking)?;
    chunker::save_chunks(&chunks, &config.dataset.chunks_path)
        .context("Failed to save chunks file")?;

    println!(
        "Embedding {} chunks into collection '{}'...",
        chunks.len(),
        store.collection_name()
    );
    store
        .build(&chunks, true)
        .await
        .context("Failed to build collection")?;

    Ok(chunks.len())
}

fn configured_metrics(config: &Config) -> Vec<Metric> {
    config
        .evaluation
        .metrics
        .iter()
        .filter_map(|name| Metric::parse(name))
        .collect()
}

async fn cmd_run(
    config_path: Option<PathBuf>,
    sample: bool,
    skip_build: bool,
    concurrency: usize,
) -> Result<()> {
    let config = load_config(config_path)?;
    let client = LlmClient::new(config.llm.clone());

    println!("Chat model: {}", config.llm.model);
    println!("Embedding model: {}", config.vector_store.embedding_model);

    let start = Instant::now();

    let dataset = load_samples(&config, sample)?;
    println!("Dataset: {} ({} samples)", dataset.name, dataset.len());

    let store = Arc::new(open_store(&config, &client).await?);

    if skip_build && store.count().await > 0 {
        println!(
            "Reusing collection '{}' ({} records)",
            store.collection_name(),
            store.count().await
        );
    } else {
        build_collection(&config, &store, &dataset).await?;
    }

    println!("\nRunning batch ({} workers)...", concurrency);
    let runner = RagRunner::new(
        store.clone(),
        Arc::new(client.clone()),
        config.retrieval.top_k,
    );
    let batch = executor::run_batch(&dataset.samples, &runner, concurrency).await;

    let judge_client = match &config.evaluation.llm_model {
        Some(model) => client.with_model(model.clone()),
        None => client.clone(),
    };
    let engine = EvalEngine::new(
        Arc::new(JudgeScorer::new(Arc::new(judge_client))),
        configured_metrics(&config),
    )
    .with_concurrency(concurrency);

    println!("Scoring {} records...", batch.records.len());
    let result = engine
        .evaluate(&batch.records)
        .await
        .context("Evaluation failed")?;

    let report = RunReport {
        dataset: dataset.name.clone(),
        result,
        errors: batch.errors,
        elapsed_secs: start.elapsed().as_secs_f64(),
    };

    report.print_summary();

    write_csv(&report.result, &config.evaluation.output_csv).context("Failed to write CSV")?;
    println!("Scores exported to {}", config.evaluation.output_csv.display());

    report
        .save(&config.evaluation.results_path)
        .context("Failed to save results")?;
    println!("Run report saved to {}", config.evaluation.results_path.display());

    Ok(())
}

async fn cmd_build(config_path: Option<PathBuf>, sample: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let client = LlmClient::new(config.llm.clone());

    let dataset = load_samples(&config, sample)?;
    println!("Dataset: {} ({} samples)", dataset.name, dataset.len());

    let start = Instant::now();
    let store = open_store(&config, &client).await?;
    let chunk_count = build_collection(&config, &store, &dataset).await?;

    println!("\nCollection built:");
    println!("  Name:       {}", store.collection_name());
    println!("  Records:    {}", chunk_count);
    println!("  Build time: {:.2?}", start.elapsed());

    Ok(())
}

async fn cmd_ask(config_path: Option<PathBuf>, question: String) -> Result<()> {
    let config = load_config(config_path)?;
    let client = LlmClient::new(config.llm.clone());

    let store = Arc::new(open_store(&config, &client).await?);
    if store.count().await == 0 {
        return Err(rust_rag_bench::RagBenchError::CollectionNotFound(
            store.collection_name().to_string(),
        ))
        .context("Run the 'build' command first");
    }

    let runner = RagRunner::new(store, Arc::new(client), config.retrieval.top_k);

    println!("Question: {}\n", question);
    let output = runner
        .invoke(&question)
        .await
        .context("Runner invocation failed")?;

    println!("Answer: {}\n", output.generation);
    println!("Contexts:");
    println!("{}", "─".repeat(60));
    for (i, passage) in output.contexts.iter().enumerate() {
        println!("{:>2}. [score {:.3}] {}", i + 1, passage.score, passage.text);
    }

    Ok(())
}

fn cmd_inspect(
    config_path: Option<PathBuf>,
    index: usize,
    results: Option<PathBuf>,
) -> Result<()> {
    // Inspection only reads a saved report; no API key needed.
    let config = Config::load(config_path.as_deref()).context("Failed to load configuration")?;
    let path = results.unwrap_or(config.evaluation.results_path);

    if !path.exists() {
        anyhow::bail!(
            "Results not found at '{}'. Run the 'run' command first.",
            path.display()
        );
    }

    let report = RunReport::load(&path).context("Failed to load results")?;
    report.print_record(index)?;

    Ok(())
}

async fn cmd_test(config_path: Option<PathBuf>) -> Result<()> {
    println!("Testing LLM connection...\n");

    let config = Config::load(config_path.as_deref()).context("Failed to load configuration")?;

    println!("Configuration:");
    println!("  API Base:  {}", config.llm.api_base);
    println!("  Model:     {}", config.llm.model);
    println!(
        "  API Key:   {}...",
        &config.llm.api_key[..config.llm.api_key.len().min(8)]
    );
    println!();

    if let Err(e) = config.validate() {
        println!("Configuration error: {}", e);
        return Ok(());
    }

    let client = LlmClient::new(config.llm);

    println!("Sending test request...");
    match client.test_connection().await {
        Ok(()) => {
            println!("Connection successful!");
        }
        Err(e) => {
            println!("Connection failed: {}", e);
        }
    }

    Ok(())
}
