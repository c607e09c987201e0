//! End-to-end pipeline test with offline fakes at every network seam:
//! dataset -> chunks -> collection -> runner -> batch -> evaluation -> CSV.

use async_trait::async_trait;
use rust_rag_bench::chunker;
use rust_rag_bench::config::{ChunkingConfig, VectorStoreConfig};
use rust_rag_bench::dataset::sample_dataset;
use rust_rag_bench::error::Result;
use rust_rag_bench::eval::{EvalEngine, JudgeScorer, Metric, MetricScorer, RunReport, write_csv};
use rust_rag_bench::executor::{EvalRecord, run_batch};
use rust_rag_bench::llm::ChatModel;
use rust_rag_bench::runner::RagRunner;
use rust_rag_bench::store::{Embedder, RemoteEmbedder, VectorStore};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Letter-frequency embedder: deterministic, similar texts score closer.
struct LetterEmbedder;

#[async_trait]
impl Embedder for LetterEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0.0f32; 26];
                for c in text.to_lowercase().chars() {
                    if c.is_ascii_lowercase() {
                        v[(c as u8 - b'a') as usize] += 1.0;
                    }
                }
                v
            })
            .collect())
    }
}

/// Generator returning a canned non-empty answer.
struct CannedModel;

#[async_trait]
impl ChatModel for CannedModel {
    async fn complete(&self, _system: Option<&str>, user: &str) -> Result<String> {
        Ok(format!("Answer derived from a {}-char prompt", user.len()))
    }
}

/// Judge that scores by whether the record has contexts and an answer.
struct RuleScorer;

#[async_trait]
impl MetricScorer for RuleScorer {
    async fn score(&self, _metric: Metric, record: &EvalRecord) -> Result<f64> {
        if record.contexts.is_empty() || record.answer.is_empty() {
            Ok(0.0)
        } else {
            Ok(0.75)
        }
    }
}

/// Judge model speaking the strict JSON protocol, to exercise JudgeScorer.
struct JsonJudgeModel;

#[async_trait]
impl ChatModel for JsonJudgeModel {
    async fn complete(&self, _system: Option<&str>, _user: &str) -> Result<String> {
        Ok(r#"{"score": 0.9, "reasoning": "looks right"}"#.to_string())
    }
}

fn store_config(dir: &Path) -> VectorStoreConfig {
    VectorStoreConfig {
        embedding_model: "letters".to_string(),
        persist_directory: dir.join("collections"),
        collection_name: "pipeline_test".to_string(),
    }
}

#[tokio::test]
async fn full_pipeline_produces_scored_report_and_csv() {
    let dir = TempDir::new().unwrap();

    // Dataset -> chunks
    let dataset = sample_dataset();
    assert_eq!(dataset.len(), 3);

    let chunking = ChunkingConfig {
        chunk_size: 200,
        chunk_overlap: 20,
    };
    let chunks = chunker::split_dataset(&dataset, &chunking).unwrap();
    assert!(chunks.len() >= dataset.len());

    let chunks_path = dir.path().join("chunks.jsonl");
    chunker::save_chunks(&chunks, &chunks_path).unwrap();
    assert_eq!(chunker::load_chunks(&chunks_path).unwrap().len(), chunks.len());

    // Build the collection
    let store = Arc::new(
        VectorStore::open(Arc::new(LetterEmbedder), &store_config(dir.path()))
            .await
            .unwrap(),
    );
    store.build(&chunks, true).await.unwrap();
    assert_eq!(store.count().await, chunks.len());

    // Rebuilding is idempotent
    store.build(&chunks, true).await.unwrap();
    assert_eq!(store.count().await, chunks.len());

    // Batch: one record per sample, in order, one context each (top_k = 1)
    let runner = RagRunner::new(store.clone(), Arc::new(CannedModel), 1);
    let batch = run_batch(&dataset.samples, &runner, 4).await;

    assert_eq!(batch.records.len(), 3);
    assert!(batch.errors.is_empty());
    for (record, sample) in batch.records.iter().zip(&dataset.samples) {
        assert_eq!(record.question, sample.question);
        assert_eq!(record.contexts.len(), 1);
        assert!(!record.answer.is_empty());
    }

    // Evaluate: per-sample table of 3, aggregate keyed by the metric set
    let metrics = vec![Metric::Faithfulness, Metric::AnswerRelevance];
    let engine = EvalEngine::new(Arc::new(RuleScorer), metrics.clone());
    let result = engine.evaluate(&batch.records).await.unwrap();

    assert_eq!(result.per_sample.len(), 3);
    let mut expected: Vec<String> = metrics.iter().map(|m| m.name().to_string()).collect();
    expected.sort();
    assert_eq!(result.metric_names(), expected);
    for scores in &result.per_sample {
        assert_eq!(scores.scores["faithfulness"], 0.75);
    }

    // CSV: one header row plus one data row per record, scores in [0, 1]
    let csv_path = dir.path().join("results.csv");
    write_csv(&result, &csv_path).unwrap();

    let content = std::fs::read_to_string(&csv_path).unwrap();
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let header = reader.headers().unwrap().clone();
    assert!(header.iter().any(|h| h == "faithfulness"));
    assert!(header.iter().any(|h| h == "answer_relevance"));

    let rows: Vec<_> = reader
        .records()
        .collect::<std::result::Result<_, _>>()
        .unwrap();
    assert_eq!(rows.len(), 3);
    let col = header.iter().position(|h| h == "answer_relevance").unwrap();
    for row in &rows {
        let value: f64 = row[col].parse().unwrap();
        assert!((0.0..=1.0).contains(&value));
    }

    // Report round-trip for the inspector
    let report = RunReport {
        dataset: dataset.name.clone(),
        result,
        errors: batch.errors,
        elapsed_secs: 0.1,
    };
    let report_path = dir.path().join("results.json");
    report.save(&report_path).unwrap();

    let loaded = RunReport::load(&report_path).unwrap();
    assert_eq!(loaded.result.per_sample.len(), 3);
    assert!(loaded.print_record(0).is_ok());
    assert!(loaded.print_record(3).is_err());
}

#[tokio::test]
async fn judge_scorer_drives_engine_through_chat_model() {
    let records = vec![EvalRecord {
        question: "What is Rust?".to_string(),
        answer: "A systems language.".to_string(),
        ground_truth: "A systems programming language.".to_string(),
        contexts: vec!["Rust is a systems language.".to_string()],
    }];

    let engine = EvalEngine::new(
        Arc::new(JudgeScorer::new(Arc::new(JsonJudgeModel))),
        Metric::ALL.to_vec(),
    );
    let result = engine.evaluate(&records).await.unwrap();

    assert_eq!(result.per_sample.len(), 1);
    assert_eq!(result.aggregate.len(), Metric::ALL.len());
    for (_, score) in &result.aggregate {
        assert_eq!(*score, 0.9);
    }
}

/// Embedder with one dimension per topical keyword, so provenance
/// assertions are deterministic.
struct KeywordEmbedder;

const KEYWORDS: [&str; 6] = ["rust", "ownership", "python", "guido", "supervised", "labeled"];

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                KEYWORDS
                    .iter()
                    .map(|k| lower.matches(k).count() as f32)
                    .collect()
            })
            .collect())
    }
}

#[tokio::test]
async fn retrieval_prefers_the_matching_context() {
    let dir = TempDir::new().unwrap();
    let dataset = sample_dataset();

    // One chunk per sample keeps provenance unambiguous.
    let chunking = ChunkingConfig {
        chunk_size: 2000,
        chunk_overlap: 0,
    };
    let chunks = chunker::split_dataset(&dataset, &chunking).unwrap();
    assert_eq!(chunks.len(), 3);

    let store = VectorStore::open(Arc::new(KeywordEmbedder), &store_config(dir.path()))
        .await
        .unwrap();
    store.build(&chunks, true).await.unwrap();

    // A query lifted from one context should retrieve that sample's
    // chunk first.
    let query = "Supervised learning uses labeled data to train models";
    let results = store.search(query, 3).await.unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].sample_id.as_deref(), Some("sample_3"));
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

/// RemoteEmbedder is the production embedder; make sure the offline seams
/// used above match its construction signature.
#[test]
fn remote_embedder_constructs_from_client() {
    let config = rust_rag_bench::config::Config::with_llm(
        "https://api.example.com",
        "test-key",
        "gpt-4",
    );
    let client = rust_rag_bench::llm::LlmClient::new(config.llm);
    let _embedder = RemoteEmbedder::new(client, "text-embedding-3-small");
}
