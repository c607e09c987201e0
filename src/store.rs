//! Vector store adapter: embedding, persistence and similarity search.
//!
//! A collection is a named, independently rebuildable namespace persisted as
//! one file under the configured directory (JSON or bincode, chosen by
//! extension). The adapter is bound to the configured collection; rebuilds
//! assemble the replacement fully before an atomic rename swap, so a failed
//! build leaves the previous collection intact and concurrent readers never
//! observe a half-written file.

use crate::chunker::Chunk;
use crate::config::VectorStoreConfig;
use crate::error::{RagBenchError, Result};
use crate::llm::LlmClient;
use async_trait::async_trait;
use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Embedding batch size per API request.
const EMBED_BATCH_SIZE: usize = 32;

/// Capability contract for text embedding.
///
/// The production implementation calls the remote embeddings endpoint;
/// tests substitute deterministic local embedders.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| RagBenchError::Embedding("Empty embedding batch response".to_string()))
    }
}

/// Embedder backed by the remote embeddings endpoint.
pub struct RemoteEmbedder {
    client: LlmClient,
    model: String,
}

impl RemoteEmbedder {
    pub fn new(client: LlmClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.client.embed_batch(&self.model, texts).await
    }
}

/// A retrieved passage with its similarity score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    /// Passage text content.
    pub text: String,
    /// Similarity to the query (higher is more similar).
    pub score: f32,
    /// Id of the sample the passage was cut from, when known.
    pub sample_id: Option<String>,
}

impl Passage {
    /// The passage text.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Capability contract for retrieval.
///
/// Anything returning an ordered passage sequence for a query can serve as
/// the retrieval stage of a runner; no common base type is required.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Retrieve up to `top_k` passages for `query`, most similar first.
    async fn invoke(&self, query: &str, top_k: usize) -> Result<Vec<Passage>>;
}

/// A persisted embedding record. Owned entirely by the vector store.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct VectorRecord {
    /// Record id, derived from `(sample_id, chunk_index)`.
    pub id: String,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// Original chunk text.
    pub text: String,
    /// Source sample id.
    pub sample_id: String,
    /// Chunk position within the source sample.
    pub chunk_index: usize,
}

impl VectorRecord {
    fn record_id(chunk: &Chunk) -> String {
        format!("{}:{}", chunk.sample_id, chunk.index)
    }
}

/// On-disk collection payload.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
struct Collection {
    name: String,
    records: Vec<VectorRecord>,
}

/// Save format for collection files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CollectionFormat {
    /// JSON format (human-readable, larger).
    Json,
    /// Bincode format (binary, compact).
    Bincode,
}

impl CollectionFormat {
    /// Determine format from file extension.
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => CollectionFormat::Json,
            _ => CollectionFormat::Bincode,
        }
    }
}

/// Vector store bound to one configured collection.
pub struct VectorStore {
    embedder: Arc<dyn Embedder>,
    persist_dir: PathBuf,
    collection: String,
    records: RwLock<Vec<VectorRecord>>,
}

impl VectorStore {
    /// Open the configured collection, loading its file if one exists.
    pub async fn open(embedder: Arc<dyn Embedder>, config: &VectorStoreConfig) -> Result<Self> {
        let store = Self {
            embedder,
            persist_dir: config.persist_directory.clone(),
            collection: config.collection_name.clone(),
            records: RwLock::new(Vec::new()),
        };

        let path = store.collection_path(&store.collection);
        if path.exists() {
            let loaded = load_collection(&path)?;
            *store.records.write().await = loaded.records;
        }

        Ok(store)
    }

    /// Name of the collection this store reads and writes.
    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    /// Number of records currently in the collection.
    pub async fn count(&self) -> usize {
        self.records.read().await.len()
    }

    /// Embed `chunks` and write them into the collection.
    ///
    /// With `overwrite`, the previous contents are replaced wholesale;
    /// otherwise incoming records are upserted by record id. Embedding
    /// happens before anything is touched, and the collection file is
    /// swapped via rename, so a failure leaves the old collection intact.
    pub async fn build(&self, chunks: &[Chunk], overwrite: bool) -> Result<()> {
        let embedded = self.embed_chunks(chunks).await?;

        let mut records = self.records.write().await;
        let merged = if overwrite {
            embedded
        } else {
            let mut by_id: HashMap<String, usize> = records
                .iter()
                .enumerate()
                .map(|(i, r)| (r.id.clone(), i))
                .collect();
            let mut merged = records.clone();
            for record in embedded {
                match by_id.get(&record.id) {
                    Some(&i) => merged[i] = record,
                    None => {
                        by_id.insert(record.id.clone(), merged.len());
                        merged.push(record);
                    }
                }
            }
            merged
        };

        self.persist(&merged)?;
        *records = merged;
        Ok(())
    }

    /// Incrementally upsert chunks into the collection.
    ///
    /// A chunk whose record id already exists replaces the stored record.
    pub async fn add_documents(&self, chunks: &[Chunk]) -> Result<()> {
        self.build(chunks, false).await
    }

    /// Delete a collection file by name. Missing collections are a no-op.
    pub async fn delete_collection(&self, name: &str) -> Result<()> {
        let path = self.collection_path(name);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| RagBenchError::io(&path, e))?;
        }
        if name == self.collection {
            self.records.write().await.clear();
        }
        Ok(())
    }

    /// Nearest-neighbor search over the collection.
    ///
    /// Returns up to `top_k` passages ordered by decreasing similarity;
    /// an empty collection yields an empty sequence, never an error.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<Passage>> {
        if self.count().await == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;

        let records = self.records.read().await;
        let mut results: Vec<Passage> = records
            .iter()
            .map(|record| Passage {
                text: record.text.clone(),
                score: cosine_similarity(&query_embedding, &record.embedding),
                sample_id: Some(record.sample_id.clone()),
            })
            .collect();

        // Sort by score descending
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);

        Ok(results)
    }

    async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<VectorRecord>> {
        let mut records = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;

            if embeddings.len() != batch.len() {
                return Err(RagBenchError::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }

            for (chunk, embedding) in batch.iter().zip(embeddings) {
                records.push(VectorRecord {
                    id: VectorRecord::record_id(chunk),
                    embedding,
                    text: chunk.text.clone(),
                    sample_id: chunk.sample_id.clone(),
                    chunk_index: chunk.index,
                });
            }
        }

        Ok(records)
    }

    /// Write the collection to a temp file, then rename over the target.
    fn persist(&self, records: &[VectorRecord]) -> Result<()> {
        let path = self.collection_path(&self.collection);
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| RagBenchError::io(parent, e))?;
            }
        }

        let collection = Collection {
            name: self.collection.clone(),
            records: records.to_vec(),
        };

        let data = match CollectionFormat::from_path(&path) {
            CollectionFormat::Json => serde_json::to_string_pretty(&collection)
                .map_err(|e| RagBenchError::Serialization(e.to_string()))?
                .into_bytes(),
            CollectionFormat::Bincode => {
                let config = bincode::config::standard();
                bincode::encode_to_vec(&collection, config)
                    .map_err(|e| RagBenchError::Serialization(e.to_string()))?
            }
        };

        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &data).map_err(|e| RagBenchError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| RagBenchError::io(&path, e))?;

        Ok(())
    }

    /// Path of a collection file. Names without an extension get the
    /// default `.bin`; a `.json` name selects the JSON format.
    fn collection_path(&self, name: &str) -> PathBuf {
        if Path::new(name).extension().is_some() {
            self.persist_dir.join(name)
        } else {
            self.persist_dir.join(format!("{}.bin", name))
        }
    }
}

#[async_trait]
impl Retriever for VectorStore {
    async fn invoke(&self, query: &str, top_k: usize) -> Result<Vec<Passage>> {
        self.search(query, top_k).await
    }
}

/// Load a collection file (JSON or bincode, by extension).
fn load_collection(path: &Path) -> Result<Collection> {
    let data = fs::read(path).map_err(|e| RagBenchError::io(path, e))?;

    let collection = match CollectionFormat::from_path(path) {
        CollectionFormat::Json => {
            let json_str =
                String::from_utf8(data).map_err(|e| RagBenchError::Serialization(e.to_string()))?;
            serde_json::from_str(&json_str)
                .map_err(|e| RagBenchError::Serialization(e.to_string()))?
        }
        CollectionFormat::Bincode => {
            let config = bincode::config::standard();
            let (collection, _): (Collection, usize) = bincode::decode_from_slice(&data, config)
                .map_err(|e| RagBenchError::Serialization(e.to_string()))?;
            collection
        }
    };

    Ok(collection)
}

/// Cosine similarity between two vectors. Zero-length or zero-norm
/// vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Deterministic embedder: counts keyword occurrences per dimension.
    struct KeywordEmbedder;

    const KEYWORDS: [&str; 4] = ["rust", "python", "learning", "fox"];

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let lower = t.to_lowercase();
                    KEYWORDS
                        .iter()
                        .map(|k| lower.matches(k).count() as f32)
                        .collect()
                })
                .collect())
        }
    }

    /// Embedder that always fails, for rebuild-atomicity tests.
    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(RagBenchError::Embedding("service unavailable".to_string()))
        }
    }

    fn chunk(sample_id: &str, index: usize, text: &str) -> Chunk {
        Chunk {
            sample_id: sample_id.to_string(),
            index,
            text: text.to_string(),
        }
    }

    fn store_config(dir: &Path) -> VectorStoreConfig {
        VectorStoreConfig {
            embedding_model: "test-model".to_string(),
            persist_directory: dir.to_path_buf(),
            collection_name: "test".to_string(),
        }
    }

    fn open_store(dir: &Path, embedder: Arc<dyn Embedder>) -> VectorStore {
        VectorStore {
            embedder,
            persist_dir: dir.to_path_buf(),
            collection: "test".to_string(),
            records: RwLock::new(Vec::new()),
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    }

    #[tokio::test]
    async fn test_search_orders_by_similarity() {
        let dir = TempDir::new().unwrap();
        let store = open_store(dir.path(), Arc::new(KeywordEmbedder));

        let chunks = vec![
            chunk("s1", 0, "rust rust rust"),
            chunk("s2", 0, "python is popular"),
            chunk("s3", 0, "the fox jumps"),
        ];
        store.build(&chunks, true).await.unwrap();

        let results = store.search("tell me about rust", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].sample_id.as_deref(), Some("s1"));
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn test_search_respects_top_k() {
        let dir = TempDir::new().unwrap();
        let store = open_store(dir.path(), Arc::new(KeywordEmbedder));

        let chunks: Vec<Chunk> = (0..5).map(|i| chunk("s1", i, "rust text")).collect();
        store.build(&chunks, true).await.unwrap();

        let results = store.search("rust", 3).await.unwrap();
        assert_eq!(results.len(), 3);

        let results = store.search("rust", 100).await.unwrap();
        assert_eq!(results.len(), 5);
    }

    #[tokio::test]
    async fn test_empty_collection_returns_empty() {
        let dir = TempDir::new().unwrap();
        // FailingEmbedder proves search never reaches the embedding call.
        let store = open_store(dir.path(), Arc::new(FailingEmbedder));

        let results = store.search("anything", 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_overwrite_rebuild_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = open_store(dir.path(), Arc::new(KeywordEmbedder));

        let chunks = vec![chunk("s1", 0, "rust"), chunk("s1", 1, "python")];
        store.build(&chunks, true).await.unwrap();
        let first = store.count().await;

        store.build(&chunks, true).await.unwrap();
        assert_eq!(store.count().await, first);
    }

    #[tokio::test]
    async fn test_add_documents_upserts_by_id() {
        let dir = TempDir::new().unwrap();
        let store = open_store(dir.path(), Arc::new(KeywordEmbedder));

        store
            .build(&[chunk("s1", 0, "rust"), chunk("s1", 1, "python")], true)
            .await
            .unwrap();

        // Same id, new text: replaced, not duplicated.
        store
            .add_documents(&[chunk("s1", 0, "fox"), chunk("s2", 0, "learning")])
            .await
            .unwrap();

        assert_eq!(store.count().await, 3);
        let results = store.search("fox", 1).await.unwrap();
        assert_eq!(results[0].text, "fox");
    }

    #[tokio::test]
    async fn test_failed_rebuild_keeps_old_collection() {
        let dir = TempDir::new().unwrap();
        let store = open_store(dir.path(), Arc::new(KeywordEmbedder));
        store.build(&[chunk("s1", 0, "rust")], true).await.unwrap();

        let broken = open_store(dir.path(), Arc::new(FailingEmbedder));
        let err = broken.build(&[chunk("s2", 0, "python")], true).await;
        assert!(err.is_err());

        // The collection file still holds the original records.
        let reloaded = VectorStore::open(Arc::new(KeywordEmbedder), &store_config(dir.path()))
            .await
            .unwrap();
        assert_eq!(reloaded.count().await, 1);
    }

    #[tokio::test]
    async fn test_persist_and_reopen() {
        let dir = TempDir::new().unwrap();
        let store = open_store(dir.path(), Arc::new(KeywordEmbedder));
        store
            .build(&[chunk("s1", 0, "rust"), chunk("s2", 0, "fox")], true)
            .await
            .unwrap();

        let reopened = VectorStore::open(Arc::new(KeywordEmbedder), &store_config(dir.path()))
            .await
            .unwrap();
        assert_eq!(reopened.count().await, 2);

        let results = reopened.search("fox", 1).await.unwrap();
        assert_eq!(results[0].sample_id.as_deref(), Some("s2"));
    }

    #[tokio::test]
    async fn test_json_collection_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = VectorStore {
            embedder: Arc::new(KeywordEmbedder),
            persist_dir: dir.path().to_path_buf(),
            collection: "test.json".to_string(),
            records: RwLock::new(Vec::new()),
        };
        store.build(&[chunk("s1", 0, "rust")], true).await.unwrap();

        let path = dir.path().join("test.json");
        assert!(path.exists());
        // The file is actual JSON, not bincode.
        let parsed: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["name"], "test.json");

        let config = VectorStoreConfig {
            embedding_model: "test-model".to_string(),
            persist_directory: dir.path().to_path_buf(),
            collection_name: "test.json".to_string(),
        };
        let reopened = VectorStore::open(Arc::new(KeywordEmbedder), &config)
            .await
            .unwrap();
        assert_eq!(reopened.count().await, 1);
    }

    #[tokio::test]
    async fn test_delete_collection() {
        let dir = TempDir::new().unwrap();
        let store = open_store(dir.path(), Arc::new(KeywordEmbedder));
        store.build(&[chunk("s1", 0, "rust")], true).await.unwrap();

        store.delete_collection("test").await.unwrap();
        assert_eq!(store.count().await, 0);
        assert!(!dir.path().join("test.bin").exists());

        // Deleting again is a no-op.
        store.delete_collection("test").await.unwrap();
    }
}
