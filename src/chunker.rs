//! Chunk builder: splits ground-truth contexts into retrieval units.
//!
//! Splitting is pure character windowing: a window of `chunk_size` chars
//! advancing by `chunk_size - chunk_overlap`. The last chunk may be shorter;
//! no chunk exceeds `chunk_size`. Concatenating the first chunk with every
//! later chunk minus its leading `chunk_overlap` chars reproduces the
//! original context exactly.

use crate::config::ChunkingConfig;
use crate::dataset::{Dataset, Sample};
use crate::error::{RagBenchError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A chunk of a sample's ground-truth context.
///
/// Uniqueness is `(sample_id, index)`; index order within a sample is the
/// order of the original text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Id of the sample this chunk was cut from.
    pub sample_id: String,
    /// 0-indexed position within the sample's chunk sequence.
    pub index: usize,
    /// Chunk text content.
    pub text: String,
}

/// Split one sample's ground-truth context into chunks.
///
/// An empty context yields no chunks. Fails with a configuration error
/// when `chunk_overlap >= chunk_size`.
pub fn split_sample(sample: &Sample, config: &ChunkingConfig) -> Result<Vec<Chunk>> {
    if config.chunk_overlap >= config.chunk_size {
        return Err(RagBenchError::Config(format!(
            "chunk_overlap ({}) must be smaller than chunk_size ({})",
            config.chunk_overlap, config.chunk_size
        )));
    }

    let chars: Vec<char> = sample.ground_truth_context.chars().collect();
    let stride = config.chunk_size - config.chunk_overlap;

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + config.chunk_size).min(chars.len());

        chunks.push(Chunk {
            sample_id: sample.id.clone(),
            index: chunks.len(),
            text: chars[start..end].iter().collect(),
        });

        if end == chars.len() {
            break;
        }
        start += stride;
    }

    Ok(chunks)
}

/// Split every sample in a dataset into one flat chunk sequence.
pub fn split_dataset(dataset: &Dataset, config: &ChunkingConfig) -> Result<Vec<Chunk>> {
    let mut chunks = Vec::new();
    for sample in &dataset.samples {
        chunks.extend(split_sample(sample, config)?);
    }
    Ok(chunks)
}

/// Write chunks as line-delimited JSON, one chunk per line.
pub fn save_chunks(chunks: &[Chunk], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| RagBenchError::io(parent, e))?;
        }
    }

    let mut out = String::new();
    for chunk in chunks {
        out.push_str(
            &serde_json::to_string(chunk).map_err(|e| RagBenchError::Serialization(e.to_string()))?,
        );
        out.push('\n');
    }

    fs::write(path, out).map_err(|e| RagBenchError::io(path, e))?;
    Ok(())
}

/// Load chunks from a line-delimited JSON file.
pub fn load_chunks(path: &Path) -> Result<Vec<Chunk>> {
    let content = fs::read_to_string(path).map_err(|e| RagBenchError::io(path, e))?;

    let mut chunks = Vec::new();
    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let chunk: Chunk = serde_json::from_str(line).map_err(|e| {
            RagBenchError::Serialization(format!(
                "Failed to parse chunk at line {}: {}",
                line_num + 1,
                e
            ))
        })?;
        chunks.push(chunk);
    }

    Ok(chunks)
}
