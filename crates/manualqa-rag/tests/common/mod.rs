#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use manualqa_core::traits::{AnswerGenerator, Embedder, VectorIndex};
use manualqa_core::types::{ChunkMetadata, IndexHit, IndexRecord, RankedCandidate, SearchCandidate};
use manualqa_rag::InMemoryIndex;

pub const QUERY_VECTOR: [f32; 2] = [1.0, 0.0];

/// Unit vector whose similarity to `QUERY_VECTOR` is `similarity`
/// (`similarity = (1 + cos) / 2`).
pub fn vector_with_similarity(similarity: f32) -> Vec<f32> {
    let cos = 2.0 * similarity - 1.0;
    vec![cos, (1.0 - cos * cos).max(0.0).sqrt()]
}

pub fn meta(category: &str, page: u32, section: Option<&str>) -> ChunkMetadata {
    ChunkMetadata {
        manual_id: "router-x".into(),
        manual_name: "Router X".into(),
        manual_file: "router_x.pdf".into(),
        category: category.into(),
        page_number: page,
        section: section.map(str::to_string),
        bbox: None,
        chunk_index: 0,
    }
}

pub fn record(id: &str, category: &str, similarity: f32, text: &str) -> IndexRecord {
    IndexRecord { id: id.into(), text: text.into(), vector: vector_with_similarity(similarity), metadata: meta(category, 1, None) }
}

pub fn candidate(id: &str, similarity: f32, text: &str) -> SearchCandidate {
    SearchCandidate {
        id: id.into(),
        text: text.into(),
        metadata: meta("maintenance", 1, None),
        distance: 2.0 * (1.0 - similarity),
        similarity,
    }
}

pub fn ranked(id: &str, similarity: f32, rerank_score: f32) -> RankedCandidate {
    RankedCandidate { candidate: candidate(id, similarity, id), original_rank: 0, keyword_score: 0.0, rerank_score }
}

pub async fn seeded_index(partition: &str, records: &[IndexRecord]) -> Arc<InMemoryIndex> {
    let index = Arc::new(InMemoryIndex::new());
    index.upsert(partition, records).await.expect("seed");
    index
}

/// Embeds every query as `QUERY_VECTOR` and every document as its own
/// copy of `document_vector`.
pub struct FixedEmbedder {
    pub document_vector: Vec<f32>,
}

impl Default for FixedEmbedder {
    fn default() -> Self {
        Self { document_vector: vec![0.0, 1.0] }
    }
}

impl Embedder for FixedEmbedder {
    fn dim(&self) -> usize {
        2
    }

    fn max_len(&self) -> usize {
        512
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| self.document_vector.clone()).collect())
    }

    fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(QUERY_VECTOR.to_vec())
    }
}

pub struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn dim(&self) -> usize {
        2
    }

    fn max_len(&self) -> usize {
        512
    }

    fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(anyhow!("embedding backend offline"))
    }
}

pub struct FailingIndex;

#[async_trait]
impl VectorIndex for FailingIndex {
    async fn upsert(&self, _partition: &str, _records: &[IndexRecord]) -> Result<usize> {
        Err(anyhow!("store unavailable"))
    }

    async fn search(&self, _p: &str, _v: &[f32], _k: usize, _floor: Option<f32>) -> Result<Vec<IndexHit>> {
        Err(anyhow!("store unavailable"))
    }

    async fn delete_manual(&self, _partition: &str, _manual_id: &str) -> Result<usize> {
        Err(anyhow!("store unavailable"))
    }

    async fn list_partitions(&self) -> Result<Vec<String>> {
        Err(anyhow!("store unavailable"))
    }
}

/// Returns a fixed answer and records every `(system, prompt)` pair.
pub struct ScriptedGenerator {
    pub answer: String,
    pub calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedGenerator {
    pub fn new(answer: &str) -> Self {
        Self { answer: answer.into(), calls: Mutex::new(Vec::new()) }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }
}

#[async_trait]
impl AnswerGenerator for ScriptedGenerator {
    async fn generate(&self, system_instruction: &str, prompt: &str) -> Result<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((system_instruction.to_string(), prompt.to_string()));
        }
        Ok(self.answer.clone())
    }
}

pub struct FailingGenerator;

#[async_trait]
impl AnswerGenerator for FailingGenerator {
    async fn generate(&self, _system: &str, _prompt: &str) -> Result<String> {
        Err(anyhow!("model timed out"))
    }
}
