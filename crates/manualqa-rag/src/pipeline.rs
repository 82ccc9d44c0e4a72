//! End-to-end orchestration: ingestion of chunked manuals and answering of
//! questions against them.

use std::sync::Arc;

use anyhow::anyhow;
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use manualqa_core::chunker::Chunker;
use manualqa_core::config::AppConfig;
use manualqa_core::error::{Error, Result};
use manualqa_core::traits::{AnswerGenerator, Embedder, VectorIndex};
use manualqa_core::types::{
    ChatAnswer, ChatMessage, Chunk, ChunkMetadata, IndexRecord, ManualInfo, SearchCandidate, TextBlock,
};

use crate::citations::CitationResolver;
use crate::enrich::QueryEnricher;
use crate::prompt::{citation_prompt, clean_answer, system_instruction};
use crate::rerank::Reranker;
use crate::retrieve::{PartitionCap, Retriever};

pub const NO_INFORMATION_ANSWER: &str = "I couldn't find any relevant information in the documentation for your query. Try rephrasing your question or check if documents have been uploaded.";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HealthReport {
    pub healthy: bool,
    pub partitions: Vec<String>,
    pub error: Option<String>,
    /// RFC 3339 timestamp of the check.
    pub checked_at: String,
}

pub struct RagPipeline {
    enricher: QueryEnricher,
    retriever: Retriever,
    reranker: Reranker,
    resolver: CitationResolver,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    generator: Arc<dyn AnswerGenerator>,
}

impl RagPipeline {
    pub fn new(
        config: &AppConfig,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Self {
        Self {
            enricher: QueryEnricher::new(&config.memory),
            retriever: Retriever::new(embedder.clone(), index.clone(), config.retrieval),
            reranker: Reranker::new(config.rerank),
            resolver: CitationResolver::new(config.confidence),
            embedder,
            index,
            generator,
        }
    }

    /// Answers `raw_query`, citing the context chunks the model referenced.
    /// An empty context yields the canned "no information" answer with
    /// confidence 0; collaborator failures are returned as errors.
    pub async fn process_query(
        &self,
        raw_query: &str,
        category: Option<&str>,
        history: &[ChatMessage],
        memory_enabled: bool,
    ) -> Result<ChatAnswer> {
        let query = self.enricher.enrich(raw_query, history, memory_enabled);
        let candidates = self.retriever.retrieve(&query, category).await?;
        let retrieved = candidates.len();
        let ranked = self.reranker.rerank(&query, candidates);
        let context = self.reranker.select_context(ranked);
        info!(retrieved, context = context.len(), category = category.unwrap_or("*"), "retrieval done");

        if context.is_empty() {
            return Ok(ChatAnswer {
                answer: NO_INFORMATION_ANSWER.to_string(),
                context_chunks_used: Vec::new(),
                sources: Vec::new(),
                citations: Vec::new(),
                confidence: 0.0,
            });
        }

        let raw_answer = self
            .generator
            .generate(&system_instruction(category), &citation_prompt(&query, &context))
            .await
            .map_err(Error::Generation)?;
        let answer = clean_answer(&raw_answer);
        let resolution = self.resolver.resolve(&answer, &context);
        info!(citations = resolution.citations.len(), confidence = resolution.confidence, "answer ready");

        Ok(ChatAnswer {
            answer,
            context_chunks_used: context,
            sources: resolution.sources,
            citations: resolution.citations,
            confidence: resolution.confidence,
        })
    }

    /// Chunks `blocks`, embeds the chunks and replaces the manual's rows in
    /// its category partition. A document without text yields no chunks and
    /// touches neither collaborator.
    pub async fn ingest(
        &self,
        manual: &ManualInfo,
        blocks: &[TextBlock],
        chunk_size: usize,
        overlap: usize,
    ) -> Result<Vec<Chunk>> {
        check_chunking(chunk_size, overlap)?;
        let chunks = Chunker::new(chunk_size, overlap).chunk(blocks);
        self.store(manual, chunks).await
    }

    /// Ingests text without block structure through the paragraph packer.
    pub async fn ingest_text(&self, manual: &ManualInfo, text: &str, chunk_size: usize) -> Result<Vec<Chunk>> {
        check_chunking(chunk_size, 0)?;
        let chunks = Chunker::new(chunk_size, 0).chunk_text(text, 1, None);
        self.store(manual, chunks).await
    }

    async fn store(&self, manual: &ManualInfo, chunks: Vec<Chunk>) -> Result<Vec<Chunk>> {
        if chunks.is_empty() {
            warn!(manual = %manual.filename, "no text to index");
            return Ok(chunks);
        }
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_documents(&texts).map_err(Error::Embedding)?;
        if vectors.len() != chunks.len() {
            return Err(Error::Embedding(anyhow!(
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let records: Vec<IndexRecord> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexRecord {
                id: record_id(&manual.id, &chunk.id),
                text: chunk.text.clone(),
                vector,
                metadata: ChunkMetadata::for_chunk(manual, chunk),
            })
            .collect();
        let replaced =
            self.index.delete_manual(&manual.category, &manual.id).await.map_err(Error::VectorIndex)?;
        let written = self.index.upsert(&manual.category, &records).await.map_err(Error::VectorIndex)?;
        info!(
            manual = %manual.filename,
            category = %manual.category,
            chunks = chunks.len(),
            replaced,
            written,
            "ingested manual"
        );
        Ok(chunks)
    }

    /// Nearest chunks for `query` without generation: up to `n` from the
    /// given category, or up to `n` per partition otherwise.
    pub async fn search_documents(&self, query: &str, category: Option<&str>, n: usize) -> Result<Vec<SearchCandidate>> {
        let vector = self.embedder.embed_query(query).map_err(Error::Embedding)?;
        match category {
            Some(partition) => self.retriever.search_partition(partition, &vector, n).await,
            None => self.retriever.search_all(&vector, PartitionCap::Each(n)).await,
        }
    }

    pub async fn categories(&self) -> Result<Vec<String>> {
        let mut partitions = self.index.list_partitions().await.map_err(Error::VectorIndex)?;
        partitions.sort();
        Ok(partitions)
    }

    pub async fn health(&self) -> HealthReport {
        let checked_at = Utc::now().to_rfc3339();
        match self.categories().await {
            Ok(partitions) => HealthReport { healthy: true, partitions, error: None, checked_at },
            Err(e) => {
                warn!(error = %e, "health check failed");
                HealthReport { healthy: false, partitions: Vec::new(), error: Some(e.to_string()), checked_at }
            }
        }
    }
}

/// Index key of a chunk, unique per manual even when chunk ids of two
/// manuals collide.
pub fn record_id(manual_id: &str, chunk_id: &str) -> String {
    format!("{manual_id}:{chunk_id}")
}

fn check_chunking(chunk_size: usize, overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(Error::InvalidConfig("chunk size must be positive".into()));
    }
    if overlap >= chunk_size {
        return Err(Error::InvalidConfig(format!(
            "chunk overlap ({overlap}) must be smaller than chunk size ({chunk_size})"
        )));
    }
    Ok(())
}
