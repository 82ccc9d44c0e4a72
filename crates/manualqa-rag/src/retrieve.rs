use std::collections::HashSet;
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::debug;

use manualqa_core::config::RetrievalConfig;
use manualqa_core::error::{Error, Result};
use manualqa_core::traits::{Embedder, VectorIndex};
use manualqa_core::types::SearchCandidate;

/// How many hits each partition may contribute when no category is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionCap {
    /// `floor(total / partition_count) + 1` per partition.
    Split(usize),
    /// The same cap for every partition.
    Each(usize),
}

pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>, config: RetrievalConfig) -> Self {
        Self { embedder, index, config }
    }

    pub async fn retrieve(&self, query: &str, category: Option<&str>) -> Result<Vec<SearchCandidate>> {
        let vector = self.embedder.embed_query(query).map_err(Error::Embedding)?;
        self.retrieve_with_vector(&vector, category).await
    }

    /// Searches one partition with cap `top_k`, or every partition with the
    /// split cap, merging in partition-name order.
    pub async fn retrieve_with_vector(&self, vector: &[f32], category: Option<&str>) -> Result<Vec<SearchCandidate>> {
        match category {
            Some(partition) => self.search_partition(partition, vector, self.config.top_k).await,
            None => self.search_all(vector, PartitionCap::Split(self.config.top_k)).await,
        }
    }

    pub async fn search_all(&self, vector: &[f32], cap: PartitionCap) -> Result<Vec<SearchCandidate>> {
        let mut partitions = self.index.list_partitions().await.map_err(Error::VectorIndex)?;
        if partitions.is_empty() {
            debug!("no partitions to search");
            return Ok(Vec::new());
        }
        partitions.sort();
        partitions.dedup();

        let per_partition = match cap {
            PartitionCap::Split(total) => total / partitions.len() + 1,
            PartitionCap::Each(k) => k,
        };
        let searches = partitions.iter().map(|p| self.search_partition(p, vector, per_partition));
        let groups = try_join_all(searches).await?;

        let merged = merge_unique(groups);
        debug!(partitions = partitions.len(), per_partition, candidates = merged.len(), "merged partition results");
        Ok(merged)
    }

    /// Hits at or above the similarity floor, best first.
    pub async fn search_partition(&self, partition: &str, vector: &[f32], k: usize) -> Result<Vec<SearchCandidate>> {
        let floor = self.config.similarity_threshold;
        let hits = self.index.search(partition, vector, k, Some(floor)).await.map_err(Error::VectorIndex)?;

        let mut candidates: Vec<SearchCandidate> =
            hits.into_iter().map(SearchCandidate::from).filter(|c| c.similarity >= floor).collect();
        candidates.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        candidates.truncate(k);
        Ok(candidates)
    }
}

/// Concatenates groups in order, keeping the first occurrence of each id.
pub fn merge_unique(groups: Vec<Vec<SearchCandidate>>) -> Vec<SearchCandidate> {
    let mut seen = HashSet::new();
    groups.into_iter().flatten().filter(|c| seen.insert(c.id.clone())).collect()
}
