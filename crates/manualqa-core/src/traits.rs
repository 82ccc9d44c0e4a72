use async_trait::async_trait;

use crate::types::{IndexHit, IndexRecord};

/// Text -> fixed-length vector. Query and document embeddings may differ for
/// the same text; callers use `embed_query` and `embed_documents` accordingly.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed_documents(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.embed_batch(texts)
    }

    fn embed_query(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector for the query"))
    }
}

/// Nearest-neighbour search over named partitions. Implementations must be
/// safe for concurrent reads.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace records by id; returns the number written.
    async fn upsert(&self, partition: &str, records: &[IndexRecord]) -> anyhow::Result<usize>;

    /// Up to `k` hits ordered by ascending cosine distance. When a floor is
    /// given, hits whose similarity falls below it may be left out.
    async fn search(
        &self,
        partition: &str,
        vector: &[f32],
        k: usize,
        similarity_floor: Option<f32>,
    ) -> anyhow::Result<Vec<IndexHit>>;

    /// Removes every row of `manual_id` from `partition`; returns the number
    /// removed. A missing partition removes nothing.
    async fn delete_manual(&self, partition: &str, manual_id: &str) -> anyhow::Result<usize>;

    async fn list_partitions(&self) -> anyhow::Result<Vec<String>>;
}

/// Language model producing an answer for a prompt that lists numbered sources.
/// The model is asked, not guaranteed, to cite them as `[n]`.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, system_instruction: &str, prompt: &str) -> anyhow::Result<String>;
}
