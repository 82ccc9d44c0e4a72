//! Brute-force cosine index held in memory. Used for development runs and
//! tests where a LanceDB directory is unwanted.

use std::collections::BTreeMap;
use std::sync::RwLock;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use manualqa_core::traits::VectorIndex;
use manualqa_core::types::{similarity_from_distance, IndexHit, IndexRecord};

#[derive(Default)]
pub struct InMemoryIndex {
    partitions: RwLock<BTreeMap<String, Vec<IndexRecord>>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_count(&self, partition: &str) -> usize {
        self.partitions.read().map(|p| p.get(partition).map_or(0, Vec::len)).unwrap_or(0)
    }
}

/// `1 - cos(a, b)`; zero vectors are treated as orthogonal.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn upsert(&self, partition: &str, records: &[IndexRecord]) -> Result<usize> {
        let mut partitions = self.partitions.write().map_err(|_| anyhow!("index lock poisoned"))?;
        let rows = partitions.entry(partition.to_string()).or_default();
        for record in records {
            match rows.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record.clone(),
                None => rows.push(record.clone()),
            }
        }
        Ok(records.len())
    }

    async fn search(
        &self,
        partition: &str,
        vector: &[f32],
        k: usize,
        similarity_floor: Option<f32>,
    ) -> Result<Vec<IndexHit>> {
        let partitions = self.partitions.read().map_err(|_| anyhow!("index lock poisoned"))?;
        let Some(rows) = partitions.get(partition) else {
            return Ok(Vec::new());
        };

        let mut hits = Vec::with_capacity(rows.len());
        for record in rows {
            if record.vector.len() != vector.len() {
                bail!("query vector length {} does not match stored length {}", vector.len(), record.vector.len());
            }
            let distance = cosine_distance(&record.vector, vector);
            if similarity_floor.is_some_and(|floor| similarity_from_distance(distance) < floor) {
                continue;
            }
            hits.push(IndexHit {
                id: record.id.clone(),
                distance,
                text: record.text.clone(),
                metadata: record.metadata.clone(),
            });
        }
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        Ok(hits)
    }

    async fn delete_manual(&self, partition: &str, manual_id: &str) -> Result<usize> {
        let mut partitions = self.partitions.write().map_err(|_| anyhow!("index lock poisoned"))?;
        let Some(rows) = partitions.get_mut(partition) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|r| r.metadata.manual_id != manual_id);
        Ok(before - rows.len())
    }

    async fn list_partitions(&self) -> Result<Vec<String>> {
        let partitions = self.partitions.read().map_err(|_| anyhow!("index lock poisoned"))?;
        Ok(partitions.keys().cloned().collect())
    }
}
