//! LanceDB-backed vector index.
//!
//! Every partition (manual category) is its own table named
//! `{prefix}{partition}`. Rows are upserted by record id with `merge_insert`,
//! deleted per manual with a `manual_id` predicate and searched by cosine
//! distance.

use anyhow::{anyhow, Result};
use arrow_array::RecordBatchIterator;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType};
use tracing::{debug, info};

use manualqa_core::traits::VectorIndex;
use manualqa_core::types::{similarity_from_distance, IndexHit, IndexRecord};

pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

use crate::search::batch_to_hits;
use crate::table::{open_db, prefixed_tables, table_exists};
use crate::writer::records_to_batch;

pub struct LanceVectorIndex {
    db: Connection,
    prefix: String,
    dim: usize,
}

impl LanceVectorIndex {
    pub async fn open(uri: &str, prefix: &str, dim: usize) -> Result<Self> {
        let db = open_db(uri).await?;
        info!(uri, prefix, dim, "opened vector store");
        Ok(Self { db, prefix: prefix.to_string(), dim })
    }

    pub fn table_name(&self, partition: &str) -> String {
        format!("{}{}", self.prefix, partition)
    }

    /// Row count of a partition; 0 when the partition does not exist.
    pub async fn count(&self, partition: &str) -> Result<usize> {
        let name = self.table_name(partition);
        if !table_exists(&self.db, &name).await? {
            return Ok(0);
        }
        Ok(self.db.open_table(&name).execute().await?.count_rows(None).await?)
    }
}

#[async_trait]
impl VectorIndex for LanceVectorIndex {
    async fn upsert(&self, partition: &str, records: &[IndexRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let batch = records_to_batch(records, self.dim)?;
        let schema = batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        let name = self.table_name(partition);

        if table_exists(&self.db, &name).await? {
            let table = self.db.open_table(&name).execute().await?;
            let mut merge = table.merge_insert(&["id"]);
            merge.when_matched_update_all(None).when_not_matched_insert_all();
            merge.execute(reader).await?;
        } else {
            self.db.create_table(&name, reader).execute().await?;
        }
        info!(table = %name, rows = records.len(), "upserted chunks");
        Ok(records.len())
    }

    async fn search(
        &self,
        partition: &str,
        vector: &[f32],
        k: usize,
        similarity_floor: Option<f32>,
    ) -> Result<Vec<IndexHit>> {
        if vector.len() != self.dim {
            return Err(anyhow!("query vector length {} does not match index dimension {}", vector.len(), self.dim));
        }
        let name = self.table_name(partition);
        if k == 0 || !table_exists(&self.db, &name).await? {
            debug!(table = %name, "nothing to search");
            return Ok(Vec::new());
        }

        let table = self.db.open_table(&name).execute().await?;
        let mut stream = table
            .vector_search(vector.to_vec())?
            .distance_type(DistanceType::Cosine)
            .limit(k)
            .execute()
            .await?;

        let mut hits = Vec::new();
        while let Some(batch) = stream.try_next().await? {
            hits.extend(batch_to_hits(&batch)?);
        }
        if let Some(floor) = similarity_floor {
            hits.retain(|h| similarity_from_distance(h.distance) >= floor);
        }
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        debug!(table = %name, hits = hits.len(), "vector search");
        Ok(hits)
    }

    async fn delete_manual(&self, partition: &str, manual_id: &str) -> Result<usize> {
        let name = self.table_name(partition);
        if !table_exists(&self.db, &name).await? {
            return Ok(0);
        }
        let table = self.db.open_table(&name).execute().await?;
        let predicate = manual_predicate(manual_id);
        let matching = table.count_rows(Some(predicate.clone())).await?;
        if matching > 0 {
            table.delete(&predicate).await?;
        }
        info!(table = %name, manual_id, rows = matching, "deleted manual rows");
        Ok(matching)
    }

    async fn list_partitions(&self) -> Result<Vec<String>> {
        prefixed_tables(&self.db, &self.prefix).await
    }
}

/// SQL filter selecting one manual's rows; single quotes are doubled.
pub fn manual_predicate(manual_id: &str) -> String {
    format!("manual_id = '{}'", manual_id.replace('\'', "''"))
}
