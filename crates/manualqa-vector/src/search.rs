use anyhow::{anyhow, Result};
use arrow_array::{Array, Float32Array, Int32Array, RecordBatch, StringArray};

use manualqa_core::types::{BoundingBox, ChunkMetadata, IndexHit};

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| anyhow!("column '{}' missing or of unexpected type", name))
}

fn optional_str(col: &StringArray, i: usize) -> Option<String> {
    (!col.is_null(i)).then(|| col.value(i).to_string())
}

/// Decodes one result batch of a vector query into hits, in row order.
pub fn batch_to_hits(batch: &RecordBatch) -> Result<Vec<IndexHit>> {
    let ids = column::<StringArray>(batch, "id")?;
    let manual_ids = column::<StringArray>(batch, "manual_id")?;
    let manual_names = column::<StringArray>(batch, "manual_name")?;
    let manual_files = column::<StringArray>(batch, "manual_file")?;
    let categories = column::<StringArray>(batch, "category")?;
    let sections = column::<StringArray>(batch, "section")?;
    let pages = column::<Int32Array>(batch, "page_number")?;
    let chunk_indices = column::<Int32Array>(batch, "chunk_index")?;
    let bboxes = column::<StringArray>(batch, "bbox")?;
    let texts = column::<StringArray>(batch, "text")?;
    let distances = column::<Float32Array>(batch, "_distance")?;

    let mut hits = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let bbox = match optional_str(bboxes, i) {
            Some(json) => Some(serde_json::from_str::<BoundingBox>(&json)?),
            None => None,
        };
        hits.push(IndexHit {
            id: ids.value(i).to_string(),
            distance: distances.value(i),
            text: texts.value(i).to_string(),
            metadata: ChunkMetadata {
                manual_id: manual_ids.value(i).to_string(),
                manual_name: manual_names.value(i).to_string(),
                manual_file: manual_files.value(i).to_string(),
                category: categories.value(i).to_string(),
                page_number: pages.value(i).max(0) as u32,
                section: optional_str(sections, i),
                bbox,
                chunk_index: chunk_indices.value(i).max(0) as usize,
            },
        });
    }
    Ok(hits)
}
