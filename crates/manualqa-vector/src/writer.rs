use anyhow::{ensure, Result};
use arrow_array::types::Float32Type;
use arrow_array::{FixedSizeListArray, Int32Array, RecordBatch, StringArray, TimestampMillisecondArray};
use chrono::Utc;
use std::sync::Arc;

use manualqa_core::types::IndexRecord;

use crate::schema::build_chunk_schema;

/// Converts records into one Arrow batch; every vector must have length `dim`.
pub fn records_to_batch(records: &[IndexRecord], dim: usize) -> Result<RecordBatch> {
    if let Some(bad) = records.iter().find(|r| r.vector.len() != dim) {
        anyhow::bail!("record {} has vector length {} (expected {})", bad.id, bad.vector.len(), dim);
    }
    ensure!(dim > 0, "vector dimension must be positive");

    let now = Utc::now().timestamp_millis();
    let mut bboxes = Vec::with_capacity(records.len());
    for r in records {
        bboxes.push(r.metadata.bbox.as_ref().map(serde_json::to_string).transpose()?);
    }
    let vectors = records.iter().map(|r| Some(r.vector.iter().map(|&x| Some(x)).collect::<Vec<_>>()));

    let batch = RecordBatch::try_new(
        build_chunk_schema(dim),
        vec![
            Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.id.as_str()))),
            Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.metadata.manual_id.as_str()))),
            Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.metadata.manual_name.as_str()))),
            Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.metadata.manual_file.as_str()))),
            Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.metadata.category.as_str()))),
            Arc::new(StringArray::from(records.iter().map(|r| r.metadata.section.clone()).collect::<Vec<_>>())),
            Arc::new(Int32Array::from_iter_values(records.iter().map(|r| r.metadata.page_number as i32))),
            Arc::new(Int32Array::from_iter_values(records.iter().map(|r| r.metadata.chunk_index as i32))),
            Arc::new(StringArray::from(bboxes)),
            Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.text.as_str()))),
            Arc::new(TimestampMillisecondArray::from(vec![now; records.len()])),
            Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors, dim as i32)),
        ],
    )?;
    Ok(batch)
}
