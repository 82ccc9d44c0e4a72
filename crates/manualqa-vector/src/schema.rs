use arrow_schema::{DataType, Field, Schema, TimeUnit};
use std::sync::Arc;

/// Column layout of a partition table; `dim` is the embedder's vector length.
pub fn build_chunk_schema(dim: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("manual_id", DataType::Utf8, false),
        Field::new("manual_name", DataType::Utf8, false),
        Field::new("manual_file", DataType::Utf8, false),
        Field::new("category", DataType::Utf8, false),
        Field::new("section", DataType::Utf8, true),
        Field::new("page_number", DataType::Int32, false),
        Field::new("chunk_index", DataType::Int32, false),
        // JSON-encoded BoundingBox
        Field::new("bbox", DataType::Utf8, true),
        Field::new("text", DataType::Utf8, false),
        Field::new("ingested_at", DataType::Timestamp(TimeUnit::Millisecond, None), false),
        Field::new(
            "vector",
            DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim as i32),
            true,
        ),
    ]))
}
