use manualqa_core::traits::VectorIndex;
use manualqa_core::types::{BoundingBox, ChunkMetadata, IndexRecord};
use manualqa_vector::writer::records_to_batch;
use manualqa_vector::{manual_predicate, LanceVectorIndex};

const DIM: usize = 4;

fn record(id: &str, category: &str, vector: [f32; DIM], text: &str) -> IndexRecord {
    IndexRecord {
        id: id.to_string(),
        text: text.to_string(),
        vector: vector.to_vec(),
        metadata: ChunkMetadata {
            manual_id: "m1".into(),
            manual_name: "Router X".into(),
            manual_file: "router_x.pdf".into(),
            category: category.into(),
            page_number: 12,
            section: Some("Spindle".into()),
            bbox: Some(BoundingBox { x0: 1.0, y0: 2.0, x1: 3.0, y1: 4.0 }),
            chunk_index: 0,
        },
    }
}

async fn open(tmp: &tempfile::TempDir) -> LanceVectorIndex {
    LanceVectorIndex::open(&tmp.path().to_string_lossy(), "manuals_", DIM).await.expect("open")
}

#[tokio::test]
async fn upsert_then_search_orders_by_distance() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let index = open(&tmp).await;
    let records = vec![
        record("a", "maintenance", [1.0, 0.0, 0.0, 0.0], "oil the rails"),
        record("b", "maintenance", [0.7, 0.7, 0.0, 0.0], "check the belt"),
        record("c", "maintenance", [0.0, 0.0, 1.0, 0.0], "unrelated"),
    ];
    assert_eq!(index.upsert("maintenance", &records).await?, 3);

    let hits = index.search("maintenance", &[1.0, 0.0, 0.0, 0.0], 3, None).await?;
    let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert!(hits[0].distance < 1e-4);
    assert_eq!(hits[0].metadata.section.as_deref(), Some("Spindle"));
    assert_eq!(hits[0].metadata.bbox, Some(BoundingBox { x0: 1.0, y0: 2.0, x1: 3.0, y1: 4.0 }));
    assert_eq!(hits[0].metadata.page_number, 12);
    Ok(())
}

#[tokio::test]
async fn similarity_floor_drops_distant_hits() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let index = open(&tmp).await;
    index
        .upsert(
            "safety",
            &[record("near", "safety", [1.0, 0.0, 0.0, 0.0], "x"), record("far", "safety", [-1.0, 0.0, 0.0, 0.0], "y")],
        )
        .await?;

    let hits = index.search("safety", &[1.0, 0.0, 0.0, 0.0], 10, Some(0.7)).await?;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "near");
    Ok(())
}

#[tokio::test]
async fn upsert_replaces_rows_with_same_id() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let index = open(&tmp).await;
    index.upsert("programming", &[record("p1", "programming", [1.0, 0.0, 0.0, 0.0], "old")]).await?;
    index.upsert("programming", &[record("p1", "programming", [1.0, 0.0, 0.0, 0.0], "new")]).await?;

    assert_eq!(index.count("programming").await?, 1);
    let hits = index.search("programming", &[1.0, 0.0, 0.0, 0.0], 5, None).await?;
    assert_eq!(hits[0].text, "new");
    Ok(())
}

#[tokio::test]
async fn partitions_are_listed_sorted_without_prefix() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let index = open(&tmp).await;
    assert!(index.list_partitions().await?.is_empty());

    index.upsert("safety", &[record("s", "safety", [0.0, 1.0, 0.0, 0.0], "s")]).await?;
    index.upsert("maintenance", &[record("m", "maintenance", [0.0, 1.0, 0.0, 0.0], "m")]).await?;
    assert_eq!(index.list_partitions().await?, vec!["maintenance".to_string(), "safety".to_string()]);

    let missing = index.search("troubleshooting", &[0.0, 1.0, 0.0, 0.0], 5, None).await?;
    assert!(missing.is_empty());
    Ok(())
}

#[test]
fn wrong_dimension_is_rejected() {
    let mut bad = record("x", "c", [1.0, 0.0, 0.0, 0.0], "t");
    bad.vector.push(0.5);
    assert!(records_to_batch(&[bad], DIM).is_err());
}

#[tokio::test]
async fn delete_manual_removes_only_that_manuals_rows() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let index = open(&tmp).await;
    let mut other = record("o1", "maintenance", [0.0, 1.0, 0.0, 0.0], "other manual");
    other.metadata.manual_id = "m2".into();
    index
        .upsert(
            "maintenance",
            &[
                record("a1", "maintenance", [1.0, 0.0, 0.0, 0.0], "torque 40 Nm"),
                record("a2", "maintenance", [0.0, 0.0, 1.0, 0.0], "belt"),
                other,
            ],
        )
        .await?;

    assert_eq!(index.delete_manual("maintenance", "m1").await?, 2);
    assert_eq!(index.count("maintenance").await?, 1);
    let hits = index.search("maintenance", &[0.0, 1.0, 0.0, 0.0], 5, None).await?;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].metadata.manual_id, "m2");

    assert_eq!(index.delete_manual("maintenance", "m1").await?, 0);
    assert_eq!(index.delete_manual("troubleshooting", "m1").await?, 0);
    Ok(())
}

#[test]
fn manual_predicate_escapes_quotes() {
    assert_eq!(manual_predicate("m1"), "manual_id = 'm1'");
    assert_eq!(manual_predicate("o'brien"), "manual_id = 'o''brien'");
}
