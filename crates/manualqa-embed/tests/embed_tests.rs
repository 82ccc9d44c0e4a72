use manualqa_core::config::EmbeddingConfig;
use manualqa_core::traits::Embedder;
use manualqa_embed::{embed_in_batches, get_default_embedder, HashEmbedder};

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[test]
fn fake_embedder_shapes_and_determinism() {
    let config = EmbeddingConfig { use_fake: true, ..EmbeddingConfig::default() };
    let embedder = get_default_embedder(&config).expect("embedder");
    let texts = vec!["spindle speed".to_string(), "spindle speed".to_string()];
    let embs = embedder.embed_documents(&texts).expect("embed_documents");

    assert_eq!(embs.len(), 2);
    assert_eq!(embs[0].len(), 1024, "embedding dim follows config");
    let norm: f32 = embs[0].iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");
    for (a, b) in embs[0].iter().zip(&embs[1]) {
        assert!((a - b).abs() <= 1e-6);
    }
}

#[test]
fn shared_words_are_closer_than_disjoint_ones() {
    let embedder = HashEmbedder::new(256);
    let base = embedder.embed_query("replace the drive belt").unwrap();
    let near = embedder.embed_query("drive belt tension").unwrap();
    let far = embedder.embed_query("coolant pump wiring").unwrap();
    assert!(cosine(&base, &near) > cosine(&base, &far));
}

#[test]
fn query_prefix_only_affects_queries() {
    let plain = HashEmbedder::new(64);
    let prefixed = HashEmbedder::new(64).with_query_prefix("query: ");
    let doc = vec!["lubricate rails".to_string()];

    assert_eq!(plain.embed_documents(&doc).unwrap(), prefixed.embed_documents(&doc).unwrap());
    assert_ne!(plain.embed_query("lubricate rails").unwrap(), prefixed.embed_query("lubricate rails").unwrap());
}

#[test]
fn empty_text_embeds_to_zero_vector() {
    let v = HashEmbedder::new(8).embed_query("").unwrap();
    assert!(v.iter().all(|x| *x == 0.0));
}

#[test]
fn documents_are_embedded_in_bounded_batches() {
    let embedder = HashEmbedder::new(32);
    let texts: Vec<String> = (0..70).map(|i| format!("chunk number {i}")).collect();
    let mut batch_sizes = Vec::new();

    let vectors = embed_in_batches(&texts, 32, |batch| {
        batch_sizes.push(batch.len());
        embedder.embed_batch(batch)
    })
    .unwrap();

    assert_eq!(batch_sizes, vec![32, 32, 6]);
    assert_eq!(vectors.len(), 70);
    assert_eq!(vectors[69], embedder.embed_batch(&texts[69..]).unwrap()[0]);
    assert!(embed_in_batches(&[], 32, |_| panic!("no batch for empty input")).unwrap().is_empty());
}

#[test]
fn short_batch_result_is_an_error() {
    let texts = vec!["a".to_string(), "b".to_string()];
    let err = embed_in_batches(&texts, 8, |_| Ok(vec![vec![0.0; 4]])).unwrap_err();
    assert!(err.to_string().contains("1 vectors for a batch of 2"));
}
