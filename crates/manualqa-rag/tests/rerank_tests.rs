mod common;

use common::candidate;
use manualqa_core::config::RerankPolicy;
use manualqa_rag::rerank::{keyword_score, position_bonus};
use manualqa_rag::Reranker;

#[test]
fn keyword_score_counts_overlap_and_technical_terms() {
    let p = RerankPolicy::default();
    assert!((keyword_score("oil the belt", "belt tension", &p) - 1.0 / 3.0).abs() < 1e-6);
    assert!((keyword_score("lubrication interval", "Lubrication schedule", &p) - 0.6).abs() < 1e-6);
    assert_eq!(keyword_score("Replace spindle bearings", "how to replace the spindle bearings", &p), 1.0);
    assert_eq!(keyword_score("   ", "anything", &p), 0.0);
    assert_eq!(keyword_score("coolant", "", &p), 0.0);
}

#[test]
fn position_bonus_decays_to_zero() {
    let p = RerankPolicy::default();
    assert!((position_bonus(0, &p) - 0.1).abs() < 1e-6);
    assert!((position_bonus(3, &p) - 0.07).abs() < 1e-6);
    assert_eq!(position_bonus(15, &p), 0.0);
}

#[test]
fn scores_blend_and_sort_descending() {
    let reranker = Reranker::default();
    let ranked = reranker.rerank(
        "spindle belt",
        vec![
            candidate("a", 0.80, "nothing relevant"),
            candidate("b", 0.78, "spindle belt replacement"),
            candidate("c", 0.95, "unrelated text"),
        ],
    );

    let ids: Vec<&str> = ranked.iter().map(|r| r.candidate.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "c", "a"]);
    assert!(ranked.windows(2).all(|w| w[0].rerank_score >= w[1].rerank_score));

    let b = &ranked[0];
    assert_eq!(b.original_rank, 1);
    assert_eq!(b.keyword_score, 1.0);
    assert!((b.rerank_score - (0.7 * 0.78 + 0.2 * 1.0 + 0.1 * 0.09)).abs() < 1e-5);
}

#[test]
fn equal_scores_keep_retrieval_order() {
    let candidates = (0..13).map(|i| candidate(&format!("c{i}"), 0.5, "same text")).collect();
    let ranked = Reranker::default().rerank("query", candidates);
    assert_eq!(ranked[11].original_rank, 11);
    assert_eq!(ranked[12].original_rank, 12);
    assert!(ranked.windows(2).all(|w| w[0].rerank_score >= w[1].rerank_score));
}

#[test]
fn context_is_bounded_and_above_floor() {
    let reranker = Reranker::default();
    let mut candidates: Vec<_> = (0..8).map(|i| candidate(&format!("hi{i}"), 0.9, "text")).collect();
    candidates.push(candidate("low", 0.4, "text"));
    let context = reranker.select_context(reranker.rerank("query", candidates));

    assert_eq!(context.len(), 5);
    assert!(context.iter().all(|c| c.rerank_score > 0.3));
    assert!(context.iter().all(|c| c.candidate.id != "low"));
}

#[test]
fn weak_candidates_leave_empty_context() {
    let reranker = Reranker::default();
    let ranked = reranker.rerank("query", vec![candidate("a", 0.3, "x"), candidate("b", 0.2, "y")]);
    assert!(reranker.select_context(ranked).is_empty());
    assert!(reranker.select_context(Vec::new()).is_empty());
}
