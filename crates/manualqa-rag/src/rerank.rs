use std::collections::HashSet;

use tracing::debug;

use manualqa_core::config::RerankPolicy;
use manualqa_core::types::{ContextChunk, RankedCandidate, SearchCandidate};

/// Share of query words found in `text`, plus a bonus per shared word
/// longer than the technical-term length; capped at 1.0.
pub fn keyword_score(query: &str, text: &str, policy: &RerankPolicy) -> f32 {
    let query_lower = query.to_lowercase();
    let query_words: HashSet<&str> = query_lower.split_whitespace().collect();
    if query_words.is_empty() {
        return 0.0;
    }
    let text_lower = text.to_lowercase();
    let text_words: HashSet<&str> = text_lower.split_whitespace().collect();

    let shared: Vec<&str> = query_words.intersection(&text_words).copied().collect();
    let technical = shared.iter().filter(|w| w.chars().count() > policy.technical_term_len).count();
    let base = shared.len() as f32 / query_words.len() as f32;
    (base + technical as f32 * policy.technical_term_bonus).min(1.0)
}

pub fn position_bonus(original_rank: usize, policy: &RerankPolicy) -> f32 {
    (policy.position_base - policy.position_step * original_rank as f32).max(0.0)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Reranker {
    policy: RerankPolicy,
}

impl Reranker {
    pub fn new(policy: RerankPolicy) -> Self {
        Self { policy }
    }

    /// Blends similarity, keyword overlap and retrieval position; result is
    /// sorted by descending score, ties keeping retrieval order.
    pub fn rerank(&self, query: &str, candidates: Vec<SearchCandidate>) -> Vec<RankedCandidate> {
        let p = &self.policy;
        let mut ranked: Vec<RankedCandidate> = candidates
            .into_iter()
            .enumerate()
            .map(|(original_rank, candidate)| {
                let keyword_score = keyword_score(query, &candidate.text, p);
                let rerank_score = p.similarity_weight * candidate.similarity
                    + p.keyword_weight * keyword_score
                    + p.position_weight * position_bonus(original_rank, p);
                debug!(id = %candidate.id, similarity = candidate.similarity, keyword_score, rerank_score, "reranked");
                RankedCandidate { candidate, original_rank, keyword_score, rerank_score }
            })
            .collect();
        ranked.sort_by(|a, b| b.rerank_score.total_cmp(&a.rerank_score));
        ranked
    }

    /// Leading candidates scoring strictly above the floor, at most `max_context`.
    pub fn select_context(&self, ranked: Vec<RankedCandidate>) -> Vec<ContextChunk> {
        ranked
            .into_iter()
            .filter(|r| r.rerank_score > self.policy.context_floor)
            .take(self.policy.max_context)
            .collect()
    }
}
