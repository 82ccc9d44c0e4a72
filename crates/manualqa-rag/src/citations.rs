use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use manualqa_core::config::ConfidencePolicy;
use manualqa_core::types::{Citation, ContextChunk, SourceRef};

const QUOTE_CHARS: usize = 200;

fn marker_regex() -> Option<&'static Regex> {
    static MARKER: OnceLock<Option<Regex>> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"\[(\d+)\]").ok()).as_ref()
}

/// Distinct `[n]` numbers in `answer`, ascending. Numbers that do not fit
/// in `usize` are ignored.
pub fn cited_numbers(answer: &str) -> BTreeSet<usize> {
    let Some(re) = marker_regex() else {
        return BTreeSet::new();
    };
    re.captures_iter(answer).filter_map(|c| c.get(1)?.as_str().parse().ok()).collect()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Resolution {
    pub citations: Vec<Citation>,
    pub sources: Vec<SourceRef>,
    pub confidence: f32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CitationResolver {
    policy: ConfidencePolicy,
}

impl CitationResolver {
    pub fn new(policy: ConfidencePolicy) -> Self {
        Self { policy }
    }

    pub fn resolve(&self, answer: &str, context: &[ContextChunk]) -> Resolution {
        Resolution {
            citations: citations(answer, context),
            sources: source_list(context),
            confidence: compute_confidence(context, &self.policy),
        }
    }
}

/// Markers mapped to 1-based context positions; out-of-range numbers and
/// `[0]` are dropped.
pub fn citations(answer: &str, context: &[ContextChunk]) -> Vec<Citation> {
    cited_numbers(answer)
        .into_iter()
        .filter_map(|number| {
            let chunk = context.get(number.checked_sub(1)?)?;
            let meta = &chunk.candidate.metadata;
            Some(Citation {
                number,
                manual_name: meta.manual_name.clone(),
                page_number: meta.page_number,
                section: meta.section.clone(),
                bbox: meta.bbox,
                quoted_text: chunk.candidate.text.chars().take(QUOTE_CHARS).collect(),
            })
        })
        .collect()
}

pub fn source_list(context: &[ContextChunk]) -> Vec<SourceRef> {
    context
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            let meta = &chunk.candidate.metadata;
            SourceRef {
                id: format!("source_{}", i + 1),
                manual_name: meta.manual_name.clone(),
                manual_file: meta.manual_file.clone(),
                page_number: meta.page_number,
                section: meta.section.clone(),
                bbox: meta.bbox,
                similarity: chunk.candidate.similarity,
            }
        })
        .collect()
}

/// Answer confidence from the leading context chunks: mean similarity,
/// optionally blended with mean rerank score, plus an agreement bonus when
/// enough sources back the answer. Clamped to `[0, ceiling]`; 0 without context.
pub fn compute_confidence(context: &[ContextChunk], policy: &ConfidencePolicy) -> f32 {
    if context.is_empty() {
        return 0.0;
    }
    let top = &context[..context.len().min(policy.top_n.max(1))];
    let n = top.len() as f32;
    let avg_similarity = top.iter().map(|c| c.candidate.similarity).sum::<f32>() / n;
    let bonus = if context.len() >= policy.agreement_min_sources { policy.agreement_bonus } else { 0.0 };

    let confidence = if policy.blend_rerank {
        let avg_rerank = top.iter().map(|c| c.rerank_score).sum::<f32>() / n;
        policy.similarity_weight * avg_similarity + policy.rerank_weight * avg_rerank + bonus
    } else {
        avg_similarity + bonus
    };
    confidence.min(policy.ceiling).max(0.0)
}
