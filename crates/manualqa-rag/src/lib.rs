//! manualqa-rag
//!
//! Query side of the system: query enrichment, multi-partition retrieval,
//! reranking and context selection, prompt construction, answer generation
//! and citation resolution, wired together by [`pipeline::RagPipeline`].

pub mod citations;
pub mod enrich;
pub mod generator;
pub mod memory_index;
pub mod pipeline;
pub mod prompt;
pub mod rerank;
pub mod retrieve;

pub use citations::{CitationResolver, Resolution};
pub use enrich::QueryEnricher;
pub use generator::ChatCompletionGenerator;
pub use memory_index::InMemoryIndex;
pub use pipeline::{record_id, HealthReport, RagPipeline, NO_INFORMATION_ANSWER};
pub use rerank::Reranker;
pub use retrieve::Retriever;
