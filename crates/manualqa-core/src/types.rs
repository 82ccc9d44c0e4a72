//! Domain types shared by the chunker, the vector store and the query pipeline.

use serde::{Deserialize, Serialize};

pub type ChunkId = String;

/// Layout role of an extracted block.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Heading,
    #[default]
    Text,
    List,
    Caption,
    Emphasis,
}

/// Page-space rectangle `(x0, y0)`-`(x1, y1)` used to highlight a source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

/// A positioned run of text produced by extraction, in reading order.
///
/// `section` is the table-of-contents title the block falls under, when the
/// extractor could resolve one. `start_char`/`end_char` are character offsets
/// into the document's concatenated text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextBlock {
    pub text: String,
    pub page_number: u32,
    #[serde(default)]
    pub block_type: BlockType,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub bbox: Option<BoundingBox>,
    #[serde(default)]
    pub start_char: usize,
    #[serde(default)]
    pub end_char: usize,
}

impl TextBlock {
    pub fn new(text: impl Into<String>, page_number: u32, block_type: BlockType) -> Self {
        let text = text.into();
        let end_char = text.chars().count();
        Self { text, page_number, block_type, section: None, bbox: None, start_char: 0, end_char }
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    pub fn with_offsets(mut self, start_char: usize, end_char: usize) -> Self {
        self.start_char = start_char;
        self.end_char = end_char;
        self
    }
}

/// A bounded span of document text, the unit that gets embedded and indexed.
///
/// - `id`: 12 hex chars derived from the leading text and `chunk_index`
/// - `page_number`: the page most of the chunk's blocks sit on
/// - `section`: first heading inside the chunk, else the inherited TOC section
/// - `token_count`: `chars / 4` estimate of `text`
/// - `bbox`: box of the first block, for highlighting
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub id: ChunkId,
    pub text: String,
    pub page_number: u32,
    pub section: Option<String>,
    pub chunk_index: usize,
    pub start_char: usize,
    pub end_char: usize,
    pub token_count: usize,
    #[serde(default)]
    pub bbox: Option<BoundingBox>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingResult {
    pub document_id: String,
    pub chunks: Vec<Chunk>,
    pub total_chunks: usize,
    pub total_tokens: usize,
}

/// Identity of a manual being ingested.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManualInfo {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub title: Option<String>,
    pub category: String,
}

impl ManualInfo {
    /// Human-facing manual name: the title, else the filename without its
    /// `.pdf` extension and with underscores as spaces.
    pub fn display_name(&self) -> String {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => self.filename.replace(".pdf", "").replace('_', " "),
        }
    }
}

/// Metadata stored next to every vector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    pub manual_id: String,
    pub manual_name: String,
    pub manual_file: String,
    pub category: String,
    pub page_number: u32,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub bbox: Option<BoundingBox>,
    #[serde(default)]
    pub chunk_index: usize,
}

impl ChunkMetadata {
    pub fn for_chunk(manual: &ManualInfo, chunk: &Chunk) -> Self {
        Self {
            manual_id: manual.id.clone(),
            manual_name: manual.display_name(),
            manual_file: manual.filename.clone(),
            category: manual.category.clone(),
            page_number: chunk.page_number,
            section: chunk.section.clone(),
            bbox: chunk.bbox,
            chunk_index: chunk.chunk_index,
        }
    }
}

/// One row handed to a vector index on upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRecord {
    pub id: ChunkId,
    pub text: String,
    pub vector: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// One nearest-neighbour result as reported by a vector index.
/// `distance` is cosine distance in `[0, 2]`.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    pub id: ChunkId,
    pub distance: f32,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Maps cosine distance onto `[0, 1]`, 1 meaning identical.
pub fn similarity_from_distance(distance: f32) -> f32 {
    if distance.is_nan() {
        return 0.0;
    }
    (1.0 - distance / 2.0).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchCandidate {
    pub id: ChunkId,
    pub text: String,
    pub metadata: ChunkMetadata,
    pub distance: f32,
    pub similarity: f32,
}

impl From<IndexHit> for SearchCandidate {
    fn from(hit: IndexHit) -> Self {
        let similarity = similarity_from_distance(hit.distance);
        Self { id: hit.id, text: hit.text, metadata: hit.metadata, distance: hit.distance, similarity }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedCandidate {
    #[serde(flatten)]
    pub candidate: SearchCandidate,
    /// 0-based position before reranking.
    pub original_rank: usize,
    pub keyword_score: f32,
    pub rerank_score: f32,
}

/// A ranked candidate admitted into the context set handed to the model.
pub type ContextChunk = RankedCandidate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// A `[n]` marker in a generated answer resolved to its source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Citation {
    pub number: usize,
    pub manual_name: String,
    pub page_number: u32,
    pub section: Option<String>,
    pub bbox: Option<BoundingBox>,
    pub quoted_text: String,
}

/// Source entry listed with an answer, one per context chunk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceRef {
    pub id: String,
    pub manual_name: String,
    pub manual_file: String,
    pub page_number: u32,
    pub section: Option<String>,
    pub bbox: Option<BoundingBox>,
    pub similarity: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatAnswer {
    pub answer: String,
    pub context_chunks_used: Vec<ContextChunk>,
    pub sources: Vec<SourceRef>,
    pub citations: Vec<Citation>,
    pub confidence: f32,
}
