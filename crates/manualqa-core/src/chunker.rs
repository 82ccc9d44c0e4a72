//! Block-aware chunking of extracted manual text.
//!
//! Blocks are packed into windows bounded by an estimated token budget. Each
//! closed window seeds the next one with blocks taken from its tail, walking
//! backwards while the overlap budget allows. Plain text without block
//! structure goes through a paragraph packer with a word-level fallback.

use tracing::debug;

use crate::config::ChunkingConfig;
use crate::types::{BlockType, Chunk, ChunkingResult, TextBlock};

pub const CHARS_PER_TOKEN: usize = 4;
const ID_PREFIX_CHARS: usize = 100;
const ID_HEX_LEN: usize = 12;

/// Fixed `chars / 4` approximation; no tokenizer involved.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / CHARS_PER_TOKEN
}

/// First 12 hex chars of the blake3 digest of `content`.
pub fn short_hash(content: &str) -> String {
    let digest = blake3::hash(content.as_bytes());
    digest.to_hex().as_str()[..ID_HEX_LEN].to_string()
}

/// Stable external id of a chunk. Not a dedup key: collisions are tolerated.
pub fn chunk_id(text: &str, chunk_index: usize) -> String {
    let prefix: String = text.chars().take(ID_PREFIX_CHARS).collect();
    short_hash(&format!("{prefix}_{chunk_index}"))
}

/// Most frequent page; ties go to the page seen first.
pub fn mode_page<I>(pages: I) -> Option<u32>
where
    I: IntoIterator<Item = u32>,
{
    let mut counts: Vec<(u32, usize)> = Vec::new();
    for page in pages {
        match counts.iter_mut().find(|(seen, _)| *seen == page) {
            Some((_, count)) => *count += 1,
            None => counts.push((page, 1)),
        }
    }

    let mut best: Option<(u32, usize)> = None;
    for (page, count) in counts {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((page, count));
        }
    }
    best.map(|(page, _)| page)
}

struct WindowBlock<'a> {
    source: &'a TextBlock,
    text: &'a str,
    tokens: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::from_config(&ChunkingConfig::default())
    }
}

impl Chunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }

    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Chunks a document and reports totals. Without an explicit id the
    /// document id is the short hash of all block texts.
    pub fn chunk_document(&self, blocks: &[TextBlock], document_id: Option<&str>) -> ChunkingResult {
        let chunks = self.chunk(blocks);
        let total_tokens = chunks.iter().map(|c| c.token_count).sum();
        let document_id = match document_id {
            Some(id) => id.to_string(),
            None => {
                let content: String = blocks.iter().map(|b| b.text.as_str()).collect();
                short_hash(&content)
            }
        };
        ChunkingResult { document_id, total_chunks: chunks.len(), total_tokens, chunks }
    }

    /// Packs ordered blocks into overlapping chunks. Never fails; blocks with
    /// no visible text are skipped and an empty input yields no chunks.
    pub fn chunk(&self, blocks: &[TextBlock]) -> Vec<Chunk> {
        let blocks: Vec<WindowBlock<'_>> = blocks
            .iter()
            .filter_map(|source| {
                let text = source.text.trim();
                (!text.is_empty()).then(|| WindowBlock { source, text, tokens: estimate_tokens(text) })
            })
            .collect();

        let mut chunks = Vec::new();
        let mut window: Vec<&WindowBlock<'_>> = Vec::new();
        let mut window_tokens = 0usize;

        for block in &blocks {
            if window_tokens + block.tokens > self.chunk_size && !window.is_empty() {
                chunks.extend(build_chunk(&window, chunks.len()));
                window = overlap_tail(&window, self.chunk_overlap);
                window_tokens = window.iter().map(|b| b.tokens).sum();
            }
            window.push(block);
            window_tokens += block.tokens;
        }
        if !window.is_empty() {
            chunks.extend(build_chunk(&window, chunks.len()));
        }

        debug!(blocks = blocks.len(), chunks = chunks.len(), "chunked blocks");
        chunks
    }

    /// Fallback for text without block structure: paragraphs (blank-line
    /// separated) are packed under a hard budget of `chunk_size * 4` chars; a
    /// paragraph over budget on its own is packed word by word.
    pub fn chunk_text(&self, text: &str, start_page: u32, start_section: Option<&str>) -> Vec<Chunk> {
        let budget = self.chunk_size * CHARS_PER_TOKEN;
        let mut pieces: Vec<(String, usize, usize)> = Vec::new();
        let mut current = String::new();
        let mut current_len = 0usize;
        let mut current_span = (0usize, 0usize);

        for (paragraph, start, end) in paragraphs(text) {
            let paragraph_len = end - start;
            if current_len + paragraph_len > budget {
                if !current.is_empty() {
                    pieces.push((std::mem::take(&mut current), current_span.0, current_span.1));
                    current_len = 0;
                }
                if paragraph_len > budget {
                    pieces.extend(pack_words(paragraph, budget).into_iter().map(|piece| (piece, start, end)));
                    continue;
                }
                current.push_str(paragraph);
                current_len = paragraph_len;
                current_span = (start, end);
            } else {
                if current.is_empty() {
                    current_span.0 = start;
                } else {
                    current.push_str("\n\n");
                    current_len += 2;
                }
                current.push_str(paragraph);
                current_len += paragraph_len;
                current_span.1 = end;
            }
        }
        if !current.is_empty() {
            pieces.push((current, current_span.0, current_span.1));
        }

        pieces
            .into_iter()
            .enumerate()
            .map(|(chunk_index, (text, start_char, end_char))| Chunk {
                id: chunk_id(&text, chunk_index),
                token_count: estimate_tokens(&text),
                page_number: start_page,
                section: start_section.map(str::to_string),
                chunk_index,
                start_char,
                end_char,
                bbox: None,
                text,
            })
            .collect()
    }
}

fn build_chunk(window: &[&WindowBlock<'_>], chunk_index: usize) -> Option<Chunk> {
    let first = window.first()?;
    let last = window.last()?;
    let text = window.iter().map(|b| b.text).collect::<Vec<&str>>().join(" ");

    let section = window
        .iter()
        .find(|b| b.source.block_type == BlockType::Heading)
        .map(|b| b.text.to_string())
        .or_else(|| window.iter().find_map(|b| b.source.section.clone()));
    let page_number = mode_page(window.iter().map(|b| b.source.page_number)).unwrap_or(first.source.page_number);

    Some(Chunk {
        id: chunk_id(&text, chunk_index),
        token_count: estimate_tokens(&text),
        page_number,
        section,
        chunk_index,
        start_char: first.source.start_char,
        end_char: last.source.end_char,
        bbox: first.source.bbox,
        text,
    })
}

/// Trailing blocks of a closed window whose estimates fit in `budget`.
fn overlap_tail<'w, 'a>(window: &[&'w WindowBlock<'a>], budget: usize) -> Vec<&'w WindowBlock<'a>> {
    let mut taken = 0usize;
    let mut start = window.len();
    for (i, block) in window.iter().enumerate().rev() {
        if taken + block.tokens > budget {
            break;
        }
        taken += block.tokens;
        start = i;
    }
    window[start..].to_vec()
}

/// Non-empty trimmed paragraphs with their char span in `text`.
fn paragraphs(text: &str) -> Vec<(&str, usize, usize)> {
    let mut out = Vec::new();
    let mut cursor = 0usize;
    for raw in text.split("\n\n") {
        let raw_len = raw.chars().count();
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            let leading = raw_len - raw.trim_start().chars().count();
            let start = cursor + leading;
            out.push((trimmed, start, start + trimmed.chars().count()));
        }
        cursor += raw_len + 2;
    }
    out
}

fn pack_words(paragraph: &str, budget: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0usize;

    for word in paragraph.split_whitespace() {
        let word_len = word.chars().count();
        if current_len + word_len > budget && !current.is_empty() {
            pieces.push(current.join(" "));
            current.clear();
            current.push(word);
            current_len = word_len;
        } else {
            current.push(word);
            current_len += word_len + 1;
        }
    }
    if !current.is_empty() {
        pieces.push(current.join(" "));
    }
    pieces
}
