//! Helpers for extraction output: span classification, table-of-contents
//! section assignment and character offsets.
//!
//! The extractor itself (PDF parsing) lives outside this workspace; it hands
//! over an [`ExtractedDocument`] as JSON, either with ready-made blocks or with
//! raw styled spans that are classified here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{BlockType, BoundingBox, TextBlock};

const BOLD_FLAG: u32 = 8;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TocEntry {
    #[serde(default)]
    pub level: u32,
    pub title: String,
    pub page: u32,
}

/// A styled text run as reported by a PDF library.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawSpan {
    pub text: String,
    pub page_number: u32,
    #[serde(default)]
    pub bbox: Option<BoundingBox>,
    #[serde(default)]
    pub font_size: f32,
    #[serde(default)]
    pub font_name: String,
    #[serde(default)]
    pub flags: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedDocument {
    #[serde(default)]
    pub title: Option<String>,
    /// Name of the PDF the extraction came from.
    #[serde(default)]
    pub source_file: Option<String>,
    #[serde(default)]
    pub toc: Vec<TocEntry>,
    #[serde(default)]
    pub blocks: Vec<TextBlock>,
    #[serde(default)]
    pub spans: Vec<RawSpan>,
}

impl ExtractedDocument {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Operation(format!("invalid extraction output: {e}")))
    }

    /// Blocks in reading order with sections and offsets resolved. Raw spans
    /// are used only when the document carries no blocks.
    pub fn into_blocks(self) -> Vec<TextBlock> {
        let mut blocks = if self.blocks.is_empty() {
            self.spans.into_iter().filter_map(block_from_span).collect()
        } else {
            self.blocks
        };
        assign_sections(&mut blocks, &self.toc);
        assign_offsets(&mut blocks);
        blocks
    }
}

/// Layout role from font metrics: large or large-and-bold text is a heading,
/// tiny text a caption, italic/variant fonts emphasis.
pub fn classify_span(font_size: f32, font_name: &str, flags: u32) -> BlockType {
    let font = font_name.to_lowercase();
    let is_bold = font.contains("bold") || font.contains("black") || flags & BOLD_FLAG != 0;

    if font_size >= 16.0 || (font_size >= 14.0 && is_bold) {
        BlockType::Heading
    } else if font_size <= 8.0 {
        BlockType::Caption
    } else if font.contains('-') || font.contains("italic") {
        BlockType::Emphasis
    } else {
        BlockType::Text
    }
}

fn block_from_span(span: RawSpan) -> Option<TextBlock> {
    let text = span.text.trim();
    if text.is_empty() {
        return None;
    }
    let mut block = TextBlock::new(text, span.page_number, classify_span(span.font_size, &span.font_name, span.flags));
    block.bbox = span.bbox;
    Some(block)
}

/// Gives every block without a section the title of the most recent TOC
/// entry whose target page is not after the block's page. A later entry
/// for the same page wins.
pub fn assign_sections(blocks: &mut [TextBlock], toc: &[TocEntry]) {
    if toc.is_empty() {
        return;
    }
    let by_page: BTreeMap<u32, &str> = toc.iter().map(|e| (e.page, e.title.as_str())).collect();
    for block in blocks.iter_mut().filter(|b| b.section.is_none()) {
        block.section = by_page.range(..=block.page_number).next_back().map(|(_, title)| (*title).to_string());
    }
}

/// Fills cumulative character offsets when the extractor supplied none.
pub fn assign_offsets(blocks: &mut [TextBlock]) {
    if blocks.iter().any(|b| b.start_char != 0 || b.end_char != 0) && !offsets_look_default(blocks) {
        return;
    }
    let mut cursor = 0usize;
    for block in blocks.iter_mut() {
        let len = block.text.chars().count();
        block.start_char = cursor;
        block.end_char = cursor + len;
        cursor = block.end_char;
    }
}

/// `TextBlock::new` sets `0..len` on every block; treat that as "no offsets".
fn offsets_look_default(blocks: &[TextBlock]) -> bool {
    blocks.len() > 1 && blocks.iter().all(|b| b.start_char == 0)
}
