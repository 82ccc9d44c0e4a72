//! Prompt text handed to the answer generator and cleanup of what comes back.

use std::sync::OnceLock;

use regex::Regex;

use manualqa_core::types::ContextChunk;

const PREVIEW_CHARS: usize = 400;

const BASE_INSTRUCTION: &str = "You are a helpful technical documentation assistant for machine manuals.
Your role is to:
1. Provide accurate, factual answers based on the documentation
2. Include specific page numbers and citations
3. Be clear and concise
4. If information is not available, clearly state this";

fn category_focus(category: &str) -> Option<&'static str> {
    match category {
        "machine_operation" => Some(" Focus on operational procedures, controls, and workflows."),
        "maintenance" => Some(" Focus on maintenance schedules, procedures, and troubleshooting."),
        "safety" => Some(" Emphasize safety precautions, warning labels, and operational safety."),
        "troubleshooting" => Some(" Focus on error codes, diagnostic procedures, and solutions."),
        "programming" => Some(" Focus on G-code, machine programming, and code examples."),
        _ => None,
    }
}

/// Base assistant instruction with a focus sentence for known categories.
pub fn system_instruction(category: Option<&str>) -> String {
    let mut instruction = BASE_INSTRUCTION.to_string();
    if let Some(focus) = category.and_then(category_focus) {
        instruction.push_str(focus);
    }
    instruction
}

/// Numbered source list: `[n] {manual}, Page {p} - {section}:` followed by
/// the chunk text, cut at 400 characters.
pub fn build_context(context: &[ContextChunk]) -> String {
    context
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            let meta = &chunk.candidate.metadata;
            let mut header = format!("[{}] {}, Page {}", i + 1, meta.manual_name, meta.page_number);
            if let Some(section) = meta.section.as_deref().filter(|s| !s.is_empty()) {
                header.push_str(" - ");
                header.push_str(section);
            }
            format!("{header}:\n{}", preview(&chunk.candidate.text))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

pub fn citation_prompt(query: &str, context: &[ContextChunk]) -> String {
    format!(
        "Always cite your sources using the numbered reference format [1], [2], etc.

## User Question
{query}

## Relevant Documentation
{documentation}

## Instructions
1. Provide a clear, accurate answer based on the documentation above
2. Cite your sources using numbered references like [1], [2], etc.
3. Reference specific page numbers when available
4. Be concise but thorough
5. If the documentation doesn't contain the answer, say \"This information is not available in the current documentation.\"

## Answer:",
        documentation = build_context(context)
    )
}

struct Cleanup {
    blank_runs: Regex,
    space_before_punct: Regex,
    space_after_bold: Regex,
    space_before_bold: Regex,
}

fn cleanup() -> Option<&'static Cleanup> {
    static CLEANUP: OnceLock<Option<Cleanup>> = OnceLock::new();
    CLEANUP
        .get_or_init(|| {
            Some(Cleanup {
                blank_runs: Regex::new(r"\n{3,}").ok()?,
                space_before_punct: Regex::new(r"\s+([.,;:!?])").ok()?,
                space_after_bold: Regex::new(r"\*\*\s+").ok()?,
                space_before_bold: Regex::new(r"\s+\*\*").ok()?,
            })
        })
        .as_ref()
}

/// Collapses blank-line runs, removes whitespace before punctuation and
/// around `**` markers, trims.
pub fn clean_answer(answer: &str) -> String {
    let Some(c) = cleanup() else {
        return answer.trim().to_string();
    };
    let text = c.blank_runs.replace_all(answer, "\n\n");
    let text = c.space_before_punct.replace_all(&text, "$1");
    let text = text.trim();
    let text = c.space_after_bold.replace_all(text, "**");
    c.space_before_bold.replace_all(&text, "**").into_owned()
}
