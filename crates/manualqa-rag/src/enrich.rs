use manualqa_core::config::MemoryConfig;
use manualqa_core::types::{ChatMessage, Role};

/// Turns a raw question plus recent conversation into the search query.
#[derive(Debug, Clone, Copy)]
pub struct QueryEnricher {
    history_window: usize,
    preview_chars: usize,
}

impl Default for QueryEnricher {
    fn default() -> Self {
        Self::new(&MemoryConfig::default())
    }
}

impl QueryEnricher {
    pub fn new(config: &MemoryConfig) -> Self {
        Self { history_window: config.history_window, preview_chars: config.response_preview_chars }
    }

    /// Collapses whitespace in `query`; with memory enabled, appends the last
    /// turns of `history` in chronological order, joined by `" | "`.
    pub fn enrich(&self, query: &str, history: &[ChatMessage], memory_enabled: bool) -> String {
        let cleaned = clean_query(query);
        if !memory_enabled || history.is_empty() {
            return cleaned;
        }

        let recent = &history[history.len().saturating_sub(self.history_window)..];
        let mut parts = vec![cleaned];
        for message in recent {
            match message.role {
                Role::User => parts.push(format!("Previous: {}", message.content)),
                Role::Assistant => parts.push(format!("Response: {}", self.preview(&message.content))),
                Role::System => {}
            }
        }
        parts.join(" | ")
    }

    fn preview(&self, content: &str) -> String {
        if content.chars().count() > self.preview_chars {
            let head: String = content.chars().take(self.preview_chars).collect();
            format!("{head}...")
        } else {
            content.to_string()
        }
    }
}

pub fn clean_query(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ")
}
