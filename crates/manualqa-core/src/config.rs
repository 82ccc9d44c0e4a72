//! Lightweight configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nested keys, e.g. `APP_RETRIEVAL__TOP_K=20`). Every typed
//! setting has a default so a missing file yields a usable configuration.
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from_dir(Path::new("."))
    }

    pub fn load_from_dir(dir: &Path) -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file(dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment })
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Extracts and validates the full typed configuration.
    pub fn app(&self) -> anyhow::Result<AppConfig> {
        let config: AppConfig = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract configuration: {}", e))?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub rerank: RerankPolicy,
    pub confidence: ConfidencePolicy,
    pub memory: MemoryConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunking.chunk_size must be positive".into()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::InvalidConfig("retrieval.top_k must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.retrieval.similarity_threshold) {
            return Err(Error::InvalidConfig("retrieval.similarity_threshold must be within [0, 1]".into()));
        }
        if self.rerank.max_context == 0 {
            return Err(Error::InvalidConfig("rerank.max_context must be positive".into()));
        }
        if !(self.confidence.ceiling > 0.0 && self.confidence.ceiling <= 1.0) {
            return Err(Error::InvalidConfig("confidence.ceiling must be within (0, 1]".into()));
        }
        if self.embedding.batch_size == 0 {
            return Err(Error::InvalidConfig("embedding.batch_size must be positive".into()));
        }
        if self.confidence.top_n == 0 {
            return Err(Error::InvalidConfig("confidence.top_n must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub manuals_dir: String,
    pub lancedb_dir: String,
    /// Vector table names are `{partition_prefix}{category}`.
    pub partition_prefix: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            manuals_dir: "../dev_data/manuals".to_string(),
            lancedb_dir: "../dev_data/indexes/lancedb".to_string(),
            partition_prefix: "manuals_".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in estimated tokens.
    pub chunk_size: usize,
    /// Look-back overlap budget in estimated tokens.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 500, chunk_overlap: 50 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub similarity_threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 10, similarity_threshold: 0.7 }
    }
}

/// Weights and limits of the blended rerank score and context selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankPolicy {
    pub similarity_weight: f32,
    pub keyword_weight: f32,
    pub position_weight: f32,
    /// Bonus of the first candidate; decreases by `position_step` per rank.
    pub position_base: f32,
    pub position_step: f32,
    /// Overlapping words longer than this count as technical terms.
    pub technical_term_len: usize,
    pub technical_term_bonus: f32,
    /// Context admission requires a rerank score strictly above this.
    pub context_floor: f32,
    pub max_context: usize,
}

impl Default for RerankPolicy {
    fn default() -> Self {
        Self {
            similarity_weight: 0.7,
            keyword_weight: 0.2,
            position_weight: 0.1,
            position_base: 0.1,
            position_step: 0.01,
            technical_term_len: 6,
            technical_term_bonus: 0.1,
            context_floor: 0.3,
            max_context: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidencePolicy {
    /// Number of leading context chunks averaged.
    pub top_n: usize,
    pub agreement_min_sources: usize,
    pub agreement_bonus: f32,
    pub similarity_weight: f32,
    pub rerank_weight: f32,
    pub ceiling: f32,
    /// Blend rerank scores in when they are available.
    pub blend_rerank: bool,
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self {
            top_n: 3,
            agreement_min_sources: 3,
            agreement_bonus: 0.1,
            similarity_weight: 0.6,
            rerank_weight: 0.3,
            ceiling: 0.95,
            blend_rerank: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// History entries folded into the search query (3 exchanges).
    pub history_window: usize,
    pub response_preview_chars: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self { history_window: 6, response_preview_chars: 100 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API (`/chat/completions` is appended).
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434/v1".to_string(),
            model: "llama3.1".to_string(),
            temperature: 0.3,
            max_tokens: 2048,
            api_key: None,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model_dir: Option<String>,
    pub use_fake: bool,
    pub dimension: usize,
    pub max_len: usize,
    /// Texts per model forward pass when embedding documents.
    pub batch_size: usize,
    /// Prepended to queries only; documents are embedded as-is.
    pub query_prefix: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_dir: None,
            use_fake: false,
            dimension: 1024,
            max_len: 256,
            batch_size: 32,
            query_prefix: String::new(),
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    // Expand ~ at start
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
