pub mod ingest;
pub mod query;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use tracing::info;

use manualqa_core::config::{resolve_with_base, AppConfig, Config};
use manualqa_embed::get_default_embedder;
use manualqa_rag::{ChatCompletionGenerator, RagPipeline};
use manualqa_vector::LanceVectorIndex;

/// Validated configuration plus the directory relative paths resolve against.
pub struct Context {
    pub config: AppConfig,
    pub base_dir: PathBuf,
}

impl Context {
    pub fn load(config_dir: &Path) -> Result<Self> {
        let config = Config::load_from_dir(config_dir)?.app().context("invalid configuration")?;
        Ok(Self { config, base_dir: config_dir.to_path_buf() })
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        resolve_with_base(&self.base_dir, path)
    }

    pub async fn pipeline(&self) -> Result<RagPipeline> {
        let embedder = get_default_embedder(&self.config.embedding).context("failed to load embedder")?;
        let db_dir = self.resolve(&self.config.data.lancedb_dir);
        std::fs::create_dir_all(&db_dir).with_context(|| format!("failed to create {}", db_dir.display()))?;
        let index = LanceVectorIndex::open(&db_dir.to_string_lossy(), &self.config.data.partition_prefix, embedder.dim())
            .await
            .with_context(|| format!("failed to open vector store at {}", db_dir.display()))?;
        let generator = ChatCompletionGenerator::new(self.config.llm.clone())?;
        info!(store = %db_dir.display(), "pipeline ready");
        Ok(RagPipeline::new(&self.config, embedder, Arc::new(index), Arc::new(generator)))
    }
}
