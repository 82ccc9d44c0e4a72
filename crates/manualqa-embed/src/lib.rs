//! Text embedders: an XLM-RoBERTa (BGE-M3) model run with candle, and a
//! hash-based stand-in selected by configuration or `APP_USE_FAKE_EMBEDDINGS`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, ensure, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use manualqa_core::config::{expand_path, EmbeddingConfig};
use manualqa_core::traits::Embedder;

mod device;
mod fake;
mod pool;
mod tokenize;

pub use device::select_device;
pub use fake::HashEmbedder;
pub use pool::masked_mean_l2;
pub use tokenize::tokenize_batch;

const SLOW_BATCH_MS: u128 = 500;

pub struct EmbeddingModel {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
    batch_size: usize,
    query_prefix: String,
}

impl EmbeddingModel {
    /// Loads `tokenizer.json`, `config.json` and `pytorch_model.bin` from `model_dir`.
    pub fn load(model_dir: &Path, config: &EmbeddingConfig) -> Result<Self> {
        let device = select_device();
        info!(dir = %model_dir.display(), "loading embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;

        let model_config: XLMRobertaConfig =
            serde_json::from_str(&std::fs::read_to_string(model_dir.join("config.json"))?)?;

        let weights = candle_core::pickle::read_all(model_dir.join("pytorch_model.bin"))?;
        let weights: HashMap<String, Tensor> = weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = XLMRobertaModel::new(&model_config, vb)?;
        info!(dim = config.dimension, max_len = config.max_len, "embedding model loaded");

        Ok(Self {
            model,
            tokenizer,
            device,
            dim: config.dimension,
            max_len: config.max_len,
            batch_size: config.batch_size,
            query_prefix: config.query_prefix.clone(),
        })
    }

    fn forward(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize_batch(&self.tokenizer, texts, self.max_len, &self.device)?;
        let token_type_ids = Tensor::zeros((texts.len(), self.max_len), DType::I64, &self.device)?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let vectors: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_vec2()?;
        ensure!(
            vectors.iter().all(|v| v.len() == self.dim),
            "model produced vectors of unexpected dimension (expected {})",
            self.dim
        );

        let elapsed = start.elapsed().as_millis();
        if elapsed > SLOW_BATCH_MS {
            warn!(batch = texts.len(), elapsed_ms = elapsed as u64, "slow embedding batch");
        } else {
            debug!(batch = texts.len(), elapsed_ms = elapsed as u64, "embedded batch");
        }
        Ok(vectors)
    }
}

impl Embedder for EmbeddingModel {
    fn dim(&self) -> usize {
        self.dim
    }

    fn max_len(&self) -> usize {
        self.max_len
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        embed_in_batches(texts, self.batch_size, |batch| self.forward(batch))
    }

    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.forward(&[format!("{}{}", self.query_prefix, text)])?
            .pop()
            .ok_or_else(|| anyhow!("embedder returned no vector for the query"))
    }
}

/// Runs `embed` over consecutive slices of at most `batch_size` texts and
/// concatenates the results in input order.
pub fn embed_in_batches<F>(texts: &[String], batch_size: usize, mut embed: F) -> Result<Vec<Vec<f32>>>
where
    F: FnMut(&[String]) -> Result<Vec<Vec<f32>>>,
{
    let mut vectors = Vec::with_capacity(texts.len());
    for batch in texts.chunks(batch_size.max(1)) {
        let embedded = embed(batch)?;
        ensure!(
            embedded.len() == batch.len(),
            "embedder returned {} vectors for a batch of {}",
            embedded.len(),
            batch.len()
        );
        vectors.extend(embedded);
    }
    Ok(vectors)
}

fn fake_requested_by_env() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Embedder selected by configuration: the hash embedder when `use_fake` is
/// set (or `APP_USE_FAKE_EMBEDDINGS=1`), otherwise the model from `model_dir`.
pub fn get_default_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    if config.use_fake || fake_requested_by_env() {
        info!(dim = config.dimension, "using hash embedder");
        return Ok(Arc::new(HashEmbedder::new(config.dimension).with_query_prefix(config.query_prefix.clone())));
    }
    let model_dir = resolve_model_dir(config.model_dir.as_deref())?;
    Ok(Arc::new(EmbeddingModel::load(&model_dir, config)?))
}

fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    let candidates = configured
        .map(expand_path)
        .into_iter()
        .chain(std::env::var("MODEL_DIR").ok().map(PathBuf::from))
        .chain([PathBuf::from("../models/bge-m3"), PathBuf::from("models/bge-m3")]);
    for dir in candidates {
        if dir.exists() {
            return Ok(dir);
        }
        debug!(dir = %dir.display(), "model dir not found");
    }
    Err(anyhow!("could not locate the BGE-M3 model directory; set embedding.model_dir"))
}
