use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use walkdir::WalkDir;

use manualqa_core::chunker::short_hash;
use manualqa_core::extract::ExtractedDocument;
use manualqa_core::types::ManualInfo;

use crate::cli::IngestArgs;
use crate::commands::Context;

const DEFAULT_CATEGORY: &str = "general";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Extraction,
    PlainText,
}

pub fn source_kind(path: &Path) -> Option<SourceKind> {
    match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("json") => Some(SourceKind::Extraction),
        Some("txt") => Some(SourceKind::PlainText),
        _ => None,
    }
}

/// Category from the file's parent directory relative to `root`; nested
/// directories are joined with `_`. Files directly under `root` fall into
/// the default category.
pub fn category_for(root: &Path, path: &Path) -> String {
    let parent = path.parent().and_then(|p| p.strip_prefix(root).ok());
    let joined = parent
        .map(|p| {
            p.components()
                .filter_map(|c| c.as_os_str().to_str())
                .collect::<Vec<_>>()
                .join("_")
        })
        .unwrap_or_default();
    let sanitized: String = joined
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c.to_ascii_lowercase() } else { '_' })
        .collect();
    if sanitized.is_empty() {
        DEFAULT_CATEGORY.to_string()
    } else {
        sanitized
    }
}

pub fn collect_sources(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && source_kind(e.path()).is_some())
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

pub async fn run(ctx: &Context, args: IngestArgs) -> Result<()> {
    let root = args.dir.unwrap_or_else(|| ctx.resolve(&ctx.config.data.manuals_dir));
    let chunk_size = args.chunk_size.unwrap_or(ctx.config.chunking.chunk_size);
    let overlap = args.overlap.unwrap_or(ctx.config.chunking.chunk_overlap);
    if chunk_size == 0 || overlap >= chunk_size {
        anyhow::bail!("overlap ({overlap}) must be smaller than a positive chunk size ({chunk_size})");
    }

    let files = collect_sources(&root);
    if files.is_empty() {
        warn!(dir = %root.display(), "no .json or .txt files to ingest");
        return Ok(());
    }
    info!(dir = %root.display(), files = files.len(), chunk_size, overlap, "ingesting");
    let pipeline = ctx.pipeline().await?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg}")?
            .progress_chars("#>-"),
    );

    let mut total_chunks = 0usize;
    for path in &files {
        let relative = path.strip_prefix(&root).unwrap_or(path).to_string_lossy().to_string();
        pb.set_message(relative.clone());
        let category = args.category.clone().unwrap_or_else(|| category_for(&root, path));
        let contents = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        let file_name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_else(|| relative.clone());

        let chunks = match source_kind(path) {
            Some(SourceKind::Extraction) => {
                let document = ExtractedDocument::from_json(&contents)?;
                let manual = ManualInfo {
                    id: short_hash(&relative),
                    filename: document.source_file.clone().unwrap_or(file_name),
                    title: document.title.clone(),
                    category,
                };
                pipeline.ingest(&manual, &document.into_blocks(), chunk_size, overlap).await?
            }
            Some(SourceKind::PlainText) => {
                let manual = ManualInfo { id: short_hash(&relative), filename: file_name, title: None, category };
                pipeline.ingest_text(&manual, &contents, chunk_size).await?
            }
            None => continue,
        };
        total_chunks += chunks.len();
        pb.inc(1);
    }
    pb.finish_with_message("done");

    println!("Ingested {} files into {} chunks", files.len(), total_chunks);
    Ok(())
}
