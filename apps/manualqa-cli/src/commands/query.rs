use std::path::Path;

use anyhow::{Context as _, Result};

use manualqa_core::types::{ChatAnswer, ChatMessage};

use crate::cli::{AskArgs, SearchArgs};
use crate::commands::Context;

const PREVIEW_CHARS: usize = 160;

pub async fn ask(ctx: &Context, args: AskArgs) -> Result<()> {
    let history = load_history(args.history.as_deref())?;
    let pipeline = ctx.pipeline().await?;
    let answer =
        pipeline.process_query(&args.question, args.category.as_deref(), &history, !args.no_memory).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
    } else {
        print_answer(&answer);
    }
    Ok(())
}

/// Conversation history from a JSON file; none when no file is given.
pub fn load_history(path: Option<&Path>) -> Result<Vec<ChatMessage>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not a JSON array of chat messages", path.display()))
}

fn print_answer(answer: &ChatAnswer) {
    println!("{}\n", answer.answer);
    if !answer.citations.is_empty() {
        println!("Citations:");
        for c in &answer.citations {
            let section = c.section.as_deref().map(|s| format!(" - {s}")).unwrap_or_default();
            println!("  [{}] {}, Page {}{}", c.number, c.manual_name, c.page_number, section);
        }
    }
    println!("Sources used: {}  confidence={:.2}", answer.sources.len(), answer.confidence);
}

pub async fn search(ctx: &Context, args: SearchArgs) -> Result<()> {
    let pipeline = ctx.pipeline().await?;
    let results = pipeline.search_documents(&args.query, args.category.as_deref(), args.limit).await?;

    println!("Found {} results for: \"{}\"", results.len(), args.query);
    for (i, r) in results.iter().enumerate() {
        let preview: String = r.text.chars().take(PREVIEW_CHARS).collect();
        println!(
            "\n  {}. similarity={:.4}  {}  page={}  category={}",
            i + 1,
            r.similarity,
            r.metadata.manual_name,
            r.metadata.page_number,
            r.metadata.category
        );
        println!("     {}", preview);
    }
    Ok(())
}

pub async fn categories(ctx: &Context) -> Result<()> {
    let pipeline = ctx.pipeline().await?;
    let report = pipeline.health().await;
    if let Some(error) = &report.error {
        anyhow::bail!("vector store unhealthy: {error}");
    }
    for partition in &report.partitions {
        println!("{partition}");
    }
    println!("{} categories (checked {})", report.partitions.len(), report.checked_at);
    Ok(())
}
