use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "manualqa",
    version,
    about = "Cited question answering over ingested technical manuals"
)]
pub struct Cli {
    /// Directory holding config.toml / config.<env>.toml; relative data paths resolve against it.
    #[arg(long, global = true, default_value = ".")]
    pub config_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chunk, embed and index every extraction output under a directory.
    Ingest(IngestArgs),
    /// Answer a question with citations.
    Ask(AskArgs),
    /// Show the nearest chunks for a query without generating an answer.
    Search(SearchArgs),
    /// List indexed categories and report store health.
    Categories,
}

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Defaults to `data.manuals_dir`.
    pub dir: Option<PathBuf>,

    /// Put every file into this category instead of deriving it from the path.
    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub chunk_size: Option<usize>,

    #[arg(long)]
    pub overlap: Option<usize>,
}

#[derive(Args, Debug)]
pub struct AskArgs {
    pub question: String,

    #[arg(long)]
    pub category: Option<String>,

    /// JSON array of earlier `{"role", "content"}` messages folded into the search query.
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Ignore `--history` when building the search query.
    #[arg(long, default_value_t = false)]
    pub no_memory: bool,

    /// Print the full answer as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    pub query: String,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long, default_value_t = 5)]
    pub limit: usize,
}
