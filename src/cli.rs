use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::export::SortOrder;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Extract(ExtractArgs),
    Resolve(ResolveArgs),
}

#[derive(Debug, Args)]
pub struct ExtractArgs {
    /// Video URL or identifier (repeatable).
    #[arg(long = "video")]
    pub videos: Vec<String>,

    /// File with one video reference per line (`#` starts a comment).
    #[arg(long)]
    pub videos_file: Option<String>,

    /// Earliest publication date to keep (YYYY-MM-DD, inclusive).
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Latest publication date to keep (YYYY-MM-DD, inclusive).
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Keyword expression, e.g. `tutorial AND NOT boring, great`.
    #[arg(long)]
    pub keywords: Option<String>,

    /// Output file path for `comments.jsonl`.
    #[arg(long)]
    pub out: String,

    /// Overwrite `--out` if it exists.
    #[arg(long)]
    pub force: bool,

    /// Order of the written comments.
    #[arg(long, value_enum, default_value_t = SortOrder::FirstSeen)]
    pub sort: SortOrder,

    /// Comment threads per request (1-100).
    #[arg(long, default_value_t = 100)]
    pub page_size: u32,

    /// Maximum pages fetched per video.
    #[arg(long, default_value_t = 10)]
    pub max_pages: u32,

    /// Delay before each follow-up page request.
    #[arg(long, default_value_t = 200)]
    pub page_delay_ms: u64,

    /// Delay between videos.
    #[arg(long, default_value_t = 500)]
    pub video_delay_ms: u64,

    /// API base URL (default: `YTCOMMENTS_API_BASE_URL` or the public YouTube API).
    #[arg(long)]
    pub api_base_url: Option<String>,

    /// Cache video metadata for this many seconds (0 disables).
    #[arg(long, default_value_t = 0)]
    pub metadata_ttl_secs: u64,
}

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Video URLs or identifiers.
    #[arg(required = true)]
    pub references: Vec<String>,
}
