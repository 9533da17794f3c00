use std::fs::OpenOptions;
use std::io::{BufWriter, Write as _};
use std::path::Path;

use anyhow::Context as _;

use crate::extract::CommentRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum SortOrder {
    /// Order in which comments were first seen during extraction.
    #[default]
    FirstSeen,
    Newest,
    Oldest,
    MostLiked,
}

pub fn sort_comments(comments: &mut [CommentRecord], order: SortOrder) {
    match order {
        SortOrder::FirstSeen => {}
        SortOrder::Newest => comments.sort_by(|a, b| b.published_at.cmp(&a.published_at)),
        SortOrder::Oldest => comments.sort_by(|a, b| a.published_at.cmp(&b.published_at)),
        SortOrder::MostLiked => comments.sort_by(|a, b| b.like_count.cmp(&a.like_count)),
    }
}

/// Writes one JSON object per line. Refuses to replace an existing file
/// unless `force` is set.
pub fn write_jsonl(path: &Path, comments: &[CommentRecord], force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("output already exists (use --force): {}", path.display());
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir: {}", parent.display()))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)
        .with_context(|| format!("create output: {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for comment in comments {
        serde_json::to_writer(&mut out, comment).context("serialize comment record")?;
        out.write_all(b"\n").context("write comment newline")?;
    }
    out.flush().context("flush output")?;

    tracing::info!(path = %path.display(), comments = comments.len(), "wrote comments");
    Ok(())
}
