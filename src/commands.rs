use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use tokio_util::sync::CancellationToken;

use crate::cache::CachedSource;
use crate::cli::{ExtractArgs, ResolveArgs};
use crate::export::{sort_comments, write_jsonl};
use crate::extract::{CommentRecord, ExtractionConfig, ExtractionFilters, Extractor};
use crate::source::CommentSource;
use crate::video_id::VideoId;
use crate::youtube::{YoutubeApiConfig, YoutubeApiSource};

pub async fn extract(args: ExtractArgs) -> anyhow::Result<()> {
    let out_path = PathBuf::from(&args.out);
    if out_path.exists() && !args.force {
        anyhow::bail!("output already exists (use --force): {}", out_path.display());
    }
    if let (Some(from), Some(to)) = (args.from, args.to)
        && from > to
    {
        anyhow::bail!("--from ({from}) must not be after --to ({to})");
    }

    let mut references = args.videos.clone();
    if let Some(path) = args.videos_file.as_deref() {
        references.extend(read_references_file(Path::new(path))?);
    }
    if references.is_empty() {
        anyhow::bail!("no video references given (use --video or --videos-file)");
    }

    let mut api_config = YoutubeApiConfig::from_env().context("load youtube api config")?;
    if let Some(base_url) = args.api_base_url.as_deref() {
        api_config.base_url = base_url.to_owned();
    }
    tracing::debug!(
        base_url = %api_config.base_url,
        api_key = api_config.api_key.is_some(),
        "youtube api config"
    );
    let api = YoutubeApiSource::new(api_config).context("build youtube api source")?;
    let source: Arc<dyn CommentSource> = if args.metadata_ttl_secs > 0 {
        Arc::new(CachedSource::new(
            api,
            Duration::from_secs(args.metadata_ttl_secs),
        ))
    } else {
        Arc::new(api)
    };

    let config = ExtractionConfig {
        page_size: args.page_size,
        max_pages: args.max_pages,
        page_delay: Duration::from_millis(args.page_delay_ms),
        video_delay: Duration::from_millis(args.video_delay_ms),
    };
    let filters = ExtractionFilters {
        references,
        start_date: args.from,
        end_date: args.to,
        keywords: args.keywords.clone().filter(|k| !k.trim().is_empty()),
    };

    tracing::info!(
        videos = filters.references.len(),
        from = ?filters.start_date,
        to = ?filters.end_date,
        keywords = ?filters.keywords,
        "extract"
    );

    let cancel = CancellationToken::new();
    let interrupt = cancel_on_ctrl_c(cancel.clone());

    let mut snapshot: Vec<CommentRecord> = Vec::new();
    let on_progress = |comments: &[CommentRecord]| {
        tracing::info!(
            comments = comments.len(),
            added = comments.len() - snapshot.len(),
            "progress"
        );
        // Snapshots only ever grow by appending.
        snapshot.extend_from_slice(&comments[snapshot.len()..]);
    };

    let result = Extractor::new(source, config)
        .run(&filters, on_progress, &cancel)
        .await;
    interrupt.abort();

    match result {
        Ok(outcome) => {
            let mut comments = outcome.comments;
            sort_comments(&mut comments, args.sort);
            write_jsonl(&out_path, &comments, args.force).context("write comments")?;
            Ok(())
        }
        Err(aborted) => {
            sort_comments(&mut snapshot, args.sort);
            write_jsonl(&out_path, &snapshot, args.force).context("write partial comments")?;
            Err(anyhow::Error::new(aborted).context(format!(
                "partial results ({} comments) written to {}",
                snapshot.len(),
                out_path.display()
            )))
        }
    }
}

pub fn resolve(args: ResolveArgs) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut invalid = 0_usize;

    for reference in &args.references {
        match VideoId::resolve(reference) {
            Some(id) => writeln!(out, "{id}").context("write stdout")?,
            None => {
                eprintln!("invalid: {reference}");
                invalid += 1;
            }
        }
    }

    if invalid > 0 {
        anyhow::bail!("{invalid} invalid video reference(s)");
    }
    Ok(())
}

fn read_references_file(path: &Path) -> anyhow::Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("read videos file: {}", path.display()))?;
    Ok(parse_references(&contents))
}

fn parse_references(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect()
}

fn cancel_on_ctrl_c(cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; cancelling extraction");
            cancel.cancel();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::parse_references;

    #[test]
    fn references_file_skips_blank_lines_and_comments() {
        let contents = "\n# launch videos\nhttps://youtu.be/dQw4w9WgXcQ\n\n  9bZkp7q19f0  \n#tail\n";
        assert_eq!(
            parse_references(contents),
            vec!["https://youtu.be/dQw4w9WgXcQ", "9bZkp7q19f0"]
        );
    }
}
