use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::Instrument as _;

use crate::keywords::KeywordFilter;
use crate::source::{CommentSource, MAX_PAGE_SIZE, RawComment, SourceError};
use crate::video_id::VideoId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: String,
    pub author: String,
    pub text: String,
    /// The reference exactly as the caller supplied it.
    pub source_ref: String,
    pub source_title: String,
    pub published_at: NaiveDate,
    pub like_count: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractionFilters {
    pub references: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub keywords: Option<String>,
}

impl ExtractionFilters {
    /// Inclusive on both ends; an open bound accepts everything on its side.
    pub fn date_in_range(&self, date: NaiveDate) -> bool {
        self.start_date.is_none_or(|start| date >= start)
            && self.end_date.is_none_or(|end| date <= end)
    }
}

#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    pub page_size: u32,
    /// Page ceiling per video.
    pub max_pages: u32,
    pub page_delay: Duration,
    pub video_delay: Duration,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            max_pages: 10,
            page_delay: Duration::from_millis(200),
            video_delay: Duration::from_millis(500),
        }
    }
}

impl ExtractionConfig {
    /// Zero-delay configuration, useful against local or stubbed sources.
    pub fn unpaced() -> Self {
        Self {
            page_delay: Duration::ZERO,
            video_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    fn effective_page_size(&self) -> u32 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    fn effective_max_pages(&self) -> u32 {
        self.max_pages.max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("extraction aborted")]
pub struct ExtractionAborted;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub references: usize,
    pub invalid_references: usize,
    pub unavailable_videos: usize,
    pub comments_disabled: usize,
    pub pages_fetched: usize,
    pub page_failures: usize,
    pub outside_date_range: usize,
    pub keyword_mismatches: usize,
    pub duplicates: usize,
    pub kept: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionOutcome {
    pub comments: Vec<CommentRecord>,
    pub stats: RunStats,
}

/// Day of a platform timestamp, in the timestamp's own offset.
///
/// Falls back to the leading `YYYY-MM-DD` when the value is not full RFC 3339.
pub fn published_date(timestamp: &str) -> Option<NaiveDate> {
    let timestamp = timestamp.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(parsed.date_naive());
    }
    let day = timestamp.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

pub struct Extractor<S> {
    source: S,
    config: ExtractionConfig,
}

impl<S: CommentSource> Extractor<S> {
    pub fn new(source: S, config: ExtractionConfig) -> Self {
        Self { source, config }
    }

    /// Runs one extraction over `filters.references`, in order.
    ///
    /// `on_progress` receives the accumulated comments after every fetched
    /// page. Per-video and per-page failures are logged and skipped; only
    /// cancellation ends the run with an error.
    pub async fn run<F>(
        &self,
        filters: &ExtractionFilters,
        mut on_progress: F,
        cancel: &CancellationToken,
    ) -> Result<ExtractionOutcome, ExtractionAborted>
    where
        F: FnMut(&[CommentRecord]),
    {
        let run_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("extraction", %run_id);

        let mut run = Run::new(filters);
        let result = self
            .run_references(&mut run, &mut on_progress, cancel)
            .instrument(span.clone())
            .await;

        let _entered = span.enter();
        let stats = run.stats;
        match result {
            Ok(()) => {
                tracing::info!(
                    references = stats.references,
                    invalid = stats.invalid_references,
                    unavailable = stats.unavailable_videos + stats.comments_disabled,
                    pages = stats.pages_fetched,
                    page_failures = stats.page_failures,
                    duplicates = stats.duplicates,
                    kept = stats.kept,
                    "extraction completed"
                );
                Ok(ExtractionOutcome {
                    comments: run.comments,
                    stats,
                })
            }
            Err(aborted) => {
                tracing::info!(
                    references = stats.references,
                    kept = stats.kept,
                    "extraction aborted"
                );
                Err(aborted)
            }
        }
    }

    async fn run_references<F>(
        &self,
        run: &mut Run<'_>,
        on_progress: &mut F,
        cancel: &CancellationToken,
    ) -> Result<(), ExtractionAborted>
    where
        F: FnMut(&[CommentRecord]),
    {
        let filters = run.filters;
        let mut contacted_remote = false;

        for reference in &filters.references {
            ensure_not_cancelled(cancel)?;
            run.stats.references += 1;

            let Some(video_id) = VideoId::resolve(reference) else {
                run.stats.invalid_references += 1;
                tracing::warn!(reference = %reference, "skipping invalid video reference");
                continue;
            };

            if contacted_remote {
                pace(self.config.video_delay, cancel).await?;
            }
            contacted_remote = true;

            let metadata = match cancellable(cancel, self.source.video_metadata(&video_id)).await? {
                Ok(metadata) => metadata,
                Err(err) => {
                    match err {
                        SourceError::CommentsDisabled => run.stats.comments_disabled += 1,
                        _ => run.stats.unavailable_videos += 1,
                    }
                    tracing::warn!(
                        reference = %reference,
                        video_id = %video_id,
                        kind = err.kind(),
                        %err,
                        "skipping video: metadata unavailable"
                    );
                    continue;
                }
            };

            tracing::info!(
                video_id = %video_id,
                title = %metadata.title,
                channel = metadata.channel_title.as_deref().unwrap_or("-"),
                expected_comments = ?metadata.comment_count,
                "fetching comments"
            );
            self.collect_video(run, reference, &video_id, &metadata.title, on_progress, cancel)
                .await?;
        }

        Ok(())
    }

    async fn collect_video<F>(
        &self,
        run: &mut Run<'_>,
        reference: &str,
        video_id: &VideoId,
        title: &str,
        on_progress: &mut F,
        cancel: &CancellationToken,
    ) -> Result<(), ExtractionAborted>
    where
        F: FnMut(&[CommentRecord]),
    {
        let page_size = self.config.effective_page_size();
        let max_pages = self.config.effective_max_pages();
        let mut cursor: Option<String> = None;

        for page_index in 0..max_pages {
            if page_index > 0 {
                pace(self.config.page_delay, cancel).await?;
            }
            ensure_not_cancelled(cancel)?;

            let fetched = cancellable(
                cancel,
                self.source
                    .comments_page(video_id, page_size, cursor.as_deref()),
            )
            .await?;
            let page = match fetched {
                Ok(page) => page,
                Err(err) => {
                    run.stats.page_failures += 1;
                    tracing::warn!(
                        video_id = %video_id,
                        page = page_index + 1,
                        kind = err.kind(),
                        %err,
                        "comment page fetch failed; keeping earlier pages"
                    );
                    return Ok(());
                }
            };
            run.stats.pages_fetched += 1;

            let before = run.comments.len();
            for raw in page.comments {
                run.offer(raw, reference, title);
            }
            tracing::debug!(
                video_id = %video_id,
                page = page_index + 1,
                added = run.comments.len() - before,
                total = run.comments.len(),
                "page processed"
            );
            on_progress(&run.comments);

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => return Ok(()),
            }
        }

        tracing::debug!(video_id = %video_id, max_pages, "page ceiling reached");
        Ok(())
    }
}

/// Convenience wrapper returning only the collected comments.
pub async fn extract<S, F>(
    source: S,
    config: ExtractionConfig,
    filters: &ExtractionFilters,
    on_progress: F,
    cancel: &CancellationToken,
) -> Result<Vec<CommentRecord>, ExtractionAborted>
where
    S: CommentSource,
    F: FnMut(&[CommentRecord]),
{
    Extractor::new(source, config)
        .run(filters, on_progress, cancel)
        .await
        .map(|outcome| outcome.comments)
}

/// Accumulator owned by a single run.
struct Run<'a> {
    filters: &'a ExtractionFilters,
    keywords: KeywordFilter,
    comments: Vec<CommentRecord>,
    seen: HashSet<String>,
    stats: RunStats,
}

impl<'a> Run<'a> {
    fn new(filters: &'a ExtractionFilters) -> Self {
        Self {
            filters,
            keywords: KeywordFilter::from_option(filters.keywords.as_deref()),
            comments: Vec::new(),
            seen: HashSet::new(),
            stats: RunStats::default(),
        }
    }

    fn offer(&mut self, raw: RawComment, reference: &str, title: &str) {
        let Some(published_at) = published_date(&raw.published_at) else {
            self.stats.outside_date_range += 1;
            tracing::debug!(
                comment_id = %raw.thread_id,
                published_at = %raw.published_at,
                "unparseable comment timestamp"
            );
            return;
        };
        if !self.filters.date_in_range(published_at) {
            self.stats.outside_date_range += 1;
            return;
        }
        if !self.keywords.matches(&raw.text) {
            self.stats.keyword_mismatches += 1;
            return;
        }
        if !self.seen.insert(raw.thread_id.clone()) {
            self.stats.duplicates += 1;
            return;
        }

        self.stats.kept += 1;
        self.comments.push(CommentRecord {
            id: raw.thread_id,
            author: raw.author,
            text: raw.text,
            source_ref: reference.to_owned(),
            source_title: title.to_owned(),
            published_at,
            like_count: raw.like_count,
        });
    }
}

fn ensure_not_cancelled(cancel: &CancellationToken) -> Result<(), ExtractionAborted> {
    if cancel.is_cancelled() {
        return Err(ExtractionAborted);
    }
    Ok(())
}

async fn pace(delay: Duration, cancel: &CancellationToken) -> Result<(), ExtractionAborted> {
    if delay.is_zero() {
        return ensure_not_cancelled(cancel);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ExtractionAborted),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}

async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = T>,
) -> Result<T, ExtractionAborted> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ExtractionAborted),
        out = fut => Ok(out),
    }
}
