use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::source::{CommentPage, CommentSource, SourceError, VideoMetadata};
use crate::video_id::VideoId;

/// Wraps a [`CommentSource`] and remembers successful metadata lookups for
/// `ttl`. Comment pages and errors pass through uncached.
pub struct CachedSource<S> {
    inner: S,
    ttl: Duration,
    metadata: Mutex<HashMap<VideoId, CachedMetadata>>,
}

struct CachedMetadata {
    fetched_at: Instant,
    value: VideoMetadata,
}

impl<S> CachedSource<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            metadata: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub async fn cached_len(&self) -> usize {
        let now = Instant::now();
        self.metadata
            .lock()
            .await
            .values()
            .filter(|entry| now.duration_since(entry.fetched_at) < self.ttl)
            .count()
    }

    async fn lookup(&self, id: &VideoId) -> Option<VideoMetadata> {
        let mut entries = self.metadata.lock().await;
        let entry = entries.get(id)?;
        if entry.fetched_at.elapsed() < self.ttl {
            return Some(entry.value.clone());
        }
        entries.remove(id);
        None
    }
}

#[async_trait]
impl<S: CommentSource> CommentSource for CachedSource<S> {
    async fn video_metadata(&self, id: &VideoId) -> Result<VideoMetadata, SourceError> {
        if let Some(hit) = self.lookup(id).await {
            tracing::debug!(video_id = %id, "metadata cache hit");
            return Ok(hit);
        }

        let value = self.inner.video_metadata(id).await?;
        self.metadata.lock().await.insert(
            id.clone(),
            CachedMetadata {
                fetched_at: Instant::now(),
                value: value.clone(),
            },
        );
        Ok(value)
    }

    async fn comments_page(
        &self,
        id: &VideoId,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<CommentPage, SourceError> {
        self.inner.comments_page(id, page_size, cursor).await
    }
}
