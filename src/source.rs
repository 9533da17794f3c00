use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::video_id::VideoId;

/// Largest page the remote API will return.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_count: Option<u64>,
}

/// One top-level comment thread as the platform reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawComment {
    pub thread_id: String,
    pub author: String,
    pub text: String,
    /// RFC 3339 timestamp, unparsed.
    pub published_at: String,
    pub like_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentPage {
    pub comments: Vec<RawComment>,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("video not found")]
    NotFound,
    #[error("comments are disabled for this video")]
    CommentsDisabled,
    #[error("rate limited by the remote service")]
    RateLimited,
    #[error("{0}")]
    Other(String),
}

impl SourceError {
    /// Short label for structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::CommentsDisabled => "comments_disabled",
            Self::RateLimited => "rate_limited",
            Self::Other(_) => "other",
        }
    }
}

/// Read access to video metadata and top-level comment threads.
#[async_trait]
pub trait CommentSource: Send + Sync {
    async fn video_metadata(&self, id: &VideoId) -> Result<VideoMetadata, SourceError>;

    /// Fetches one page of at most `page_size` comment threads. `cursor` is
    /// the `next_cursor` of the previous page, `None` for the first page.
    async fn comments_page(
        &self,
        id: &VideoId,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<CommentPage, SourceError>;
}

#[async_trait]
impl<S: CommentSource + ?Sized> CommentSource for std::sync::Arc<S> {
    async fn video_metadata(&self, id: &VideoId) -> Result<VideoMetadata, SourceError> {
        (**self).video_metadata(id).await
    }

    async fn comments_page(
        &self,
        id: &VideoId,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<CommentPage, SourceError> {
        (**self).comments_page(id, page_size, cursor).await
    }
}
