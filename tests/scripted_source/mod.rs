use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use ytcomments::{CommentPage, CommentSource, RawComment, SourceError, VideoId, VideoMetadata};

#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Metadata(String),
    Page {
        video: String,
        page_size: u32,
        cursor: Option<String>,
    },
}

/// In-memory [`CommentSource`] answering from a fixed script and recording
/// every call it receives.
#[derive(Default)]
pub struct ScriptedSource {
    videos: HashMap<String, Result<VideoMetadata, SourceError>>,
    pages: HashMap<(String, Option<String>), Result<CommentPage, SourceError>>,
    hang_on_page_call: Option<(usize, CancellationToken)>,
    calls: Mutex<Vec<(Call, Instant)>>,
}

#[allow(dead_code)]
impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn video(mut self, id: &str, title: &str) -> Self {
        self.videos.insert(
            id.to_owned(),
            Ok(VideoMetadata {
                title: title.to_owned(),
                channel_title: None,
                comment_count: None,
            }),
        );
        self
    }

    pub fn video_details(mut self, id: &str, metadata: VideoMetadata) -> Self {
        self.videos.insert(id.to_owned(), Ok(metadata));
        self
    }

    pub fn video_error(mut self, id: &str, err: SourceError) -> Self {
        self.videos.insert(id.to_owned(), Err(err));
        self
    }

    pub fn page(
        mut self,
        id: &str,
        cursor: Option<&str>,
        comments: Vec<RawComment>,
        next_cursor: Option<&str>,
    ) -> Self {
        self.pages.insert(
            (id.to_owned(), cursor.map(str::to_owned)),
            Ok(CommentPage {
                comments,
                next_cursor: next_cursor.map(str::to_owned),
            }),
        );
        self
    }

    pub fn page_error(mut self, id: &str, cursor: Option<&str>, err: SourceError) -> Self {
        self.pages
            .insert((id.to_owned(), cursor.map(str::to_owned)), Err(err));
        self
    }

    /// The `n`th page request (1-based) cancels `token` and never completes.
    pub fn cancel_and_hang_on_page_call(mut self, n: usize, token: CancellationToken) -> Self {
        self.hang_on_page_call = Some((n, token));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.timed_calls().into_iter().map(|(call, _)| call).collect()
    }

    /// Every call with the (tokio) instant it was received.
    pub fn timed_calls(&self) -> Vec<(Call, Instant)> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) -> usize {
        let mut calls = self.calls.lock().unwrap();
        calls.push((call, Instant::now()));
        calls
            .iter()
            .filter(|(call, _)| matches!(call, Call::Page { .. }))
            .count()
    }

    pub fn page_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, Call::Page { .. }))
            .collect()
    }
}

#[async_trait]
impl CommentSource for ScriptedSource {
    async fn video_metadata(&self, id: &VideoId) -> Result<VideoMetadata, SourceError> {
        self.record(Call::Metadata(id.as_str().to_owned()));
        self.videos
            .get(id.as_str())
            .cloned()
            .unwrap_or(Err(SourceError::NotFound))
    }

    async fn comments_page(
        &self,
        id: &VideoId,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<CommentPage, SourceError> {
        let call_number = self.record(Call::Page {
            video: id.as_str().to_owned(),
            page_size,
            cursor: cursor.map(str::to_owned),
        });

        if let Some((n, token)) = &self.hang_on_page_call
            && *n == call_number
        {
            token.cancel();
            std::future::pending::<()>().await;
        }

        self.pages
            .get(&(id.as_str().to_owned(), cursor.map(str::to_owned)))
            .cloned()
            .unwrap_or_else(|| Err(SourceError::Other(format!("unscripted page for {id}"))))
    }
}

pub fn comment(id: &str, text: &str, published_at: &str) -> RawComment {
    RawComment {
        thread_id: id.to_owned(),
        author: format!("author-{id}"),
        text: text.to_owned(),
        published_at: published_at.to_owned(),
        like_count: 1,
    }
}

#[allow(dead_code)]
pub fn ids(comments: &[ytcomments::CommentRecord]) -> Vec<String> {
    comments.iter().map(|c| c.id.clone()).collect()
}
