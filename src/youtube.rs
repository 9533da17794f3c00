use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::source::{CommentPage, CommentSource, RawComment, SourceError, VideoMetadata};
use crate::video_id::VideoId;

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct YoutubeApiConfig {
    pub base_url: String,
    /// Omitted from requests when `None`, for proxies that hold the credential.
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for YoutubeApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl YoutubeApiConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Ok(base_url) = std::env::var("YTCOMMENTS_API_BASE_URL")
            && !base_url.trim().is_empty()
        {
            config.base_url = base_url.trim().to_owned();
        }

        config.api_key = std::env::var("YTCOMMENTS_API_KEY")
            .ok()
            .map(|key| key.trim().to_owned())
            .filter(|key| !key.is_empty());

        if let Ok(raw) = std::env::var("YTCOMMENTS_HTTP_TIMEOUT_SECS") {
            let secs: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("invalid YTCOMMENTS_HTTP_TIMEOUT_SECS={raw:?}"))?;
            config.timeout = Duration::from_secs(secs.max(1));
        }

        Ok(config)
    }

    pub fn endpoint(&self, resource: &str) -> String {
        let base_url = self.base_url.trim_end_matches('/');
        format!("{base_url}/{resource}")
    }
}

/// [`CommentSource`] backed by the YouTube Data API v3 (`videos` and
/// `commentThreads`), or anything that speaks the same JSON.
#[derive(Debug, Clone)]
pub struct YoutubeApiSource {
    client: reqwest::Client,
    config: YoutubeApiConfig,
}

impl YoutubeApiSource {
    pub fn new(config: YoutubeApiConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("build youtube api http client")?;
        Ok(Self { client, config })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        resource: &str,
        query: &[(&str, &str)],
    ) -> Result<T, SourceError> {
        let endpoint = self.config.endpoint(resource);
        let mut request = self
            .client
            .get(&endpoint)
            .header(USER_AGENT, "ytcomments/0.1")
            .header(ACCEPT, "application/json")
            .query(query);
        if let Some(api_key) = self.config.api_key.as_deref() {
            request = request.query(&[("key", api_key)]);
        }

        let response = request
            .send()
            .await
            .map_err(|err| SourceError::Other(format!("GET {endpoint}: {err}")))?;
        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|err| SourceError::Other(format!("read {resource} response body: {err}")))?;

        if !status.is_success() {
            let err = classify_error(status, &raw);
            tracing::debug!(resource, %status, kind = err.kind(), "youtube api error");
            return Err(err);
        }

        serde_json::from_str(&raw)
            .map_err(|err| SourceError::Other(format!("parse {resource} response: {err}")))
    }
}

#[async_trait]
impl CommentSource for YoutubeApiSource {
    async fn video_metadata(&self, id: &VideoId) -> Result<VideoMetadata, SourceError> {
        let response: ListResponse<VideoItem> = self
            .get_json("videos", &[("part", "snippet,statistics"), ("id", id.as_str())])
            .await?;

        let video = response
            .items
            .into_iter()
            .next()
            .ok_or(SourceError::NotFound)?;

        Ok(VideoMetadata {
            title: video.snippet.title,
            channel_title: video.snippet.channel_title,
            comment_count: video
                .statistics
                .and_then(|stats| stats.comment_count)
                .and_then(|count| count.parse().ok()),
        })
    }

    async fn comments_page(
        &self,
        id: &VideoId,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<CommentPage, SourceError> {
        let max_results = page_size.to_string();
        let mut query = vec![
            ("part", "snippet"),
            ("videoId", id.as_str()),
            ("maxResults", max_results.as_str()),
            ("textFormat", "plainText"),
            ("order", "time"),
        ];
        if let Some(cursor) = cursor {
            query.push(("pageToken", cursor));
        }

        let response: ListResponse<CommentThreadItem> =
            self.get_json("commentThreads", &query).await?;

        let comments = response
            .items
            .into_iter()
            .map(|thread| {
                let snippet = thread.snippet.top_level_comment.snippet;
                let text = if snippet.text_display.is_empty() {
                    snippet.text_original.unwrap_or_default()
                } else {
                    snippet.text_display
                };
                RawComment {
                    thread_id: thread.id,
                    author: snippet.author_display_name,
                    text,
                    published_at: snippet.published_at,
                    like_count: snippet.like_count,
                }
            })
            .collect();

        Ok(CommentPage {
            comments,
            next_cursor: response.next_page_token.filter(|token| !token.is_empty()),
        })
    }
}

const RATE_LIMIT_REASONS: &[&str] = &["quotaExceeded", "rateLimitExceeded", "userRateLimitExceeded"];

fn classify_error(status: StatusCode, raw_body: &str) -> SourceError {
    let error = serde_json::from_str::<ApiErrorEnvelope>(raw_body)
        .ok()
        .map(|envelope| envelope.error);
    let has_reason = |wanted: &[&str]| {
        error.as_ref().is_some_and(|error| {
            error
                .errors
                .iter()
                .any(|detail| wanted.contains(&detail.reason.as_str()))
        })
    };

    if has_reason(&["commentsDisabled"]) {
        return SourceError::CommentsDisabled;
    }
    if status == StatusCode::TOO_MANY_REQUESTS || has_reason(RATE_LIMIT_REASONS) {
        return SourceError::RateLimited;
    }
    if status == StatusCode::NOT_FOUND || has_reason(&["videoNotFound"]) {
        return SourceError::NotFound;
    }

    let message = error
        .map(|error| error.message)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| raw_body.trim().to_owned());
    SourceError::Other(format!("YouTube API error ({status}): {message}"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    snippet: VideoSnippet,
    statistics: Option<VideoStatistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
    title: String,
    channel_title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoStatistics {
    // The API encodes counters as decimal strings.
    comment_count: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentThreadItem {
    id: String,
    snippet: CommentThreadSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentThreadSnippet {
    top_level_comment: TopLevelComment,
}

#[derive(Debug, Deserialize)]
struct TopLevelComment {
    snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentSnippet {
    #[serde(default)]
    author_display_name: String,
    #[serde(default)]
    text_display: String,
    text_original: Option<String>,
    published_at: String,
    #[serde(default)]
    like_count: u64,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    reason: String,
}
