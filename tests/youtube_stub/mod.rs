use std::collections::HashMap;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use serde_json::{Value, json};

#[derive(Debug, Clone)]
pub struct StubComment {
    pub id: &'static str,
    pub author: &'static str,
    pub text: &'static str,
    pub published_at: &'static str,
    pub like_count: u64,
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum StubVideo {
    Available {
        title: &'static str,
        pages: Vec<Vec<StubComment>>,
    },
    /// Metadata resolves but comment threads fail with `status`/`reason`.
    CommentsFail {
        title: &'static str,
        status: u16,
        reason: &'static str,
    },
}

pub struct YoutubeStub {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

#[allow(dead_code)]
impl YoutubeStub {
    pub fn spawn(videos: HashMap<&'static str, StubVideo>) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start youtube stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}/youtube/v3");

        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let raw_url = request.url().to_string();
                seen.lock().unwrap().push(raw_url.clone());

                let url = url::Url::parse(&format!("http://stub{raw_url}")).expect("parse url");
                let query: HashMap<String, String> = url.query_pairs().into_owned().collect();

                let (status, body) = match url.path() {
                    "/youtube/v3/videos" => videos_response(&videos, &query),
                    "/youtube/v3/commentThreads" => threads_response(&videos, &query),
                    _ => (404, error_body(404, "notFound", "no such endpoint")),
                };

                let header =
                    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                        .expect("build header");
                let response = tiny_http::Response::from_string(body.to_string())
                    .with_status_code(status)
                    .with_header(header);
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            requests,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for YoutubeStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn videos_response(
    videos: &HashMap<&'static str, StubVideo>,
    query: &HashMap<String, String>,
) -> (u16, Value) {
    let id = query.get("id").map(String::as_str).unwrap_or_default();
    let Some(video) = videos.get(id) else {
        return (200, json!({ "kind": "youtube#videoListResponse", "items": [] }));
    };

    let (title, comment_count) = match video {
        StubVideo::Available { title, pages } => (*title, pages.iter().map(Vec::len).sum()),
        StubVideo::CommentsFail { title, .. } => (*title, 0_usize),
    };

    (
        200,
        json!({
            "kind": "youtube#videoListResponse",
            "items": [{
                "id": id,
                "snippet": { "title": title, "channelTitle": "Stub Channel" },
                "statistics": { "commentCount": comment_count.to_string() }
            }]
        }),
    )
}

fn threads_response(
    videos: &HashMap<&'static str, StubVideo>,
    query: &HashMap<String, String>,
) -> (u16, Value) {
    let id = query.get("videoId").map(String::as_str).unwrap_or_default();
    let pages = match videos.get(id) {
        None => return (404, error_body(404, "videoNotFound", "video not found")),
        Some(StubVideo::CommentsFail { status, reason, .. }) => {
            return (*status, error_body(*status, reason, "stubbed failure"));
        }
        Some(StubVideo::Available { pages, .. }) => pages,
    };

    let page_index = query
        .get("pageToken")
        .and_then(|token| token.strip_prefix("page-"))
        .and_then(|n| n.parse::<usize>().ok())
        .unwrap_or(0);
    let comments = pages.get(page_index).cloned().unwrap_or_default();

    let items = comments
        .iter()
        .map(|c| {
            json!({
                "kind": "youtube#commentThread",
                "id": c.id,
                "snippet": {
                    "videoId": id,
                    "topLevelComment": {
                        "id": c.id,
                        "snippet": {
                            "authorDisplayName": c.author,
                            "textDisplay": c.text,
                            "textOriginal": c.text,
                            "publishedAt": c.published_at,
                            "likeCount": c.like_count
                        }
                    },
                    "totalReplyCount": 0
                }
            })
        })
        .collect::<Vec<_>>();

    let mut body = json!({ "kind": "youtube#commentThreadListResponse", "items": items });
    if page_index + 1 < pages.len() {
        body["nextPageToken"] = json!(format!("page-{}", page_index + 1));
    }
    (200, body)
}

fn error_body(code: u16, reason: &str, message: &str) -> Value {
    json!({
        "error": {
            "code": code,
            "message": message,
            "errors": [{ "reason": reason, "domain": "youtube.stub", "message": message }]
        }
    })
}

pub fn stub_comment(
    id: &'static str,
    text: &'static str,
    published_at: &'static str,
    like_count: u64,
) -> StubComment {
    StubComment {
        id,
        author: "Stub Author",
        text,
        published_at,
        like_count,
    }
}
