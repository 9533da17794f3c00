use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use url::Url;

pub const VIDEO_ID_LEN: usize = 11;

/// Canonical 11-character YouTube video identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct VideoId(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a YouTube video reference: {0:?}")]
pub struct InvalidVideoRef(pub String);

impl VideoId {
    /// Resolves a watch URL, short link, embed URL or bare identifier.
    ///
    /// URL patterns are tried first; when one matches structurally its
    /// identifier slot decides the outcome. Only input that matches no URL
    /// pattern is validated as a bare identifier.
    pub fn resolve(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        if let Some(url) = parse_reference_url(trimmed)
            && let Some(candidate) = id_from_url(&url)
        {
            return Self::from_canonical(&candidate);
        }

        Self::from_canonical(trimmed)
    }

    pub fn from_canonical(candidate: &str) -> Option<Self> {
        is_canonical(candidate).then(|| Self(candidate.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for VideoId {
    type Err = InvalidVideoRef;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::resolve(s).ok_or_else(|| InvalidVideoRef(s.to_owned()))
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn is_canonical(candidate: &str) -> bool {
    candidate.len() == VIDEO_ID_LEN
        && candidate
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn parse_reference_url(input: &str) -> Option<Url> {
    let url = if input.contains("://") {
        Url::parse(input).ok()?
    } else if input.contains('/') {
        // `youtu.be/ID`, `www.youtube.com/watch?v=ID` pasted without a scheme.
        Url::parse(&format!("https://{input}")).ok()?
    } else {
        return None;
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    Some(url)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Host {
    YouTube,
    NoCookie,
    ShortLink,
}

fn classify_host(url: &Url) -> Option<Host> {
    let host = url.host_str()?.to_ascii_lowercase();
    let host = host
        .strip_prefix("www.")
        .or_else(|| host.strip_prefix("m."))
        .or_else(|| host.strip_prefix("music."))
        .unwrap_or(host.as_str());

    match host {
        "youtube.com" => Some(Host::YouTube),
        "youtube-nocookie.com" => Some(Host::NoCookie),
        "youtu.be" => Some(Host::ShortLink),
        _ => None,
    }
}

/// Returns the identifier slot of the first URL pattern that matches, in
/// priority order: watch page, short link, embed, then the remaining path
/// forms (`/v/`, `/shorts/`, `/live/`).
fn id_from_url(url: &Url) -> Option<String> {
    let host = classify_host(url)?;
    let segments = url
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect::<Vec<_>>())
        .unwrap_or_default();

    if host == Host::YouTube && segments.as_slice() == ["watch"] {
        return url
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned());
    }

    if host == Host::ShortLink {
        return segments.first().map(|s| (*s).to_owned());
    }

    if matches!(host, Host::YouTube | Host::NoCookie) && segments.first() == Some(&"embed") {
        return segments.get(1).map(|s| (*s).to_owned());
    }

    if host == Host::YouTube
        && let Some(kind) = segments.first()
        && matches!(*kind, "v" | "shorts" | "live")
    {
        return segments.get(1).map(|s| (*s).to_owned());
    }

    None
}
