use std::fmt;
use std::path::PathBuf;

use log::{debug, info, warn};
use serde_json::Value;
use thiserror::Error;

use crate::metadata::MetadataStore;
use crate::release::{Asset, RemoteRelease, filter_and_sort, min_timestamp, parse_timestamp};

/// Where a release list comes from: a GitHub-style releases endpoint or a
/// JSON file on disk with the same shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    Remote(String),
    File(PathBuf),
}

impl FeedSource {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            Self::Remote(raw.to_string())
        } else {
            Self::File(PathBuf::from(raw))
        }
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(url) => write!(f, "{url}"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("release feed request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("release feed returned HTTP {status}{body_snippet}")]
    HttpStatus {
        status: reqwest::StatusCode,
        body_snippet: String,
    },
    #[error("failed to read release feed body: {0}")]
    Body(#[source] reqwest::Error),
    #[error("failed to read release feed file {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse release feed: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("release feed is not a JSON array")]
    NotAnArray,
}

/// Fetches release lists and keeps the metadata store in step with them.
#[derive(Debug, Clone)]
pub struct FeedClient {
    http: reqwest::Client,
    sources: Vec<FeedSource>,
}

impl FeedClient {
    #[must_use]
    pub fn new(http: reqwest::Client, sources: Vec<FeedSource>) -> Self {
        Self { http, sources }
    }

    /// Fetch every source, keep installable releases newest first, and write
    /// them through to `store` as one batch.
    ///
    /// A source that fails contributes nothing; the failure is logged and the
    /// remaining sources still count.
    pub async fn fetch(&self, store: &mut MetadataStore) -> Vec<RemoteRelease> {
        let mut all = Vec::new();
        for source in &self.sources {
            match self.fetch_source(source).await {
                Ok(releases) => {
                    debug!("Fetched {} releases from {source}", releases.len());
                    all.extend(releases);
                }
                Err(error) => warn!("Ignoring release feed {source}: {error}"),
            }
        }

        let releases = filter_and_sort(all);
        store.upsert_all(&releases);
        info!("Release feeds returned {} installable releases", releases.len());
        releases
    }

    /// Serve the same shape as [`FeedClient::fetch`] from the metadata cache,
    /// without any network traffic.
    #[must_use]
    pub fn cached(&self, store: &MetadataStore, include_unstable: bool) -> Vec<RemoteRelease> {
        store.cached_releases(include_unstable)
    }

    async fn fetch_source(&self, source: &FeedSource) -> Result<Vec<RemoteRelease>, FeedError> {
        let body = match source {
            FeedSource::Remote(url) => {
                let response = self
                    .http
                    .get(url)
                    .send()
                    .await
                    .map_err(FeedError::Request)?;
                if !response.status().is_success() {
                    let status = response.status();
                    let body_snippet = response
                        .text()
                        .await
                        .ok()
                        .map(|body| response_snippet(&body, 160))
                        .unwrap_or_default();
                    return Err(FeedError::HttpStatus {
                        status,
                        body_snippet,
                    });
                }
                response.text().await.map_err(FeedError::Body)?
            }
            FeedSource::File(path) => {
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| FeedError::File {
                        path: path.clone(),
                        source,
                    })?
            }
        };

        parse_releases(&body)
    }
}

fn response_snippet(body: &str, max_chars: usize) -> String {
    let snippet: String = body.chars().take(max_chars).collect();
    if snippet.is_empty() {
        String::new()
    } else {
        format!(": {snippet}")
    }
}

/// Parse a feed body. Only the outer shape is strict; every field inside an
/// element degrades to an empty value when missing or malformed.
pub(crate) fn parse_releases(body: &str) -> Result<Vec<RemoteRelease>, FeedError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let value: Value = serde_json::from_str(body).map_err(FeedError::Parse)?;
    let items = value.as_array().ok_or(FeedError::NotAnArray)?;
    Ok(items.iter().map(parse_release).collect())
}

fn parse_release(item: &Value) -> RemoteRelease {
    let assets = item
        .get("assets")
        .and_then(Value::as_array)
        .map(|assets| {
            assets
                .iter()
                .map(|asset| Asset {
                    name: text_field(asset, "name"),
                    download_url: text_field(asset, "browser_download_url"),
                    size: size_field(asset, "size"),
                })
                .collect()
        })
        .unwrap_or_default();

    RemoteRelease {
        tag: text_field(item, "tag_name"),
        name: text_field(item, "name"),
        published_at: parse_timestamp(&text_field(item, "published_at"))
            .unwrap_or_else(min_timestamp),
        prerelease: bool_field(item, "prerelease"),
        draft: bool_field(item, "draft"),
        assets,
    }
}

fn text_field(item: &Value, key: &str) -> String {
    match item.get(key) {
        Some(Value::String(text)) => text.clone(),
        None | Some(Value::Null) => String::new(),
        Some(other) => other.to_string(),
    }
}

fn bool_field(item: &Value, key: &str) -> bool {
    match item.get(key) {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(text)) => text.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn size_field(item: &Value, key: &str) -> u64 {
    match item.get(key) {
        Some(Value::Number(number)) => number.as_u64().unwrap_or(0),
        Some(Value::String(text)) => text.trim().parse().unwrap_or(0),
        _ => 0,
    }
}
