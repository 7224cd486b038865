// External collaborators consumed by the pipeline.
//
// Each upstream is a trait so the pipeline can be driven by the HTTP clients
// in production and by in-memory fakes in tests.

pub mod sleeper;
pub mod youtube;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::model::{StatTable, VideoSummary};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Failure talking to an upstream. "Not found" is never an error; sources
/// report it through `Option`/[`TranscriptOutcome`] instead.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request to {url} failed: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("unexpected payload from {url}: {message}")]
    Payload { url: String, message: String },

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("failed to build HTTP client: {0}")]
    Client(reqwest::Error),
}

/// Build the shared HTTP client used by every upstream, with a per-request
/// timeout.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, SourceError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(SourceError::Client)
}

// ---------------------------------------------------------------------------
// Fantasy stats provider
// ---------------------------------------------------------------------------

/// Player directory, weekly projections, and weekly actual stats.
#[async_trait]
pub trait FantasyDataSource: Send + Sync {
    /// The whole player directory as a raw JSON object keyed by player id.
    async fn players(&self) -> Result<Value, SourceError>;

    /// Projection table for a week; `None` when the upstream has no data.
    async fn projections(&self, season: u32, week: u32) -> Result<Option<StatTable>, SourceError>;

    /// Actual stat table for a week; `None` when the upstream has no data.
    async fn stats(&self, season: u32, week: u32) -> Result<Option<StatTable>, SourceError>;
}

// ---------------------------------------------------------------------------
// Video platform
// ---------------------------------------------------------------------------

/// Result ordering requested from the video search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOrder {
    Date,
    Relevance,
}

impl SearchOrder {
    pub fn as_param(&self) -> &'static str {
        match self {
            SearchOrder::Date => "date",
            SearchOrder::Relevance => "relevance",
        }
    }
}

/// A video search request.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoQuery {
    pub text: String,
    /// Restrict the search to one channel.
    pub channel_id: Option<String>,
    pub published_after: DateTime<Utc>,
    pub max_results: u32,
    pub order: SearchOrder,
}

/// A search hit as returned by the platform, before curation is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoHit {
    pub video_id: String,
    pub title: String,
    pub channel_title: String,
    pub published_at: DateTime<Utc>,
}

impl VideoHit {
    /// Attach the display channel name and curation marker.
    pub fn into_summary(self, channel_name: String, is_curated: bool) -> VideoSummary {
        VideoSummary {
            url: VideoSummary::watch_url(&self.video_id),
            video_id: self.video_id,
            title: self.title,
            channel_name,
            published_at: self.published_at,
            is_curated,
        }
    }
}

#[async_trait]
pub trait VideoPlatform: Send + Sync {
    /// Whether the platform can be queried at all (e.g. an API key is set).
    fn is_enabled(&self) -> bool {
        true
    }

    /// Resolve a channel handle to a stable channel id.
    async fn resolve_channel(&self, handle: &str) -> Result<Option<String>, SourceError>;

    async fn search(&self, query: &VideoQuery) -> Result<Vec<VideoHit>, SourceError>;
}

/// Result of a transcript fetch. Both unavailable variants are expected,
/// non-fatal conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptOutcome {
    Text(String),
    /// The uploader disabled captions.
    Disabled,
    /// No transcript exists for the video.
    NotFound,
}

#[async_trait]
pub trait TranscriptSource: Send + Sync {
    async fn transcript(&self, video_id: &str) -> Result<TranscriptOutcome, SourceError>;
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------

/// Minimal HTTP/1.1 responder for exercising the clients against a real
/// socket.
#[cfg(test)]
pub(crate) mod test_server {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Build a complete response with a JSON body.
    pub fn json_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    /// Serve `responses` to consecutive connections, in order. Returns the
    /// base URL and a handle resolving to the request heads that were read.
    pub async fn serve(responses: Vec<String>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let mut heads = Vec::new();
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = vec![0u8; 8192];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let head = String::from_utf8_lossy(&buf[..n]);
                heads.push(head.lines().next().unwrap_or_default().to_string());
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.flush().await.unwrap();
            }
            heads
        });

        (format!("http://{addr}"), handle)
    }
}
