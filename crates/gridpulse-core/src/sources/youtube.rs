// YouTube Data API v3 search client and timed-text transcript fetcher.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info};

use super::{SourceError, TranscriptOutcome, TranscriptSource, VideoHit, VideoPlatform, VideoQuery};
use crate::config::YoutubeConfig;

// ---------------------------------------------------------------------------
// Search API response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    #[serde(default)]
    snippet: Option<Snippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    #[serde(default)]
    video_id: Option<String>,
    #[serde(default)]
    channel_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    channel_title: String,
    published_at: DateTime<Utc>,
}

impl SearchItem {
    fn into_hit(self) -> Option<VideoHit> {
        let snippet = self.snippet?;
        Some(VideoHit {
            video_id: self.id.video_id?,
            title: snippet.title,
            channel_title: snippet.channel_title,
            published_at: snippet.published_at,
        })
    }
}

// ---------------------------------------------------------------------------
// YouTubeClient
// ---------------------------------------------------------------------------

/// Video search over the YouTube Data API. Without an API key the client is
/// disabled and every call fails with [`SourceError::NotConfigured`].
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    http: reqwest::Client,
    api_base_url: String,
    api_key: Option<String>,
}

impl YouTubeClient {
    pub fn new(config: &YoutubeConfig, api_key: Option<String>, http: reqwest::Client) -> Self {
        Self {
            http,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    async fn search_raw(&self, params: &[(&str, String)]) -> Result<SearchResponse, SourceError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(SourceError::NotConfigured("youtube api key"))?;
        let url = format!("{}/search", self.api_base_url);

        let response = self
            .http
            .get(&url)
            .query(params)
            .query(&[("key", key)])
            .send()
            .await
            .map_err(|source| SourceError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|source| SourceError::Transport {
            url: url.clone(),
            source,
        })?;
        serde_json::from_str(&body).map_err(|e| SourceError::Payload {
            url,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl VideoPlatform for YouTubeClient {
    fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    async fn resolve_channel(&self, handle: &str) -> Result<Option<String>, SourceError> {
        let params = [
            ("part", "id,snippet".to_string()),
            ("q", handle.to_string()),
            ("type", "channel".to_string()),
            ("maxResults", "1".to_string()),
        ];
        let response = self.search_raw(&params).await?;
        let channel_id = response
            .items
            .into_iter()
            .next()
            .and_then(|item| item.id.channel_id);
        if let Some(id) = &channel_id {
            info!(handle, channel_id = %id, "resolved channel handle");
        }
        Ok(channel_id)
    }

    async fn search(&self, query: &VideoQuery) -> Result<Vec<VideoHit>, SourceError> {
        let mut params = vec![
            ("part", "snippet".to_string()),
            ("q", query.text.clone()),
            ("type", "video".to_string()),
            ("maxResults", query.max_results.to_string()),
            ("order", query.order.as_param().to_string()),
            (
                "publishedAfter",
                query
                    .published_after
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
        ];
        if let Some(channel_id) = &query.channel_id {
            params.push(("channelId", channel_id.clone()));
        }

        let response = self.search_raw(&params).await?;
        let hits: Vec<VideoHit> = response
            .items
            .into_iter()
            .filter_map(SearchItem::into_hit)
            .collect();
        debug!(query = %query.text, hits = hits.len(), "video search complete");
        Ok(hits)
    }
}

// ---------------------------------------------------------------------------
// Timed-text transcripts
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TimedText {
    #[serde(default)]
    events: Vec<TimedTextEvent>,
}

#[derive(Debug, Deserialize)]
struct TimedTextEvent {
    #[serde(default)]
    segs: Vec<TimedTextSeg>,
}

#[derive(Debug, Deserialize)]
struct TimedTextSeg {
    #[serde(default)]
    utf8: String,
}

/// English captions from the public timed-text endpoint (`fmt=json3`).
#[derive(Debug, Clone)]
pub struct TimedTextTranscripts {
    http: reqwest::Client,
    base_url: String,
}

impl TimedTextTranscripts {
    pub fn new(config: &YoutubeConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: config.transcript_base_url.clone(),
        }
    }
}

#[async_trait]
impl TranscriptSource for TimedTextTranscripts {
    async fn transcript(&self, video_id: &str) -> Result<TranscriptOutcome, SourceError> {
        let url = self.base_url.clone();
        let response = self
            .http
            .get(&url)
            .query(&[("v", video_id), ("lang", "en"), ("fmt", "json3")])
            .send()
            .await
            .map_err(|source| SourceError::Transport {
                url: url.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::FORBIDDEN => return Ok(TranscriptOutcome::Disabled),
            StatusCode::NOT_FOUND => return Ok(TranscriptOutcome::NotFound),
            s if !s.is_success() => {
                return Err(SourceError::Status {
                    url,
                    status: s.as_u16(),
                })
            }
            _ => {}
        }

        let body = response.text().await.map_err(|source| SourceError::Transport {
            url: url.clone(),
            source,
        })?;
        let outcome = parse_timed_text(&body);
        if let TranscriptOutcome::Text(text) = &outcome {
            info!(video_id, chars = text.chars().count(), "fetched transcript");
        }
        Ok(outcome)
    }
}

/// Join caption segments into one whitespace-normalized string. An empty or
/// unparseable body means the video has no captions in the requested language.
pub(crate) fn parse_timed_text(body: &str) -> TranscriptOutcome {
    if body.trim().is_empty() {
        return TranscriptOutcome::NotFound;
    }
    let Ok(doc) = serde_json::from_str::<TimedText>(body) else {
        return TranscriptOutcome::NotFound;
    };

    let raw: String = doc
        .events
        .iter()
        .flat_map(|e| e.segs.iter())
        .map(|s| s.utf8.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    if text.is_empty() {
        TranscriptOutcome::NotFound
    } else {
        TranscriptOutcome::Text(text)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
