// Sleeper public API client: player directory, weekly projections, weekly
// actual stats. No authentication.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use super::{FantasyDataSource, SourceError};
use crate::config::SleeperConfig;
use crate::model::StatTable;

/// HTTP client for the Sleeper API.
#[derive(Debug, Clone)]
pub struct SleeperClient {
    http: reqwest::Client,
    base_url: String,
}

impl SleeperClient {
    pub fn new(config: &SleeperConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn players_url(&self) -> String {
        format!("{}/players/nfl", self.base_url)
    }

    fn projections_url(&self, season: u32, week: u32) -> String {
        format!("{}/projections/nfl/{season}/{week}", self.base_url)
    }

    fn stats_url(&self, season: u32, week: u32) -> String {
        format!("{}/stats/nfl/regular/{season}/{week}", self.base_url)
    }

    /// GET `url` and decode the body as JSON. A 404 is reported as `None`.
    async fn get_json(&self, url: &str) -> Result<Option<Value>, SourceError> {
        debug!(%url, "sleeper request");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| SourceError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|source| SourceError::Transport {
            url: url.to_string(),
            source,
        })?;
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| SourceError::Payload {
                url: url.to_string(),
                message: e.to_string(),
            })
    }

    async fn get_table(&self, url: &str) -> Result<Option<StatTable>, SourceError> {
        let table = self.get_json(url).await?.map(StatTable::from_json);
        if let Some(t) = &table {
            debug!(%url, entries = t.len(), "sleeper table loaded");
        }
        Ok(table)
    }
}

#[async_trait]
impl FantasyDataSource for SleeperClient {
    async fn players(&self) -> Result<Value, SourceError> {
        let url = self.players_url();
        // An absent directory is an empty directory.
        Ok(self
            .get_json(&url)
            .await?
            .unwrap_or_else(|| Value::Object(Default::default())))
    }

    async fn projections(&self, season: u32, week: u32) -> Result<Option<StatTable>, SourceError> {
        self.get_table(&self.projections_url(season, week)).await
    }

    async fn stats(&self, season: u32, week: u32) -> Result<Option<StatTable>, SourceError> {
        self.get_table(&self.stats_url(season, week)).await
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
