// PulseService: the caller-facing operations. Validates input, then runs
// the enhancement chain, context aggregation and synthesis.

use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use gridpulse_core::cache::CacheService;
use gridpulse_core::config::{Config, MAX_LOOKBACK, MAX_SCAN_POOL};
use gridpulse_core::model::{PlayerIdentity, Position};
use gridpulse_core::sources::sleeper::SleeperClient;
use gridpulse_core::sources::youtube::{TimedTextTranscripts, YouTubeClient};
use gridpulse_core::store::PlayerStore;
use gridpulse_llm::LlmClient;

use crate::context::{ContextAggregator, PlayerContext};
use crate::enhancement::recency::{round1, window_weeks};
use crate::enhancement::{enhance, EnhanceParams, EnhancedPlayer, PerformanceFlag};
use crate::error::PulseError;
use crate::scan::scan_pool;
use crate::synthesis::{ComparisonResult, SynthesisClient, SynthesisResult};

pub const MIN_QUERY_CHARS: usize = 2;
pub const MAX_SEARCH_LIMIT: usize = 50;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// One week of actual vs projected points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyTrend {
    pub week: u32,
    pub actual_points: f64,
    pub projected_points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerTrends {
    pub player_id: String,
    pub player_name: String,
    /// Oldest week first.
    pub weeks: Vec<WeeklyTrend>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerPulse {
    pub player: EnhancedPlayer,
    pub context: PlayerContext,
    pub analysis: SynthesisResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerComparison {
    pub player_a: EnhancedPlayer,
    pub player_b: EnhancedPlayer,
    pub comparison: ComparisonResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanReport {
    pub flag: PerformanceFlag,
    pub position: Option<Position>,
    pub pool_size: usize,
    pub scanned: usize,
    pub matches: Vec<EnhancedPlayer>,
}

// ---------------------------------------------------------------------------
// PulseService
// ---------------------------------------------------------------------------

pub struct PulseService {
    store: PlayerStore,
    context: ContextAggregator,
    synthesis: SynthesisClient,
    config: Config,
}

impl PulseService {
    pub fn new(
        store: PlayerStore,
        context: ContextAggregator,
        synthesis: SynthesisClient,
        config: Config,
    ) -> Self {
        Self {
            store,
            context,
            synthesis,
            config,
        }
    }

    /// Wire the HTTP collaborators from config around one shared cache.
    pub fn from_config(config: Config, http: reqwest::Client) -> Self {
        let cache = Arc::new(CacheService::new(&config.cache));
        let sleeper = Arc::new(SleeperClient::new(&config.sleeper, http.clone()));
        let youtube = Arc::new(YouTubeClient::new(
            &config.youtube,
            config.credentials.youtube_api_key.clone(),
            http.clone(),
        ));
        let transcripts = Arc::new(TimedTextTranscripts::new(&config.youtube, http.clone()));
        let llm = LlmClient::from_config(&config, http);
        info!(llm_active = llm.is_active(), "pulse service configured");

        let store = PlayerStore::new(sleeper, cache.clone());
        let context = ContextAggregator::new(youtube, transcripts, cache, config.youtube.clone());
        let synthesis = SynthesisClient::new(Arc::new(llm), config.llm.clone());
        Self::new(store, context, synthesis, config)
    }

    pub fn store(&self) -> &PlayerStore {
        &self.store
    }

    fn params(&self) -> EnhanceParams {
        EnhanceParams {
            season: self.config.season.season,
            week: self.config.season.week,
            lookback: self.config.recency.lookback,
        }
    }

    async fn require_player(&self, player_id: &str) -> Result<PlayerIdentity, PulseError> {
        self.store
            .player(player_id)
            .await
            .ok_or_else(|| PulseError::PlayerNotFound(player_id.to_string()))
    }

    // --- operations ---

    /// Projection, recency window, flags and blend for the configured week.
    pub async fn enhance_player(&self, player_id: &str) -> Result<EnhancedPlayer, PulseError> {
        let player = self.require_player(player_id).await?;
        Ok(enhance(&self.store, player, self.params()).await)
    }

    /// Actual and upstream-projected points for the `lookback` weeks before
    /// the configured week, oldest first. Weeks without stats count as 0.
    pub async fn weekly_trends(
        &self,
        player_id: &str,
        lookback: u32,
    ) -> Result<PlayerTrends, PulseError> {
        if !(1..=MAX_LOOKBACK).contains(&lookback) {
            return Err(PulseError::InvalidLookback(lookback));
        }
        let player = self.require_player(player_id).await?;
        let season = self.config.season.season;

        let mut weeks = Vec::new();
        for week in window_weeks(self.config.season.week, lookback) {
            let actual = self.store.stats(season, week).await.points_for(player_id);
            let projected = self.store.projections(season, week).await.points_for(player_id);
            weeks.push(WeeklyTrend {
                week,
                actual_points: round1(actual.unwrap_or(0.0)),
                projected_points: round1(projected.unwrap_or(0.0)),
            });
        }
        weeks.reverse();

        Ok(PlayerTrends {
            player_id: player.id,
            player_name: player.name,
            weeks,
        })
    }

    /// Enhanced stats, video context and a model recommendation.
    pub async fn pulse(&self, player_id: &str) -> Result<PlayerPulse, PulseError> {
        let player = self.require_player(player_id).await?;
        let name = player.name.clone();

        let (enhanced, context) = tokio::join!(
            enhance(&self.store, player, self.params()),
            self.context.gather(&name),
        );
        let analysis = self
            .synthesis
            .synthesize(&enhanced, &context, self.config.season.season)
            .await;

        Ok(PlayerPulse {
            player: enhanced,
            context,
            analysis,
        })
    }

    /// Head-to-head start recommendation between two players.
    pub async fn compare(
        &self,
        player_a: &str,
        player_b: &str,
    ) -> Result<PlayerComparison, PulseError> {
        if player_a == player_b {
            return Err(PulseError::InvalidInput(
                "cannot compare a player with themselves".to_string(),
            ));
        }
        let (a, b) = tokio::try_join!(
            self.require_player(player_a),
            self.require_player(player_b)
        )?;
        let (name_a, name_b) = (a.name.clone(), b.name.clone());
        let params = self.params();

        let (enhanced_a, enhanced_b, context_a, context_b) = tokio::join!(
            enhance(&self.store, a, params),
            enhance(&self.store, b, params),
            self.context.gather(&name_a),
            self.context.gather(&name_b),
        );
        let comparison = self
            .synthesis
            .compare(
                &enhanced_a,
                &context_a,
                &enhanced_b,
                &context_b,
                self.config.season.season,
            )
            .await;

        Ok(PlayerComparison {
            player_a: enhanced_a,
            player_b: enhanced_b,
            comparison,
        })
    }

    /// Enhance the top of the active pool and keep players carrying `flag`.
    pub async fn scan(
        &self,
        flag: &str,
        position: Option<&str>,
        pool_size: Option<usize>,
    ) -> Result<ScanReport, PulseError> {
        let flag: PerformanceFlag = flag.parse()?;
        let position = position
            .map(|p| {
                Position::from_str_pos(p)
                    .ok_or_else(|| PulseError::InvalidInput(format!("unknown position `{p}`")))
            })
            .transpose()?;
        let pool_size = pool_size.unwrap_or(self.config.scan.pool_size);
        if !(1..=MAX_SCAN_POOL).contains(&pool_size) {
            return Err(PulseError::InvalidPoolSize(pool_size));
        }

        let pool = self.store.active_players(position, pool_size).await;
        let scanned = pool.len();
        let matches = scan_pool(
            &self.store,
            pool,
            flag,
            self.params(),
            self.config.scan.max_concurrency,
        )
        .await;

        Ok(ScanReport {
            flag,
            position,
            pool_size,
            scanned,
            matches,
        })
    }

    /// Name search over skill-position players.
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<PlayerIdentity>, PulseError> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_CHARS {
            return Err(PulseError::InvalidInput(format!(
                "query must be at least {MIN_QUERY_CHARS} characters"
            )));
        }
        if !(1..=MAX_SEARCH_LIMIT).contains(&limit) {
            return Err(PulseError::InvalidInput(format!(
                "limit must be between 1 and {MAX_SEARCH_LIMIT}, got {limit}"
            )));
        }
        Ok(self.store.search_players(query, limit).await)
    }
}
