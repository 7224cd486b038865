// Projection resolver: one point projection per player-week through an
// ordered fallback chain. A value of exactly 0 counts as absent.

use serde::Serialize;
use std::fmt;
use tracing::debug;

use gridpulse_core::model::PlayerIdentity;
use gridpulse_core::store::PlayerStore;

use super::recency::{round1, window_weeks, RecentPerformance};

/// Which tier of the fallback chain produced the projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionSource {
    /// Upstream projection for the requested week.
    Sleeper,
    /// Average of upstream projections over the lookback weeks.
    RecentProjectionAvg,
    /// Average actual points of the window minus its most recent week.
    RecentWeekBaseline,
    /// Average actual points of the whole window.
    RecentAvg,
}

impl ProjectionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectionSource::Sleeper => "sleeper",
            ProjectionSource::RecentProjectionAvg => "recent_projection_avg",
            ProjectionSource::RecentWeekBaseline => "recent_week_baseline",
            ProjectionSource::RecentAvg => "recent_avg",
        }
    }
}

impl fmt::Display for ProjectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedProjection {
    pub value: f64,
    /// `None` when every tier came up empty or the player is on bye.
    pub source: Option<ProjectionSource>,
}

impl ResolvedProjection {
    pub fn absent() -> Self {
        Self {
            value: 0.0,
            source: None,
        }
    }

    fn from_tier(value: f64, source: ProjectionSource) -> Option<Self> {
        (value != 0.0 && value.is_finite()).then_some(Self {
            value,
            source: Some(source),
        })
    }

    pub fn is_absent(&self) -> bool {
        self.source.is_none()
    }
}

/// Resolve the projection for `player` in `week`, stopping at the first tier
/// with a non-zero value. `recent` is the player's recency window ending
/// before `week`. A bye week short-circuits to an absent projection.
pub async fn resolve_projection(
    store: &PlayerStore,
    player: &PlayerIdentity,
    season: u32,
    week: u32,
    lookback: u32,
    recent: &RecentPerformance,
) -> ResolvedProjection {
    if player.is_on_bye(week) {
        debug!(player_id = %player.id, week, "player on bye, projection skipped");
        return ResolvedProjection::absent();
    }

    let exact = store
        .projections(season, week)
        .await
        .points_for(&player.id)
        .unwrap_or(0.0);
    if let Some(resolved) = ResolvedProjection::from_tier(exact, ProjectionSource::Sleeper) {
        return resolved;
    }

    let mut previous = Vec::new();
    for w in window_weeks(week, lookback) {
        if let Some(points) = store.projections(season, w).await.points_for(&player.id) {
            previous.push(points);
        }
    }

    let resolved = fallback_tiers(&previous, recent);
    debug!(
        player_id = %player.id,
        week,
        value = resolved.value,
        source = ?resolved.source,
        "projection resolved by fallback"
    );
    resolved
}

/// Tiers 2 to 4, given the player's upstream projections for the lookback
/// weeks and their recency window.
pub fn fallback_tiers(
    previous_projections: &[f64],
    recent: &RecentPerformance,
) -> ResolvedProjection {
    let nonzero: Vec<f64> = previous_projections
        .iter()
        .copied()
        .filter(|p| *p != 0.0)
        .collect();
    if !nonzero.is_empty() {
        let avg = nonzero.iter().sum::<f64>() / nonzero.len() as f64;
        if let Some(r) =
            ResolvedProjection::from_tier(round1(avg), ProjectionSource::RecentProjectionAvg)
        {
            return r;
        }
    }

    if let Some(baseline) = recent.previous_weeks_avg() {
        if let Some(r) =
            ResolvedProjection::from_tier(round1(baseline), ProjectionSource::RecentWeekBaseline)
        {
            return r;
        }
    }

    ResolvedProjection::from_tier(recent.avg_points, ProjectionSource::RecentAvg)
        .unwrap_or_else(ResolvedProjection::absent)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
