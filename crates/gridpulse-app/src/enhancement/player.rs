// One player-week run through the whole enhancement chain.

use serde::Serialize;
use tracing::debug;

use gridpulse_core::model::PlayerIdentity;
use gridpulse_core::store::PlayerStore;

use super::blend::adjusted_projection;
use super::flags::{compute_flags, FlagSet};
use super::recency::{recent_performance, RecentPerformance};
use super::resolver::{resolve_projection, ProjectionSource};

/// Season, week and recency window for an enhancement run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnhanceParams {
    pub season: u32,
    pub week: u32,
    pub lookback: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionSummary {
    pub value: f64,
    pub source: Option<ProjectionSource>,
    /// Flag-weighted blend. `None` on bye or when no projection resolved.
    pub adjusted: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnhancedPlayer {
    pub player: PlayerIdentity,
    pub week: u32,
    pub projection: ProjectionSummary,
    /// Present only when at least one week had data.
    pub recent_performance: Option<RecentPerformance>,
    pub performance_flags: FlagSet,
    pub context_message: String,
    pub on_bye: bool,
}

impl EnhancedPlayer {
    /// Projection used for display and ranking: the blend when there is one.
    pub fn effective_projection(&self) -> f64 {
        self.projection.adjusted.unwrap_or(self.projection.value)
    }
}

/// Short human-readable status line.
pub fn context_message(
    player: &PlayerIdentity,
    on_bye: bool,
    recent: &RecentPerformance,
) -> String {
    if on_bye {
        let bye = player.bye_week.map(|w| w.to_string()).unwrap_or_default();
        format!("Player is on bye (Week {bye})")
    } else if recent.has_data() {
        format!("L{}W avg: {:.1} pts", recent.weeks_analyzed, recent.avg_points)
    } else {
        "No recent performance data".to_string()
    }
}

/// Recency, projection, flags and blend for `player`.
pub async fn enhance(
    store: &PlayerStore,
    player: PlayerIdentity,
    params: EnhanceParams,
) -> EnhancedPlayer {
    let on_bye = player.is_on_bye(params.week);
    let recent = recent_performance(
        store,
        &player.id,
        params.season,
        params.week,
        params.lookback,
    )
    .await;
    let resolved = resolve_projection(
        store,
        &player,
        params.season,
        params.week,
        params.lookback,
        &recent,
    )
    .await;

    let (flags, adjusted) = if on_bye || resolved.is_absent() {
        (FlagSet::default(), None)
    } else {
        let flags = compute_flags(resolved.value, &recent);
        let adjusted = adjusted_projection(resolved.value, &recent, &flags);
        (flags, Some(adjusted))
    };

    debug!(
        player_id = %player.id,
        projection = resolved.value,
        flags = %flags.display_list(),
        "player enhanced"
    );

    EnhancedPlayer {
        context_message: context_message(&player, on_bye, &recent),
        week: params.week,
        projection: ProjectionSummary {
            value: resolved.value,
            source: resolved.source,
            adjusted,
        },
        recent_performance: recent.has_data().then_some(recent),
        performance_flags: flags,
        on_bye,
        player,
    }
}
