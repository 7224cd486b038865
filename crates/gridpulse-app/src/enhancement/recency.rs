// Recent-performance window: per-week actual points before the current week.

use serde::{Deserialize, Serialize};

use gridpulse_core::store::PlayerStore;

/// Direction of the most recent week relative to the weeks before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Improving => "improving",
            Trend::Declining => "declining",
            Trend::Stable => "stable",
        }
    }
}

/// Relative change of the latest week against the previous-weeks average
/// beyond which the trend is no longer stable.
const TREND_THRESHOLD: f64 = 0.25;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentPerformance {
    pub weeks_analyzed: usize,
    /// Rounded to one decimal.
    pub avg_points: f64,
    /// Rounded to one decimal.
    pub total_points: f64,
    pub trend: Trend,
    /// Most recent week first.
    pub weekly_points: Vec<f64>,
    /// Week number of each `weekly_points` entry.
    pub weeks: Vec<u32>,
}

impl RecentPerformance {
    pub fn empty() -> Self {
        Self {
            weeks_analyzed: 0,
            avg_points: 0.0,
            total_points: 0.0,
            trend: Trend::Stable,
            weekly_points: Vec::new(),
            weeks: Vec::new(),
        }
    }

    /// Summarize `(week, points)` pairs given most-recent-first.
    pub fn from_weeks(entries: &[(u32, f64)]) -> Self {
        if entries.is_empty() {
            return Self::empty();
        }
        let weekly_points: Vec<f64> = entries.iter().map(|(_, p)| *p).collect();
        let total: f64 = weekly_points.iter().sum();
        let avg = total / weekly_points.len() as f64;

        Self {
            weeks_analyzed: weekly_points.len(),
            avg_points: round1(avg),
            total_points: round1(total),
            trend: classify_trend(&weekly_points),
            weeks: entries.iter().map(|(w, _)| *w).collect(),
            weekly_points,
        }
    }

    pub fn has_data(&self) -> bool {
        self.weeks_analyzed > 0
    }

    pub fn max_week(&self) -> Option<f64> {
        self.weekly_points.iter().copied().reduce(f64::max)
    }

    pub fn min_week(&self) -> Option<f64> {
        self.weekly_points.iter().copied().reduce(f64::min)
    }

    /// Average of every week except the most recent one, unrounded. `None`
    /// with fewer than two weeks.
    pub fn previous_weeks_avg(&self) -> Option<f64> {
        let previous = self.weekly_points.get(1..).filter(|p| !p.is_empty())?;
        Some(previous.iter().sum::<f64>() / previous.len() as f64)
    }
}

fn classify_trend(weekly_points: &[f64]) -> Trend {
    let [latest, previous @ ..] = weekly_points else {
        return Trend::Stable;
    };
    if previous.is_empty() {
        return Trend::Stable;
    }
    let previous_avg = previous.iter().sum::<f64>() / previous.len() as f64;
    if previous_avg <= 0.0 {
        return Trend::Stable;
    }
    let change = (latest - previous_avg) / previous_avg;
    if change > TREND_THRESHOLD {
        Trend::Improving
    } else if change < -TREND_THRESHOLD {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

/// Weeks `current_week - 1` down to `current_week - lookback`, stopping
/// before week 0.
pub fn window_weeks(current_week: u32, lookback: u32) -> impl Iterator<Item = u32> {
    (1..=lookback).map_while(move |i| current_week.checked_sub(i).filter(|w| *w >= 1))
}

/// Round half away from zero to one decimal.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Collect the player's actual points over the lookback window. Weeks where
/// the player has no stat entry are skipped.
pub async fn recent_performance(
    store: &PlayerStore,
    player_id: &str,
    season: u32,
    current_week: u32,
    lookback: u32,
) -> RecentPerformance {
    let mut entries = Vec::new();
    for week in window_weeks(current_week, lookback) {
        let table = store.stats(season, week).await;
        if let Some(points) = table.points_for(player_id) {
            entries.push((week, points));
        }
    }
    RecentPerformance::from_weeks(&entries)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
