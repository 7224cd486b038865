// Flag-weighted blend of the resolved projection with recent form.

use super::flags::{FlagSet, PerformanceFlag};
use super::recency::{round1, RecentPerformance};

/// Blend weight given to the recent average, highest priority first.
const BLEND_WEIGHTS: [(PerformanceFlag, f64); 4] = [
    (PerformanceFlag::BreakoutCandidate, 0.40),
    (PerformanceFlag::DecliningRole, 0.30),
    (PerformanceFlag::TrendingUp, 0.20),
    (PerformanceFlag::Underperforming, 0.15),
];

/// Weight of the highest-priority weighted flag present, 0.0 when none is.
pub fn blend_weight(flags: &FlagSet) -> f64 {
    BLEND_WEIGHTS
        .iter()
        .find(|(flag, _)| flags.contains(*flag))
        .map(|(_, w)| *w)
        .unwrap_or(0.0)
}

/// `projection * (1 - w) + avg * w`, rounded to one decimal. The projection
/// is returned untouched when there is no recent data or no projection.
pub fn adjusted_projection(projection: f64, recent: &RecentPerformance, flags: &FlagSet) -> f64 {
    if recent.weeks_analyzed == 0 || projection == 0.0 {
        return projection;
    }
    let w = blend_weight(flags);
    round1(projection * (1.0 - w) + recent.avg_points * w)
}
