// Performance flags derived from a projection and a recency window.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::recency::RecentPerformance;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PerformanceFlag {
    BreakoutCandidate,
    TrendingUp,
    Underperforming,
    DecliningRole,
    HighCeiling,
    BoomBust,
    Consistent,
}

impl PerformanceFlag {
    pub const ALL: [PerformanceFlag; 7] = [
        PerformanceFlag::BreakoutCandidate,
        PerformanceFlag::TrendingUp,
        PerformanceFlag::Underperforming,
        PerformanceFlag::DecliningRole,
        PerformanceFlag::HighCeiling,
        PerformanceFlag::BoomBust,
        PerformanceFlag::Consistent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceFlag::BreakoutCandidate => "BREAKOUT_CANDIDATE",
            PerformanceFlag::TrendingUp => "TRENDING_UP",
            PerformanceFlag::Underperforming => "UNDERPERFORMING",
            PerformanceFlag::DecliningRole => "DECLINING_ROLE",
            PerformanceFlag::HighCeiling => "HIGH_CEILING",
            PerformanceFlag::BoomBust => "BOOM_BUST",
            PerformanceFlag::Consistent => "CONSISTENT",
        }
    }
}

impl fmt::Display for PerformanceFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown performance flag `{0}`")]
pub struct UnknownFlag(pub String);

impl FromStr for PerformanceFlag {
    type Err = UnknownFlag;

    /// Case-insensitive; `-` and spaces are accepted in place of `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace(['-', ' '], "_");
        PerformanceFlag::ALL
            .into_iter()
            .find(|f| f.as_str() == normalized)
            .ok_or_else(|| UnknownFlag(s.to_string()))
    }
}

/// Flags in evaluation order, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FlagSet(Vec<PerformanceFlag>);

impl FlagSet {
    pub fn contains(&self, flag: PerformanceFlag) -> bool {
        self.0.contains(&flag)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = PerformanceFlag> + '_ {
        self.0.iter().copied()
    }

    fn insert(&mut self, flag: PerformanceFlag) {
        if !self.contains(flag) {
            self.0.push(flag);
        }
    }

    /// Comma-separated names, or `None` when empty.
    pub fn display_list(&self) -> String {
        if self.0.is_empty() {
            return "None".to_string();
        }
        self.iter().map(|f| f.as_str()).collect::<Vec<_>>().join(", ")
    }
}

impl FromIterator<PerformanceFlag> for FlagSet {
    fn from_iter<I: IntoIterator<Item = PerformanceFlag>>(iter: I) -> Self {
        let mut set = FlagSet::default();
        for flag in iter {
            set.insert(flag);
        }
        set
    }
}

/// Evaluate every flag rule. Breakout/trending and declining/underperforming
/// are two-tier pairs where the stronger tier wins; the rest are independent.
pub fn compute_flags(projection: f64, recent: &RecentPerformance) -> FlagSet {
    let mut flags = FlagSet::default();
    if recent.weeks_analyzed == 0 || projection == 0.0 {
        return flags;
    }

    let avg = recent.avg_points;
    let max = recent.max_week().unwrap_or(0.0);
    let min = recent.min_week().unwrap_or(0.0);

    if avg >= projection * 1.5 {
        flags.insert(PerformanceFlag::BreakoutCandidate);
    } else if avg >= projection * 1.2 {
        flags.insert(PerformanceFlag::TrendingUp);
    }

    if avg <= projection * 0.7 {
        flags.insert(PerformanceFlag::DecliningRole);
    } else if avg <= projection * 0.8 {
        flags.insert(PerformanceFlag::Underperforming);
    }

    if max >= projection * 2.0 {
        flags.insert(PerformanceFlag::HighCeiling);
    }

    if recent.weeks_analyzed >= 2 {
        if min > 0.0 && max >= min * 2.0 {
            flags.insert(PerformanceFlag::BoomBust);
        }
        let band = avg * 0.2;
        if recent.weekly_points.iter().all(|p| (p - avg).abs() <= band) {
            flags.insert(PerformanceFlag::Consistent);
        }
    }

    flags
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use PerformanceFlag::*;

    fn window(points: &[f64]) -> RecentPerformance {
        let entries: Vec<(u32, f64)> = points
            .iter()
            .enumerate()
            .map(|(i, p)| (15 - i as u32, *p))
            .collect();
        RecentPerformance::from_weeks(&entries)
    }

    fn flags(projection: f64, points: &[f64]) -> Vec<PerformanceFlag> {
        compute_flags(projection, &window(points)).iter().collect()
    }

    #[test]
    fn breakout_at_one_and_a_half_times_projection() {
        // avg 16.0 vs 10.0
        let got = flags(10.0, &[16.0, 17.0, 15.0]);
        assert!(got.contains(&BreakoutCandidate));
        assert!(!got.contains(&TrendingUp));
    }

    #[test]
    fn trending_up_between_tiers() {
        // avg 13.0 vs 10.0
        let got = flags(10.0, &[13.0, 12.0, 14.0]);
        assert!(got.contains(&TrendingUp));
        assert!(!got.contains(&BreakoutCandidate));
    }

    #[test]
    fn declining_role_for_low_average() {
        let got = flags(20.0, &[4.0, 5.0, 6.0]);
        assert!(got.contains(&DecliningRole));
        assert!(!got.contains(&Underperforming));
        assert!(!got.contains(&BreakoutCandidate));
    }

    #[test]
    fn underperforming_between_tiers() {
        // avg 15.0 vs 20.0: 0.75x
        let got = flags(20.0, &[15.0, 15.0]);
        assert!(got.contains(&Underperforming));
        assert!(!got.contains(&DecliningRole));
    }

    #[test]
    fn high_ceiling_and_boom_bust() {
        let got = flags(10.0, &[22.0, 9.0, 8.0]);
        assert!(got.contains(&HighCeiling));
        assert!(got.contains(&BoomBust));
        assert!(!got.contains(&Consistent));
    }

    #[test]
    fn consistent_only() {
        assert_eq!(flags(10.0, &[10.0, 10.5, 9.5]), vec![Consistent]);
    }

    #[test]
    fn boom_bust_needs_positive_floor() {
        let got = flags(10.0, &[12.0, 0.0]);
        assert!(!got.contains(&BoomBust));
    }

    #[test]
    fn single_week_skips_volatility_flags() {
        assert_eq!(flags(10.0, &[10.0]), Vec::<PerformanceFlag>::new());
    }

    #[test]
    fn empty_without_data_or_projection() {
        assert!(compute_flags(10.0, &RecentPerformance::empty()).is_empty());
        assert!(compute_flags(0.0, &window(&[25.0, 30.0])).is_empty());
    }

    #[test]
    fn exclusive_tiers_hold_across_ratios() {
        for tenths in 0..=40 {
            let avg = tenths as f64;
            let got = flags(10.0, &[avg, avg]);
            assert!(!(got.contains(&BreakoutCandidate) && got.contains(&TrendingUp)));
            assert!(!(got.contains(&BreakoutCandidate) && got.contains(&DecliningRole)));
            assert!(!(got.contains(&DecliningRole) && got.contains(&Underperforming)));
        }
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("breakout_candidate".parse::<PerformanceFlag>(), Ok(BreakoutCandidate));
        assert_eq!("Boom-Bust".parse::<PerformanceFlag>(), Ok(BoomBust));
        assert_eq!(
            "SLEEPER".parse::<PerformanceFlag>(),
            Err(UnknownFlag("SLEEPER".to_string()))
        );
    }

    #[test]
    fn flag_set_serializes_as_names() {
        let set: FlagSet = [HighCeiling, BoomBust, HighCeiling].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert_eq!(
            serde_json::to_string(&set).unwrap(),
            r#"["HIGH_CEILING","BOOM_BUST"]"#
        );
        assert_eq!(set.display_list(), "HIGH_CEILING, BOOM_BUST");
        assert_eq!(FlagSet::default().display_list(), "None");
    }
}
