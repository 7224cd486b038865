// Prompt templates for single-player recommendations and head-to-head
// comparisons.
//
// Each prompt carries the pre-computed numbers (resolved and blended
// projection, recency window, flags) plus whatever video commentary was
// found, so the model spends its effort on news and matchup context.

use crate::context::PlayerContext;
use crate::enhancement::EnhancedPlayer;

pub const NO_EXPERT_ANALYSIS: &str = "No expert analysis found in recent videos.";

/// Video titles listed in the prompt, on top of the transcript summary.
const MAX_LISTED_VIDEOS: usize = 5;

// ---------------------------------------------------------------------------
// Shared sections
// ---------------------------------------------------------------------------

fn player_heading(player: &EnhancedPlayer) -> String {
    let team = player.player.team.as_deref().unwrap_or("FA");
    format!("{} ({}, {})", player.player.name, player.player.position, team)
}

/// Statistical block for one player.
pub fn format_stat_block(player: &EnhancedPlayer) -> String {
    let mut out = String::new();

    if player.on_bye {
        out.push_str(&format!("- {}\n", player.context_message));
    }

    let source = player
        .projection
        .source
        .map(|s| s.as_str())
        .unwrap_or("unavailable");
    out.push_str(&format!(
        "- Projected Points: {:.1} pts (source: {})\n",
        player.projection.value, source
    ));
    if let Some(adjusted) = player.projection.adjusted {
        out.push_str(&format!("- Adjusted Projection: {adjusted:.1} pts\n"));
    }

    match &player.recent_performance {
        Some(recent) => {
            let weekly = recent
                .weekly_points
                .iter()
                .map(|p| format!("{p:.1}"))
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!(
                "- L{}W Average: {:.1} pts\n\
                 - Trend: {}\n\
                 - Weekly Points (most recent first): {}\n",
                recent.weeks_analyzed,
                recent.avg_points,
                recent.trend.as_str(),
                weekly,
            ));
        }
        None => out.push_str("- Recent Performance: No recent data available\n"),
    }

    out.push_str(&format!(
        "- Performance Flags: {}\n",
        player.performance_flags.display_list()
    ));
    out
}

/// Video commentary block, or the no-analysis placeholder.
pub fn format_video_block(context: &PlayerContext) -> String {
    if !context.has_mentions() {
        return format!("{NO_EXPERT_ANALYSIS}\n");
    }

    let mut out = String::new();
    for video in context.videos.iter().take(MAX_LISTED_VIDEOS) {
        let label = if video.is_curated { " [trusted]" } else { "" };
        out.push_str(&format!(
            "- {}{} ({}): {}\n",
            video.channel_name,
            label,
            video.published_at.format("%Y-%m-%d"),
            video.title
        ));
    }
    out.push_str("\nTranscript excerpts:\n");
    out.push_str(&context.summary);
    out.push('\n');
    out
}

// ---------------------------------------------------------------------------
// Single-player synthesis
// ---------------------------------------------------------------------------

/// Build the start/sit recommendation prompt for one player.
pub fn build_synthesis_prompt(
    player: &EnhancedPlayer,
    context: &PlayerContext,
    season: u32,
) -> String {
    let name = &player.player.name;
    let mut prompt = String::with_capacity(2048);

    prompt.push_str(&format!(
        "You are an expert fantasy football analyst helping with Week {} of the {} NFL season.\n\n",
        player.week, season
    ));

    prompt.push_str(&format!("## PLAYER\n{}\n\n", player_heading(player)));

    prompt.push_str("## STATISTICAL DATA FROM SLEEPER API\n");
    prompt.push_str(&format_stat_block(player));
    prompt.push('\n');

    prompt.push_str("## EXPERT VIDEO ANALYSIS\n");
    prompt.push_str(&format_video_block(context));
    prompt.push('\n');

    prompt.push_str(&format!(
        "## YOUR TASK\n\
         1. Use Google Search to find the LATEST news, injury updates, and expert opinions about {name} for this week\n\
         2. Look for recent Reddit discussions, Twitter/X posts, and fantasy analyst takes\n\
         3. Check for any breaking news that affects their value\n\
         4. Consider their matchup this week\n\n"
    ));

    prompt.push_str(
        "## RESPONSE FORMAT\n\
         Based on ALL available information (stats + video analysis + live search results), provide a JSON response:\n\
         {\n\
         \x20   \"recommendation\": \"START\" | \"SIT\" | \"FLEX\",\n\
         \x20   \"conviction\": \"HIGH\" | \"MEDIUM-HIGH\" | \"MIXED\" | \"MEDIUM-LOW\" | \"LOW\",\n\
         \x20   \"reasoning\": \"2-3 sentence explanation citing specific sources you found\",\n\
         \x20   \"key_factors\": [\"factor 1 with source\", \"factor 2 with source\", \"factor 3 with source\"],\n\
         \x20   \"risk_level\": \"LOW\" | \"MODERATE\" | \"HIGH\",\n\
         \x20   \"expert_consensus\": \"summary of what fantasy experts are saying, cite sources\",\n\
         \x20   \"sources_used\": [\"source 1\", \"source 2\", \"source 3\"]\n\
         }\n\n\
         IMPORTANT:\n\
         - Cite specific sources you find (e.g., \"FantasyPros ranks him...\", \"Reddit r/fantasyfootball says...\")\n\
         - Include any injury news or matchup concerns\n\
         - Be specific about THIS WEEK's outlook\n\n\
         Respond ONLY with valid JSON, no markdown formatting.",
    );

    prompt
}

// ---------------------------------------------------------------------------
// Head-to-head comparison
// ---------------------------------------------------------------------------

/// Build the "who do I start" prompt for two players.
pub fn build_comparison_prompt(
    player_a: &EnhancedPlayer,
    context_a: &PlayerContext,
    player_b: &EnhancedPlayer,
    context_b: &PlayerContext,
    season: u32,
) -> String {
    let mut prompt = String::with_capacity(3072);

    prompt.push_str(&format!(
        "You are an expert fantasy football analyst helping with Week {} of the {} NFL season. \
         The user can start only one of these two players.\n\n",
        player_a.week, season
    ));

    for (label, player, context) in [("A", player_a, context_a), ("B", player_b, context_b)] {
        prompt.push_str(&format!("## PLAYER {label}: {}\n", player_heading(player)));
        prompt.push_str(&format_stat_block(player));
        prompt.push_str("\nExpert video analysis:\n");
        prompt.push_str(&format_video_block(context));
        prompt.push('\n');
    }

    prompt.push_str(&format!(
        "## YOUR TASK\n\
         1. Use Google Search to find the LATEST news and injury updates for {} and {}\n\
         2. Compare their matchups and expected roles this week\n\
         3. Decide which player to start, or call it a toss-up if the gap is negligible\n\n",
        player_a.player.name, player_b.player.name
    ));

    prompt.push_str(
        "## RESPONSE FORMAT\n\
         Provide a JSON response:\n\
         {\n\
         \x20   \"winner\": \"A\" | \"B\" | \"TOSS_UP\",\n\
         \x20   \"conviction\": \"HIGH\" | \"MEDIUM-HIGH\" | \"MIXED\" | \"MEDIUM-LOW\" | \"LOW\",\n\
         \x20   \"reasoning\": \"2-3 sentence explanation citing specific sources you found\",\n\
         \x20   \"player_a_advantages\": [\"advantage 1\", \"advantage 2\"],\n\
         \x20   \"player_b_advantages\": [\"advantage 1\", \"advantage 2\"],\n\
         \x20   \"matchup_edge\": \"which defensive matchup favors whom and why\",\n\
         \x20   \"sources_used\": [\"source 1\", \"source 2\"]\n\
         }\n\n\
         Respond ONLY with valid JSON, no markdown formatting.",
    );

    prompt
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::PlayerContext;
    use crate::enhancement::{
        FlagSet, PerformanceFlag, ProjectionSource, ProjectionSummary, RecentPerformance,
    };
    use chrono::{TimeZone, Utc};
    use gridpulse_core::model::{PlayerIdentity, Position, VideoSummary};

    fn enhanced(name: &str) -> EnhancedPlayer {
        EnhancedPlayer {
            player: PlayerIdentity {
                id: "1".into(),
                name: name.into(),
                position: Position::WR,
                team: Some("MIA".into()),
                bye_week: None,
            },
            week: 16,
            projection: ProjectionSummary {
                value: 14.2,
                source: Some(ProjectionSource::Sleeper),
                adjusted: Some(15.1),
            },
            recent_performance: Some(RecentPerformance::from_weeks(&[(15, 18.0), (14, 15.5)])),
            performance_flags: [PerformanceFlag::TrendingUp].into_iter().collect(),
            context_message: "L2W avg: 16.8 pts".into(),
            on_bye: false,
        }
    }

    fn context_with_mentions() -> PlayerContext {
        let published_at = Utc.with_ymd_and_hms(2025, 12, 14, 9, 0, 0).unwrap();
        PlayerContext {
            videos: vec![VideoSummary {
                video_id: "v1".into(),
                title: "Week 16 starts".into(),
                channel_name: "FantasyPros".into(),
                published_at,
                url: VideoSummary::watch_url("v1"),
                is_curated: true,
            }],
            mentions: vec![crate::context::VideoMention {
                video_id: "v1".into(),
                channel_name: "FantasyPros".into(),
                is_curated: true,
                published_at,
                excerpt: "Waddle is a must start".into(),
                position: 0,
            }],
            summary: "Waddle is a must start".into(),
        }
    }

    #[test]
    fn synthesis_prompt_has_all_sections() {
        let p = build_synthesis_prompt(&enhanced("Jaylen Waddle"), &context_with_mentions(), 2025);
        assert!(p.starts_with("You are an expert fantasy football analyst helping with Week 16 of the 2025 NFL season."));
        assert!(p.contains("## PLAYER\nJaylen Waddle (WR, MIA)"));
        assert!(p.contains("- Projected Points: 14.2 pts (source: sleeper)"));
        assert!(p.contains("- Adjusted Projection: 15.1 pts"));
        assert!(p.contains("- L2W Average: 16.8 pts"));
        assert!(p.contains("- Weekly Points (most recent first): 18.0, 15.5"));
        assert!(p.contains("- Performance Flags: TRENDING_UP"));
        assert!(p.contains("- FantasyPros [trusted] (2025-12-14): Week 16 starts"));
        assert!(p.contains("Waddle is a must start"));
        assert!(p.contains("\"sources_used\""));
        assert!(p.ends_with("Respond ONLY with valid JSON, no markdown formatting."));
    }

    #[test]
    fn missing_context_uses_placeholder() {
        let mut player = enhanced("Jaylen Waddle");
        player.recent_performance = None;
        player.performance_flags = FlagSet::default();
        player.projection.source = None;
        player.projection.adjusted = None;

        let p = build_synthesis_prompt(&player, &PlayerContext::empty(), 2025);
        assert!(p.contains(NO_EXPERT_ANALYSIS));
        assert!(p.contains("(source: unavailable)"));
        assert!(p.contains("No recent data available"));
        assert!(p.contains("- Performance Flags: None"));
        assert!(!p.contains("Adjusted Projection"));
    }

    #[test]
    fn comparison_prompt_labels_both_players() {
        let p = build_comparison_prompt(
            &enhanced("Jaylen Waddle"),
            &context_with_mentions(),
            &enhanced("Tyreek Hill"),
            &PlayerContext::empty(),
            2025,
        );
        assert!(p.contains("## PLAYER A: Jaylen Waddle (WR, MIA)"));
        assert!(p.contains("## PLAYER B: Tyreek Hill (WR, MIA)"));
        assert!(p.contains("for Jaylen Waddle and Tyreek Hill"));
        assert!(p.contains("\"winner\": \"A\" | \"B\" | \"TOSS_UP\""));
        assert_eq!(p.matches(NO_EXPERT_ANALYSIS).count(), 1);
    }
}
