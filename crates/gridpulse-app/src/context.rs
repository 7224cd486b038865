// Video commentary for a player: curated-first search, transcript fetches,
// mention excerpts, and a bounded text summary for the synthesis prompt.

use chrono::{DateTime, Duration, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use gridpulse_core::cache::{CacheService, VideoSearchKey};
use gridpulse_core::config::YoutubeConfig;
use gridpulse_core::model::VideoSummary;
use gridpulse_core::sources::{
    SearchOrder, TranscriptOutcome, TranscriptSource, VideoPlatform, VideoQuery,
};

/// Most excerpts kept per transcript.
pub const MAX_MENTIONS_PER_TRANSCRIPT: usize = 5;

/// Extra general-search results requested to absorb duplicates.
const GENERAL_SEARCH_SLACK: usize = 5;

pub const MENTION_SEPARATOR: &str = "\n\n---\n\n";
pub const TRUNCATION_MARKER: &str = "...[truncated]";
pub const NO_MENTIONS_TEXT: &str = "No specific mentions found in transcripts.";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// An excerpt around one occurrence of a name in a transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    pub text: String,
    /// Character offset of the match in the transcript.
    pub position: usize,
}

/// A mention attributed to the video it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoMention {
    pub video_id: String,
    pub channel_name: String,
    pub is_curated: bool,
    pub published_at: DateTime<Utc>,
    pub excerpt: String,
    pub position: usize,
}

/// Everything gathered for one player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerContext {
    pub videos: Vec<VideoSummary>,
    pub mentions: Vec<VideoMention>,
    pub summary: String,
}

impl PlayerContext {
    pub fn empty() -> Self {
        Self {
            videos: Vec::new(),
            mentions: Vec::new(),
            summary: NO_MENTIONS_TEXT.to_string(),
        }
    }

    pub fn has_mentions(&self) -> bool {
        !self.mentions.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ContextAggregator
// ---------------------------------------------------------------------------

pub struct ContextAggregator {
    platform: Arc<dyn VideoPlatform>,
    transcripts: Arc<dyn TranscriptSource>,
    cache: Arc<CacheService>,
    config: YoutubeConfig,
}

impl ContextAggregator {
    pub fn new(
        platform: Arc<dyn VideoPlatform>,
        transcripts: Arc<dyn TranscriptSource>,
        cache: Arc<CacheService>,
        config: YoutubeConfig,
    ) -> Self {
        Self {
            platform,
            transcripts,
            cache,
            config,
        }
    }

    /// Resolve a curated handle, caching the answer for the process lifetime.
    async fn channel_id(&self, handle: &str) -> Option<String> {
        if let Some(id) = self.cache.channel_id(handle) {
            return Some(id);
        }
        match self.platform.resolve_channel(handle).await {
            Ok(Some(id)) => {
                self.cache.put_channel_id(handle, id.clone());
                Some(id)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(handle, "failed to resolve channel: {e}");
                None
            }
        }
    }

    /// Recent videos about `player_name`: curated channels first, then a
    /// general search for the remaining slots. Each group is newest-first.
    pub async fn search_videos(&self, player_name: &str, max_results: usize) -> Vec<VideoSummary> {
        let key = VideoSearchKey {
            player_name: player_name.to_string(),
            max_results,
            days_back: self.config.days_back,
        };
        if let Some(cached) = self.cache.video_search(&key) {
            debug!(player_name, "video search served from cache");
            return cached.as_ref().clone();
        }
        if !self.platform.is_enabled() {
            warn!("video platform not configured, skipping video search");
            return Vec::new();
        }

        let published_after = Utc::now() - Duration::days(i64::from(self.config.days_back));
        let mut results: Vec<VideoSummary> = Vec::new();
        let mut curated_names: HashSet<String> = HashSet::new();

        for channel in &self.config.curated_channels {
            let Some(channel_id) = self.channel_id(&channel.handle).await else {
                warn!(handle = %channel.handle, "could not resolve channel, skipping");
                continue;
            };
            let query = VideoQuery {
                text: format!("{player_name} fantasy football"),
                channel_id: Some(channel_id),
                published_after,
                max_results: self.config.per_channel_results,
                order: SearchOrder::Date,
            };
            match self.platform.search(&query).await {
                Ok(hits) => {
                    debug!(handle = %channel.handle, hits = hits.len(), "curated search");
                    for hit in hits {
                        results.push(hit.into_summary(channel.name.clone(), true));
                        curated_names.insert(channel.name.clone());
                    }
                }
                Err(e) => warn!(handle = %channel.handle, "curated search failed: {e}"),
            }
        }

        if results.len() < max_results {
            let remaining = max_results - results.len();
            let query = VideoQuery {
                text: format!("{player_name} fantasy football analysis"),
                channel_id: None,
                published_after,
                max_results: u32::try_from(remaining + GENERAL_SEARCH_SLACK).unwrap_or(u32::MAX),
                order: SearchOrder::Relevance,
            };
            match self.platform.search(&query).await {
                Ok(hits) => {
                    for hit in hits {
                        if results.iter().any(|r| r.video_id == hit.video_id) {
                            continue;
                        }
                        if curated_names.contains(&hit.channel_title) {
                            continue;
                        }
                        let channel = hit.channel_title.clone();
                        results.push(hit.into_summary(channel, false));
                        if results.len() >= max_results {
                            break;
                        }
                    }
                }
                Err(e) => warn!("general video search failed: {e}"),
            }
        }

        let (mut curated, mut general): (Vec<_>, Vec<_>) =
            results.into_iter().partition(|v| v.is_curated);
        curated.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        general.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        info!(
            player_name,
            curated = curated.len(),
            general = general.len(),
            "video search complete"
        );

        let mut videos = curated;
        videos.extend(general);
        videos.truncate(max_results);

        self.cache.put_video_search(key, videos.clone());
        videos
    }

    /// Search, fetch transcripts concurrently, and extract mentions.
    pub async fn gather(&self, player_name: &str) -> PlayerContext {
        let videos = self.search_videos(player_name, self.config.max_videos).await;
        if videos.is_empty() {
            return PlayerContext::empty();
        }

        let fetches = videos.iter().map(|v| self.transcripts.transcript(&v.video_id));
        let outcomes = join_all(fetches).await;

        let mut mentions = Vec::new();
        for (video, outcome) in videos.iter().zip(outcomes) {
            match outcome {
                Ok(TranscriptOutcome::Text(text)) => {
                    for m in extract_mentions(&text, player_name, self.config.context_chars) {
                        mentions.push(VideoMention {
                            video_id: video.video_id.clone(),
                            channel_name: video.channel_name.clone(),
                            is_curated: video.is_curated,
                            published_at: video.published_at,
                            excerpt: m.text,
                            position: m.position,
                        });
                    }
                }
                Ok(TranscriptOutcome::Disabled) => {
                    debug!(video_id = %video.video_id, "transcripts disabled")
                }
                Ok(TranscriptOutcome::NotFound) => {
                    debug!(video_id = %video.video_id, "no transcript")
                }
                Err(e) => warn!(video_id = %video.video_id, "transcript fetch failed: {e}"),
            }
        }

        let excerpts: Vec<&str> = mentions.iter().map(|m| m.excerpt.as_str()).collect();
        let summary = summarize(&excerpts, self.config.summary_max_chars);
        PlayerContext {
            videos,
            mentions,
            summary,
        }
    }
}

// ---------------------------------------------------------------------------
// Mention extraction and summary
// ---------------------------------------------------------------------------

fn lowercase_chars(s: &str) -> Vec<char> {
    // One output char per input char keeps offsets aligned.
    s.chars()
        .map(|c| c.to_lowercase().next().unwrap_or(c))
        .collect()
}

fn find_chars(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() || from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

/// Case-insensitive excerpts around the full name and, for multi-word names,
/// the surname. A match within half a window of an accepted one is dropped.
/// At most [`MAX_MENTIONS_PER_TRANSCRIPT`], ordered by position.
pub fn extract_mentions(transcript: &str, player_name: &str, context_chars: usize) -> Vec<Mention> {
    let name = player_name.trim();
    if transcript.is_empty() || name.is_empty() {
        return Vec::new();
    }

    let original: Vec<char> = transcript.chars().collect();
    let lower = lowercase_chars(transcript);
    let name_len = name.chars().count();

    let mut terms = vec![lowercase_chars(name)];
    let words: Vec<&str> = name.split_whitespace().collect();
    if words.len() > 1 {
        if let Some(last) = words.last() {
            terms.push(lowercase_chars(last));
        }
    }

    let min_gap = context_chars / 2;
    let mut accepted: Vec<usize> = Vec::new();
    let mut mentions = Vec::new();

    for term in &terms {
        let mut start = 0;
        while let Some(pos) = find_chars(&lower, term, start) {
            start = pos + term.len();
            if accepted.iter().any(|fp| pos.abs_diff(*fp) < min_gap) {
                continue;
            }
            accepted.push(pos);

            let from = pos.saturating_sub(context_chars);
            let to = (pos + name_len + context_chars).min(original.len());
            let text: String = original[from..to].iter().collect();
            mentions.push(Mention {
                text: text.trim().to_string(),
                position: pos,
            });
        }
    }

    mentions.sort_by_key(|m| m.position);
    mentions.truncate(MAX_MENTIONS_PER_TRANSCRIPT);
    debug!(player_name, count = mentions.len(), "extracted transcript mentions");
    mentions
}

/// Join excerpts with a separator and cap the result at `max_chars`
/// characters plus a truncation marker.
pub fn summarize(excerpts: &[&str], max_chars: usize) -> String {
    if excerpts.is_empty() {
        return NO_MENTIONS_TEXT.to_string();
    }
    let combined = excerpts.join(MENTION_SEPARATOR);
    if combined.chars().count() <= max_chars {
        return combined;
    }
    let mut cut: String = combined.chars().take(max_chars).collect();
    cut.push_str(TRUNCATION_MARKER);
    cut
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use gridpulse_core::config::{CacheConfig, CuratedChannel};
    use gridpulse_core::sources::{SourceError, VideoHit};
    use std::sync::Mutex;

    // -- mention extraction --

    #[test]
    fn finds_full_name_and_surname() {
        let transcript = "Josh Allen was great. Later, ALLEN ran it in again.";
        let mentions = extract_mentions(transcript, "Josh Allen", 20);
        let positions: Vec<usize> = mentions.iter().map(|m| m.position).collect();
        // The surname inside the full-name match at 5 is too close to count.
        assert_eq!(positions, vec![0, 29]);
        assert_eq!(mentions[0].text, "Josh Allen was great. Later, A");
    }

    #[test]
    fn nearby_matches_are_suppressed() {
        // Surname at 5 is within half of a 750 window of the full match at 0.
        let transcript = "Josh Allen and Allen again";
        let mentions = extract_mentions(transcript, "Josh Allen", 750);
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].text, transcript);
    }

    #[test]
    fn caps_mentions_and_orders_by_position() {
        let transcript = "Kelce ".repeat(40);
        let mentions = extract_mentions(&transcript, "Travis Kelce", 4);
        assert_eq!(mentions.len(), MAX_MENTIONS_PER_TRANSCRIPT);
        assert!(mentions.windows(2).all(|w| w[0].position < w[1].position));
    }

    #[test]
    fn offsets_are_character_based() {
        let transcript = "Señor Ñandú says De'Von Achane is elite";
        let mentions = extract_mentions(transcript, "De'Von Achane", 20);
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].position, 17);
        assert_eq!(mentions[0].text, transcript);
    }

    #[test]
    fn empty_inputs_yield_nothing() {
        assert!(extract_mentions("", "Josh Allen", 750).is_empty());
        assert!(extract_mentions("some text", "  ", 750).is_empty());
        assert!(extract_mentions("nothing here", "Josh Allen", 750).is_empty());
    }

    #[test]
    fn summarize_joins_and_truncates() {
        assert_eq!(summarize(&[], 2000), NO_MENTIONS_TEXT);
        assert_eq!(summarize(&["a", "b"], 2000), "a\n\n---\n\nb");

        let long = "x".repeat(30);
        let out = summarize(&[&long], 10);
        assert_eq!(out, format!("{}{}", "x".repeat(10), TRUNCATION_MARKER));
    }

    // -- aggregator with fakes --

    struct FakePlatform {
        enabled: bool,
        queries: Mutex<Vec<VideoQuery>>,
        resolve_calls: Mutex<usize>,
    }

    fn hit(id: &str, channel: &str, day: u32) -> VideoHit {
        VideoHit {
            video_id: id.to_string(),
            title: format!("video {id}"),
            channel_title: channel.to_string(),
            published_at: Utc.with_ymd_and_hms(2025, 12, day, 12, 0, 0).unwrap(),
        }
    }

    #[async_trait]
    impl VideoPlatform for FakePlatform {
        fn is_enabled(&self) -> bool {
            self.enabled
        }

        async fn resolve_channel(&self, handle: &str) -> Result<Option<String>, SourceError> {
            *self.resolve_calls.lock().unwrap() += 1;
            Ok(match handle {
                "alpha" => Some("UC_ALPHA".into()),
                "beta" => Some("UC_BETA".into()),
                _ => None,
            })
        }

        async fn search(&self, query: &VideoQuery) -> Result<Vec<VideoHit>, SourceError> {
            self.queries.lock().unwrap().push(query.clone());
            Ok(match query.channel_id.as_deref() {
                Some("UC_ALPHA") => vec![hit("a1", "Alpha Raw", 1), hit("a2", "Alpha Raw", 3)],
                Some("UC_BETA") => vec![hit("b1", "Beta Raw", 2)],
                Some(_) => vec![],
                None => vec![
                    hit("a1", "Somebody", 9),
                    hit("g1", "Beta Show", 8),
                    hit("g2", "Indie Analyst", 4),
                    hit("g3", "Another Analyst", 6),
                    hit("g4", "Late Analyst", 7),
                ],
            })
        }
    }

    struct FakeTranscripts;

    #[async_trait]
    impl TranscriptSource for FakeTranscripts {
        async fn transcript(&self, video_id: &str) -> Result<TranscriptOutcome, SourceError> {
            Ok(match video_id {
                "a2" => TranscriptOutcome::Text("Start Josh Allen this week.".into()),
                "b1" => TranscriptOutcome::Disabled,
                "g3" => TranscriptOutcome::Text("I like Allen in this spot.".into()),
                _ => TranscriptOutcome::NotFound,
            })
        }
    }

    fn aggregator(enabled: bool) -> (ContextAggregator, Arc<FakePlatform>) {
        let platform = Arc::new(FakePlatform {
            enabled,
            queries: Mutex::new(Vec::new()),
            resolve_calls: Mutex::new(0),
        });
        let config = YoutubeConfig {
            max_videos: 5,
            context_chars: 750,
            curated_channels: vec![
                CuratedChannel::new("alpha", "Alpha Show"),
                CuratedChannel::new("missing", "Missing Show"),
                CuratedChannel::new("beta", "Beta Show"),
            ],
            ..Default::default()
        };
        let cache = Arc::new(CacheService::new(&CacheConfig::default()));
        let agg =
            ContextAggregator::new(platform.clone(), Arc::new(FakeTranscripts), cache, config);
        (agg, platform)
    }

    #[tokio::test]
    async fn curated_first_then_general_newest_first() {
        let (agg, platform) = aggregator(true);
        let videos = agg.search_videos("Josh Allen", 5).await;
        let ids: Vec<&str> = videos.iter().map(|v| v.video_id.as_str()).collect();
        // Curated: a2 (Dec 3), b1 (Dec 2), a1 (Dec 1). General skips the
        // duplicate a1 and the curated "Beta Show" channel, then fills two
        // slots (g2, g3) before sorting newest-first.
        assert_eq!(ids, vec!["a2", "b1", "a1", "g3", "g2"]);
        assert_eq!(videos[0].channel_name, "Alpha Show");
        assert!(videos[0].is_curated);
        assert!(!videos[4].is_curated);

        let queries = platform.queries.lock().unwrap();
        let general = queries.last().unwrap();
        assert_eq!(general.text, "Josh Allen fantasy football analysis");
        assert_eq!(general.order, SearchOrder::Relevance);
        assert_eq!(general.max_results, 2 + 5);
        assert_eq!(queries[0].text, "Josh Allen fantasy football");
        assert_eq!(queries[0].order, SearchOrder::Date);
        assert_eq!(queries[0].max_results, 2);
    }

    #[tokio::test]
    async fn searches_and_channel_ids_are_cached() {
        let (agg, platform) = aggregator(true);
        agg.search_videos("Josh Allen", 5).await;
        let first_queries = platform.queries.lock().unwrap().len();
        agg.search_videos("Josh Allen", 5).await;
        assert_eq!(platform.queries.lock().unwrap().len(), first_queries);

        // A different size is a different cache key, but handles stay resolved.
        agg.search_videos("Josh Allen", 3).await;
        assert_eq!(*platform.resolve_calls.lock().unwrap(), 3 + 1);
    }

    #[tokio::test]
    async fn gather_collects_mentions_from_available_transcripts() {
        let (agg, _) = aggregator(true);
        let ctx = agg.gather("Josh Allen").await;
        assert_eq!(ctx.videos.len(), 5);
        assert_eq!(ctx.mentions.len(), 2);
        assert_eq!(ctx.mentions[0].video_id, "a2");
        assert_eq!(ctx.mentions[1].video_id, "g3");
        assert_eq!(
            ctx.summary,
            "Start Josh Allen this week.\n\n---\n\nI like Allen in this spot."
        );
    }

    #[tokio::test]
    async fn disabled_platform_gives_empty_context() {
        let (agg, platform) = aggregator(false);
        let ctx = agg.gather("Josh Allen").await;
        assert_eq!(ctx, PlayerContext::empty());
        assert!(platform.queries.lock().unwrap().is_empty());
    }
}
