// Upstream-shaped data: players, weekly stat tables, and video metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// Fantasy-relevant NFL positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    QB,
    RB,
    WR,
    TE,
    K,
    DEF,
}

impl Position {
    pub const ALL: [Position; 6] = [
        Position::QB,
        Position::RB,
        Position::WR,
        Position::TE,
        Position::K,
        Position::DEF,
    ];

    /// Parse a position abbreviation. Accepts `DST`/`D/ST` as aliases for
    /// `DEF`. Anything outside the six skill positions yields `None`.
    pub fn from_str_pos(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "QB" => Some(Position::QB),
            "RB" => Some(Position::RB),
            "WR" => Some(Position::WR),
            "TE" => Some(Position::TE),
            "K" => Some(Position::K),
            "DEF" | "DST" | "D/ST" => Some(Position::DEF),
            _ => None,
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            Position::QB => "QB",
            Position::RB => "RB",
            Position::WR => "WR",
            Position::TE => "TE",
            Position::K => "K",
            Position::DEF => "DEF",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_str())
    }
}

// ---------------------------------------------------------------------------
// Player directory
// ---------------------------------------------------------------------------

/// Stable identity of a player as exposed to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerIdentity {
    pub id: String,
    pub name: String,
    pub position: Position,
    pub team: Option<String>,
    pub bye_week: Option<u32>,
}

impl PlayerIdentity {
    /// Whether the player's bye falls on `week`.
    pub fn is_on_bye(&self, week: u32) -> bool {
        self.bye_week == Some(week)
    }
}

/// One raw record of the bulk player directory. Every field is optional
/// upstream; missing names become empty strings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DirectoryEntry {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub search_full_name: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub bye_week: Option<u32>,
    #[serde(default)]
    pub search_rank: Option<u32>,
}

/// Rank assigned to directory entries without a search rank.
pub const UNRANKED: u32 = 9999;

impl DirectoryEntry {
    pub fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        )
    }

    pub fn rank(&self) -> u32 {
        self.search_rank.unwrap_or(UNRANKED)
    }

    /// Skill position, if the entry has one.
    pub fn skill_position(&self) -> Option<Position> {
        self.position.as_deref().and_then(Position::from_str_pos)
    }

    /// Convert into a [`PlayerIdentity`]. Entries outside the skill positions
    /// are not addressable and yield `None`.
    pub fn to_identity(&self, id: &str) -> Option<PlayerIdentity> {
        Some(PlayerIdentity {
            id: id.to_string(),
            name: self.full_name(),
            position: self.skill_position()?,
            team: self.team.clone().filter(|t| !t.is_empty()),
            bye_week: self.bye_week,
        })
    }
}

/// The whole player directory keyed by upstream player id.
pub type PlayerDirectory = HashMap<String, DirectoryEntry>;

/// Parse the directory document, skipping records that fail to deserialize.
pub fn parse_directory(value: Value) -> PlayerDirectory {
    let Value::Object(map) = value else {
        debug!("player directory payload is not an object");
        return PlayerDirectory::new();
    };
    map.into_iter()
        .filter_map(|(id, raw)| match serde_json::from_value::<DirectoryEntry>(raw) {
            Ok(entry) => Some((id, entry)),
            Err(e) => {
                debug!(player_id = %id, "skipping malformed directory entry: {e}");
                None
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Weekly stat tables
// ---------------------------------------------------------------------------

/// Cache key for per-week tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeekKey {
    pub season: u32,
    pub week: u32,
}

impl WeekKey {
    pub fn new(season: u32, week: u32) -> Self {
        Self { season, week }
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} week {}", self.season, self.week)
    }
}

/// Scoring fields of one player's stat bag. Other stats are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StatLine {
    #[serde(default)]
    pub pts_ppr: Option<f64>,
    #[serde(default)]
    pub pts_half_ppr: Option<f64>,
    #[serde(default)]
    pub pts_std: Option<f64>,
    #[serde(default)]
    pub pts: Option<f64>,
}

impl StatLine {
    /// Fantasy points, preferring PPR, then half-PPR, then standard, then the
    /// generic total. A zero field defers to the next one; 0.0 when none of
    /// them carries points.
    pub fn points(&self) -> f64 {
        [self.pts_ppr, self.pts_half_ppr, self.pts_std, self.pts]
            .into_iter()
            .flatten()
            .find(|p| *p != 0.0 && p.is_finite())
            .unwrap_or(0.0)
    }
}

/// A per-(season, week) table of stat lines keyed by player id. Used for both
/// projections and actual results, which share one shape upstream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatTable {
    entries: HashMap<String, StatLine>,
}

impl StatTable {
    pub fn new(entries: HashMap<String, StatLine>) -> Self {
        Self { entries }
    }

    /// Parse an upstream payload. Accepts either an object keyed by player
    /// id or an array of records carrying a `player_id`. A record's stats may
    /// sit under a nested `stats` key or directly on the record. Empty and
    /// malformed records are skipped.
    pub fn from_json(value: Value) -> Self {
        let pairs: Vec<(String, Value)> = match value {
            Value::Object(map) => map.into_iter().collect(),
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| {
                    let id = item.get("player_id")?.as_str()?.to_string();
                    Some((id, item))
                })
                .collect(),
            _ => Vec::new(),
        };

        let mut entries = HashMap::with_capacity(pairs.len());
        for (id, raw) in pairs {
            let bag = match raw {
                Value::Object(mut obj) => match obj.remove("stats") {
                    Some(nested @ Value::Object(_)) => nested,
                    _ => Value::Object(obj),
                },
                _ => continue,
            };
            if bag.as_object().is_some_and(|o| o.is_empty()) {
                continue;
            }
            match serde_json::from_value::<StatLine>(bag) {
                Ok(line) => {
                    entries.insert(id, line);
                }
                Err(e) => debug!(player_id = %id, "skipping malformed stat line: {e}"),
            }
        }
        Self { entries }
    }

    pub fn get(&self, player_id: &str) -> Option<&StatLine> {
        self.entries.get(player_id)
    }

    /// Points for a player, `None` when the player has no entry this week.
    pub fn points_for(&self, player_id: &str) -> Option<f64> {
        self.get(player_id).map(StatLine::points)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Video metadata
// ---------------------------------------------------------------------------

/// One video returned by the video platform search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoSummary {
    pub video_id: String,
    pub title: String,
    pub channel_name: String,
    pub published_at: DateTime<Utc>,
    pub url: String,
    pub is_curated: bool,
}

impl VideoSummary {
    pub fn watch_url(video_id: &str) -> String {
        format!("https://www.youtube.com/watch?v={video_id}")
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
