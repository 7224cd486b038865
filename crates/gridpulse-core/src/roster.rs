// League-integration roster rows and their link into the player directory.
//
// The league provider itself (and its OAuth flow) lives outside this crate;
// only the row schema and the cross-reference are provided here.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::model::{PlayerDirectory, PlayerIdentity, Position};

/// Display name used when a row carries no name.
pub const UNKNOWN_PLAYER_NAME: &str = "Unknown";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
struct RosterName {
    #[serde(default)]
    full: Option<String>,
}

/// One roster row as delivered by the league provider. Every field is
/// optional upstream.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LeagueRosterPlayer {
    /// Provider player id; numeric ids are kept in their decimal form.
    #[serde(default, deserialize_with = "string_or_number")]
    pub player_id: Option<String>,
    /// Game-scoped key, e.g. `449.p.33389`.
    #[serde(default)]
    pub player_key: Option<String>,
    #[serde(default)]
    name: Option<RosterName>,
    #[serde(default)]
    pub display_position: Option<String>,
    #[serde(default)]
    pub editorial_team_abbr: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub injury_status: Option<String>,
}

/// Flattened view returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterEntry {
    pub player_id: Option<String>,
    pub player_key: Option<String>,
    pub name: String,
    pub position: Option<String>,
    pub team: Option<String>,
    pub status: Option<String>,
    pub injury_status: Option<String>,
    /// Matching directory player, when one could be found.
    pub player: Option<PlayerIdentity>,
}

impl LeagueRosterPlayer {
    /// Full display name, `"Unknown"` when absent.
    pub fn full_name(&self) -> &str {
        self.name
            .as_ref()
            .and_then(|n| n.full.as_deref())
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(UNKNOWN_PLAYER_NAME)
    }

    /// Primary position. Multi-position strings such as `WR,TE` use the first.
    pub fn position(&self) -> Option<Position> {
        self.display_position
            .as_deref()
            .and_then(|p| p.split(',').next())
            .and_then(Position::from_str_pos)
    }

    /// Find this row's player in the directory by normalized name, position
    /// and team. Without a team on the row, name and position must be unique.
    pub fn cross_reference(&self, directory: &PlayerDirectory) -> Option<PlayerIdentity> {
        let name = normalize_name(self.full_name());
        if name.is_empty() || self.full_name() == UNKNOWN_PLAYER_NAME {
            return None;
        }
        let position = self.position();
        let team = self
            .editorial_team_abbr
            .as_deref()
            .map(|t| t.to_uppercase());

        let mut candidates: Vec<PlayerIdentity> = directory
            .iter()
            .filter_map(|(id, entry)| entry.to_identity(id))
            .filter(|p| normalize_name(&p.name) == name)
            .filter(|p| position.map_or(true, |pos| pos == p.position))
            .collect();

        if let Some(team) = &team {
            let on_team: Vec<PlayerIdentity> = candidates
                .iter()
                .filter(|p| p.team.as_deref().map(str::to_uppercase).as_ref() == Some(team))
                .cloned()
                .collect();
            if !on_team.is_empty() {
                candidates = on_team;
            }
        }

        if candidates.len() == 1 {
            candidates.pop()
        } else {
            None
        }
    }

    pub fn to_entry(&self, directory: &PlayerDirectory) -> RosterEntry {
        RosterEntry {
            player_id: self.player_id.clone(),
            player_key: self.player_key.clone(),
            name: self.full_name().to_string(),
            position: self.display_position.clone(),
            team: self.editorial_team_abbr.clone(),
            status: self.status.clone(),
            injury_status: self.injury_status.clone(),
            player: self.cross_reference(directory),
        }
    }
}

/// Lowercase, drop punctuation and generational suffixes so `D.J. Moore` and
/// `DJ Moore`, or `Kenneth Walker III` and `Kenneth Walker`, compare equal.
pub fn normalize_name(name: &str) -> String {
    const SUFFIXES: [&str; 5] = ["jr", "sr", "ii", "iii", "iv"];
    name.split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|w| !w.is_empty() && !SUFFIXES.contains(&w.as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
