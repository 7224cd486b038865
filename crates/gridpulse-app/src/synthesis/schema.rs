// Result schemas for model output. Every field is always populated: parsed
// objects have missing or unrecognized fields replaced with defaults, and
// total failures are replaced by fixed fallback results.

use serde::Serialize;
use serde_json::Value;

pub const DEFAULT_REASONING: &str = "No reasoning provided.";
pub const DEFAULT_CONSENSUS: &str = "No consensus available";
pub const DEFAULT_MATCHUP_EDGE: &str = "No matchup edge identified.";
pub const DEFAULT_SOURCES: [&str; 2] = ["Google Search", "Sleeper API"];

/// Uppercase with `_` and spaces folded to `-`.
fn normalize(s: &str) -> String {
    s.trim().to_uppercase().replace(['_', ' '], "-")
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Start,
    Sit,
    Flex,
}

impl Recommendation {
    pub fn parse_lenient(s: &str) -> Option<Self> {
        match normalize(s).as_str() {
            "START" => Some(Recommendation::Start),
            "SIT" => Some(Recommendation::Sit),
            "FLEX" => Some(Recommendation::Flex),
            _ => None,
        }
    }
}

/// Ordinal confidence, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Conviction {
    #[serde(rename = "HIGH")]
    High,
    #[serde(rename = "MEDIUM-HIGH")]
    MediumHigh,
    #[serde(rename = "MIXED")]
    Mixed,
    #[serde(rename = "MEDIUM-LOW")]
    MediumLow,
    #[serde(rename = "LOW")]
    Low,
}

impl Conviction {
    pub fn parse_lenient(s: &str) -> Option<Self> {
        match normalize(s).as_str() {
            "HIGH" => Some(Conviction::High),
            "MEDIUM-HIGH" => Some(Conviction::MediumHigh),
            "MIXED" => Some(Conviction::Mixed),
            "MEDIUM-LOW" => Some(Conviction::MediumLow),
            "LOW" => Some(Conviction::Low),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn parse_lenient(s: &str) -> Option<Self> {
        match normalize(s).as_str() {
            "LOW" => Some(RiskLevel::Low),
            "MODERATE" | "MEDIUM" => Some(RiskLevel::Moderate),
            "HIGH" => Some(RiskLevel::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Winner {
    A,
    B,
    #[serde(rename = "TOSS_UP")]
    TossUp,
}

impl Winner {
    pub fn parse_lenient(s: &str) -> Option<Self> {
        match normalize(s).as_str() {
            "A" | "PLAYER-A" => Some(Winner::A),
            "B" | "PLAYER-B" => Some(Winner::B),
            "TOSS-UP" | "TOSSUP" => Some(Winner::TossUp),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Field readers
// ---------------------------------------------------------------------------

fn text_field(obj: &Value, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// A list of strings. A bare string becomes a one-element list; non-string
/// items are dropped. `None` when the key is missing or not list-like.
fn list_field(obj: &Value, key: &str) -> Option<Vec<String>> {
    match obj.get(key)? {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        Value::String(s) if !s.trim().is_empty() => Some(vec![s.trim().to_string()]),
        _ => None,
    }
}

fn enum_field<T>(obj: &Value, key: &str, parse: fn(&str) -> Option<T>) -> Option<T> {
    obj.get(key).and_then(Value::as_str).and_then(parse)
}

fn default_sources() -> Vec<String> {
    DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// SynthesisResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisResult {
    pub recommendation: Recommendation,
    pub conviction: Conviction,
    pub reasoning: String,
    pub key_factors: Vec<String>,
    pub risk_level: RiskLevel,
    pub expert_consensus: String,
    pub sources_used: Vec<String>,
}

impl SynthesisResult {
    /// Build from a parsed object, defaulting whatever is missing.
    pub fn from_value(obj: &Value) -> Self {
        Self {
            recommendation: enum_field(obj, "recommendation", Recommendation::parse_lenient)
                .unwrap_or(Recommendation::Flex),
            conviction: enum_field(obj, "conviction", Conviction::parse_lenient)
                .unwrap_or(Conviction::Low),
            reasoning: text_field(obj, "reasoning")
                .unwrap_or_else(|| DEFAULT_REASONING.to_string()),
            key_factors: list_field(obj, "key_factors").unwrap_or_default(),
            risk_level: enum_field(obj, "risk_level", RiskLevel::parse_lenient)
                .unwrap_or(RiskLevel::Moderate),
            expert_consensus: text_field(obj, "expert_consensus")
                .unwrap_or_else(|| DEFAULT_CONSENSUS.to_string()),
            sources_used: list_field(obj, "sources_used").unwrap_or_else(default_sources),
        }
    }

    /// Returned when no extraction strategy produced an object.
    pub fn parse_failure() -> Self {
        Self {
            recommendation: Recommendation::Flex,
            conviction: Conviction::Low,
            reasoning: "Unable to generate analysis due to parsing error.".to_string(),
            key_factors: vec!["Analysis unavailable".to_string()],
            risk_level: RiskLevel::Moderate,
            expert_consensus: DEFAULT_CONSENSUS.to_string(),
            sources_used: vec!["Sleeper API".to_string()],
        }
    }

    /// Returned when the model could not be called at all.
    pub fn model_failure(cause: &str) -> Self {
        Self {
            recommendation: Recommendation::Flex,
            conviction: Conviction::Low,
            reasoning: format!("Error generating analysis: {cause}"),
            key_factors: vec!["Analysis error".to_string()],
            risk_level: RiskLevel::High,
            expert_consensus: "Unable to fetch expert opinions".to_string(),
            sources_used: vec!["Sleeper API".to_string()],
        }
    }
}

// ---------------------------------------------------------------------------
// ComparisonResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub winner: Winner,
    pub conviction: Conviction,
    pub reasoning: String,
    pub player_a_advantages: Vec<String>,
    pub player_b_advantages: Vec<String>,
    pub matchup_edge: String,
    pub sources_used: Vec<String>,
}

impl ComparisonResult {
    pub fn from_value(obj: &Value) -> Self {
        Self {
            winner: enum_field(obj, "winner", Winner::parse_lenient).unwrap_or(Winner::TossUp),
            conviction: enum_field(obj, "conviction", Conviction::parse_lenient)
                .unwrap_or(Conviction::Low),
            reasoning: text_field(obj, "reasoning")
                .unwrap_or_else(|| DEFAULT_REASONING.to_string()),
            player_a_advantages: list_field(obj, "player_a_advantages").unwrap_or_default(),
            player_b_advantages: list_field(obj, "player_b_advantages").unwrap_or_default(),
            matchup_edge: text_field(obj, "matchup_edge")
                .unwrap_or_else(|| DEFAULT_MATCHUP_EDGE.to_string()),
            sources_used: list_field(obj, "sources_used").unwrap_or_else(default_sources),
        }
    }

    pub fn parse_failure() -> Self {
        Self {
            winner: Winner::TossUp,
            conviction: Conviction::Low,
            reasoning: "Unable to generate comparison due to parsing error.".to_string(),
            player_a_advantages: Vec::new(),
            player_b_advantages: Vec::new(),
            matchup_edge: DEFAULT_MATCHUP_EDGE.to_string(),
            sources_used: vec!["Sleeper API".to_string()],
        }
    }

    pub fn model_failure(cause: &str) -> Self {
        Self {
            winner: Winner::TossUp,
            conviction: Conviction::Low,
            reasoning: format!("Error generating comparison: {cause}"),
            player_a_advantages: Vec::new(),
            player_b_advantages: Vec::new(),
            matchup_edge: "Unable to evaluate matchup".to_string(),
            sources_used: vec!["Sleeper API".to_string()],
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
