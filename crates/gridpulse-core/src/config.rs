// Configuration loading and parsing (pulse.toml, credentials.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

/// Upper bound for the recency lookback window, in weeks.
pub const MAX_LOOKBACK: u32 = 8;

/// Upper bound for a scan pool.
pub const MAX_SCAN_POOL: usize = 200;

/// Last week of the NFL regular season.
pub const MAX_WEEK: u32 = 18;

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub season: SeasonConfig,
    pub sleeper: SleeperConfig,
    pub youtube: YoutubeConfig,
    pub llm: LlmConfig,
    pub cache: CacheConfig,
    pub http: HttpConfig,
    pub scan: ScanConfig,
    pub recency: RecencyConfig,
    pub credentials: CredentialsConfig,
}

// ---------------------------------------------------------------------------
// pulse.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire pulse.toml file. Every section
/// is optional and falls back to its `Default`.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct PulseFile {
    season: SeasonConfig,
    sleeper: SleeperConfig,
    youtube: YoutubeConfig,
    llm: LlmConfig,
    cache: CacheConfig,
    http: HttpConfig,
    scan: ScanConfig,
    recency: RecencyConfig,
}

/// The NFL season and week the pipeline reports on.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SeasonConfig {
    pub season: u32,
    pub week: u32,
}

impl Default for SeasonConfig {
    fn default() -> Self {
        Self {
            season: 2025,
            week: 16,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SleeperConfig {
    pub base_url: String,
}

impl Default for SleeperConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.sleeper.app/v1".to_string(),
        }
    }
}

/// A hand-picked channel searched before the general video search.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CuratedChannel {
    /// Human-readable handle, without the leading `@`.
    pub handle: String,
    /// Display name attached to results from this channel.
    pub name: String,
}

impl CuratedChannel {
    pub fn new(handle: &str, name: &str) -> Self {
        Self {
            handle: handle.to_string(),
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct YoutubeConfig {
    pub api_base_url: String,
    pub transcript_base_url: String,
    /// Only videos published within this many days are considered.
    pub days_back: u32,
    pub max_videos: usize,
    pub per_channel_results: u32,
    /// Characters kept on each side of a mention.
    pub context_chars: usize,
    pub summary_max_chars: usize,
    /// Searched in order, before the general search.
    pub curated_channels: Vec<CuratedChannel>,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://www.googleapis.com/youtube/v3".to_string(),
            transcript_base_url: "https://www.youtube.com/api/timedtext".to_string(),
            days_back: 90,
            max_videos: 5,
            per_channel_results: 2,
            context_chars: 750,
            summary_max_chars: 2000,
            curated_channels: vec![
                CuratedChannel::new("thefantasyfootballers", "The Fantasy Footballers"),
                CuratedChannel::new("fantasypros", "FantasyPros"),
                CuratedChannel::new("fantasyfootballtoday", "Fantasy Football Today (CBS)"),
                CuratedChannel::new("lateroundff", "Late-Round Fantasy Football"),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub api_base_url: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// Attach the web-search grounding tool to synthesis calls.
    pub grounding: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gemini-3-flash-preview".to_string(),
            api_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            temperature: 0.7,
            max_output_tokens: 2048,
            grounding: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub sleeper_ttl_secs: u64,
    pub projection_capacity: u64,
    pub stats_capacity: u64,
    pub video_search_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sleeper_ttl_secs: 5 * 60,
            projection_capacity: 100,
            stats_capacity: 500,
            video_search_ttl_secs: 6 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub pool_size: usize,
    pub max_concurrency: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            pool_size: 50,
            max_concurrency: 8,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecencyConfig {
    pub lookback: u32,
}

impl Default for RecencyConfig {
    fn default() -> Self {
        Self { lookback: 3 }
    }
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub gemini_api_key: Option<String>,
    pub youtube_api_key: Option<String>,
}

impl CredentialsConfig {
    /// Fill keys missing from credentials.toml using `lookup` (normally the
    /// process environment). Empty values count as missing.
    pub fn fill_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        fill_key(&mut self.gemini_api_key, lookup("GEMINI_API_KEY"));
        fill_key(&mut self.youtube_api_key, lookup("YOUTUBE_API_KEY"));
    }
}

fn fill_key(slot: &mut Option<String>, candidate: Option<String>) {
    let missing = slot.as_deref().map_or(true, str::is_empty);
    if missing {
        if let Some(value) = candidate.filter(|v| !v.is_empty()) {
            *slot = Some(value);
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/pulse.toml` and (optionally)
/// `config/credentials.toml`, both relative to `base_dir`. Environment
/// variables are not consulted here; see [`load_config`].
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- pulse.toml (required) ---
    let pulse_path = config_dir.join("pulse.toml");
    let pulse_text = read_file(&pulse_path)?;
    let pulse: PulseFile = toml::from_str(&pulse_text).map_err(|e| ConfigError::ParseError {
        path: pulse_path.clone(),
        source: e,
    })?;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        season: pulse.season,
        sleeper: pulse.sleeper,
        youtube: pulse.youtube,
        llm: pulse.llm,
        cache: pulse.cache,
        http: pulse.http,
        scan: pulse.scan,
        recency: pulse.recency,
        credentials,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };

        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working
/// directory, seeding `config/` from `defaults/` first and filling API keys
/// from the environment.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    let mut config = load_config_from(&cwd)?;
    config.credentials.fill_from(|key| std::env::var(key).ok());
    Ok(config)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_string(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let week = config.season.week;
    if !(1..=MAX_WEEK).contains(&week) {
        return Err(invalid(
            "season.week",
            format!("must be between 1 and {MAX_WEEK}, got {week}"),
        ));
    }

    let lookback = config.recency.lookback;
    if !(1..=MAX_LOOKBACK).contains(&lookback) {
        return Err(invalid(
            "recency.lookback",
            format!("must be between 1 and {MAX_LOOKBACK}, got {lookback}"),
        ));
    }

    let temp = config.llm.temperature;
    if !(0.0..=2.0).contains(&temp) {
        return Err(invalid(
            "llm.temperature",
            format!("must be between 0.0 and 2.0 inclusive, got {temp}"),
        ));
    }

    if config.scan.pool_size == 0 || config.scan.pool_size > MAX_SCAN_POOL {
        return Err(invalid(
            "scan.pool_size",
            format!(
                "must be between 1 and {MAX_SCAN_POOL}, got {}",
                config.scan.pool_size
            ),
        ));
    }

    // Counts and budgets must be positive
    let positive_fields: &[(&str, u64)] = &[
        ("llm.max_output_tokens", u64::from(config.llm.max_output_tokens)),
        ("scan.max_concurrency", config.scan.max_concurrency as u64),
        ("youtube.max_videos", config.youtube.max_videos as u64),
        ("youtube.per_channel_results", u64::from(config.youtube.per_channel_results)),
        ("youtube.context_chars", config.youtube.context_chars as u64),
        ("youtube.summary_max_chars", config.youtube.summary_max_chars as u64),
        ("youtube.days_back", u64::from(config.youtube.days_back)),
        ("cache.sleeper_ttl_secs", config.cache.sleeper_ttl_secs),
        ("cache.projection_capacity", config.cache.projection_capacity),
        ("cache.stats_capacity", config.cache.stats_capacity),
        ("cache.video_search_ttl_secs", config.cache.video_search_ttl_secs),
        ("http.timeout_secs", config.http.timeout_secs),
    ];
    for (name, val) in positive_fields {
        if *val == 0 {
            return Err(invalid(name, "must be > 0"));
        }
    }

    if config.sleeper.base_url.trim().is_empty() {
        return Err(invalid("sleeper.base_url", "must not be empty"));
    }

    for (i, channel) in config.youtube.curated_channels.iter().enumerate() {
        if channel.handle.trim().is_empty() {
            return Err(invalid(
                &format!("youtube.curated_channels[{i}].handle"),
                "must not be empty",
            ));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    /// Path to the repository-level `defaults/` directory.
    fn repo_root() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
    }

    fn fresh_dir(name: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        tmp
    }

    #[test]
    fn load_valid_config_from_project_defaults() {
        let tmp = fresh_dir("gridpulse_config_defaults");
        fs::copy(
            repo_root().join("defaults/pulse.toml"),
            tmp.join("config/pulse.toml"),
        )
        .unwrap();

        let config = load_config_from(&tmp).expect("should load valid config");

        assert_eq!(config.season.season, 2025);
        assert_eq!(config.season.week, 16);
        assert_eq!(config.sleeper.base_url, "https://api.sleeper.app/v1");
        assert_eq!(config.recency.lookback, 3);
        assert_eq!(config.youtube.days_back, 90);
        assert_eq!(config.youtube.context_chars, 750);
        assert_eq!(config.youtube.curated_channels.len(), 4);
        assert_eq!(config.youtube.curated_channels[0].handle, "thefantasyfootballers");
        assert_eq!(config.llm.max_output_tokens, 2048);
        assert!(config.llm.grounding);
        assert_eq!(config.cache.sleeper_ttl_secs, 300);
        assert_eq!(config.scan.max_concurrency, 8);
        assert!(config.credentials.gemini_api_key.is_none());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn partial_file_falls_back_to_section_defaults() {
        let tmp = fresh_dir("gridpulse_config_partial");
        fs::write(
            tmp.join("config/pulse.toml"),
            "[season]\nseason = 2024\nweek = 9\n",
        )
        .unwrap();

        let config = load_config_from(&tmp).expect("should load partial config");
        assert_eq!(config.season.season, 2024);
        assert_eq!(config.season.week, 9);
        assert_eq!(config.recency.lookback, 3);
        assert_eq!(config.youtube.max_videos, 5);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn credentials_toml_with_keys() {
        let tmp = fresh_dir("gridpulse_config_creds");
        fs::write(tmp.join("config/pulse.toml"), "").unwrap();
        fs::write(
            tmp.join("config/credentials.toml"),
            "gemini_api_key = \"gm-test\"\nyoutube_api_key = \"yt-test\"\n",
        )
        .unwrap();

        let config = load_config_from(&tmp).expect("should load with credentials.toml");
        assert_eq!(config.credentials.gemini_api_key.as_deref(), Some("gm-test"));
        assert_eq!(config.credentials.youtube_api_key.as_deref(), Some("yt-test"));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn environment_fills_only_missing_keys() {
        let mut creds = CredentialsConfig {
            gemini_api_key: Some("from-file".into()),
            youtube_api_key: Some(String::new()),
        };
        creds.fill_from(|key| match key {
            "GEMINI_API_KEY" => Some("from-env".into()),
            "YOUTUBE_API_KEY" => Some("yt-env".into()),
            _ => None,
        });
        assert_eq!(creds.gemini_api_key.as_deref(), Some("from-file"));
        assert_eq!(creds.youtube_api_key.as_deref(), Some("yt-env"));
    }

    #[test]
    fn rejects_week_zero() {
        let tmp = fresh_dir("gridpulse_config_week_zero");
        fs::write(tmp.join("config/pulse.toml"), "[season]\nseason = 2025\nweek = 0\n").unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "season.week"),
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_lookback_above_max() {
        let tmp = fresh_dir("gridpulse_config_lookback");
        fs::write(tmp.join("config/pulse.toml"), "[recency]\nlookback = 9\n").unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "recency.lookback"),
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_concurrency() {
        let tmp = fresh_dir("gridpulse_config_concurrency");
        fs::write(tmp.join("config/pulse.toml"), "[scan]\nmax_concurrency = 0\n").unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "scan.max_concurrency")
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_temperature_out_of_range() {
        let tmp = fresh_dir("gridpulse_config_temperature");
        fs::write(tmp.join("config/pulse.toml"), "[llm]\ntemperature = 3.5\n").unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "llm.temperature"),
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_not_found_for_missing_pulse_toml() {
        let tmp = fresh_dir("gridpulse_config_missing");

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::FileNotFound { path } => assert!(path.ends_with("pulse.toml")),
            other => panic!("expected FileNotFound, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let tmp = fresh_dir("gridpulse_config_invalid");
        fs::write(tmp.join("config/pulse.toml"), "this is not valid [[[ toml").unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ParseError { path, .. } => assert!(path.ends_with("pulse.toml")),
            other => panic!("expected ParseError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_copies_missing_and_skips_examples() {
        let tmp = std::env::temp_dir().join("gridpulse_config_ensure");
        let _ = fs::remove_dir_all(&tmp);
        let defaults_dir = tmp.join("defaults");
        fs::create_dir_all(&defaults_dir).unwrap();

        fs::copy(
            repo_root().join("defaults/pulse.toml"),
            defaults_dir.join("pulse.toml"),
        )
        .unwrap();
        fs::write(
            defaults_dir.join("credentials.toml.example"),
            "gemini_api_key = \"...\"\n",
        )
        .unwrap();

        let copied = ensure_config_files(&tmp).expect("should succeed");
        assert_eq!(copied.len(), 1);
        assert!(tmp.join("config/pulse.toml").exists());
        assert!(!tmp.join("config/credentials.toml.example").exists());

        // Second run leaves existing files alone.
        fs::write(tmp.join("config/pulse.toml"), "# custom\n").unwrap();
        let copied = ensure_config_files(&tmp).expect("should succeed");
        assert!(copied.is_empty());
        let content = fs::read_to_string(tmp.join("config/pulse.toml")).unwrap();
        assert_eq!(content, "# custom\n");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_errors_when_both_dirs_missing() {
        let tmp = std::env::temp_dir().join("gridpulse_config_both_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        let err = ensure_config_files(&tmp).unwrap_err();
        match &err {
            ConfigError::DefaultsCopyError { message } => {
                assert!(message.contains("neither defaults/ nor config/"));
            }
            other => panic!("expected DefaultsCopyError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }
}
