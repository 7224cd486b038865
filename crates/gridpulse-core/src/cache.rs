// Process-wide upstream caches, owned by one injectable service.
//
// The player directory never expires; it is dropped only by `invalidate_*` or
// by restarting the process. Weekly tables and video searches are bounded and
// expire after their configured TTL. Concurrent misses for the same key may
// both fetch upstream; the later insert wins.

use moka::sync::Cache;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::debug;

use crate::config::CacheConfig;
use crate::model::{PlayerDirectory, StatTable, VideoSummary, WeekKey};

/// Key for cached video searches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoSearchKey {
    pub player_name: String,
    pub max_results: usize,
    pub days_back: u32,
}

pub struct CacheService {
    directory: RwLock<Option<Arc<PlayerDirectory>>>,
    projections: Cache<WeekKey, Arc<StatTable>>,
    stats: Cache<WeekKey, Arc<StatTable>>,
    channel_ids: Cache<String, String>,
    video_searches: Cache<VideoSearchKey, Arc<Vec<VideoSummary>>>,
}

impl CacheService {
    pub fn new(config: &CacheConfig) -> Self {
        let ttl = Duration::from_secs(config.sleeper_ttl_secs);
        Self {
            directory: RwLock::new(None),
            projections: Cache::builder()
                .max_capacity(config.projection_capacity)
                .time_to_live(ttl)
                .build(),
            stats: Cache::builder()
                .max_capacity(config.stats_capacity)
                .time_to_live(ttl)
                .build(),
            channel_ids: Cache::builder().build(),
            video_searches: Cache::builder()
                .max_capacity(256)
                .time_to_live(Duration::from_secs(config.video_search_ttl_secs))
                .build(),
        }
    }

    // --- player directory ---

    pub fn directory(&self) -> Option<Arc<PlayerDirectory>> {
        self.directory
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn put_directory(&self, directory: PlayerDirectory) -> Arc<PlayerDirectory> {
        let directory = Arc::new(directory);
        *self
            .directory
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Arc::clone(&directory));
        debug!(players = directory.len(), "player directory cached");
        directory
    }

    pub fn invalidate_directory(&self) {
        *self
            .directory
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }

    // --- weekly projections ---

    pub fn projections(&self, key: WeekKey) -> Option<Arc<StatTable>> {
        self.projections.get(&key)
    }

    pub fn put_projections(&self, key: WeekKey, table: StatTable) -> Arc<StatTable> {
        let table = Arc::new(table);
        self.projections.insert(key, Arc::clone(&table));
        table
    }

    pub fn invalidate_projections(&self, key: WeekKey) {
        self.projections.invalidate(&key);
    }

    // --- weekly actual stats ---

    pub fn stats(&self, key: WeekKey) -> Option<Arc<StatTable>> {
        self.stats.get(&key)
    }

    pub fn put_stats(&self, key: WeekKey, table: StatTable) -> Arc<StatTable> {
        let table = Arc::new(table);
        self.stats.insert(key, Arc::clone(&table));
        table
    }

    pub fn invalidate_stats(&self, key: WeekKey) {
        self.stats.invalidate(&key);
    }

    // --- channel handles ---

    pub fn channel_id(&self, handle: &str) -> Option<String> {
        self.channel_ids.get(handle)
    }

    pub fn put_channel_id(&self, handle: &str, channel_id: String) {
        self.channel_ids.insert(handle.to_string(), channel_id);
    }

    // --- video searches ---

    pub fn video_search(&self, key: &VideoSearchKey) -> Option<Arc<Vec<VideoSummary>>> {
        self.video_searches.get(key)
    }

    pub fn put_video_search(&self, key: VideoSearchKey, videos: Vec<VideoSummary>) {
        self.video_searches.insert(key, Arc::new(videos));
    }

    /// Drop every cached value.
    pub fn clear(&self) {
        self.invalidate_directory();
        self.projections.invalidate_all();
        self.stats.invalidate_all();
        self.channel_ids.invalidate_all();
        self.video_searches.invalidate_all();
    }
}

impl std::fmt::Debug for CacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService")
            .field("projections", &self.projections.entry_count())
            .field("stats", &self.stats.entry_count())
            .field("channel_ids", &self.channel_ids.entry_count())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
