// Read-through access to the fantasy data source.
//
// Every read consults the cache first. A miss fetches upstream; a "not found"
// answer is cached as an empty table, while transport and payload failures
// are logged and reported as an empty value without being cached, so the
// next read retries.

use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::CacheService;
use crate::model::{parse_directory, PlayerDirectory, PlayerIdentity, Position, StatTable, WeekKey};
use crate::sources::FantasyDataSource;

#[derive(Clone)]
pub struct PlayerStore {
    source: Arc<dyn FantasyDataSource>,
    cache: Arc<CacheService>,
}

impl PlayerStore {
    pub fn new(source: Arc<dyn FantasyDataSource>, cache: Arc<CacheService>) -> Self {
        Self { source, cache }
    }

    pub fn cache(&self) -> &Arc<CacheService> {
        &self.cache
    }

    // --- directory ---

    /// The full player directory.
    pub async fn directory(&self) -> Arc<PlayerDirectory> {
        if let Some(dir) = self.cache.directory() {
            return dir;
        }
        match self.source.players().await {
            Ok(raw) => {
                let dir = parse_directory(raw);
                info!(players = dir.len(), "loaded player directory");
                self.cache.put_directory(dir)
            }
            Err(e) => {
                warn!("player directory fetch failed: {e}");
                Arc::new(PlayerDirectory::new())
            }
        }
    }

    /// Look up one addressable player by id.
    pub async fn player(&self, player_id: &str) -> Option<PlayerIdentity> {
        self.directory()
            .await
            .get(player_id)
            .and_then(|entry| entry.to_identity(player_id))
    }

    /// Case-insensitive substring search over skill-position players. Exact
    /// name matches sort first, then alphabetically by name.
    pub async fn search_players(&self, query: &str, limit: usize) -> Vec<PlayerIdentity> {
        let needle = query.to_lowercase();
        let dir = self.directory().await;

        let mut matches: Vec<PlayerIdentity> = dir
            .iter()
            .filter(|(_, entry)| {
                let full = entry.full_name().to_lowercase();
                let search = entry.search_full_name.as_deref().unwrap_or("").to_lowercase();
                full.contains(&needle) || search.contains(&needle)
            })
            .filter_map(|(id, entry)| entry.to_identity(id))
            .collect();

        matches.sort_by(|a, b| {
            let a_inexact = a.name.to_lowercase() != needle;
            let b_inexact = b.name.to_lowercase() != needle;
            a_inexact
                .cmp(&b_inexact)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(limit);
        matches
    }

    /// Rostered skill-position players ordered by search rank, optionally
    /// restricted to one position.
    pub async fn active_players(
        &self,
        position: Option<Position>,
        limit: usize,
    ) -> Vec<PlayerIdentity> {
        let dir = self.directory().await;

        let mut ranked: Vec<(u32, PlayerIdentity)> = dir
            .iter()
            .filter_map(|(id, entry)| {
                let identity = entry.to_identity(id)?;
                identity.team.as_ref()?;
                if position.is_some_and(|p| p != identity.position) {
                    return None;
                }
                Some((entry.rank(), identity))
            })
            .collect();

        ranked.sort_by(|(ra, a), (rb, b)| ra.cmp(rb).then_with(|| a.id.cmp(&b.id)));
        ranked.into_iter().take(limit).map(|(_, p)| p).collect()
    }

    // --- weekly tables ---

    /// Projection table for a week. Empty when the week has no projections
    /// or the upstream is unreachable.
    pub async fn projections(&self, season: u32, week: u32) -> Arc<StatTable> {
        let key = WeekKey::new(season, week);
        if let Some(table) = self.cache.projections(key) {
            return table;
        }
        match self.source.projections(season, week).await {
            Ok(table) => self.cache.put_projections(key, table.unwrap_or_default()),
            Err(e) => {
                warn!(%key, "projection fetch failed: {e}");
                Arc::new(StatTable::default())
            }
        }
    }

    /// Actual stat table for a week, with the same absence semantics as
    /// [`PlayerStore::projections`].
    pub async fn stats(&self, season: u32, week: u32) -> Arc<StatTable> {
        let key = WeekKey::new(season, week);
        if let Some(table) = self.cache.stats(key) {
            return table;
        }
        match self.source.stats(season, week).await {
            Ok(table) => self.cache.put_stats(key, table.unwrap_or_default()),
            Err(e) => {
                warn!(%key, "stats fetch failed: {e}");
                Arc::new(StatTable::default())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::sources::SourceError;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts upstream calls; week 1 stats are missing, week 2 fails.
    #[derive(Default)]
    struct CountingSource {
        player_calls: AtomicUsize,
        stats_calls: AtomicUsize,
    }

    #[async_trait]
    impl FantasyDataSource for CountingSource {
        async fn players(&self) -> Result<Value, SourceError> {
            self.player_calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({
                "1": { "first_name": "Josh", "last_name": "Allen", "position": "QB", "team": "BUF", "search_rank": 3 },
                "2": { "first_name": "Josh", "last_name": "Allen", "position": "LB", "team": "JAX" },
                "3": { "first_name": "Josh", "last_name": "Jacobs", "position": "RB", "team": "GB", "search_rank": 10 },
                "4": { "first_name": "Free", "last_name": "Agent", "position": "WR", "search_rank": 1 },
                "5": { "first_name": "Josh", "last_name": "Allenby", "position": "WR", "team": "NYJ" },
            }))
        }

        async fn projections(
            &self,
            _season: u32,
            _week: u32,
        ) -> Result<Option<StatTable>, SourceError> {
            Ok(Some(StatTable::from_json(json!({ "1": { "pts_ppr": 20.0 } }))))
        }

        async fn stats(&self, _season: u32, week: u32) -> Result<Option<StatTable>, SourceError> {
            self.stats_calls.fetch_add(1, Ordering::SeqCst);
            match week {
                1 => Ok(None),
                2 => Err(SourceError::NotConfigured("test upstream")),
                _ => Ok(Some(StatTable::from_json(json!({ "1": { "pts_ppr": 18.0 } })))),
            }
        }
    }

    fn store() -> (PlayerStore, Arc<CountingSource>) {
        let source = Arc::new(CountingSource::default());
        let cache = Arc::new(CacheService::new(&CacheConfig::default()));
        (PlayerStore::new(source.clone(), cache), source)
    }

    #[tokio::test]
    async fn directory_is_fetched_once() {
        let (store, source) = store();
        assert!(store.player("1").await.is_some());
        assert!(store.player("3").await.is_some());
        assert_eq!(source.player_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_skill_player_is_not_found() {
        let (store, _) = store();
        assert!(store.player("2").await.is_none());
        assert!(store.player("999").await.is_none());
    }

    #[tokio::test]
    async fn search_puts_exact_match_first() {
        let (store, _) = store();
        let results = store.search_players("josh allen", 10).await;
        let ids: Vec<&str> = results.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "5"]);

        let results = store.search_players("josh", 1).await;
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn active_players_need_a_team_and_sort_by_rank() {
        let (store, _) = store();
        let ids: Vec<String> = store
            .active_players(None, 10)
            .await
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["1", "3", "5"]);

        let rbs = store.active_players(Some(Position::RB), 10).await;
        assert_eq!(rbs.len(), 1);
        assert_eq!(rbs[0].id, "3");
    }

    #[tokio::test]
    async fn not_found_is_cached_but_failures_are_not() {
        let (store, source) = store();

        assert!(store.stats(2025, 1).await.is_empty());
        assert!(store.stats(2025, 1).await.is_empty());
        assert_eq!(source.stats_calls.load(Ordering::SeqCst), 1);

        assert!(store.stats(2025, 2).await.is_empty());
        assert!(store.stats(2025, 2).await.is_empty());
        assert_eq!(source.stats_calls.load(Ordering::SeqCst), 3);

        assert_eq!(store.stats(2025, 3).await.points_for("1"), Some(18.0));
        assert_eq!(store.stats(2025, 3).await.points_for("1"), Some(18.0));
        assert_eq!(source.stats_calls.load(Ordering::SeqCst), 4);
    }
}
