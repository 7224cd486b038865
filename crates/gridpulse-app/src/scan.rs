// Pool scan: enhance every player in a ranked pool with bounded concurrency
// and keep the ones carrying a given flag.

use futures_util::stream::{self, StreamExt};
use tracing::{info, warn};

use gridpulse_core::model::PlayerIdentity;
use gridpulse_core::store::PlayerStore;

use crate::enhancement::{enhance, EnhanceParams, EnhancedPlayer, PerformanceFlag};

/// Enhance `pool` (already in rank order) at most `max_concurrency` players
/// at a time. Each player runs in its own task so a panic while enhancing
/// one is logged and skipped. Matches come back in pool order.
pub async fn scan_pool(
    store: &PlayerStore,
    pool: Vec<PlayerIdentity>,
    flag: PerformanceFlag,
    params: EnhanceParams,
    max_concurrency: usize,
) -> Vec<EnhancedPlayer> {
    let pool_size = pool.len();
    let tasks = pool.into_iter().enumerate().map(|(rank, player)| {
        let store = store.clone();
        async move {
            let player_id = player.id.clone();
            let handle = tokio::spawn(async move { enhance(&store, player, params).await });
            (rank, player_id, handle.await)
        }
    });

    let finished: Vec<_> = stream::iter(tasks)
        .buffer_unordered(max_concurrency.max(1))
        .collect()
        .await;

    let mut matches: Vec<(usize, EnhancedPlayer)> = Vec::new();
    let mut failures = 0usize;
    for (rank, player_id, outcome) in finished {
        match outcome {
            Ok(enhanced) => {
                if enhanced.performance_flags.contains(flag) {
                    matches.push((rank, enhanced));
                }
            }
            Err(e) => {
                failures += 1;
                warn!(player_id = %player_id, "enhancement failed during scan: {e}");
            }
        }
    }
    matches.sort_by_key(|(rank, _)| *rank);

    info!(
        flag = %flag,
        pool = pool_size,
        matches = matches.len(),
        failures,
        "pool scan complete"
    );
    matches.into_iter().map(|(_, p)| p).collect()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
