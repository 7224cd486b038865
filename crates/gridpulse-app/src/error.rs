use thiserror::Error;

use gridpulse_core::config::{MAX_LOOKBACK, MAX_SCAN_POOL};

use crate::enhancement::UnknownFlag;

/// Caller errors. Upstream trouble never surfaces here; it degrades to empty
/// data or fallback results instead.
#[derive(Debug, Error)]
pub enum PulseError {
    #[error("player not found: {0}")]
    PlayerNotFound(String),

    #[error(transparent)]
    UnknownFlag(#[from] UnknownFlag),

    #[error("lookback must be between 1 and {max}, got {0}", max = MAX_LOOKBACK)]
    InvalidLookback(u32),

    #[error("pool size must be between 1 and {max}, got {0}", max = MAX_SCAN_POOL)]
    InvalidPoolSize(usize),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}
