// Statistical enhancement of a player-week: recency window, projection
// fallback chain, performance flags, and the blended projection.

pub mod blend;
pub mod flags;
pub mod player;
pub mod recency;
pub mod resolver;

pub use blend::adjusted_projection;
pub use flags::{compute_flags, FlagSet, PerformanceFlag, UnknownFlag};
pub use player::{enhance, EnhanceParams, EnhancedPlayer, ProjectionSummary};
pub use recency::{recent_performance, RecentPerformance, Trend};
pub use resolver::{resolve_projection, ProjectionSource, ResolvedProjection};
