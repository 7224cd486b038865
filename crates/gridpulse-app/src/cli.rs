use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "gridpulse")]
#[command(about = "Weekly fantasy football projections, performance flags and start/sit analysis")]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Enhanced projection, recent form and flags for one player
    Player {
        /// Sleeper player id
        player_id: String,
    },

    /// Actual vs projected points over recent weeks
    Trends {
        player_id: String,

        /// Number of weeks to look back (1-8)
        #[arg(short, long, default_value_t = 3)]
        lookback: u32,
    },

    /// Full analysis: stats, video commentary and a model recommendation
    Pulse { player_id: String },

    /// Head-to-head start recommendation
    Compare {
        player_a: String,
        player_b: String,
    },

    /// Find active players carrying a performance flag
    Scan {
        /// Flag name, e.g. BREAKOUT_CANDIDATE
        flag: String,

        /// Restrict the pool to one position (QB, RB, WR, TE, K, DEF)
        #[arg(short, long)]
        position: Option<String>,

        /// Number of top-ranked players to scan (1-200)
        #[arg(long)]
        pool: Option<usize>,
    },

    /// Search players by name
    Search {
        query: String,

        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
}
