// gridpulse entry point.
//
// 1. Initialize tracing (log to file so stdout stays clean JSON)
// 2. Load config
// 3. Build the HTTP client and the service
// 4. Run one subcommand and print its result

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use std::time::Duration;
use tracing::info;

use gridpulse_app::cli::{Cli, Commands};
use gridpulse_app::PulseService;
use gridpulse_core::config;
use gridpulse_core::sources::http_client;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing()?;
    info!("gridpulse starting up");

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        season = config.season.season,
        week = config.season.week,
        "config loaded"
    );

    let http = http_client(Duration::from_secs(config.http.timeout_secs))
        .context("failed to build HTTP client")?;
    let service = PulseService::from_config(config, http);

    match cli.command {
        Commands::Player { player_id } => {
            let player = service.enhance_player(&player_id).await?;
            print_json(&player, cli.pretty)?;
        }
        Commands::Trends { player_id, lookback } => {
            let trends = service.weekly_trends(&player_id, lookback).await?;
            print_json(&trends, cli.pretty)?;
        }
        Commands::Pulse { player_id } => {
            let pulse = service.pulse(&player_id).await?;
            print_json(&pulse, cli.pretty)?;
        }
        Commands::Compare { player_a, player_b } => {
            let comparison = service.compare(&player_a, &player_b).await?;
            print_json(&comparison, cli.pretty)?;
        }
        Commands::Scan {
            flag,
            position,
            pool,
        } => {
            let report = service.scan(&flag, position.as_deref(), pool).await?;
            print_json(&report, cli.pretty)?;
        }
        Commands::Search { query, limit } => {
            let players = service.search(&query, limit).await?;
            print_json(&players, cli.pretty)?;
        }
    }

    info!("gridpulse finished");
    Ok(())
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context("failed to serialize output")?;
    println!("{out}");
    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("gridpulse.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gridpulse=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
