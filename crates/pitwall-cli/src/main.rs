//! `pitwall`: terminal client for the Pitwall query API.
//!
//! # Usage
//!
//! ```text
//! pitwall drivers
//! pitwall driver 1
//! pitwall races --year 2024
//! pitwall race 9472
//! pitwall --url http://pitwall.local:8080 season
//! ```

mod client;
mod render;
mod view;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use client::ApiClient;
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "pitwall", about = "Query the Pitwall telemetry store")]
struct Args {
  /// Path to a TOML config file (url).
  #[arg(short, long, value_name = "FILE")]
  config: Option<std::path::PathBuf>,

  /// Base URL of the pitwall server (default: http://localhost:8080).
  #[arg(long, env = "PITWALL_URL")]
  url: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List every stored driver.
  Drivers,
  /// Season performance and per-race results for one driver.
  Driver { number: u32 },
  /// List race sessions.
  Races {
    #[arg(long)]
    year: Option<i32>,
  },
  /// Podium, last place, fastest lap and top speed for one race.
  Race { session_key: u32 },
  /// Season leaderboards.
  Season {
    #[arg(long)]
    year: Option<i32>,
  },
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url: String,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  // Load config file if provided.
  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let base_url = args
    .url
    .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
    .unwrap_or_else(|| "http://localhost:8080".to_string());

  let client = ApiClient::new(base_url)?;

  let report = match args.command {
    Command::Drivers => render::drivers(&client.list_drivers().await?),
    Command::Driver { number } => match client.driver_summary(number).await? {
      Some(summary) => render::driver_summary(&summary),
      None => bail!("driver {number} not found"),
    },
    Command::Races { year } => render::races(&client.list_races(year).await?),
    Command::Race { session_key } => match client.race_summary(session_key).await? {
      Some(summary) => render::race_summary(&summary),
      None => bail!("race {session_key} not found"),
    },
    Command::Season { year } => render::season(&client.season(year).await?),
  };
  report.print()?;

  Ok(())
}
