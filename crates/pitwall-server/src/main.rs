//! pitwall-server binary.
//!
//! Reads `pitwall.toml` (or the path given with `--config`), opens the SQLite
//! store, and then ingests telemetry, serves the query API, or both.
//!
//! ```text
//! pitwall-server ingest --season 2024
//! pitwall-server serve
//! pitwall-server run
//! ```

mod settings;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use chrono::Utc;
use clap::{Parser, Subcommand};
use pitwall_api::ApiState;
use pitwall_core::store::{IngestStore, WriteMode};
use pitwall_ingest::{HttpSource, IngestJob, IngestReport};
use pitwall_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::{ServerConfig, expand_tilde};

#[derive(Parser)]
#[command(author, version, about = "Pitwall telemetry ingestion and query server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "pitwall.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Pull drivers, sessions, positions and laps into the store, then exit.
  Ingest {
    /// Season to ingest instead of the configured one.
    #[arg(long)]
    season: Option<i32>,
  },
  /// Serve the query API over HTTP.
  Serve,
  /// Ingest in the background while serving the query API.
  Run {
    #[arg(long)]
    season: Option<i32>,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let mut cfg = ServerConfig::load(&cli.config)?;
  cfg.store_path = expand_tilde(&cfg.store_path);

  // Ctrl-C stops ingestion at the next batch and drains the server.
  let cancel = CancellationToken::new();
  tokio::spawn({
    let cancel = cancel.clone();
    async move {
      if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("interrupt received; shutting down");
      }
      cancel.cancel();
    }
  });

  match cli.command {
    Command::Ingest { season } => {
      if let Some(season) = season {
        cfg.ingest.season = season;
      }
      let store = open_store(&cfg).await?;
      ingest(&store, &cfg, &cancel).await?;
    }
    Command::Serve => {
      let store = open_store(&cfg).await?;
      serve(store, &cfg, &cancel).await?;
    }
    Command::Run { season } => {
      if let Some(season) = season {
        cfg.ingest.season = season;
      }
      // Separate connections: the reader never queues behind a bulk write.
      let (writer, reader) = open_shared(&cfg).await?;
      let (ingested, served) =
        tokio::join!(ingest(&writer, &cfg, &cancel), serve(reader, &cfg, &cancel));
      ingested?;
      served?;
    }
  }

  Ok(())
}

async fn open_store(cfg: &ServerConfig) -> anyhow::Result<SqliteStore> {
  SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))
}

/// Open a writer and a reader on the same store file.
///
/// SQLite cannot leave WAL while another connection is open, so the file is
/// switched to WAL before the reader exists and WAL stays the mode that the
/// bulk-write guard restores.
async fn open_shared(cfg: &ServerConfig) -> anyhow::Result<(SqliteStore, SqliteStore)> {
  let writer = open_store(cfg).await?;
  let current = writer.write_mode().await.context("failed to read write mode")?;
  writer
    .set_write_mode(WriteMode::concurrent(current.busy_timeout))
    .await
    .context("failed to switch the store to WAL")?;
  let reader = open_store(cfg).await?;
  Ok((writer, reader))
}

async fn ingest(
  store: &SqliteStore,
  cfg: &ServerConfig,
  cancel: &CancellationToken,
) -> anyhow::Result<IngestReport> {
  let source = HttpSource::new(&cfg.source).context("failed to set up record source")?;
  let report = IngestJob::new(&source, store, &cfg.ingest, Utc::now())
    .run(cancel)
    .await;

  for phase in report.phases.iter().filter(|p| !p.is_clean()) {
    tracing::warn!("{phase}");
  }
  if report.cancelled {
    tracing::warn!("ingestion cancelled before completion");
  }
  Ok(report)
}

async fn serve(
  store: SqliteStore,
  cfg: &ServerConfig,
  cancel: &CancellationToken,
) -> anyhow::Result<()> {
  let app = pitwall_api::app(ApiState::new(Arc::new(store), cfg.ingest.season));
  let address = cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(cancel.clone().cancelled_owned())
    .await
    .context("server error")?;

  Ok(())
}
