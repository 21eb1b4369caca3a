//! [`IngestJob`]: one full ingestion run.
//!
//! Phases, in order:
//!
//! 1. drivers, once per configured driver source;
//! 2. race sessions of the configured season;
//! 3. for each stored session of the season, in start order: positions, then
//!    laps. This phase runs inside a [`BulkWriteGuard`].
//!
//! A failed fetch or batch is recorded and the run moves on. Cancellation
//! stops the run at the next fetch or batch boundary.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use pitwall_core::{
  NormalizeError, SourceError,
  config::{DriverSource, IngestConfig},
  model::{Batch, Entity, SessionKey},
  normalize::{Normalized, Normalizer},
  record::Record,
  source::{self, RecordSource, resource},
  store::{IngestStore, WriteMode},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
  guard::BulkWriteGuard,
  report::{IngestReport, SessionReport},
  writer::BatchWriter,
};

pub struct IngestJob<'a, R, S> {
  source:     &'a R,
  store:      &'a S,
  config:     &'a IngestConfig,
  writer:     BatchWriter,
  normalizer: Normalizer,
}

impl<'a, R, S> IngestJob<'a, R, S>
where
  R: RecordSource,
  S: IngestStore + Clone + 'static,
{
  /// `now` stands in for laps that carry no start time.
  pub fn new(
    source: &'a R,
    store: &'a S,
    config: &'a IngestConfig,
    now: DateTime<Utc>,
  ) -> Self {
    Self {
      source,
      store,
      config,
      writer: BatchWriter::new(config.into()),
      normalizer: Normalizer::new(config.excluded_driver_numbers.iter().copied(), now),
    }
  }

  pub async fn run(&self, cancel: &CancellationToken) -> IngestReport {
    let mut report = IngestReport::default();
    info!(season = self.config.season, "ingestion started");

    for driver_source in &self.config.driver_sources {
      if cancel.is_cancelled() {
        break;
      }
      report.phases.push(self.ingest_drivers(driver_source, cancel).await);
    }

    if !cancel.is_cancelled() {
      report.phases.push(self.ingest_sessions(cancel).await);
    }

    if !cancel.is_cancelled() {
      match self.store.session_keys(Some(self.config.season)).await {
        Ok(keys) => self.ingest_timing(&keys, &mut report, cancel).await,
        Err(e) => warn!(error = %e, "could not list stored sessions; skipping timing data"),
      }
    }

    report.cancelled = cancel.is_cancelled();
    info!(
      written = report.written(),
      failed_batches = report.failed_batches(),
      failed_fetches = report.failed_fetches(),
      cancelled = report.cancelled,
      "ingestion finished",
    );
    report
  }

  // ─── Phases ─────────────────────────────────────────────────────────────────

  async fn ingest_drivers(
    &self,
    driver_source: &DriverSource,
    cancel: &CancellationToken,
  ) -> SessionReport {
    let wanted: BTreeSet<_> = driver_source.driver_numbers.iter().copied().collect();
    self
      .phase(
        Entity::Driver,
        Some(driver_source.session_key),
        resource::DRIVERS,
        source::filters([("session_key", driver_source.session_key)]),
        cancel,
        |r| {
          let driver = self.normalizer.driver(r)?;
          if wanted.is_empty() || wanted.contains(&driver.driver_number) {
            Ok(Normalized::Row(driver))
          } else {
            Ok(Normalized::Excluded)
          }
        },
        Batch::Drivers,
      )
      .await
  }

  async fn ingest_sessions(&self, cancel: &CancellationToken) -> SessionReport {
    self
      .phase(
        Entity::Session,
        None,
        resource::SESSIONS,
        source::filters([
          ("session_name", self.config.session_name.clone()),
          ("year", self.config.season.to_string()),
        ]),
        cancel,
        |r| self.normalizer.session(r).map(Normalized::Row),
        Batch::Sessions,
      )
      .await
  }

  /// Positions and laps of every session in `keys`, under the bulk guard.
  async fn ingest_timing(
    &self,
    keys: &[SessionKey],
    report: &mut IngestReport,
    cancel: &CancellationToken,
  ) {
    if keys.is_empty() {
      info!(season = self.config.season, "no stored sessions; nothing to time");
      return;
    }

    let mode = WriteMode::concurrent(self.config.busy_timeout());
    let guard = match BulkWriteGuard::acquire(self.store, mode).await {
      Ok(guard) => Some(guard),
      Err(e) => {
        warn!(error = %e, "could not enter bulk write mode; continuing without it");
        None
      }
    };

    for &session_key in keys {
      if cancel.is_cancelled() {
        break;
      }
      info!(session_key, "ingesting session");
      report.phases.push(self.ingest_positions(session_key, cancel).await);
      if cancel.is_cancelled() {
        break;
      }
      report.phases.push(self.ingest_laps(session_key, cancel).await);
    }

    if let Some(guard) = guard
      && let Err(e) = guard.finish().await
    {
      warn!(error = %e, "failed to restore write mode");
    }
  }

  async fn ingest_positions(
    &self,
    session_key: SessionKey,
    cancel: &CancellationToken,
  ) -> SessionReport {
    let policy = self.config.position_policy;
    self
      .phase(
        Entity::Position,
        Some(session_key),
        resource::POSITION,
        source::filters([("session_key", session_key)]),
        cancel,
        |r| self.normalizer.position(r, session_key),
        |rows| Batch::Positions { rows, policy },
      )
      .await
  }

  async fn ingest_laps(
    &self,
    session_key: SessionKey,
    cancel: &CancellationToken,
  ) -> SessionReport {
    self
      .phase(
        Entity::Lap,
        Some(session_key),
        resource::LAPS,
        source::filters([("session_key", session_key)]),
        cancel,
        |r| self.normalizer.lap(r, session_key),
        Batch::Laps,
      )
      .await
  }

  // ─── Shared phase driver ────────────────────────────────────────────────────

  /// Fetch, normalise, and write one entity phase.
  #[allow(clippy::too_many_arguments)]
  async fn phase<T, N, B>(
    &self,
    entity: Entity,
    session_key: Option<SessionKey>,
    resource: &str,
    filters: source::Filters,
    cancel: &CancellationToken,
    normalize: N,
    into_batch: B,
  ) -> SessionReport
  where
    N: Fn(&Record) -> Result<Normalized<T>, NormalizeError>,
    B: FnOnce(Vec<T>) -> Batch,
  {
    let mut report = SessionReport::new(entity, session_key);

    let fetched = tokio::select! {
      _ = cancel.cancelled() => Err(SourceError::Cancelled),
      r = self.source.fetch(resource, &filters) => r,
    };
    let records = match fetched {
      Ok(records) => records,
      // Not a source failure: the run report carries the cancellation.
      Err(SourceError::Cancelled) => {
        debug!(%entity, ?session_key, "fetch cancelled");
        return report;
      }
      Err(e) => {
        warn!(%entity, ?session_key, error = %e, "fetch failed");
        report.fetch_error = Some(e.to_string());
        return report;
      }
    };
    report.fetched = records.len();

    let mut rows = Vec::with_capacity(records.len());
    for record in &records {
      match normalize(record) {
        Ok(Normalized::Row(row)) => rows.push(row),
        Ok(Normalized::Excluded) => report.excluded += 1,
        Err(e) => {
          report.skipped += 1;
          debug!(%entity, ?session_key, error = %e, "skipping record");
        }
      }
    }

    let batches = self.writer.write(self.store, into_batch(rows), cancel).await;
    report.absorb(&batches);
    info!(
      %entity,
      ?session_key,
      fetched = report.fetched,
      skipped = report.skipped,
      excluded = report.excluded,
      written = report.written,
      failed_batches = report.failed_batches,
      "phase complete",
    );
    report
  }
}
