//! The store traits and supporting types.
//!
//! Two seams: [`IngestStore`] is what the write pipeline consumes,
//! [`QueryStore`] is what the query service consumes. Storage backends (e.g.
//! `pitwall-store-sqlite`) implement both; higher layers depend on these
//! abstractions, not on a concrete backend.

use std::{future::Future, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
  model::{Batch, Driver, DriverNumber, Session, SessionKey},
  summary::{DriverSummary, RaceSummary, SeasonLeaderboard},
};

// ─── Error classification ────────────────────────────────────────────────────

/// Coarse classification of a store failure, decided once at the backend
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreErrorKind {
  /// Transient: another connection holds a conflicting lock. Worth retrying.
  LockContention,
  Other,
}

/// Implemented by backend error types so the writer can decide whether a
/// failed batch is retryable.
pub trait ClassifyError {
  fn kind(&self) -> StoreErrorKind;

  fn is_lock_contention(&self) -> bool {
    self.kind() == StoreErrorKind::LockContention
  }
}

// ─── Write mode ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
  Delete,
  Truncate,
  Persist,
  Memory,
  Wal,
  Off,
}

/// The store's durability/locking configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteMode {
  pub journal_mode: JournalMode,
  /// How long a writer waits for a lock before reporting contention.
  pub busy_timeout: Duration,
}

impl WriteMode {
  /// Write-ahead logging plus a bounded lock wait: readers proceed while a
  /// bulk writer holds its transaction.
  pub fn concurrent(busy_timeout: Duration) -> Self {
    Self { journal_mode: JournalMode::Wal, busy_timeout }
  }
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Write side of a telemetry store.
///
/// Rows are append-only: an existing natural key is never overwritten, except
/// for positions under [`PositionPolicy::LatestSample`](crate::model::PositionPolicy).
pub trait IngestStore: Send + Sync {
  type Error: std::error::Error + ClassifyError + Send + Sync + 'static;

  /// Apply `batch` atomically as upsert-ignore writes and return the number
  /// of rows inserted or replaced. Either every row is applied or none is.
  fn upsert(
    &self,
    batch: Batch,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Keys of stored sessions, optionally restricted to one season, in start
  /// order.
  fn session_keys(
    &self,
    year: Option<i32>,
  ) -> impl Future<Output = Result<Vec<SessionKey>, Self::Error>> + Send + '_;

  fn write_mode(
    &self,
  ) -> impl Future<Output = Result<WriteMode, Self::Error>> + Send + '_;

  /// Switch to `mode` and return the mode that was in effect before.
  fn set_write_mode(
    &self,
    mode: WriteMode,
  ) -> impl Future<Output = Result<WriteMode, Self::Error>> + Send + '_;
}

/// Read side: the fixed set of aggregate views.
///
/// Every view must be correct for whatever subset of sessions has been
/// ingested so far.
pub trait QueryStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// All drivers, by driver number.
  fn list_drivers(
    &self,
  ) -> impl Future<Output = Result<Vec<Driver>, Self::Error>> + Send + '_;

  /// Race sessions by start time, optionally restricted to one season.
  fn list_races(
    &self,
    year: Option<i32>,
  ) -> impl Future<Output = Result<Vec<Session>, Self::Error>> + Send + '_;

  /// Performance summary for a driver. Returns `None` if the driver is not
  /// stored.
  fn driver_summary(
    &self,
    driver_number: DriverNumber,
  ) -> impl Future<Output = Result<Option<DriverSummary>, Self::Error>> + Send + '_;

  /// Result summary for a session. Returns `None` if the session is not
  /// stored.
  fn race_summary(
    &self,
    session_key: SessionKey,
  ) -> impl Future<Output = Result<Option<RaceSummary>, Self::Error>> + Send + '_;

  fn season_leaderboard(
    &self,
    year: i32,
  ) -> impl Future<Output = Result<SeasonLeaderboard, Self::Error>> + Send + '_;
}
