//! The batched transactional writer and its retry controller.
//!
//! Rows are split into batches of `batch_size`, applied in source order, one
//! transaction each. A batch that fails with lock contention is retried in
//! full with exponential backoff; any other failure gives up on that batch at
//! once. Either way the next batch still runs.

use std::time::Duration;

use pitwall_core::{
  config::IngestConfig,
  model::Batch,
  store::{ClassifyError as _, IngestStore, StoreErrorKind},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{error::BatchFailed, report::BatchReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterConfig {
  pub batch_size:   usize,
  /// Total attempts per batch, including the first.
  pub max_attempts: u32,
  pub backoff_base: Duration,
}

impl WriterConfig {
  /// Delay after failed attempt number `attempt` (1-based): `base`, `2·base`,
  /// `4·base`, ...
  pub fn backoff(&self, attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(16);
    self.backoff_base.saturating_mul(1 << exp)
  }
}

impl From<&IngestConfig> for WriterConfig {
  fn from(cfg: &IngestConfig) -> Self {
    Self {
      batch_size:   cfg.batch_size,
      max_attempts: cfg.max_attempts,
      backoff_base: cfg.backoff_base(),
    }
  }
}

impl Default for WriterConfig {
  fn default() -> Self { Self::from(&IngestConfig::default()) }
}

#[derive(Debug, Clone, Default)]
pub struct BatchWriter {
  config: WriterConfig,
}

impl BatchWriter {
  pub fn new(config: WriterConfig) -> Self { Self { config } }

  pub fn config(&self) -> &WriterConfig { &self.config }

  /// Write `rows` in batches. Stops before the next batch once `cancel`
  /// fires; batches never started have no report.
  pub async fn write<S: IngestStore>(
    &self,
    store: &S,
    rows: Batch,
    cancel: &CancellationToken,
  ) -> Vec<BatchReport> {
    let entity = rows.entity();
    let mut reports = Vec::new();
    for (index, batch) in rows.split(self.config.batch_size).into_iter().enumerate() {
      if cancel.is_cancelled() {
        debug!(%entity, batch = index, "cancelled; remaining batches not written");
        break;
      }
      reports.push(self.write_batch(store, index, batch, cancel).await);
    }
    reports
  }

  async fn write_batch<S: IngestStore>(
    &self,
    store: &S,
    index: usize,
    batch: Batch,
    cancel: &CancellationToken,
  ) -> BatchReport {
    let entity = batch.entity();
    let attempted = batch.len();
    let max_attempts = self.config.max_attempts.max(1);
    let failed = |attempts: u32, kind: StoreErrorKind, message: String| BatchReport {
      index,
      attempted,
      written: 0,
      attempts,
      error: Some(BatchFailed { attempts, kind, message }),
    };

    let mut attempt = 0;
    loop {
      attempt += 1;
      let err = match store.upsert(batch.clone()).await {
        Ok(written) => {
          debug!(%entity, batch = index, attempted, written, attempt, "batch committed");
          return BatchReport { index, attempted, written, attempts: attempt, error: None };
        }
        Err(err) => err,
      };

      let kind = err.kind();
      if kind != StoreErrorKind::LockContention || attempt >= max_attempts {
        warn!(%entity, batch = index, attempt, error = %err, "batch failed");
        return failed(attempt, kind, err.to_string());
      }

      let delay = self.config.backoff(attempt);
      warn!(
        %entity,
        batch = index,
        attempt,
        delay_ms = delay.as_millis() as u64,
        "lock contention; retrying batch",
      );
      tokio::select! {
        _ = cancel.cancelled() => {
          return failed(attempt, kind, format!("{err}; cancelled before retry"));
        }
        _ = tokio::time::sleep(delay) => {}
      }
    }
  }
}
