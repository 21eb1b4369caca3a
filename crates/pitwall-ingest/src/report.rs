//! Outcome reports for batches, phases and whole jobs.

use std::fmt;

use pitwall_core::model::{Entity, SessionKey};

use crate::error::BatchFailed;

/// What happened to one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
  /// Position of the batch within its phase, from zero.
  pub index:     usize,
  /// Rows handed to the store.
  pub attempted: usize,
  /// Rows the store actually inserted or replaced.
  pub written:   usize,
  pub attempts:  u32,
  pub error:     Option<BatchFailed>,
}

impl BatchReport {
  pub fn succeeded(&self) -> bool { self.error.is_none() }
}

/// Counters for one entity phase, optionally scoped to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
  pub entity:         Entity,
  pub session_key:    Option<SessionKey>,
  pub fetched:        usize,
  /// Records that failed normalisation.
  pub skipped:        usize,
  /// Records dropped by the driver policy (excluded or not requested).
  pub excluded:       usize,
  pub attempted:      usize,
  /// Rows in committed batches.
  pub succeeded:      usize,
  pub written:        usize,
  pub failed_batches: usize,
  /// Set when the fetch itself failed; nothing else was attempted then.
  pub fetch_error:    Option<String>,
}

impl SessionReport {
  pub fn new(entity: Entity, session_key: Option<SessionKey>) -> Self {
    Self {
      entity,
      session_key,
      fetched: 0,
      skipped: 0,
      excluded: 0,
      attempted: 0,
      succeeded: 0,
      written: 0,
      failed_batches: 0,
      fetch_error: None,
    }
  }

  pub fn absorb(&mut self, batches: &[BatchReport]) {
    for b in batches {
      self.attempted += b.attempted;
      if b.succeeded() {
        self.succeeded += b.attempted;
        self.written += b.written;
      } else {
        self.failed_batches += 1;
      }
    }
  }

  pub fn is_clean(&self) -> bool {
    self.fetch_error.is_none() && self.failed_batches == 0
  }
}

impl fmt::Display for SessionReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.session_key {
      Some(key) => write!(f, "{} (session {key})", self.entity)?,
      None => write!(f, "{}", self.entity)?,
    }
    if let Some(err) = &self.fetch_error {
      return write!(f, ": fetch failed: {err}");
    }
    write!(
      f,
      ": fetched {}, skipped {}, excluded {}, written {}/{}, failed batches {}",
      self.fetched,
      self.skipped,
      self.excluded,
      self.written,
      self.attempted,
      self.failed_batches,
    )
  }
}

/// Everything one ingestion run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
  pub phases:    Vec<SessionReport>,
  /// The run stopped early because its token was cancelled.
  pub cancelled: bool,
}

impl IngestReport {
  pub fn written(&self) -> usize { self.phases.iter().map(|p| p.written).sum() }

  pub fn failed_batches(&self) -> usize {
    self.phases.iter().map(|p| p.failed_batches).sum()
  }

  pub fn failed_fetches(&self) -> usize {
    self.phases.iter().filter(|p| p.fetch_error.is_some()).count()
  }

  pub fn is_clean(&self) -> bool {
    !self.cancelled && self.phases.iter().all(SessionReport::is_clean)
  }
}
