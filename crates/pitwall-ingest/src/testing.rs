//! Scripted in-process fakes for the writer and guard tests.

use std::{
  collections::VecDeque,
  sync::{Arc, Mutex},
  time::Duration,
};

use pitwall_core::{
  model::{Batch, SessionKey},
  store::{ClassifyError, IngestStore, JournalMode, StoreErrorKind, WriteMode},
};
use tokio::time::Instant;

#[derive(Debug, thiserror::Error)]
#[error("scripted {0:?} failure")]
pub struct FakeError(pub StoreErrorKind);

impl ClassifyError for FakeError {
  fn kind(&self) -> StoreErrorKind { self.0 }
}

#[derive(Debug)]
pub struct Inner {
  /// Outcome of each upcoming upsert call; `None` (or an empty script)
  /// succeeds.
  pub script:  VecDeque<Option<StoreErrorKind>>,
  /// Time and row count of every upsert call.
  pub calls:   Vec<(Instant, usize)>,
  /// Rows committed so far.
  pub written: usize,
  pub mode:    WriteMode,
}

#[derive(Debug, Clone)]
pub struct FakeStore {
  pub inner: Arc<Mutex<Inner>>,
}

impl FakeStore {
  pub fn new() -> Self {
    Self {
      inner: Arc::new(Mutex::new(Inner {
        script:  VecDeque::new(),
        calls:   Vec::new(),
        written: 0,
        mode:    WriteMode {
          journal_mode: JournalMode::Delete,
          busy_timeout: Duration::from_millis(5_000),
        },
      })),
    }
  }

  pub fn script(self, outcomes: impl IntoIterator<Item = Option<StoreErrorKind>>) -> Self {
    self.inner.lock().unwrap().script.extend(outcomes);
    self
  }

  pub fn calls(&self) -> Vec<(Instant, usize)> { self.inner.lock().unwrap().calls.clone() }

  pub fn written(&self) -> usize { self.inner.lock().unwrap().written }

  pub fn mode(&self) -> WriteMode { self.inner.lock().unwrap().mode }
}

impl IngestStore for FakeStore {
  type Error = FakeError;

  async fn upsert(&self, batch: Batch) -> Result<usize, FakeError> {
    let mut inner = self.inner.lock().unwrap();
    inner.calls.push((Instant::now(), batch.len()));
    match inner.script.pop_front().flatten() {
      Some(kind) => Err(FakeError(kind)),
      None => {
        inner.written += batch.len();
        Ok(batch.len())
      }
    }
  }

  async fn session_keys(&self, _year: Option<i32>) -> Result<Vec<SessionKey>, FakeError> {
    Ok(Vec::new())
  }

  async fn write_mode(&self) -> Result<WriteMode, FakeError> { Ok(self.mode()) }

  async fn set_write_mode(&self, mode: WriteMode) -> Result<WriteMode, FakeError> {
    let mut inner = self.inner.lock().unwrap();
    Ok(std::mem::replace(&mut inner.mode, mode))
  }
}
