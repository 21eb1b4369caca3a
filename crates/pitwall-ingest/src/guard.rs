//! [`BulkWriteGuard`]: a scoped switch into the concurrent write mode.

use pitwall_core::store::{IngestStore, WriteMode};
use tracing::{debug, warn};

/// Holds the store in a bulk write mode and puts the prior mode back.
///
/// Call [`finish`](Self::finish) on every exit path. A guard dropped
/// unfinished spawns the restoration on the current tokio runtime instead.
#[must_use = "call `finish` to restore the prior write mode"]
pub struct BulkWriteGuard<S>
where
  S: IngestStore + Clone + 'static,
{
  store: S,
  /// `None` once restored.
  prior: Option<WriteMode>,
}

impl<S> BulkWriteGuard<S>
where
  S: IngestStore + Clone + 'static,
{
  /// Switch `store` into `mode`. If the switch fails, whatever part of it
  /// took effect is rolled back before the error is returned.
  pub async fn acquire(store: &S, mode: WriteMode) -> Result<Self, S::Error> {
    let before = store.write_mode().await?;
    let prior = match store.set_write_mode(mode).await {
      Ok(prior) => prior,
      Err(e) => {
        if let Err(restore) = store.set_write_mode(before).await {
          warn!(error = %restore, "failed to roll back write mode");
        }
        return Err(e);
      }
    };
    debug!(?prior, ?mode, "bulk write mode on");
    Ok(Self { store: store.clone(), prior: Some(prior) })
  }

  /// The mode that will be restored.
  pub fn prior(&self) -> Option<WriteMode> { self.prior }

  pub async fn finish(mut self) -> Result<(), S::Error> {
    if let Some(prior) = self.prior {
      self.store.set_write_mode(prior).await?;
      self.prior = None;
      debug!(?prior, "bulk write mode off");
    }
    Ok(())
  }
}

impl<S> Drop for BulkWriteGuard<S>
where
  S: IngestStore + Clone + 'static,
{
  fn drop(&mut self) {
    let Some(prior) = self.prior.take() else {
      return;
    };
    match tokio::runtime::Handle::try_current() {
      Ok(handle) => {
        let store = self.store.clone();
        handle.spawn(async move {
          if let Err(e) = store.set_write_mode(prior).await {
            warn!(error = %e, "failed to restore write mode");
          }
        });
      }
      Err(_) => warn!(?prior, "no runtime to restore write mode on"),
    }
  }
}
