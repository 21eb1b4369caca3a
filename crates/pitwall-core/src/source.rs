//! The `RecordSource` trait: where raw telemetry comes from.

use std::future::Future;

use crate::{error::SourceError, record::Record};

/// Upstream resource names understood by the ingestion job.
pub mod resource {
  pub const DRIVERS: &str = "drivers";
  pub const SESSIONS: &str = "sessions";
  pub const POSITION: &str = "position";
  pub const LAPS: &str = "laps";
}

/// Query parameters narrowing a fetch (e.g. `session_key=9472`).
pub type Filters = Vec<(String, String)>;

/// A provider of raw records.
///
/// Each call yields a finite, non-restartable sequence. Failures are fatal to
/// that call only; retrying is the caller's business.
pub trait RecordSource: Send + Sync {
  fn fetch<'a>(
    &'a self,
    resource: &'a str,
    filters: &'a [(String, String)],
  ) -> impl Future<Output = Result<Vec<Record>, SourceError>> + Send + 'a;
}

/// Build a filter list from string pairs.
pub fn filters<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Filters
where
  K: ToString,
  V: ToString,
{
  pairs
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}
