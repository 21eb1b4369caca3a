//! Error types for `pitwall-ingest`.

use pitwall_core::store::StoreErrorKind;
use thiserror::Error;

/// Set-up failures. Everything that happens once a job is running is
/// recorded in its report instead.
#[derive(Debug, Error)]
pub enum Error {
  #[error("failed to build HTTP client: {0}")]
  Client(#[from] reqwest::Error),
}

/// Why a batch was given up on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("batch failed after {attempts} attempt(s) ({kind:?}): {message}")]
pub struct BatchFailed {
  pub attempts: u32,
  pub kind:     StoreErrorKind,
  pub message:  String,
}
