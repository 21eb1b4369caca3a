//! Error types for `pitwall-core`.

use thiserror::Error;

/// Why a raw record could not be turned into a typed row.
///
/// Always record-level: the record is skipped and ingestion carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
  #[error("missing field: {0}")]
  MissingField(&'static str),

  /// The field is present but has the wrong shape (text where a number is
  /// expected, a fractional driver number, an unparseable timestamp, ...).
  #[error("invalid field: {0}")]
  InvalidField(&'static str),
}

/// Failure to pull records from the upstream provider.
///
/// Fatal to the fetch call that produced it; never retried at this layer.
#[derive(Debug, Error)]
pub enum SourceError {
  #[error("source unavailable: {0}")]
  Unavailable(String),

  #[error("malformed payload: {0}")]
  MalformedPayload(String),

  #[error("fetch cancelled")]
  Cancelled,
}
