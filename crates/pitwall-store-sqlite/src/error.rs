//! Error type for `pitwall-store-sqlite`.

use pitwall_core::store::{ClassifyError, JournalMode, StoreErrorKind};
use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unexpected value in column {column}: {value:?}")]
  InvalidValue { column: &'static str, value: String },

  /// SQLite kept a different journal mode than the one asked for.
  #[error("journal mode {requested:?} refused; database stayed in {effective:?}")]
  JournalModeRefused { requested: JournalMode, effective: String },
}

impl ClassifyError for Error {
  /// `SQLITE_BUSY` and `SQLITE_LOCKED` are contention; everything else is
  /// not worth retrying.
  fn kind(&self) -> StoreErrorKind {
    let Error::Database(tokio_rusqlite::Error::Rusqlite(err)) = self else {
      return StoreErrorKind::Other;
    };
    match err.sqlite_error_code() {
      Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => {
        StoreErrorKind::LockContention
      }
      _ => StoreErrorKind::Other,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
