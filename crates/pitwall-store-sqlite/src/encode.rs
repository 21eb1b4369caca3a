//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings with
//! microsecond precision, so `ORDER BY` on the text column orders by time.

use chrono::{DateTime, SecondsFormat, Utc};
use pitwall_core::{
  model::{Driver, Session, SessionKey},
  store::JournalMode,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── JournalMode ─────────────────────────────────────────────────────────────

pub fn encode_journal_mode(m: JournalMode) -> &'static str {
  match m {
    JournalMode::Delete => "DELETE",
    JournalMode::Truncate => "TRUNCATE",
    JournalMode::Persist => "PERSIST",
    JournalMode::Memory => "MEMORY",
    JournalMode::Wal => "WAL",
    JournalMode::Off => "OFF",
  }
}

pub fn decode_journal_mode(s: &str) -> Result<JournalMode> {
  match s.to_ascii_lowercase().as_str() {
    "delete" => Ok(JournalMode::Delete),
    "truncate" => Ok(JournalMode::Truncate),
    "persist" => Ok(JournalMode::Persist),
    "memory" => Ok(JournalMode::Memory),
    "wal" => Ok(JournalMode::Wal),
    "off" => Ok(JournalMode::Off),
    _ => Err(Error::InvalidValue {
      column: "journal_mode",
      value:  s.to_owned(),
    }),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const DRIVER_COLUMNS: &str =
  "driver_number, first_name, last_name, name_acronym, team_name, country_code";

pub fn driver_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Driver> {
  Ok(Driver {
    driver_number: row.get(0)?,
    first_name:    row.get(1)?,
    last_name:     row.get(2)?,
    name_acronym:  row.get(3)?,
    team_name:     row.get(4)?,
    country_code:  row.get(5)?,
  })
}

pub const SESSION_COLUMNS: &str = "session_key, session_name, session_type, \
  location, country_name, year, circuit_short_name, date_start";

/// Raw values read directly from a `sessions` row.
pub struct RawSession {
  pub session_key:        SessionKey,
  pub session_name:       String,
  pub session_type:       String,
  pub location:           String,
  pub country_name:       String,
  pub year:               i32,
  pub circuit_short_name: String,
  pub date_start:         String,
}

impl RawSession {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      session_key:        row.get(0)?,
      session_name:       row.get(1)?,
      session_type:       row.get(2)?,
      location:           row.get(3)?,
      country_name:       row.get(4)?,
      year:               row.get(5)?,
      circuit_short_name: row.get(6)?,
      date_start:         row.get(7)?,
    })
  }

  pub fn into_session(self) -> Result<Session> {
    Ok(Session {
      session_key:        self.session_key,
      session_name:       self.session_name,
      session_type:       self.session_type,
      location:           self.location,
      country_name:       self.country_name,
      year:               self.year,
      circuit_short_name: self.circuit_short_name,
      date_start:         decode_dt(&self.date_start)?,
    })
  }
}
