//! [`SqliteStore`], the SQLite implementation of [`IngestStore`].

use std::{path::Path, time::Duration};

use pitwall_core::{
  model::{Batch, PositionPolicy, SessionKey},
  store::{IngestStore, WriteMode},
};
use rusqlite::TransactionBehavior;

use crate::{
  Error, Result,
  encode::{decode_journal_mode, encode_dt, encode_journal_mode},
  schema::SCHEMA,
};

// ─── Statements ──────────────────────────────────────────────────────────────

const INSERT_DRIVER: &str = "
  INSERT INTO drivers (
    driver_number, first_name, last_name, name_acronym, team_name, country_code
  ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
  ON CONFLICT (driver_number) DO NOTHING";

const INSERT_SESSION: &str = "
  INSERT INTO sessions (
    session_key, session_name, session_type, location, country_name, year,
    circuit_short_name, date_start
  ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
  ON CONFLICT (session_key) DO NOTHING";

const INSERT_POSITION_FIRST: &str = "
  INSERT INTO positions (driver_number, session_key, position, date)
  VALUES (?1, ?2, ?3, ?4)
  ON CONFLICT (driver_number, session_key) DO NOTHING";

// Strictly later only, so replaying the same samples changes nothing.
const INSERT_POSITION_LATEST: &str = "
  INSERT INTO positions (driver_number, session_key, position, date)
  VALUES (?1, ?2, ?3, ?4)
  ON CONFLICT (driver_number, session_key) DO UPDATE
    SET position = excluded.position, date = excluded.date
    WHERE excluded.date > positions.date";

const INSERT_LAP: &str = "
  INSERT INTO laps (
    driver_number, session_key, lap_number, lap_duration,
    duration_sector_1, duration_sector_2, duration_sector_3,
    st_speed, date_start
  ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
  ON CONFLICT (driver_number, session_key, lap_number) DO NOTHING";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Pitwall telemetry store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. Open the
/// same file twice to get independent reader and writer connections.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

/// Read `(journal_mode, busy_timeout_ms)` from the connection.
fn read_mode(conn: &rusqlite::Connection) -> rusqlite::Result<(String, u64)> {
  let journal: String =
    conn.pragma_query_value(None, "journal_mode", |r| r.get(0))?;
  let timeout: u64 = conn.pragma_query_value(None, "busy_timeout", |r| r.get(0))?;
  Ok((journal, timeout))
}

fn decode_mode((journal, timeout_ms): (String, u64)) -> Result<WriteMode> {
  Ok(WriteMode {
    journal_mode: decode_journal_mode(&journal)?,
    busy_timeout: Duration::from_millis(timeout_ms),
  })
}

/// Apply every row of `batch` within `tx`; returns the number of rows
/// inserted or replaced.
fn apply_batch(tx: &rusqlite::Transaction<'_>, batch: &Batch) -> rusqlite::Result<usize> {
  let mut changed = 0;
  match batch {
    Batch::Drivers(rows) => {
      let mut stmt = tx.prepare_cached(INSERT_DRIVER)?;
      for d in rows {
        changed += stmt.execute(rusqlite::params![
          d.driver_number,
          d.first_name,
          d.last_name,
          d.name_acronym,
          d.team_name,
          d.country_code,
        ])?;
      }
    }
    Batch::Sessions(rows) => {
      let mut stmt = tx.prepare_cached(INSERT_SESSION)?;
      for s in rows {
        changed += stmt.execute(rusqlite::params![
          s.session_key,
          s.session_name,
          s.session_type,
          s.location,
          s.country_name,
          s.year,
          s.circuit_short_name,
          encode_dt(s.date_start),
        ])?;
      }
    }
    Batch::Positions { rows, policy } => {
      let sql = match policy {
        PositionPolicy::FirstSample => INSERT_POSITION_FIRST,
        PositionPolicy::LatestSample => INSERT_POSITION_LATEST,
      };
      let mut stmt = tx.prepare_cached(sql)?;
      for p in rows {
        changed += stmt.execute(rusqlite::params![
          p.driver_number,
          p.session_key,
          p.position,
          encode_dt(p.date),
        ])?;
      }
    }
    Batch::Laps(rows) => {
      let mut stmt = tx.prepare_cached(INSERT_LAP)?;
      for l in rows {
        changed += stmt.execute(rusqlite::params![
          l.driver_number,
          l.session_key,
          l.lap_number,
          l.lap_duration,
          l.duration_sector_1,
          l.duration_sector_2,
          l.duration_sector_3,
          l.st_speed,
          encode_dt(l.date_start),
        ])?;
      }
    }
  }
  Ok(changed)
}

// ─── IngestStore impl ────────────────────────────────────────────────────────

impl IngestStore for SqliteStore {
  type Error = Error;

  async fn upsert(&self, batch: Batch) -> Result<usize> {
    let changed = self
      .conn
      .call(move |conn| {
        // IMMEDIATE takes the write lock up front, so contention surfaces
        // at BEGIN instead of halfway through the batch.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = apply_batch(&tx, &batch)?;
        tx.commit()?;
        Ok(changed)
      })
      .await?;
    Ok(changed)
  }

  async fn session_keys(&self, year: Option<i32>) -> Result<Vec<SessionKey>> {
    let keys = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT session_key FROM sessions
           WHERE ?1 IS NULL OR year = ?1
           ORDER BY date_start ASC, session_key ASC",
        )?;
        let keys = stmt
          .query_map(rusqlite::params![year], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<SessionKey>>>()?;
        Ok(keys)
      })
      .await?;
    Ok(keys)
  }

  async fn write_mode(&self) -> Result<WriteMode> {
    let raw = self
      .conn
      .call(|conn| Ok(read_mode(conn)?))
      .await?;
    decode_mode(raw)
  }

  async fn set_write_mode(&self, mode: WriteMode) -> Result<WriteMode> {
    let journal = encode_journal_mode(mode.journal_mode);
    let (prior, effective) = self
      .conn
      .call(move |conn| {
        let prior = read_mode(conn)?;
        // The lock wait is applied first and stays applied even when the
        // journal switch below fails.
        conn.busy_timeout(mode.busy_timeout)?;
        if prior.0.eq_ignore_ascii_case(journal) {
          return Ok((prior, None));
        }
        // Leaving WAL needs every other connection closed, and an in-memory
        // database stays in MEMORY; the pragma reports the mode in effect.
        let effective: String =
          conn.pragma_update_and_check(None, "journal_mode", journal, |r| r.get(0))?;
        if effective.eq_ignore_ascii_case(journal) {
          Ok((prior, None))
        } else {
          Ok((prior, Some(effective)))
        }
      })
      .await?;

    if let Some(effective) = effective {
      return Err(Error::JournalModeRefused { requested: mode.journal_mode, effective });
    }
    decode_mode(prior)
  }
}
