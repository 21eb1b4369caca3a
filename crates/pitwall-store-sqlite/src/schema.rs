//! SQL schema for the Pitwall SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Foreign keys document the natural-key relationships but are not enforced
/// (`PRAGMA foreign_keys` stays off). The journal mode is left alone here;
/// the ingestion pipeline switches it around bulk writes.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS drivers (
    driver_number INTEGER PRIMARY KEY,
    first_name    TEXT NOT NULL,
    last_name     TEXT NOT NULL,
    name_acronym  TEXT NOT NULL,
    team_name     TEXT NOT NULL,
    country_code  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    session_key        INTEGER PRIMARY KEY,
    session_name       TEXT NOT NULL,
    session_type       TEXT NOT NULL,   -- only 'Race' is aggregated
    location           TEXT NOT NULL,
    country_name       TEXT NOT NULL,
    year               INTEGER NOT NULL,
    circuit_short_name TEXT NOT NULL,
    date_start         TEXT NOT NULL    -- fixed-width UTC, sorts as time
);

-- One sample per (driver, session).
CREATE TABLE IF NOT EXISTS positions (
    driver_number INTEGER NOT NULL REFERENCES drivers(driver_number),
    session_key   INTEGER NOT NULL REFERENCES sessions(session_key),
    position      INTEGER NOT NULL CHECK (position >= 1),
    date          TEXT NOT NULL,
    PRIMARY KEY (driver_number, session_key)
);

-- lap_duration <= 0 marks an untimed lap.
CREATE TABLE IF NOT EXISTS laps (
    driver_number     INTEGER NOT NULL REFERENCES drivers(driver_number),
    session_key       INTEGER NOT NULL REFERENCES sessions(session_key),
    lap_number        INTEGER NOT NULL,
    lap_duration      REAL NOT NULL,
    duration_sector_1 REAL NOT NULL,
    duration_sector_2 REAL NOT NULL,
    duration_sector_3 REAL NOT NULL,
    st_speed          REAL NOT NULL,
    date_start        TEXT NOT NULL,
    PRIMARY KEY (driver_number, session_key, lap_number)
);

CREATE INDEX IF NOT EXISTS sessions_year_idx      ON sessions(year, date_start);
CREATE INDEX IF NOT EXISTS positions_session_idx  ON positions(session_key, position);
CREATE INDEX IF NOT EXISTS laps_session_idx       ON laps(session_key, lap_duration);

PRAGMA user_version = 1;
";
