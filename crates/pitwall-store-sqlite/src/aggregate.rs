//! [`QueryStore`] impl: the aggregate views, computed with set-based SQL.
//!
//! Tie-breaks are deterministic: rankings and the podium prefer the lower
//! driver number, last place the higher one, and fastest lap / top speed the
//! lower driver number. Position and lap rows of drivers without a `drivers`
//! row are not reported, though they still count towards session minima.

use pitwall_core::{
  model::{Driver, DriverNumber, RACE_SESSION_TYPE, Session, SessionKey},
  store::QueryStore,
  summary::{
    DriverRaceResult, DriverSummary, FastestLap, LeaderboardEntry, Performance,
    Placing, RaceSummary, SeasonLeaderboard, TOP_N, TopSpeed, race_label,
  },
};
use rusqlite::OptionalExtension as _;

use crate::{
  Error, Result,
  encode::{DRIVER_COLUMNS, RawSession, SESSION_COLUMNS, decode_dt, driver_from_row},
  store::SqliteStore,
};

// ─── Driver summary ──────────────────────────────────────────────────────────

const DRIVER_TOTALS: &str = "
  SELECT
    COUNT(DISTINCT CASE WHEN position = 1  THEN session_key END),
    COUNT(DISTINCT CASE WHEN position <= 3 THEN session_key END)
  FROM positions
  WHERE driver_number = ?1";

const DRIVER_MAX_SPEED: &str =
  "SELECT COALESCE(MAX(st_speed), 0.0) FROM laps WHERE driver_number = ?1";

const DRIVER_RACE_RESULTS: &str = "
  WITH driver_laps AS (
    SELECT session_key,
           MIN(CASE WHEN lap_duration > 0 THEN lap_duration END) AS best_lap,
           MAX(st_speed)                                          AS max_speed
    FROM laps
    WHERE driver_number = ?1
    GROUP BY session_key
  ),
  session_best AS (
    SELECT session_key, MIN(lap_duration) AS best_lap
    FROM laps
    WHERE lap_duration > 0
    GROUP BY session_key
  )
  SELECT
    s.session_key,
    s.circuit_short_name,
    s.country_name,
    p.position,
    COALESCE(dl.best_lap, 0.0),
    COALESCE(dl.max_speed, 0.0),
    COALESCE(dl.best_lap IS NOT NULL AND dl.best_lap = sb.best_lap, 0)
  FROM positions p
  JOIN sessions s            ON s.session_key  = p.session_key
  LEFT JOIN driver_laps dl   ON dl.session_key = p.session_key
  LEFT JOIN session_best sb  ON sb.session_key = p.session_key
  WHERE p.driver_number = ?1
  ORDER BY s.date_start ASC, s.session_key ASC";

// ─── Race summary ────────────────────────────────────────────────────────────

const RACE_HEADER: &str = "
  SELECT session_key, country_name, date_start, year, circuit_short_name
  FROM sessions WHERE session_key = ?1";

const RACE_PODIUM: &str = "
  SELECT p.position, d.driver_number, d.first_name || ' ' || d.last_name,
         d.team_name, d.country_code
  FROM positions p
  JOIN drivers d ON d.driver_number = p.driver_number
  WHERE p.session_key = ?1
  ORDER BY p.position ASC, p.driver_number ASC
  LIMIT ?2";

const RACE_LAST_PLACE: &str = "
  SELECT p.position, d.driver_number, d.first_name || ' ' || d.last_name,
         d.team_name, d.country_code
  FROM positions p
  JOIN drivers d ON d.driver_number = p.driver_number
  WHERE p.session_key = ?1
  ORDER BY p.position DESC, p.driver_number DESC
  LIMIT 1";

const RACE_FASTEST_LAP: &str = "
  SELECT d.driver_number, d.first_name || ' ' || d.last_name, l.lap_number,
         l.lap_duration, l.duration_sector_1, l.duration_sector_2,
         l.duration_sector_3
  FROM laps l
  JOIN drivers d ON d.driver_number = l.driver_number
  WHERE l.session_key = ?1 AND l.lap_duration > 0
  ORDER BY l.lap_duration ASC, l.driver_number ASC, l.lap_number ASC
  LIMIT 1";

// A zero speed is the "not recorded" fallback, never a reading.
const RACE_TOP_SPEED: &str = "
  SELECT d.driver_number, d.first_name || ' ' || d.last_name, l.st_speed
  FROM laps l
  JOIN drivers d ON d.driver_number = l.driver_number
  WHERE l.session_key = ?1 AND l.st_speed > 0
  ORDER BY l.st_speed DESC, l.driver_number ASC
  LIMIT 1";

// ─── Season leaderboard ──────────────────────────────────────────────────────

const SEASON_WINS: &str = "
  SELECT d.driver_number, d.first_name || ' ' || d.last_name, d.team_name,
         d.country_code, COUNT(DISTINCT p.session_key) AS n
  FROM positions p
  JOIN sessions s ON s.session_key   = p.session_key
  JOIN drivers d  ON d.driver_number = p.driver_number
  WHERE s.year = ?1 AND s.session_type = ?2 AND p.position = 1
  GROUP BY d.driver_number
  ORDER BY n DESC, d.driver_number ASC
  LIMIT ?3";

const SEASON_PODIUMS: &str = "
  SELECT d.driver_number, d.first_name || ' ' || d.last_name, d.team_name,
         d.country_code, COUNT(DISTINCT p.session_key) AS n
  FROM positions p
  JOIN sessions s ON s.session_key   = p.session_key
  JOIN drivers d  ON d.driver_number = p.driver_number
  WHERE s.year = ?1 AND s.session_type = ?2 AND p.position <= 3
  GROUP BY d.driver_number
  ORDER BY n DESC, d.driver_number ASC
  LIMIT ?3";

// Only fully timed laps (total and all three sectors positive) compete.
// Every driver matching a session's minimum is credited.
const SEASON_FASTEST_LAPS: &str = "
  WITH valid_laps AS (
    SELECT l.session_key, l.driver_number, l.lap_duration
    FROM laps l
    JOIN sessions s ON s.session_key = l.session_key
    WHERE s.year = ?1 AND s.session_type = ?2
      AND l.lap_duration > 0
      AND l.duration_sector_1 > 0
      AND l.duration_sector_2 > 0
      AND l.duration_sector_3 > 0
  ),
  session_best AS (
    SELECT session_key, MIN(lap_duration) AS best
    FROM valid_laps
    GROUP BY session_key
  ),
  holders AS (
    SELECT DISTINCT v.session_key, v.driver_number
    FROM valid_laps v
    JOIN session_best b
      ON b.session_key = v.session_key AND v.lap_duration = b.best
  )
  SELECT d.driver_number, d.first_name || ' ' || d.last_name, d.team_name,
         d.country_code, COUNT(*) AS n
  FROM holders h
  JOIN drivers d ON d.driver_number = h.driver_number
  GROUP BY d.driver_number
  ORDER BY n DESC, d.driver_number ASC
  LIMIT ?3";

// ─── Row helpers ─────────────────────────────────────────────────────────────

fn placing_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Placing> {
  Ok(Placing {
    position:      row.get(0)?,
    driver_number: row.get(1)?,
    driver:        row.get(2)?,
    team:          row.get(3)?,
    country:       row.get(4)?,
  })
}

fn leaderboard(
  conn: &rusqlite::Connection,
  sql: &str,
  year: i32,
) -> rusqlite::Result<Vec<LeaderboardEntry>> {
  let mut stmt = conn.prepare_cached(sql)?;
  let rows = stmt
    .query_map(rusqlite::params![year, RACE_SESSION_TYPE, TOP_N], |row| {
      Ok(LeaderboardEntry {
        rank:          0,
        driver_number: row.get(0)?,
        driver:        row.get(1)?,
        team:          row.get(2)?,
        country:       row.get(3)?,
        count:         row.get(4)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(
    rows
      .into_iter()
      .zip(1..)
      .map(|(entry, rank)| LeaderboardEntry { rank, ..entry })
      .collect(),
  )
}

/// Everything a race summary needs, read in one snapshot.
struct RawRace {
  session_key:        SessionKey,
  country_name:       String,
  date_start:         String,
  year:               i32,
  circuit_short_name: String,
  podium:             Vec<Placing>,
  last_place:         Option<Placing>,
  fastest_lap:        Option<FastestLap>,
  top_speed:          Option<TopSpeed>,
}

// ─── QueryStore impl ─────────────────────────────────────────────────────────

impl QueryStore for SqliteStore {
  type Error = Error;

  async fn list_drivers(&self) -> Result<Vec<Driver>> {
    let drivers = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {DRIVER_COLUMNS} FROM drivers ORDER BY driver_number ASC"
        ))?;
        let rows = stmt
          .query_map([], driver_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(drivers)
  }

  async fn list_races(&self, year: Option<i32>) -> Result<Vec<Session>> {
    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SESSION_COLUMNS} FROM sessions
           WHERE session_type = ?1 AND (?2 IS NULL OR year = ?2)
           ORDER BY date_start ASC, session_key ASC"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![RACE_SESSION_TYPE, year],
            RawSession::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSession::into_session).collect()
  }

  async fn driver_summary(
    &self,
    driver_number: DriverNumber,
  ) -> Result<Option<DriverSummary>> {
    let summary = self
      .conn
      .call(move |conn| {
        // One read transaction so every part sees the same committed state.
        let tx = conn.transaction()?;

        let driver = tx
          .query_row(
            &format!("SELECT {DRIVER_COLUMNS} FROM drivers WHERE driver_number = ?1"),
            rusqlite::params![driver_number],
            driver_from_row,
          )
          .optional()?;
        let Some(driver) = driver else {
          return Ok(None);
        };

        let (wins, top3): (u32, u32) = tx.query_row(
          DRIVER_TOTALS,
          rusqlite::params![driver_number],
          |r| Ok((r.get(0)?, r.get(1)?)),
        )?;
        let max_speed: f64 = tx.query_row(
          DRIVER_MAX_SPEED,
          rusqlite::params![driver_number],
          |r| r.get(0),
        )?;

        let race_results = {
          let mut stmt = tx.prepare(DRIVER_RACE_RESULTS)?;
          stmt
            .query_map(rusqlite::params![driver_number], |row| {
              let country: String = row.get(2)?;
              Ok(DriverRaceResult {
                session_key:        row.get(0)?,
                circuit_short_name: row.get(1)?,
                race:               race_label(&country),
                position:           row.get(3)?,
                best_lap_duration:  row.get(4)?,
                max_speed:          row.get(5)?,
                fastest_lap:        row.get(6)?,
              })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        tx.commit()?;

        Ok(Some(DriverSummary {
          driver,
          performance: Performance { wins, top3, max_speed },
          race_results,
        }))
      })
      .await?;
    Ok(summary)
  }

  async fn race_summary(&self, session_key: SessionKey) -> Result<Option<RaceSummary>> {
    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let header = tx
          .query_row(RACE_HEADER, rusqlite::params![session_key], |r| {
            Ok((
              r.get::<_, SessionKey>(0)?,
              r.get::<_, String>(1)?,
              r.get::<_, String>(2)?,
              r.get::<_, i32>(3)?,
              r.get::<_, String>(4)?,
            ))
          })
          .optional()?;
        let Some((session_key, country_name, date_start, year, circuit_short_name)) =
          header
        else {
          return Ok(None);
        };

        let podium = {
          let mut stmt = tx.prepare(RACE_PODIUM)?;
          stmt
            .query_map(rusqlite::params![session_key, TOP_N], placing_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        let last_place = tx
          .query_row(RACE_LAST_PLACE, rusqlite::params![session_key], placing_from_row)
          .optional()?;
        let fastest_lap = tx
          .query_row(RACE_FASTEST_LAP, rusqlite::params![session_key], |r| {
            Ok(FastestLap {
              driver_number: r.get(0)?,
              driver:        r.get(1)?,
              lap_number:    r.get(2)?,
              total_time:    r.get(3)?,
              sector_1:      r.get(4)?,
              sector_2:      r.get(5)?,
              sector_3:      r.get(6)?,
            })
          })
          .optional()?;
        let top_speed = tx
          .query_row(RACE_TOP_SPEED, rusqlite::params![session_key], |r| {
            Ok(TopSpeed {
              driver_number: r.get(0)?,
              driver:        r.get(1)?,
              speed_kmh:     r.get(2)?,
            })
          })
          .optional()?;
        tx.commit()?;

        Ok(Some(RawRace {
          session_key,
          country_name,
          date_start,
          year,
          circuit_short_name,
          podium,
          last_place,
          fastest_lap,
          top_speed,
        }))
      })
      .await?;

    let Some(raw) = raw else {
      return Ok(None);
    };
    Ok(Some(RaceSummary {
      session_key:        raw.session_key,
      country_name:       raw.country_name,
      date_start:         decode_dt(&raw.date_start)?,
      year:               raw.year,
      circuit_short_name: raw.circuit_short_name,
      podium:             raw.podium,
      last_place:         raw.last_place,
      fastest_lap:        raw.fastest_lap,
      top_speed:          raw.top_speed,
    }))
  }

  async fn season_leaderboard(&self, year: i32) -> Result<SeasonLeaderboard> {
    let board = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let top_winners = leaderboard(&tx, SEASON_WINS, year)?;
        let top_fastest_laps = leaderboard(&tx, SEASON_FASTEST_LAPS, year)?;
        let top_podium_finishers = leaderboard(&tx, SEASON_PODIUMS, year)?;
        tx.commit()?;
        Ok(SeasonLeaderboard {
          season: year,
          top_winners,
          top_fastest_laps,
          top_podium_finishers,
        })
      })
      .await?;
    Ok(board)
  }
}
