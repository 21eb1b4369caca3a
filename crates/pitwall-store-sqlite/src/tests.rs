//! Integration tests for `SqliteStore` against in-memory and file databases.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use pitwall_core::{
  model::{Batch, Driver, DriverNumber, Lap, Position, PositionPolicy, Session, SessionKey},
  store::{ClassifyError, IngestStore, JournalMode, QueryStore, StoreErrorKind, WriteMode},
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

// ─── Fixtures ────────────────────────────────────────────────────────────────

fn ts(day: u32, secs: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 3, day, 15, 0, 0).unwrap()
    + chrono::Duration::seconds(i64::from(secs))
}

fn driver(n: DriverNumber, last: &str) -> Driver {
  Driver {
    driver_number: n,
    first_name:    format!("Driver{n}"),
    last_name:     last.into(),
    name_acronym:  last.chars().take(3).collect::<String>().to_uppercase(),
    team_name:     format!("Team {n}"),
    country_code:  "GBR".into(),
  }
}

fn session(key: SessionKey, country: &str, year: i32, day: u32) -> Session {
  Session {
    session_key:        key,
    session_name:       "Race".into(),
    session_type:       "Race".into(),
    location:           country.into(),
    country_name:       country.into(),
    year,
    circuit_short_name: format!("{country} GP"),
    date_start:         Utc.with_ymd_and_hms(year, 3, day, 15, 0, 0).unwrap(),
  }
}

fn pos(n: DriverNumber, key: SessionKey, position: u32) -> Position {
  Position { driver_number: n, session_key: key, position, date: ts(1, 0) }
}

fn lap(n: DriverNumber, key: SessionKey, lap_number: u32, duration: f64, speed: f64) -> Lap {
  Lap {
    driver_number: n,
    session_key: key,
    lap_number,
    lap_duration: duration,
    duration_sector_1: duration / 3.0,
    duration_sector_2: duration / 3.0,
    duration_sector_3: duration / 3.0,
    st_speed: speed,
    date_start: ts(1, lap_number),
  }
}

fn positions(rows: Vec<Position>) -> Batch {
  Batch::Positions { rows, policy: PositionPolicy::FirstSample }
}

async fn seed_drivers(s: &SqliteStore, numbers: &[DriverNumber]) {
  let rows = numbers.iter().map(|&n| driver(n, &format!("Last{n}"))).collect();
  s.upsert(Batch::Drivers(rows)).await.unwrap();
}

// ─── Upsert semantics ────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_twice_is_idempotent() {
  let s = store().await;
  let batch = Batch::Laps(vec![
    lap(1, 9999, 1, 80.0, 300.0),
    lap(1, 9999, 2, 79.0, 305.0),
    lap(4, 9999, 1, 81.0, 299.0),
  ]);

  assert_eq!(s.upsert(batch.clone()).await.unwrap(), 3);
  assert_eq!(s.upsert(batch).await.unwrap(), 0);

  seed_drivers(&s, &[1, 4]).await;
  s.upsert(Batch::Sessions(vec![session(9999, "Bahrain", 2024, 2)]))
    .await
    .unwrap();
  let race = s.race_summary(9999).await.unwrap().unwrap();
  assert_eq!(race.fastest_lap.unwrap().total_time, 79.0);
}

#[tokio::test]
async fn first_driver_write_wins() {
  let s = store().await;
  s.upsert(Batch::Drivers(vec![driver(1, "Verstappen")])).await.unwrap();

  let mut changed = driver(1, "Verstappen");
  changed.team_name = "Somewhere Else".into();
  assert_eq!(s.upsert(Batch::Drivers(vec![changed])).await.unwrap(), 0);

  let drivers = s.list_drivers().await.unwrap();
  assert_eq!(drivers.len(), 1);
  assert_eq!(drivers[0].team_name, "Team 1");
}

#[tokio::test]
async fn first_sample_policy_keeps_earliest_write() {
  let s = store().await;
  let early = Position { date: ts(2, 10), ..pos(1, 9999, 5) };
  let late = Position { date: ts(2, 99), ..pos(1, 9999, 1) };

  s.upsert(positions(vec![early, late])).await.unwrap();
  seed_drivers(&s, &[1]).await;
  s.upsert(Batch::Sessions(vec![session(9999, "Bahrain", 2024, 2)]))
    .await
    .unwrap();

  let summary = s.driver_summary(1).await.unwrap().unwrap();
  assert_eq!(summary.race_results[0].position, 5);
  assert_eq!(summary.performance.wins, 0);
}

#[tokio::test]
async fn latest_sample_policy_keeps_latest_observation() {
  let s = store().await;
  let early = Position { date: ts(2, 10), ..pos(1, 9999, 5) };
  let late = Position { date: ts(2, 99), ..pos(1, 9999, 1) };
  let batch = Batch::Positions {
    rows:   vec![late.clone(), early],
    policy: PositionPolicy::LatestSample,
  };

  assert_eq!(s.upsert(batch.clone()).await.unwrap(), 1);
  // Replaying the same samples changes nothing.
  assert_eq!(s.upsert(batch).await.unwrap(), 0);

  seed_drivers(&s, &[1]).await;
  s.upsert(Batch::Sessions(vec![session(9999, "Bahrain", 2024, 2)]))
    .await
    .unwrap();
  let summary = s.driver_summary(1).await.unwrap().unwrap();
  assert_eq!(summary.race_results[0].position, 1);
  assert_eq!(summary.performance.wins, 1);
}

#[tokio::test]
async fn failing_row_rolls_back_whole_batch() {
  let s = store().await;
  // Position 0 violates the CHECK constraint on the third row.
  let err = s
    .upsert(positions(vec![pos(1, 9999, 1), pos(2, 9999, 2), pos(3, 9999, 0)]))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), StoreErrorKind::Other);

  seed_drivers(&s, &[1, 2, 3]).await;
  s.upsert(Batch::Sessions(vec![session(9999, "Bahrain", 2024, 2)]))
    .await
    .unwrap();
  let race = s.race_summary(9999).await.unwrap().unwrap();
  assert!(race.podium.is_empty());
  assert!(race.last_place.is_none());
}

#[tokio::test]
async fn session_keys_follow_start_order() {
  let s = store().await;
  s.upsert(Batch::Sessions(vec![
    session(3, "Japan", 2024, 20),
    session(1, "Bahrain", 2024, 2),
    session(2, "Monaco", 2023, 10),
  ]))
  .await
  .unwrap();

  assert_eq!(s.session_keys(Some(2024)).await.unwrap(), [1, 3]);
  assert_eq!(s.session_keys(None).await.unwrap(), [2, 1, 3]);
}

// ─── Driver summary ──────────────────────────────────────────────────────────

async fn seed_bahrain(s: &SqliteStore) {
  seed_drivers(s, &[1, 11, 16]).await;
  s.upsert(Batch::Sessions(vec![session(9999, "Bahrain", 2024, 2)]))
    .await
    .unwrap();
  s.upsert(positions(vec![pos(1, 9999, 1), pos(11, 9999, 2), pos(16, 9999, 3)]))
    .await
    .unwrap();
  s.upsert(Batch::Laps(vec![
    lap(1, 9999, 1, 0.0, 280.0),
    lap(1, 9999, 2, 78.123, 310.5),
    lap(1, 9999, 3, 79.0, 305.0),
    lap(11, 9999, 1, 80.0, 318.0),
    lap(11, 9999, 2, 81.0, 300.0),
    lap(16, 9999, 1, 0.0, 0.0),
  ]))
  .await
  .unwrap();
}

#[tokio::test]
async fn driver_summary_marks_fastest_lap_holder() {
  let s = store().await;
  seed_bahrain(&s).await;

  let ver = s.driver_summary(1).await.unwrap().unwrap();
  assert_eq!(ver.driver.last_name, "Last1");
  assert_eq!(ver.performance.wins, 1);
  assert_eq!(ver.performance.top3, 1);
  assert_eq!(ver.performance.max_speed, 310.5);

  let result = &ver.race_results[0];
  assert_eq!(result.session_key, 9999);
  assert_eq!(result.race, "Race in Bahrain");
  assert_eq!(result.circuit_short_name, "Bahrain GP");
  assert_eq!(result.position, 1);
  assert!(result.fastest_lap);
  assert_eq!(result.best_lap_duration, 78.123);

  let per = s.driver_summary(11).await.unwrap().unwrap();
  assert_eq!(per.performance.wins, 0);
  assert_eq!(per.performance.top3, 1);
  assert!(!per.race_results[0].fastest_lap);
  assert_eq!(per.race_results[0].best_lap_duration, 80.0);
  assert_eq!(per.race_results[0].max_speed, 318.0);
}

#[tokio::test]
async fn driver_without_valid_laps_has_zeroes() {
  let s = store().await;
  seed_bahrain(&s).await;

  let lec = s.driver_summary(16).await.unwrap().unwrap();
  let result = &lec.race_results[0];
  assert_eq!(result.best_lap_duration, 0.0);
  assert_eq!(result.max_speed, 0.0);
  assert!(!result.fastest_lap);
  assert_eq!(lec.performance.max_speed, 0.0);
}

#[tokio::test]
async fn driver_summary_orders_races_and_skips_unplaced_sessions() {
  let s = store().await;
  seed_bahrain(&s).await;
  s.upsert(Batch::Sessions(vec![
    session(9000, "Saudi Arabia", 2024, 1),
    session(9100, "Australia", 2024, 24),
  ]))
  .await
  .unwrap();
  s.upsert(positions(vec![pos(1, 9000, 2)])).await.unwrap();
  // Laps without a stored position do not produce a result row.
  s.upsert(Batch::Laps(vec![lap(1, 9100, 1, 77.0, 330.0)])).await.unwrap();

  let ver = s.driver_summary(1).await.unwrap().unwrap();
  let keys: Vec<_> = ver.race_results.iter().map(|r| r.session_key).collect();
  assert_eq!(keys, [9000, 9999]);
  assert_eq!(ver.performance.wins, 1);
  assert_eq!(ver.performance.top3, 2);
  assert_eq!(ver.performance.max_speed, 330.0);
  assert!(ver.performance.wins <= ver.performance.top3);
}

#[tokio::test]
async fn fastest_lap_flag_shared_on_exact_tie() {
  let s = store().await;
  seed_bahrain(&s).await;
  s.upsert(Batch::Laps(vec![lap(11, 9999, 3, 78.123, 301.0)]))
    .await
    .unwrap();

  assert!(s.driver_summary(1).await.unwrap().unwrap().race_results[0].fastest_lap);
  assert!(s.driver_summary(11).await.unwrap().unwrap().race_results[0].fastest_lap);
  assert!(!s.driver_summary(16).await.unwrap().unwrap().race_results[0].fastest_lap);
}

#[tokio::test]
async fn driver_summary_missing_returns_none() {
  let s = store().await;
  assert!(s.driver_summary(99).await.unwrap().is_none());
}

// ─── Race summary ────────────────────────────────────────────────────────────

#[tokio::test]
async fn race_summary_podium_last_place_fastest_and_top_speed() {
  let s = store().await;
  seed_bahrain(&s).await;
  seed_drivers(&s, &[4, 81]).await;
  s.upsert(positions(vec![pos(4, 9999, 4), pos(81, 9999, 20)]))
    .await
    .unwrap();

  let race = s.race_summary(9999).await.unwrap().unwrap();
  assert_eq!(race.country_name, "Bahrain");
  assert_eq!(race.year, 2024);
  assert_eq!(race.date_start, Utc.with_ymd_and_hms(2024, 3, 2, 15, 0, 0).unwrap());

  let podium: Vec<_> = race.podium.iter().map(|p| (p.position, p.driver_number)).collect();
  assert_eq!(podium, [(1, 1), (2, 11), (3, 16)]);

  let last = race.last_place.unwrap();
  assert_eq!((last.position, last.driver_number), (20, 81));
  assert!(race.podium.iter().all(|p| p.position <= last.position));

  let fastest = race.fastest_lap.unwrap();
  assert_eq!(fastest.driver_number, 1);
  assert_eq!(fastest.driver, "Driver1 Last1");
  assert_eq!(fastest.lap_number, 2);
  assert_eq!(fastest.total_time, 78.123);

  let top = race.top_speed.unwrap();
  assert_eq!((top.driver_number, top.speed_kmh), (11, 318.0));
}

#[tokio::test]
async fn race_podium_ties_prefer_lower_driver_number() {
  let s = store().await;
  seed_drivers(&s, &[5, 7, 9, 3]).await;
  s.upsert(Batch::Sessions(vec![session(1, "Spain", 2024, 5)]))
    .await
    .unwrap();
  s.upsert(positions(vec![pos(9, 1, 1), pos(7, 1, 1), pos(5, 1, 2), pos(3, 1, 2)]))
    .await
    .unwrap();

  let race = s.race_summary(1).await.unwrap().unwrap();
  let podium: Vec<_> = race.podium.iter().map(|p| p.driver_number).collect();
  assert_eq!(podium, [7, 9, 3]);
  assert_eq!(race.last_place.unwrap().driver_number, 5);
}

#[tokio::test]
async fn race_summary_without_timing_has_no_lap_records() {
  let s = store().await;
  seed_drivers(&s, &[1]).await;
  s.upsert(Batch::Sessions(vec![session(1, "Spain", 2024, 5)]))
    .await
    .unwrap();
  s.upsert(Batch::Laps(vec![lap(1, 1, 1, 0.0, 0.0)])).await.unwrap();

  let race = s.race_summary(1).await.unwrap().unwrap();
  assert!(race.podium.is_empty());
  assert!(race.last_place.is_none());
  assert!(race.fastest_lap.is_none());
  assert!(race.top_speed.is_none());
}

#[tokio::test]
async fn race_summary_missing_returns_none() {
  let s = store().await;
  assert!(s.race_summary(1234).await.unwrap().is_none());
}

#[tokio::test]
async fn list_races_filters_type_and_season() {
  let s = store().await;
  let mut quali = session(5, "Bahrain", 2024, 1);
  quali.session_name = "Qualifying".into();
  quali.session_type = "Qualifying".into();
  s.upsert(Batch::Sessions(vec![
    session(3, "Japan", 2024, 20),
    session(1, "Bahrain", 2024, 2),
    session(2, "Monaco", 2023, 10),
    quali,
  ]))
  .await
  .unwrap();

  let keys: Vec<_> = s
    .list_races(Some(2024))
    .await
    .unwrap()
    .into_iter()
    .map(|r| r.session_key)
    .collect();
  assert_eq!(keys, [1, 3]);
  assert_eq!(s.list_races(None).await.unwrap().len(), 3);
}

// ─── Season leaderboard ──────────────────────────────────────────────────────

#[tokio::test]
async fn season_wins_rank_ties_by_driver_number() {
  let s = store().await;
  // A = 44, B = 16 (5 wins each), C = 1 (3 wins).
  seed_drivers(&s, &[1, 16, 44]).await;
  let sessions: Vec<_> = (1..=13).map(|k| session(k, "Somewhere", 2024, k)).collect();
  s.upsert(Batch::Sessions(sessions)).await.unwrap();

  let mut rows = vec![];
  for k in 1..=5 {
    rows.push(pos(44, k, 1));
  }
  for k in 6..=10 {
    rows.push(pos(16, k, 1));
  }
  for k in 11..=13 {
    rows.push(pos(1, k, 1));
  }
  s.upsert(positions(rows)).await.unwrap();

  let board = s.season_leaderboard(2024).await.unwrap();
  let winners: Vec<_> = board
    .top_winners
    .iter()
    .map(|e| (e.rank, e.driver_number, e.count))
    .collect();
  assert_eq!(winners, [(1, 16, 5), (2, 44, 5), (3, 1, 3)]);
  assert_eq!(board.top_winners[0].driver, "Driver16 Last16");
  assert_eq!(board.top_winners[0].team, "Team 16");
  assert_eq!(board.season, 2024);
}

#[tokio::test]
async fn season_podiums_count_top_three_finishes() {
  let s = store().await;
  seed_bahrain(&s).await;
  s.upsert(Batch::Sessions(vec![
    session(2, "Japan", 2024, 20),
    session(3, "Monaco", 2023, 10),
  ]))
  .await
  .unwrap();
  s.upsert(positions(vec![
    pos(1, 2, 4),
    pos(11, 2, 1),
    pos(16, 2, 3),
    // Other season: ignored.
    pos(1, 3, 1),
  ]))
  .await
  .unwrap();

  let board = s.season_leaderboard(2024).await.unwrap();
  let podiums: Vec<_> = board
    .top_podium_finishers
    .iter()
    .map(|e| (e.driver_number, e.count))
    .collect();
  assert_eq!(podiums, [(11, 2), (16, 2), (1, 1)]);
  assert!(board.top_podium_finishers.len() <= 3);
}

#[tokio::test]
async fn season_fastest_laps_require_fully_timed_laps() {
  let s = store().await;
  seed_bahrain(&s).await;
  s.upsert(Batch::Sessions(vec![session(2, "Japan", 2024, 20)]))
    .await
    .unwrap();

  // Fastest in Japan on paper, but sector 2 was not timed.
  let mut untimed = lap(16, 2, 1, 70.0, 300.0);
  untimed.duration_sector_2 = 0.0;
  s.upsert(Batch::Laps(vec![
    untimed,
    lap(11, 2, 1, 90.0, 300.0),
    lap(1, 2, 1, 90.0, 300.0),
  ]))
  .await
  .unwrap();

  let board = s.season_leaderboard(2024).await.unwrap();
  let fastest: Vec<_> = board
    .top_fastest_laps
    .iter()
    .map(|e| (e.rank, e.driver_number, e.count))
    .collect();
  // Bahrain to 1; Japan tied between 1 and 11.
  assert_eq!(fastest, [(1, 1, 2), (2, 11, 1)]);
}

#[tokio::test]
async fn empty_season_has_empty_tables() {
  let s = store().await;
  seed_bahrain(&s).await;
  let board = s.season_leaderboard(1999).await.unwrap();
  assert!(board.top_winners.is_empty());
  assert!(board.top_fastest_laps.is_empty());
  assert!(board.top_podium_finishers.is_empty());
}

// ─── Write mode and contention ───────────────────────────────────────────────

#[tokio::test]
async fn write_mode_switch_reports_prior_mode() {
  let dir = tempfile::tempdir().unwrap();
  let s = SqliteStore::open(dir.path().join("pitwall.db")).await.unwrap();

  let initial = s.write_mode().await.unwrap();
  assert_eq!(initial.journal_mode, JournalMode::Delete);

  let prior = s
    .set_write_mode(WriteMode::concurrent(Duration::from_millis(10_000)))
    .await
    .unwrap();
  assert_eq!(prior, initial);

  let now = s.write_mode().await.unwrap();
  assert_eq!(now.journal_mode, JournalMode::Wal);
  assert_eq!(now.busy_timeout, Duration::from_millis(10_000));

  s.set_write_mode(prior).await.unwrap();
  assert_eq!(s.write_mode().await.unwrap(), initial);
}

#[tokio::test]
async fn held_write_lock_is_lock_contention() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("pitwall.db");
  let s = SqliteStore::open(&path).await.unwrap();
  s.set_write_mode(WriteMode {
    journal_mode: JournalMode::Delete,
    busy_timeout: Duration::ZERO,
  })
  .await
  .unwrap();

  let other = rusqlite::Connection::open(&path).unwrap();
  other.execute_batch("BEGIN IMMEDIATE").unwrap();

  let err = s
    .upsert(Batch::Drivers(vec![driver(1, "Verstappen")]))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), StoreErrorKind::LockContention);
  assert!(err.is_lock_contention());

  other.execute_batch("ROLLBACK").unwrap();
  assert_eq!(
    s.upsert(Batch::Drivers(vec![driver(1, "Verstappen")])).await.unwrap(),
    1
  );
}

#[tokio::test]
async fn reader_sees_only_committed_batches_under_wal() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("pitwall.db");
  let writer = SqliteStore::open(&path).await.unwrap();
  writer
    .set_write_mode(WriteMode::concurrent(Duration::from_millis(1_000)))
    .await
    .unwrap();
  let reader = SqliteStore::open(&path).await.unwrap();

  writer.upsert(Batch::Drivers(vec![driver(1, "Verstappen")])).await.unwrap();

  // A foreign writer holds an open, uncommitted transaction.
  let other = rusqlite::Connection::open(&path).unwrap();
  other.execute_batch("BEGIN IMMEDIATE").unwrap();
  other
    .execute(
      "INSERT INTO drivers VALUES (2, 'Logan', 'Sargeant', 'SAR', 'Williams', 'USA')",
      [],
    )
    .unwrap();

  let seen: Vec<_> = reader
    .list_drivers()
    .await
    .unwrap()
    .into_iter()
    .map(|d| d.driver_number)
    .collect();
  assert_eq!(seen, [1]);

  other.execute_batch("COMMIT").unwrap();
  assert_eq!(reader.list_drivers().await.unwrap().len(), 2);
}

#[tokio::test]
async fn in_memory_database_refuses_wal() {
  let s = store().await;
  let before = s.write_mode().await.unwrap();
  assert_eq!(before.journal_mode, JournalMode::Memory);

  let err = s
    .set_write_mode(WriteMode::concurrent(Duration::from_millis(10_000)))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::JournalModeRefused { requested: JournalMode::Wal, ref effective } if effective == "memory"
  ));
  assert_eq!(err.kind(), StoreErrorKind::Other);

  let now = s.write_mode().await.unwrap();
  assert_eq!(now.journal_mode, JournalMode::Memory);
  assert_eq!(now.busy_timeout, Duration::from_millis(10_000));
}

#[tokio::test]
async fn failed_wal_exit_still_applies_busy_timeout() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("pitwall.db");
  let writer = SqliteStore::open(&path).await.unwrap();
  let initial = WriteMode {
    journal_mode: JournalMode::Delete,
    busy_timeout: Duration::from_millis(50),
  };
  writer.set_write_mode(initial).await.unwrap();

  let prior = writer
    .set_write_mode(WriteMode::concurrent(Duration::from_millis(10_000)))
    .await
    .unwrap();
  assert_eq!(prior, initial);

  // A second connection reading through the WAL pins the journal mode.
  let reader = SqliteStore::open(&path).await.unwrap();
  assert!(reader.list_drivers().await.unwrap().is_empty());

  assert!(writer.set_write_mode(prior).await.is_err());
  let now = writer.write_mode().await.unwrap();
  assert_eq!(now.journal_mode, JournalMode::Wal);
  assert_eq!(now.busy_timeout, Duration::from_millis(50));
}

#[tokio::test]
async fn wal_baseline_round_trips_with_a_reader_open() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("pitwall.db");
  let writer = SqliteStore::open(&path).await.unwrap();
  let baseline = WriteMode::concurrent(Duration::from_millis(50));
  writer.set_write_mode(baseline).await.unwrap();

  let reader = SqliteStore::open(&path).await.unwrap();
  assert!(reader.list_drivers().await.unwrap().is_empty());

  let prior = writer
    .set_write_mode(WriteMode::concurrent(Duration::from_millis(10_000)))
    .await
    .unwrap();
  assert_eq!(prior, baseline);
  writer.upsert(Batch::Drivers(vec![driver(1, "Verstappen")])).await.unwrap();
  assert_eq!(reader.list_drivers().await.unwrap().len(), 1);

  writer.set_write_mode(prior).await.unwrap();
  assert_eq!(writer.write_mode().await.unwrap(), baseline);
}
