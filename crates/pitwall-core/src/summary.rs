//! Derived read models produced by the aggregation queries.
//!
//! Never stored, always computed from the raw Position and Lap rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Driver, DriverNumber, SessionKey};

/// Label shown for a race in per-driver results.
pub fn race_label(country_name: &str) -> String { format!("Race in {country_name}") }

// ─── Driver summary ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverSummary {
  pub driver:       Driver,
  pub performance:  Performance,
  /// One entry per session with a stored position, oldest first.
  pub race_results: Vec<DriverRaceResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Performance {
  /// Distinct sessions with stored position 1.
  pub wins:      u32,
  /// Distinct sessions with stored position ≤ 3.
  pub top3:      u32,
  /// Highest speed-trap reading over all laps; 0 without laps.
  pub max_speed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverRaceResult {
  pub session_key:        SessionKey,
  pub circuit_short_name: String,
  pub race:               String,
  pub position:           u32,
  /// The driver's best valid lap equals the session's best valid lap.
  pub fastest_lap:        bool,
  /// 0 when the driver has no valid lap in the session.
  pub best_lap_duration:  f64,
  pub max_speed:          f64,
}

// ─── Race summary ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceSummary {
  pub session_key:        SessionKey,
  pub country_name:       String,
  pub date_start:         DateTime<Utc>,
  pub year:               i32,
  pub circuit_short_name: String,
  /// Up to three lowest stored positions, ascending.
  pub podium:             Vec<Placing>,
  pub last_place:         Option<Placing>,
  pub fastest_lap:        Option<FastestLap>,
  pub top_speed:          Option<TopSpeed>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placing {
  pub position:      u32,
  pub driver_number: DriverNumber,
  pub driver:        String,
  pub team:          String,
  pub country:       String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FastestLap {
  pub driver_number: DriverNumber,
  pub driver:        String,
  pub lap_number:    u32,
  pub total_time:    f64,
  pub sector_1:      f64,
  pub sector_2:      f64,
  pub sector_3:      f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopSpeed {
  pub driver_number: DriverNumber,
  pub driver:        String,
  pub speed_kmh:     f64,
}

// ─── Season leaderboard ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonLeaderboard {
  pub season:               i32,
  /// Most race wins.
  pub top_winners:          Vec<LeaderboardEntry>,
  /// Most races holding the session's fastest fully timed lap.
  pub top_fastest_laps:     Vec<LeaderboardEntry>,
  /// Most races finishing in the top three. Older clients knew this table as
  /// "pole positions"; it has always counted podiums.
  pub top_podium_finishers: Vec<LeaderboardEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
  /// 1-based.
  pub rank:          u32,
  pub driver_number: DriverNumber,
  pub driver:        String,
  pub team:          String,
  pub country:       String,
  pub count:         u32,
}

/// Number of entries in each leaderboard table and on the podium.
pub const TOP_N: u32 = 3;
