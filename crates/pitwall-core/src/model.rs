//! Typed rows for the four stored entities.
//!
//! All rows are write-once from the engine's point of view: they are created
//! by the ingestion pipeline and only ever read afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type DriverNumber = u32;
pub type SessionKey = u32;

/// The only session type the aggregation views consider.
pub const RACE_SESSION_TYPE: &str = "Race";

// ─── Entities ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
  pub driver_number: DriverNumber,
  pub first_name:    String,
  pub last_name:     String,
  pub name_acronym:  String,
  pub team_name:     String,
  pub country_code:  String,
}

impl Driver {
  pub fn full_name(&self) -> String {
    format!("{} {}", self.first_name, self.last_name)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
  pub session_key:        SessionKey,
  pub session_name:       String,
  pub session_type:       String,
  pub location:           String,
  pub country_name:       String,
  pub year:               i32,
  pub circuit_short_name: String,
  pub date_start:         DateTime<Utc>,
}

impl Session {
  pub fn is_race(&self) -> bool { self.session_type == RACE_SESSION_TYPE }
}

/// A driver's classification in a session.
///
/// At most one row exists per (driver, session); which observation is kept
/// is decided by [`PositionPolicy`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
  pub driver_number: DriverNumber,
  pub session_key:   SessionKey,
  /// Always ≥ 1.
  pub position:      u32,
  pub date:          DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lap {
  pub driver_number:     DriverNumber,
  pub session_key:       SessionKey,
  pub lap_number:        u32,
  /// Zero when the source had neither a duration nor any sector times.
  pub lap_duration:      f64,
  pub duration_sector_1: f64,
  pub duration_sector_2: f64,
  pub duration_sector_3: f64,
  pub st_speed:          f64,
  pub date_start:        DateTime<Utc>,
}

impl Lap {
  /// A timed lap; in-laps, out-laps and invalidated laps have no positive
  /// duration.
  pub fn is_valid(&self) -> bool { self.lap_duration > 0.0 }

  /// Valid, and every sector was timed too.
  pub fn is_fully_timed(&self) -> bool {
    self.is_valid()
      && self.duration_sector_1 > 0.0
      && self.duration_sector_2 > 0.0
      && self.duration_sector_3 > 0.0
  }
}

// ─── Write policy ────────────────────────────────────────────────────────────

/// Which sample of a position time series is kept for a (driver, session).
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PositionPolicy {
  /// The first stored observation wins; later ones are ignored.
  #[default]
  FirstSample,
  /// An observation with a strictly later timestamp replaces the stored one.
  LatestSample,
}

// ─── Batches ─────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Entity {
  Driver,
  Session,
  Position,
  Lap,
}

/// A homogeneous group of rows applied to the store as one transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum Batch {
  Drivers(Vec<Driver>),
  Sessions(Vec<Session>),
  Positions {
    rows:   Vec<Position>,
    policy: PositionPolicy,
  },
  Laps(Vec<Lap>),
}

impl Batch {
  pub fn entity(&self) -> Entity {
    match self {
      Self::Drivers(_) => Entity::Driver,
      Self::Sessions(_) => Entity::Session,
      Self::Positions { .. } => Entity::Position,
      Self::Laps(_) => Entity::Lap,
    }
  }

  pub fn len(&self) -> usize {
    match self {
      Self::Drivers(r) => r.len(),
      Self::Sessions(r) => r.len(),
      Self::Positions { rows, .. } => rows.len(),
      Self::Laps(r) => r.len(),
    }
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  /// Split into consecutive batches of at most `size` rows, preserving
  /// source order. An empty batch splits into nothing.
  pub fn split(self, size: usize) -> Vec<Batch> {
    let size = size.max(1);
    match self {
      Self::Drivers(r) => chunk(r, size).map(Self::Drivers).collect(),
      Self::Sessions(r) => chunk(r, size).map(Self::Sessions).collect(),
      Self::Positions { rows, policy } => chunk(rows, size)
        .map(|rows| Self::Positions { rows, policy })
        .collect(),
      Self::Laps(r) => chunk(r, size).map(Self::Laps).collect(),
    }
  }
}

fn chunk<T>(rows: Vec<T>, size: usize) -> impl Iterator<Item = Vec<T>> {
  let mut rows = rows.into_iter().peekable();
  std::iter::from_fn(move || {
    rows.peek()?;
    Some(rows.by_ref().take(size).collect())
  })
}
