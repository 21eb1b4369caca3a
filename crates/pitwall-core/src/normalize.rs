//! Raw record → typed row conversion.
//!
//! This is the only place that knows the field names and shapes of the
//! upstream provider's records. It applies the null-fallback policy for laps
//! and the driver exclusion policy for positions and laps.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::{
  error::NormalizeError,
  model::{Driver, DriverNumber, Lap, Position, Session, SessionKey},
  record::{Record, Scalar},
};

type Result<T, E = NormalizeError> = std::result::Result<T, E>;

/// Outcome of normalising a record for an entity subject to the exclusion
/// policy.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized<T> {
  Row(T),
  /// The record belongs to an excluded driver and must not be stored.
  Excluded,
}

/// Converts raw records into typed rows.
#[derive(Debug, Clone)]
pub struct Normalizer {
  excluded: BTreeSet<DriverNumber>,
  /// Substituted for a lap's missing `date_start`.
  now:      DateTime<Utc>,
}

impl Normalizer {
  pub fn new(
    excluded: impl IntoIterator<Item = DriverNumber>,
    now: DateTime<Utc>,
  ) -> Self {
    Self { excluded: excluded.into_iter().collect(), now }
  }

  pub fn is_excluded(&self, driver_number: DriverNumber) -> bool {
    self.excluded.contains(&driver_number)
  }

  pub fn driver(&self, r: &Record) -> Result<Driver> {
    Ok(Driver {
      driver_number: required_u32(r, "driver_number")?,
      first_name:    required_text(r, "first_name")?,
      last_name:     required_text(r, "last_name")?,
      name_acronym:  required_text(r, "name_acronym")?,
      team_name:     required_text(r, "team_name")?,
      country_code:  required_text(r, "country_code")?,
    })
  }

  pub fn session(&self, r: &Record) -> Result<Session> {
    let year = required_u32(r, "year")?;
    Ok(Session {
      session_key:        required_u32(r, "session_key")?,
      session_name:       required_text(r, "session_name")?,
      session_type:       required_text(r, "session_type")?,
      location:           required_text(r, "location")?,
      country_name:       required_text(r, "country_name")?,
      year:               i32::try_from(year)
        .map_err(|_| NormalizeError::InvalidField("year"))?,
      circuit_short_name: required_text(r, "circuit_short_name")?,
      date_start:         required_timestamp(r, "date_start")?,
    })
  }

  /// Normalise a position sample observed in `session_key`.
  pub fn position(
    &self,
    r: &Record,
    session_key: SessionKey,
  ) -> Result<Normalized<Position>> {
    let driver_number = required_u32(r, "driver_number")?;
    if self.is_excluded(driver_number) {
      return Ok(Normalized::Excluded);
    }

    let position = required_u32(r, "position")?;
    if position < 1 {
      return Err(NormalizeError::InvalidField("position"));
    }

    Ok(Normalized::Row(Position {
      driver_number,
      session_key,
      position,
      date: required_timestamp(r, "date")?,
    }))
  }

  /// Normalise a lap driven in `session_key`.
  ///
  /// Missing timing fields fall back to zero; a missing total falls back to
  /// the sum of the sectors that are present.
  pub fn lap(&self, r: &Record, session_key: SessionKey) -> Result<Normalized<Lap>> {
    let driver_number = required_u32(r, "driver_number")?;
    if self.is_excluded(driver_number) {
      return Ok(Normalized::Excluded);
    }
    let lap_number = required_u32(r, "lap_number")?;

    let sector_1 = optional_f64(r, "duration_sector_1")?;
    let sector_2 = optional_f64(r, "duration_sector_2")?;
    let sector_3 = optional_f64(r, "duration_sector_3")?;

    let lap_duration = match optional_f64(r, "lap_duration")? {
      Some(total) => total,
      None => [sector_1, sector_2, sector_3].into_iter().flatten().sum(),
    };

    let date_start = match r.get("date_start") {
      Some(_) => required_timestamp(r, "date_start")?,
      None => self.now,
    };

    Ok(Normalized::Row(Lap {
      driver_number,
      session_key,
      lap_number,
      lap_duration,
      duration_sector_1: sector_1.unwrap_or(0.0),
      duration_sector_2: sector_2.unwrap_or(0.0),
      duration_sector_3: sector_3.unwrap_or(0.0),
      st_speed: optional_f64(r, "st_speed")?.unwrap_or(0.0),
      date_start,
    }))
  }
}

// ─── Field accessors ─────────────────────────────────────────────────────────

fn optional_f64(r: &Record, field: &'static str) -> Result<Option<f64>> {
  match r.get(field) {
    None => Ok(None),
    Some(Scalar::Number(n)) if n.is_finite() => Ok(Some(*n)),
    Some(_) => Err(NormalizeError::InvalidField(field)),
  }
}

fn required_u32(r: &Record, field: &'static str) -> Result<u32> {
  let n = optional_f64(r, field)?.ok_or(NormalizeError::MissingField(field))?;
  if n.fract() != 0.0 || n < 0.0 || n > f64::from(u32::MAX) {
    return Err(NormalizeError::InvalidField(field));
  }
  Ok(n as u32)
}

fn required_text(r: &Record, field: &'static str) -> Result<String> {
  match r.get(field) {
    None => Err(NormalizeError::MissingField(field)),
    Some(Scalar::Text(s)) => Ok(s.clone()),
    Some(_) => Err(NormalizeError::InvalidField(field)),
  }
}

fn required_timestamp(r: &Record, field: &'static str) -> Result<DateTime<Utc>> {
  let text = required_text(r, field)?;
  parse_timestamp(&text).ok_or(NormalizeError::InvalidField(field))
}

/// Parse an RFC 3339 timestamp; a timestamp without offset is taken as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .ok()
    .or_else(|| {
      NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
    })
}
