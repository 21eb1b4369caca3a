//! Ingestion configuration.
//!
//! Every field has a default, so an empty `[ingest]` table (or none at all)
//! reproduces the stock behaviour.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::{DriverNumber, PositionPolicy, SessionKey};

/// Drivers to import from one session's entry list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverSource {
  pub session_key:    SessionKey,
  /// Empty means every driver in the entry list.
  #[serde(default)]
  pub driver_numbers: Vec<DriverNumber>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
  /// Season whose race sessions are ingested and ranked by default.
  pub season:                  i32,
  /// `session_name` filter applied when fetching sessions.
  pub session_name:            String,
  /// Rows per write transaction.
  pub batch_size:              usize,
  /// Total attempts for a batch that keeps hitting lock contention.
  pub max_attempts:            u32,
  /// First backoff delay; doubles after every failed attempt.
  pub backoff_base_ms:         u64,
  /// Lock wait applied while positions and laps are bulk-written.
  pub busy_timeout_ms:         u64,
  /// Reserved or test entries never written to positions or laps.
  pub excluded_driver_numbers: Vec<DriverNumber>,
  pub position_policy:         PositionPolicy,
  pub driver_sources:          Vec<DriverSource>,
}

impl IngestConfig {
  pub fn backoff_base(&self) -> Duration { Duration::from_millis(self.backoff_base_ms) }

  pub fn busy_timeout(&self) -> Duration { Duration::from_millis(self.busy_timeout_ms) }
}

impl Default for IngestConfig {
  fn default() -> Self {
    Self {
      season:                  2024,
      session_name:            "Race".to_owned(),
      batch_size:              100,
      max_attempts:            5,
      backoff_base_ms:         100,
      busy_timeout_ms:         10_000,
      excluded_driver_numbers: vec![61],
      position_policy:         PositionPolicy::FirstSample,
      driver_sources:          vec![
        DriverSource {
          session_key:    9574,
          driver_numbers: vec![
            1, 2, 3, 4, 10, 11, 14, 16, 18, 20, 22, 23, 24, 27, 31, 44, 55, 63,
            77, 81,
          ],
        },
        DriverSource { session_key: 9636, driver_numbers: vec![30, 43, 50] },
      ],
    }
  }
}
