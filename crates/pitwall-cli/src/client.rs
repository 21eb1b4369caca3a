//! Async HTTP client wrapping the Pitwall JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use pitwall_core::{
  model::{Driver, DriverNumber, Session, SessionKey},
  summary::{DriverSummary, RaceSummary, SeasonLeaderboard},
};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

/// Async HTTP client for the Pitwall query API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client:   Client,
  base_url: String,
}

impl ApiClient {
  pub fn new(base_url: impl Into<String>) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, base_url: base_url.into() })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.base_url.trim_end_matches('/'), path)
  }

  /// `GET` a JSON resource. A 404 is `Ok(None)`.
  async fn get<T: DeserializeOwned>(
    &self,
    path: &str,
    query: &[(&str, String)],
  ) -> Result<Option<T>> {
    tracing::debug!(path, ?query, "GET");
    let resp = self
      .client
      .get(self.url(path))
      .query(query)
      .send()
      .await
      .with_context(|| format!("GET {path} failed"))?;

    match resp.status() {
      StatusCode::NOT_FOUND => Ok(None),
      s if s.is_success() => resp
        .json()
        .await
        .map(Some)
        .with_context(|| format!("deserialising {path}")),
      s => Err(anyhow!("GET {path} → {s}")),
    }
  }

  async fn get_required<T: DeserializeOwned>(
    &self,
    path: &str,
    query: &[(&str, String)],
  ) -> Result<T> {
    self
      .get(path, query)
      .await?
      .ok_or_else(|| anyhow!("GET {path} → 404 Not Found"))
  }

  // ── Drivers ───────────────────────────────────────────────────────────────

  /// `GET /api/drivers`
  pub async fn list_drivers(&self) -> Result<Vec<Driver>> {
    self.get_required("/drivers", &[]).await
  }

  /// `GET /api/drivers/{number}`
  pub async fn driver_summary(&self, number: DriverNumber) -> Result<Option<DriverSummary>> {
    self.get(&format!("/drivers/{number}"), &[]).await
  }

  // ── Races ─────────────────────────────────────────────────────────────────

  /// `GET /api/races[?year=<y>]`
  pub async fn list_races(&self, year: Option<i32>) -> Result<Vec<Session>> {
    self.get_required("/races", &year_query(year)).await
  }

  /// `GET /api/races/{session_key}`
  pub async fn race_summary(&self, key: SessionKey) -> Result<Option<RaceSummary>> {
    self.get(&format!("/races/{key}"), &[]).await
  }

  /// `GET /api/season[?year=<y>]`
  pub async fn season(&self, year: Option<i32>) -> Result<SeasonLeaderboard> {
    self.get_required("/season", &year_query(year)).await
  }
}

fn year_query(year: Option<i32>) -> Vec<(&'static str, String)> {
  year.map(|y| ("year", y.to_string())).into_iter().collect()
}
