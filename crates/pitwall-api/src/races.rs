//! Handlers for `/races` and `/season` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/races` | Optional `?year=<season>` |
//! | `GET`  | `/races/{session_key}` | Race summary; 404 if not stored |
//! | `GET`  | `/season` | Optional `?year=<season>`, defaults to the configured one |

use axum::{
  Json,
  extract::{
    Path, Query, State,
    rejection::{PathRejection, QueryRejection},
  },
};
use pitwall_core::{
  model::{Session, SessionKey},
  store::QueryStore,
  summary::{RaceSummary, SeasonLeaderboard},
};
use serde::Deserialize;

use crate::{ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct YearParams {
  pub year: Option<i32>,
}

fn year_param(params: Result<Query<YearParams>, QueryRejection>) -> Result<Option<i32>, ApiError> {
  let Query(params) = params?;
  Ok(params.year)
}

// ─── Races ────────────────────────────────────────────────────────────────────

/// `GET /races[?year=<season>]`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  params: Result<Query<YearParams>, QueryRejection>,
) -> Result<Json<Vec<Session>>, ApiError>
where
  S: QueryStore,
{
  let year = year_param(params)?;
  let races = state
    .store
    .list_races(year)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(races))
}

/// `GET /races/{session_key}`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  key: Result<Path<SessionKey>, PathRejection>,
) -> Result<Json<RaceSummary>, ApiError>
where
  S: QueryStore,
{
  let Path(key) = key?;
  let summary = state
    .store
    .race_summary(key)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("race {key} not found")))?;
  Ok(Json(summary))
}

// ─── Season ───────────────────────────────────────────────────────────────────

/// `GET /season[?year=<season>]`
pub async fn season<S>(
  State(state): State<ApiState<S>>,
  params: Result<Query<YearParams>, QueryRejection>,
) -> Result<Json<SeasonLeaderboard>, ApiError>
where
  S: QueryStore,
{
  let year = year_param(params)?.unwrap_or(state.default_season);
  let board = state
    .store
    .season_leaderboard(year)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(board))
}
