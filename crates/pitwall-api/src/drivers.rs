//! Handlers for `/drivers` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/drivers` | Ordered by driver number |
//! | `GET`  | `/drivers/{number}` | Driver summary; 404 if not stored |

use axum::{
  Json,
  extract::{Path, State, rejection::PathRejection},
};
use pitwall_core::{
  model::{Driver, DriverNumber},
  store::QueryStore,
  summary::DriverSummary,
};

use crate::{ApiState, error::ApiError};

/// `GET /drivers`
pub async fn list<S>(State(state): State<ApiState<S>>) -> Result<Json<Vec<Driver>>, ApiError>
where
  S: QueryStore,
{
  let drivers = state
    .store
    .list_drivers()
    .await
    .map_err(ApiError::store)?;
  Ok(Json(drivers))
}

/// `GET /drivers/{number}`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  number: Result<Path<DriverNumber>, PathRejection>,
) -> Result<Json<DriverSummary>, ApiError>
where
  S: QueryStore,
{
  let Path(number) = number?;
  let summary = state
    .store
    .driver_summary(number)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("driver {number} not found")))?;
  Ok(Json(summary))
}
