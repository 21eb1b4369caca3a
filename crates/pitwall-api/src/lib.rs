//! JSON query service for Pitwall.
//!
//! Exposes an axum [`Router`] backed by any [`QueryStore`]. Every route is a
//! read; the service never writes and never retries.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = pitwall_api::app(ApiState::new(Arc::new(store), 2024));
//! axum::serve(listener, app).await?;
//! ```

pub mod drivers;
pub mod error;
pub mod races;

use std::sync::Arc;

use axum::{Router, routing::get};
use pitwall_core::store::QueryStore;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Shared state threaded through all handlers.
pub struct ApiState<S> {
  pub store:          Arc<S>,
  /// Season used by `/season` when no `?year=` is given.
  pub default_season: i32,
}

impl<S> ApiState<S> {
  pub fn new(store: Arc<S>, default_season: i32) -> Self { Self { store, default_season } }
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), default_season: self.default_season }
  }
}

/// Build the API router. Paths are relative; see [`app`] for the mounted
/// service.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: QueryStore + Send + Sync + 'static,
{
  Router::new()
    // Drivers
    .route("/drivers", get(drivers::list::<S>))
    .route("/drivers/{number}", get(drivers::get_one::<S>))
    // Races
    .route("/races", get(races::list::<S>))
    .route("/races/{session_key}", get(races::get_one::<S>))
    .route("/season", get(races::season::<S>))
    .with_state(state)
}

/// The full HTTP service: the API under `/api`, with request tracing.
pub fn app<S>(state: ApiState<S>) -> Router<()>
where
  S: QueryStore + Send + Sync + 'static,
{
  Router::new()
    .nest("/api", api_router(state))
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────
