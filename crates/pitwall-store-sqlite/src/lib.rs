//! SQLite backend for the Pitwall telemetry store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Writes go through
//! [`IngestStore`](pitwall_core::store::IngestStore); the aggregate views
//! through [`QueryStore`](pitwall_core::store::QueryStore).

mod aggregate;
mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
