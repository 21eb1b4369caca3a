//! Core types and trait definitions for the Pitwall telemetry store.
//!
//! No HTTP or database code lives here: the source adapter, the SQLite
//! backend and the query service all build on these types and traits.

// Trait methods return `impl Future + Send`; implementors write `async fn`.
#![allow(async_fn_in_trait)]

pub mod config;
pub mod error;
pub mod model;
pub mod normalize;
pub mod record;
pub mod source;
pub mod store;
pub mod summary;

pub use error::{NormalizeError, SourceError};
