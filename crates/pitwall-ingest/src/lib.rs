//! Ingestion pipeline for Pitwall.
//!
//! Pulls raw records from a [`RecordSource`](pitwall_core::source::RecordSource)
//! (normally [`HttpSource`]), normalises them, and writes them to an
//! [`IngestStore`](pitwall_core::store::IngestStore) in bounded, retried
//! transactions. Position and lap phases run inside a [`BulkWriteGuard`].
//!
//! ```rust,ignore
//! let report = IngestJob::new(&source, &store, &config, Utc::now())
//!   .run(&cancel)
//!   .await;
//! ```

pub mod error;
pub mod guard;
pub mod job;
pub mod report;
pub mod source;
pub mod writer;

#[cfg(test)]
mod testing;

pub use error::{BatchFailed, Error};
pub use guard::BulkWriteGuard;
pub use job::IngestJob;
pub use report::{BatchReport, IngestReport, SessionReport};
pub use source::{HttpSource, SourceConfig};
pub use writer::{BatchWriter, WriterConfig};
