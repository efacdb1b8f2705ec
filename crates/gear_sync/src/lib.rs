//! # Gear Sync
//!
//! Writes inventory placement changes to the remote store.
//!
//! Local state is always committed first; a write here is fire-and-forget
//! relative to the caller. Each committed gesture becomes one batch of one
//! or two records, addressed by cell *index* so a write stays meaningful
//! after the grid changes shape.
//!
//! ## Usage
//!
//! ```ignore
//! let backend = Arc::new(HttpBackend::new(&settings)?);
//! let mut client = SyncClient::new(backend, tokio::runtime::Handle::current());
//!
//! client.persist(vec![PersistRecord::moved("sword", Some(0), Some(3))]);
//!
//! // Later, on the same thread
//! for failed in client.take_failures() {
//!     log::warn!("batch {} not saved: {}", failed.batch.sequence, failed.error);
//! }
//! ```

pub mod backend;
pub mod client;
pub mod record;

pub use backend::{HttpBackend, MemoryBackend, PersistenceBackend, SyncSettings};
pub use client::{BatchSink, FailedBatch, NullSink, RecordingSink, SyncClient, SyncStats};
pub use record::{index_or_unplaced, PersistBatch, PersistRecord, WriteBody, UNPLACED_INDEX};

use thiserror::Error;

/// A write to the remote store that did not succeed
#[derive(Debug, Error)]
pub enum PersistenceFailure {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Store rejected write: {status} - {message}")]
    Status { status: u16, message: String },

    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type SyncResult<T> = Result<T, PersistenceFailure>;
