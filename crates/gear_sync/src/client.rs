//! Sync client
//!
//! Turns committed gestures into backend writes without making the caller
//! wait. Failures are logged and queued for the caller to inspect or retry;
//! they never flow back into local state.

use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::backend::PersistenceBackend;
use crate::record::{PersistBatch, PersistRecord};
use crate::PersistenceFailure;

/// Destination for the records of a committed gesture
pub trait BatchSink: Send {
    /// Hand over one gesture's records. Must not block.
    fn submit(&mut self, records: Vec<PersistRecord>);
}

/// Sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl BatchSink for NullSink {
    fn submit(&mut self, records: Vec<PersistRecord>) {
        log::debug!("Discarding {} record(s), sync disabled", records.len());
    }
}

/// Sink that keeps batches in a shared list
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    batches: Arc<Mutex<Vec<PersistBatch>>>,
    submitted: Arc<Mutex<u64>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything submitted so far
    pub fn batches(&self) -> Vec<PersistBatch> {
        self.batches.lock().clone()
    }

    /// Remove and return everything submitted so far
    pub fn take(&self) -> Vec<PersistBatch> {
        std::mem::take(&mut *self.batches.lock())
    }
}

impl BatchSink for RecordingSink {
    fn submit(&mut self, records: Vec<PersistRecord>) {
        let mut submitted = self.submitted.lock();
        *submitted += 1;
        self.batches
            .lock()
            .push(PersistBatch::new(*submitted, records));
    }
}

/// A batch whose write failed, kept so the caller can retry it
#[derive(Debug)]
pub struct FailedBatch {
    pub batch: PersistBatch,
    pub error: PersistenceFailure,
}

/// Write counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub submitted: u64,
    pub written: u64,
    pub failed: u64,
}

/// Fire-and-forget writer in front of a [`PersistenceBackend`]
pub struct SyncClient {
    backend: Arc<dyn PersistenceBackend>,
    runtime: Handle,
    next_sequence: u64,
    in_flight: Vec<JoinHandle<()>>,
    failures_tx: Sender<FailedBatch>,
    failures_rx: Receiver<FailedBatch>,
    stats: Arc<Mutex<SyncStats>>,
}

impl SyncClient {
    /// Create a client that spawns writes on `runtime`
    pub fn new(backend: Arc<dyn PersistenceBackend>, runtime: Handle) -> Self {
        let (failures_tx, failures_rx) = unbounded();
        Self {
            backend,
            runtime,
            next_sequence: 1,
            in_flight: Vec::new(),
            failures_tx,
            failures_rx,
            stats: Arc::new(Mutex::new(SyncStats::default())),
        }
    }

    /// Start writing a batch and return its sequence number.
    ///
    /// Returns `None` for an empty record list.
    pub fn persist(&mut self, records: Vec<PersistRecord>) -> Option<u64> {
        if records.is_empty() {
            return None;
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let batch = PersistBatch::new(sequence, records);

        self.stats.lock().submitted += 1;
        self.in_flight.retain(|handle| !handle.is_finished());

        let backend = Arc::clone(&self.backend);
        let failures = self.failures_tx.clone();
        let stats = Arc::clone(&self.stats);

        let handle = self.runtime.spawn(async move {
            match backend.write(&batch).await {
                Ok(()) => {
                    stats.lock().written += 1;
                    log::debug!("Batch {} saved via {}", batch.sequence, backend.name());
                }
                Err(error) => {
                    stats.lock().failed += 1;
                    log::warn!(
                        "Batch {} ({}) not saved via {}: {}",
                        batch.sequence,
                        batch.names().join(", "),
                        backend.name(),
                        error
                    );
                    let _ = failures.send(FailedBatch { batch, error });
                }
            }
        });
        self.in_flight.push(handle);

        Some(sequence)
    }

    /// Submit a failed batch again under a new sequence number
    pub fn retry(&mut self, failed: FailedBatch) -> Option<u64> {
        log::info!("Retrying batch {}", failed.batch.sequence);
        self.persist(failed.batch.records)
    }

    /// Wait for every write started so far
    pub async fn flush(&mut self) {
        for handle in self.in_flight.drain(..) {
            if let Err(e) = handle.await {
                log::error!("Sync task aborted: {}", e);
            }
        }
    }

    /// Failures reported since the last call
    pub fn take_failures(&self) -> Vec<FailedBatch> {
        self.failures_rx.try_iter().collect()
    }

    /// Writes started but not yet finished
    pub fn pending(&self) -> usize {
        self.in_flight.iter().filter(|h| !h.is_finished()).count()
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> SyncStats {
        *self.stats.lock()
    }
}

impl BatchSink for SyncClient {
    fn submit(&mut self, records: Vec<PersistRecord>) {
        self.persist(records);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_numbers_batches() {
        let mut sink = RecordingSink::new();
        let view = sink.clone();

        sink.submit(vec![PersistRecord::moved("a", Some(0), Some(1))]);
        sink.submit(vec![PersistRecord::moved("b", Some(1), Some(0))]);

        let batches = view.take();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].sequence, 1);
        assert_eq!(batches[1].names(), vec!["b"]);
        assert!(view.batches().is_empty());
    }

    #[test]
    fn test_null_sink_accepts_anything() {
        let mut sink = NullSink;
        sink.submit(vec![PersistRecord::moved("a", None, Some(1))]);
    }
}
