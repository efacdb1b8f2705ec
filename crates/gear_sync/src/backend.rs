//! Persistence backends
//!
//! Abstract write interface with an HTTP implementation for the real store
//! and an in-memory one for offline runs and tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::record::{PersistBatch, WriteBody};
use crate::{PersistenceFailure, SyncResult};

/// Header carrying the anti-forgery token expected by the store
const CSRF_HEADER: &str = "X-CSRFToken";

/// Connection settings for [`HttpBackend`]
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Full URL of the write endpoint
    pub endpoint: String,
    /// Sent as `X-CSRFToken` when set
    pub csrf_token: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl SyncSettings {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            csrf_token: None,
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_csrf_token(mut self, token: impl Into<String>) -> Self {
        self.csrf_token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Something that can durably store a batch
#[async_trait::async_trait]
pub trait PersistenceBackend: Send + Sync {
    /// Write one batch. Any non-success outcome is a `PersistenceFailure`.
    async fn write(&self, batch: &PersistBatch) -> SyncResult<()>;

    /// Short name for logs
    fn name(&self) -> &str;
}

/// JSON-over-HTTP write endpoint
pub struct HttpBackend {
    http: reqwest::Client,
    endpoint: String,
    csrf_token: Option<String>,
}

impl HttpBackend {
    /// Create a backend for the given settings
    pub fn new(settings: &SyncSettings) -> SyncResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;

        Ok(Self {
            http,
            endpoint: settings.endpoint.clone(),
            csrf_token: settings.csrf_token.clone().filter(|t| !t.is_empty()),
        })
    }

    /// Endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl PersistenceBackend for HttpBackend {
    async fn write(&self, batch: &PersistBatch) -> SyncResult<()> {
        log::debug!(
            "POST {} batch {} ({} records)",
            self.endpoint,
            batch.sequence,
            batch.records.len()
        );

        let mut request = self.http.post(&self.endpoint).json(&WriteBody {
            item_data: &batch.records,
        });
        if let Some(token) = &self.csrf_token {
            request = request.header(CSRF_HEADER, token);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PersistenceFailure::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Backend that keeps batches in memory
#[derive(Clone, Default)]
pub struct MemoryBackend {
    written: Arc<Mutex<Vec<PersistBatch>>>,
    fail_next: Arc<AtomicUsize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` writes fail
    pub fn fail_next(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Batches written so far, in completion order
    pub fn batches(&self) -> Vec<PersistBatch> {
        self.written.lock().clone()
    }
}

#[async_trait::async_trait]
impl PersistenceBackend for MemoryBackend {
    async fn write(&self, batch: &PersistBatch) -> SyncResult<()> {
        let failing = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(PersistenceFailure::Unavailable(format!(
                "batch {} dropped",
                batch.sequence
            )));
        }

        self.written.lock().push(batch.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
