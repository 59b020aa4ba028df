//! Persistence to a remote document collection
//!
//! A [`DocumentStore`] accepts one batch of plain field-map documents as an
//! atomic write; the [`BatchWriter`] slices a series into fixed-size
//! batches and retries each with exponential backoff. Persistence is
//! best-effort: a failed batch is reported, not rolled back.

use async_trait::async_trait;
use thiserror::Error;

pub mod store;
pub mod writer;

pub use store::HttpDocumentStore;
pub use writer::{BatchWriter, DEFAULT_BATCH_SIZE, DEFAULT_MAX_RETRIES};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store returned HTTP {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// A named document collection that accepts batched "add document" calls.
/// Each call succeeds or fails as a whole.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn add_documents(
        &self,
        collection: &str,
        documents: &[serde_json::Value],
    ) -> Result<(), StoreError>;
}

/// Outcome of persisting one series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    /// Every batch committed. An empty series commits zero batches.
    Committed { batches: usize, rows: usize },
    /// A batch exhausted its retries. Batches before it remain committed.
    PartialFailure {
        committed_batches: usize,
        failed_batch: usize,
        attempts: u32,
    },
}

impl PersistOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PersistOutcome::Committed { .. })
    }
}
