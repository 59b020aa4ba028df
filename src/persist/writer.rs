//! Batched, retried series writer
//!
//! Splits a series into fixed-size batches and writes each atomically,
//! retrying a failing batch up to `max_retries` attempts with `attempt * 2`
//! seconds of backoff between them. There is no cross-batch transaction:
//! a batch that exhausts its retries stops the run and is reported by
//! index, while earlier batches stay committed.

use serde_json::Value;
use tracing::{info, warn};

use super::{DocumentStore, PersistOutcome, StoreError};
use crate::domain::{Reading, ReadingSeries};

pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_MAX_RETRIES: u32 = 3;

pub struct BatchWriter<S> {
    store: S,
    batch_size: usize,
    max_retries: u32,
}

impl<S: DocumentStore> BatchWriter<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            batch_size: DEFAULT_BATCH_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Persist a series to the named collection. An empty series is a
    /// successful no-op.
    pub async fn persist(&self, series: &ReadingSeries, collection: &str) -> PersistOutcome {
        if series.is_empty() {
            return PersistOutcome::Committed {
                batches: 0,
                rows: 0,
            };
        }

        let documents: Vec<Value> = series.iter().map(document_for).collect();

        let mut committed = 0;
        for (index, batch) in documents.chunks(self.batch_size).enumerate() {
            match self.write_batch(collection, index, batch).await {
                Ok(()) => committed += 1,
                Err(e) => {
                    warn!(
                        collection,
                        batch = index,
                        attempts = self.max_retries,
                        error = %e,
                        "batch exhausted retries, aborting persist"
                    );
                    return PersistOutcome::PartialFailure {
                        committed_batches: committed,
                        failed_batch: index,
                        attempts: self.max_retries,
                    };
                }
            }
        }

        info!(collection, batches = committed, rows = series.len(), "series persisted");
        PersistOutcome::Committed {
            batches: committed,
            rows: series.len(),
        }
    }

    async fn write_batch(
        &self,
        collection: &str,
        index: usize,
        batch: &[Value],
    ) -> Result<(), StoreError> {
        let mut attempt = 1;
        loop {
            match self.store.add_documents(collection, batch).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.max_retries => {
                    let backoff = std::time::Duration::from_secs(u64::from(attempt) * 2);
                    warn!(
                        collection,
                        batch = index,
                        attempt,
                        backoff_secs = backoff.as_secs(),
                        error = %e,
                        "batch write failed, backing off"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// The write shape is source-independent: serialize the reading's fields
/// and make sure a `timestamp` is present, derived from the date.
fn document_for(reading: &Reading) -> Value {
    let mut doc = serde_json::to_value(reading).unwrap_or_else(|_| Value::Object(Default::default()));
    if let Value::Object(map) = &mut doc {
        if !map.contains_key("timestamp") {
            map.insert("timestamp".into(), Value::String(reading.date.to_string()));
        }
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SyntheticSource;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Records every call and fails according to a plan.
    #[derive(Default)]
    struct RecordingStore {
        /// (collection, batch size) per successful call
        committed: Mutex<Vec<(String, usize)>>,
        /// Total add_documents invocations.
        calls: AtomicU32,
        /// Fail the first N calls.
        fail_first: u32,
        /// Fail every call targeting this batch size marker, forever.
        always_fail: bool,
    }

    impl RecordingStore {
        fn failing_first(n: u32) -> Self {
            Self {
                fail_first: n,
                ..Default::default()
            }
        }

        fn always_failing() -> Self {
            Self {
                always_fail: true,
                ..Default::default()
            }
        }

        fn committed_sizes(&self) -> Vec<usize> {
            self.committed.lock().unwrap().iter().map(|(_, n)| *n).collect()
        }
    }

    #[async_trait]
    impl DocumentStore for RecordingStore {
        async fn add_documents(
            &self,
            collection: &str,
            documents: &[serde_json::Value],
        ) -> Result<(), StoreError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.always_fail || call <= self.fail_first {
                return Err(StoreError::Api {
                    status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                    body: "transient".into(),
                });
            }
            self.committed
                .lock()
                .unwrap()
                .push((collection.to_string(), documents.len()));
            Ok(())
        }
    }

    fn series(rows: u32) -> ReadingSeries {
        SyntheticSource::new(42).generate_ending("2024-06-15".parse().unwrap(), rows)
    }

    #[tokio::test]
    async fn test_empty_series_is_noop_success() {
        let store = RecordingStore::default();
        let writer = BatchWriter::new(store);
        let outcome = writer.persist(&ReadingSeries::default(), "sensor_data").await;

        assert_eq!(outcome, PersistOutcome::Committed { batches: 0, rows: 0 });
        assert_eq!(writer.store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_batching_120_rows_into_three_batches() {
        let writer = BatchWriter::new(RecordingStore::default()).with_batch_size(50);
        let outcome = writer.persist(&series(120), "sensor_data").await;

        assert_eq!(outcome, PersistOutcome::Committed { batches: 3, rows: 120 });
        assert_eq!(writer.store.committed_sizes(), vec![50, 50, 20]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_retried_then_commits() {
        let writer = BatchWriter::new(RecordingStore::failing_first(2)).with_batch_size(50);
        let outcome = writer.persist(&series(10), "sensor_data").await;

        assert!(outcome.is_success());
        // Two failures plus the successful third attempt.
        assert_eq!(writer.store.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_report_partial_failure() {
        let writer = BatchWriter::new(RecordingStore::always_failing()).with_batch_size(50);
        let outcome = writer.persist(&series(10), "sensor_data").await;

        assert_eq!(
            outcome,
            PersistOutcome::PartialFailure {
                committed_batches: 0,
                failed_batch: 0,
                attempts: DEFAULT_MAX_RETRIES,
            }
        );
        assert_eq!(
            writer.store.calls.load(Ordering::SeqCst),
            DEFAULT_MAX_RETRIES
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_committed_batches_stay_committed() {
        // First batch commits on call 1; batch 2 then fails all 3 attempts.
        let writer = BatchWriter::new(FailAfterFirst {
            inner: RecordingStore::default(),
        })
        .with_batch_size(50);
        let outcome = writer.persist(&series(120), "sensor_data").await;

        assert_eq!(
            outcome,
            PersistOutcome::PartialFailure {
                committed_batches: 1,
                failed_batch: 1,
                attempts: DEFAULT_MAX_RETRIES,
            }
        );
        assert_eq!(writer.store.inner.committed_sizes(), vec![50]);
    }

    /// Commits the first call, fails everything after.
    struct FailAfterFirst {
        inner: RecordingStore,
    }

    #[async_trait]
    impl DocumentStore for FailAfterFirst {
        async fn add_documents(
            &self,
            collection: &str,
            documents: &[serde_json::Value],
        ) -> Result<(), StoreError> {
            if self.inner.calls.load(Ordering::SeqCst) >= 1 {
                self.inner.calls.fetch_add(1, Ordering::SeqCst);
                return Err(StoreError::Api {
                    status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                    body: "down".into(),
                });
            }
            self.inner.add_documents(collection, documents).await
        }
    }

    #[test]
    fn test_document_gets_timestamp_from_date() {
        let reading = Reading {
            date: "2024-06-15".parse().unwrap(),
            temperature: 21.0,
            humidity: 55.0,
            pressure: 1011.0,
        };
        let doc = document_for(&reading);
        assert_eq!(doc["timestamp"], "2024-06-15");
        assert_eq!(doc["temperature"], 21.0);
    }
}
