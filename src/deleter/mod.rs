//! Deletion engine.
//!
//! [`BatchDeleter`] executes a [`DeletionPlan`] chunk by chunk with a bounded
//! number of chunks in flight. Each chunk goes through a [`Deleter`]
//! backend: [`MultiObjectDeleter`] (one DeleteObjects call per chunk) or
//! [`SingleDeleter`] (one DeleteObject call per key, used with
//! `--batch-size 1`).
//!
//! Deletion failures never abort the plan. They are accumulated in the
//! returned [`DeletionResult`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::{self, JoinError, JoinSet};
use tracing::{debug, error, info};

use crate::planner::DeletionPlan;
use crate::storage::Storage;
use crate::types::error::S3cleanerError;

pub mod batch;
pub mod single;

pub use batch::{MAX_BATCH_SIZE, MultiObjectDeleter, delete_batch};
pub use single::SingleDeleter;

/// Error code recorded for keys of a chunk whose worker task died.
const WORKER_ERROR_CODE: &str = "WorkerError";

/// A key that failed to delete.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedKey {
    pub key: String,
    pub error_code: String,
    pub error_message: String,
}

/// Aggregate outcome of one or more delete calls.
///
/// `succeeded_count + failed_count == attempted_count` holds for every
/// value produced by this module.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeletionResult {
    pub attempted_count: u64,
    pub succeeded_count: u64,
    pub failed_count: u64,
    pub failures: Vec<FailedKey>,
}

impl DeletionResult {
    /// Every key in `keys` failed with the same error.
    pub fn all_failed(keys: &[String], error_code: &str, error_message: &str) -> Self {
        Self {
            attempted_count: keys.len() as u64,
            succeeded_count: 0,
            failed_count: keys.len() as u64,
            failures: keys
                .iter()
                .map(|key| FailedKey {
                    key: key.clone(),
                    error_code: error_code.to_string(),
                    error_message: error_message.to_string(),
                })
                .collect(),
        }
    }

    pub fn merge(&mut self, other: DeletionResult) {
        self.attempted_count += other.attempted_count;
        self.succeeded_count += other.succeeded_count;
        self.failed_count += other.failed_count;
        self.failures.extend(other.failures);
    }

    pub fn has_failure(&self) -> bool {
        self.failed_count > 0
    }

    pub fn partial_failure(&self) -> Option<S3cleanerError> {
        self.has_failure()
            .then_some(S3cleanerError::PartialDeletionFailure {
                succeeded: self.succeeded_count,
                failed: self.failed_count,
            })
    }
}

/// Deletion backend for one chunk of keys.
///
/// Implementations report failures in the result and never return early:
/// every key passed in is counted as either succeeded or failed.
#[async_trait]
pub trait Deleter: Send + Sync {
    async fn delete(&self, keys: &[String]) -> DeletionResult;
}

/// Executes deletion plans with bounded chunk-level concurrency.
pub struct BatchDeleter {
    deleter: Arc<dyn Deleter>,
    chunk_size: usize,
}

impl BatchDeleter {
    /// `batch_size` is clamped to `1..=MAX_BATCH_SIZE`. A batch size of one
    /// selects the DeleteObject backend.
    pub fn new(target: Storage, batch_size: u16) -> Self {
        let chunk_size = (batch_size as usize).clamp(1, MAX_BATCH_SIZE);
        let deleter: Arc<dyn Deleter> = if chunk_size == 1 {
            Arc::new(SingleDeleter::new(target))
        } else {
            Arc::new(MultiObjectDeleter::new(target))
        };

        Self {
            deleter,
            chunk_size,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub async fn execute(&self, plan: &DeletionPlan, concurrency: u16) -> DeletionResult {
        self.execute_keys(&plan.keys(), concurrency).await
    }

    /// Delete `keys` in chunks, running up to `concurrency` chunks at once.
    ///
    /// Chunks are submitted in key order. A failing chunk does not stop the
    /// others; all chunk results are merged after every chunk has finished.
    pub async fn execute_keys(&self, keys: &[String], concurrency: u16) -> DeletionResult {
        let chunks: Vec<Vec<String>> = keys
            .chunks(self.chunk_size)
            .map(|chunk| chunk.to_vec())
            .collect();

        info!(
            object_count = keys.len(),
            chunk_count = chunks.len(),
            concurrency = concurrency,
            "deletion has started."
        );

        let result = if concurrency <= 1 {
            self.execute_sequential(chunks).await
        } else {
            self.execute_concurrent(chunks, concurrency as usize).await
        };

        info!(
            attempted_count = result.attempted_count,
            succeeded_count = result.succeeded_count,
            failed_count = result.failed_count,
            "deletion has been completed."
        );

        result
    }

    async fn execute_sequential(&self, chunks: Vec<Vec<String>>) -> DeletionResult {
        let mut result = DeletionResult::default();
        for (chunk_index, chunk) in chunks.iter().enumerate() {
            debug!(chunk_index = chunk_index, key_count = chunk.len(), "delete chunk.");
            result.merge(self.deleter.delete(chunk).await);
        }
        result
    }

    /// Keeps at most `concurrency` chunk tasks in a [`JoinSet`] and merges
    /// their results in chunk order once all of them have finished.
    async fn execute_concurrent(&self, chunks: Vec<Vec<String>>, concurrency: usize) -> DeletionResult {
        let mut chunk_results: Vec<Option<DeletionResult>> = vec![None; chunks.len()];
        let mut chunk_index_by_task = HashMap::with_capacity(chunks.len());
        let mut in_flight = JoinSet::new();

        for (chunk_index, chunk) in chunks.iter().enumerate() {
            if in_flight.len() >= concurrency {
                if let Some(joined) = in_flight.join_next().await {
                    record_chunk(joined, &chunks, &chunk_index_by_task, &mut chunk_results);
                }
            }

            let deleter = self.deleter.clone();
            let keys = chunk.clone();
            debug!(chunk_index = chunk_index, key_count = keys.len(), "delete chunk.");
            let abort_handle =
                in_flight.spawn(async move { (chunk_index, deleter.delete(&keys).await) });
            chunk_index_by_task.insert(abort_handle.id(), chunk_index);
        }

        while let Some(joined) = in_flight.join_next().await {
            record_chunk(joined, &chunks, &chunk_index_by_task, &mut chunk_results);
        }

        let mut result = DeletionResult::default();
        for chunk_result in chunk_results.into_iter().flatten() {
            result.merge(chunk_result);
        }
        result
    }
}

fn record_chunk(
    joined: Result<(usize, DeletionResult), JoinError>,
    chunks: &[Vec<String>],
    chunk_index_by_task: &HashMap<task::Id, usize>,
    chunk_results: &mut [Option<DeletionResult>],
) {
    match joined {
        Ok((chunk_index, chunk_result)) => chunk_results[chunk_index] = Some(chunk_result),
        Err(e) => {
            let Some(&chunk_index) = chunk_index_by_task.get(&e.id()) else {
                error!(error = e.to_string(), "unknown delete worker has failed.");
                return;
            };
            error!(
                chunk_index = chunk_index,
                error = e.to_string(),
                "delete worker has failed."
            );
            chunk_results[chunk_index] = Some(DeletionResult::all_failed(
                &chunks[chunk_index],
                WORKER_ERROR_CODE,
                &e.to_string(),
            ));
        }
    }
}
