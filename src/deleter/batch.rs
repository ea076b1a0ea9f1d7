//! Batch deletion using the S3 DeleteObjects API.
//!
//! One call deletes up to 1000 keys. Requests are sent in quiet mode, so
//! the response only lists the keys that failed.

use async_trait::async_trait;
use aws_sdk_s3::types::ObjectIdentifier;
use tracing::{debug, warn};

use crate::storage::Storage;

use super::{DeletionResult, Deleter, FailedKey};

/// Maximum objects per batch DeleteObjects API call (S3 limit).
pub const MAX_BATCH_SIZE: usize = 1000;

/// Error code recorded for every key of a chunk whose request failed.
const BATCH_REQUEST_ERROR_CODE: &str = "DeleteObjectsError";

/// Deletes one chunk with a single DeleteObjects call.
///
/// The caller keeps chunks at or below [`MAX_BATCH_SIZE`].
pub struct MultiObjectDeleter {
    target: Storage,
}

impl MultiObjectDeleter {
    pub fn new(target: Storage) -> Self {
        Self { target }
    }
}

#[async_trait]
impl Deleter for MultiObjectDeleter {
    async fn delete(&self, keys: &[String]) -> DeletionResult {
        let mut result = DeletionResult::default();
        if keys.is_empty() {
            return result;
        }

        let mut identifiers = Vec::with_capacity(keys.len());
        let mut requested_keys = Vec::with_capacity(keys.len());
        for key in keys {
            match ObjectIdentifier::builder().key(key).build() {
                Ok(identifier) => {
                    identifiers.push(identifier);
                    requested_keys.push(key.clone());
                }
                Err(e) => result.merge(DeletionResult::all_failed(
                    std::slice::from_ref(key),
                    BATCH_REQUEST_ERROR_CODE,
                    &e.to_string(),
                )),
            }
        }
        if identifiers.is_empty() {
            return result;
        }

        debug!(
            batch_size = identifiers.len(),
            "sending DeleteObjects batch request."
        );

        let response = match self.target.delete_objects(identifiers).await {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    bucket = self.target.bucket(),
                    key_count = requested_keys.len(),
                    error = format!("{e:#}"),
                    "S3 DeleteObjects request failed. all keys in the chunk are counted as failed."
                );
                result.merge(DeletionResult::all_failed(
                    &requested_keys,
                    BATCH_REQUEST_ERROR_CODE,
                    &format!("{e:#}"),
                ));
                return result;
            }
        };

        let failures: Vec<FailedKey> = response
            .errors()
            .iter()
            .map(|err| {
                let key = err.key().unwrap_or("unknown").to_string();
                let code = err.code().unwrap_or("unknown").to_string();
                let message = err.message().unwrap_or("no message").to_string();
                warn!(
                    key = key,
                    code = code,
                    message = message,
                    "S3 DeleteObjects partial failure for key '{}': {} ({}).",
                    key,
                    code,
                    message,
                );
                FailedKey {
                    key,
                    error_code: code,
                    error_message: message,
                }
            })
            .collect();

        let attempted_count = requested_keys.len() as u64;
        let failed_count = (failures.len() as u64).min(attempted_count);
        result.merge(DeletionResult {
            attempted_count,
            succeeded_count: attempted_count - failed_count,
            failed_count,
            failures,
        });

        debug!(
            succeeded = result.succeeded_count,
            failed = result.failed_count,
            "DeleteObjects batch completed."
        );

        result
    }
}

/// Delete `keys` sequentially in chunks of at most `batch_limit` keys.
///
/// Each chunk is one DeleteObjects round trip. A chunk whose request fails
/// counts all of its keys as failed and the next chunk still runs.
pub async fn delete_batch(target: &Storage, keys: &[String], batch_limit: usize) -> DeletionResult {
    let deleter = MultiObjectDeleter::new(target.clone());
    let mut result = DeletionResult::default();
    for chunk in keys.chunks(batch_limit.clamp(1, MAX_BATCH_SIZE)) {
        result.merge(deleter.delete(chunk).await);
    }
    result
}
