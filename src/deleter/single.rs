//! Single-object deletion using the S3 DeleteObject API.
//!
//! Deletes keys one at a time. Used when batch_size is 1, for stores that
//! do not implement DeleteObjects.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::storage::Storage;

use super::{DeletionResult, Deleter};

const DELETE_OBJECT_ERROR_CODE: &str = "DeleteObjectError";

pub struct SingleDeleter {
    target: Storage,
}

impl SingleDeleter {
    pub fn new(target: Storage) -> Self {
        Self { target }
    }
}

#[async_trait]
impl Deleter for SingleDeleter {
    async fn delete(&self, keys: &[String]) -> DeletionResult {
        let mut result = DeletionResult::default();

        for key in keys {
            debug!(key = key, "sending DeleteObject request.");

            match self.target.delete_object(key).await {
                Ok(_) => {
                    debug!(key = key, "DeleteObject succeeded.");
                    result.attempted_count += 1;
                    result.succeeded_count += 1;
                }
                Err(e) => {
                    warn!(
                        key = key,
                        error = format!("{e:#}"),
                        "S3 DeleteObject API call failed for key '{}'.",
                        key,
                    );
                    result.merge(DeletionResult::all_failed(
                        std::slice::from_ref(key),
                        DELETE_OBJECT_ERROR_CODE,
                        &format!("{e:#}"),
                    ));
                }
            }
        }

        result
    }
}
