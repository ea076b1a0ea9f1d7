use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_channel::Sender;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::operation::delete_object::DeleteObjectOutput;
use aws_sdk_s3::operation::delete_objects::DeleteObjectsOutput;
use aws_sdk_s3::types::ObjectIdentifier;
use dyn_clone::DynClone;
use tracing::info;

use crate::config::ClientConfig;
use crate::types::token::PipelineCancellationToken;
use crate::types::{ObjectRecord, StoragePath};

pub mod s3;

/// Type alias for a boxed Storage trait object.
pub type Storage = Box<dyn StorageTrait + Send + Sync>;

/// Factory trait for creating Storage instances.
#[async_trait]
pub trait StorageFactory {
    async fn create(
        path: StoragePath,
        cancellation_token: PipelineCancellationToken,
        client_config: Option<ClientConfig>,
    ) -> Storage;
}

/// Capabilities of an S3-compatible object store bound to one bucket.
///
/// Keys passed to and returned from these methods are full object keys.
/// The store client is shared read-only between concurrent callers.
#[async_trait]
pub trait StorageTrait: DynClone {
    /// The bucket this storage is bound to.
    fn bucket(&self) -> &str;

    /// List objects under `prefix` (the whole bucket when `None`) and send
    /// them to `sender` in listing order.
    ///
    /// Pagination is transparent. Any page failure is returned as an
    /// error; the listing is never silently truncated. Returns `Ok` early
    /// when the receiver has been closed.
    async fn list_objects(
        &self,
        sender: &Sender<ObjectRecord>,
        prefix: Option<&str>,
        max_keys: i32,
    ) -> Result<()>;

    /// Upload one object, attaching `metadata` as user metadata.
    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        metadata: Option<HashMap<String, String>>,
    ) -> Result<()>;

    /// Delete a single object via DeleteObject API.
    async fn delete_object(&self, key: &str) -> Result<DeleteObjectOutput>;

    /// Delete up to 1000 objects in one DeleteObjects round trip.
    ///
    /// The caller is responsible for chunking. A returned `Ok` may still
    /// carry per-key errors.
    async fn delete_objects(&self, objects: Vec<ObjectIdentifier>) -> Result<DeleteObjectsOutput>;

    /// `Ok(false)` when the bucket does not exist, `Err` when the store
    /// cannot be reached.
    async fn bucket_exists(&self) -> Result<bool>;

    /// Create the bucket. Succeeds if the caller already owns it.
    async fn create_bucket(&self) -> Result<()>;

    /// Get the underlying AWS S3 Client for direct API access.
    fn get_client(&self) -> Option<Arc<Client>>;
}

dyn_clone::clone_trait_object!(StorageTrait);

/// Create the bucket unless it already exists.
///
/// Returns whether the bucket had to be created. Calling this repeatedly
/// is harmless.
pub async fn ensure_bucket(storage: &Storage) -> Result<bool> {
    if storage.bucket_exists().await? {
        return Ok(false);
    }

    storage.create_bucket().await?;
    info!(bucket = storage.bucket(), "bucket has been created.");

    Ok(true)
}

/// Create the S3 storage for `path`.
pub async fn create_storage(
    path: StoragePath,
    client_config: Option<ClientConfig>,
    cancellation_token: PipelineCancellationToken,
) -> Storage {
    s3::S3StorageFactory::create(path, cancellation_token, client_config).await
}
