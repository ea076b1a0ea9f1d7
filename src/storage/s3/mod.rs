pub mod client_builder;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use async_channel::Sender;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::delete_object::DeleteObjectOutput;
use aws_sdk_s3::operation::delete_objects::DeleteObjectsOutput;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CreateBucketConfiguration, Delete, ObjectIdentifier,
};
use aws_smithy_types::error::metadata::ProvideErrorMetadata;

use crate::config::ClientConfig;
use crate::storage::{Storage, StorageFactory, StorageTrait};
use crate::types::error::S3cleanerError;
use crate::types::token::PipelineCancellationToken;
use crate::types::{ObjectRecord, StoragePath};

const DEFAULT_REGION: &str = "us-east-1";
const HTTP_STATUS_NOT_FOUND: u16 = 404;

/// Extracts the S3 error code and message from an AWS SDK error.
///
/// Service errors yield the S3 error code (e.g. "AccessDenied") and message.
/// Transport, timeout and construction failures yield "N/A" and the full
/// error description.
pub(crate) fn extract_sdk_error_details<E: std::fmt::Display + ProvideErrorMetadata>(
    e: &SdkError<E>,
) -> (String, String) {
    if let Some(service_err) = e.as_service_error() {
        (
            service_err.code().unwrap_or("unknown").to_string(),
            service_err.message().unwrap_or("no message").to_string(),
        )
    } else {
        ("N/A".to_string(), e.to_string())
    }
}

pub struct S3StorageFactory;

#[async_trait]
impl StorageFactory for S3StorageFactory {
    async fn create(
        path: StoragePath,
        cancellation_token: PipelineCancellationToken,
        client_config: Option<ClientConfig>,
    ) -> Storage {
        let StoragePath::S3 { bucket, .. } = path;

        let client = if let Some(ref client_config) = client_config {
            Some(Arc::new(client_config.create_client().await))
        } else {
            None
        };
        let region = client_config.and_then(|client_config| client_config.region);

        Box::new(S3Storage {
            bucket,
            region,
            cancellation_token,
            client,
        })
    }
}

#[derive(Clone)]
struct S3Storage {
    bucket: String,
    region: Option<String>,
    cancellation_token: PipelineCancellationToken,
    client: Option<Arc<Client>>,
}

impl S3Storage {
    fn client(&self) -> Result<&Client> {
        self.client
            .as_deref()
            .ok_or_else(|| anyhow!("no S3 client configured for bucket {}.", self.bucket))
    }

    fn create_bucket_configuration(&self) -> Option<CreateBucketConfiguration> {
        let region = self.region.as_deref()?;
        if region == DEFAULT_REGION {
            return None;
        }

        Some(
            CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(region))
                .build(),
        )
    }
}

#[async_trait]
impl StorageTrait for S3Storage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list_objects(
        &self,
        sender: &Sender<ObjectRecord>,
        prefix: Option<&str>,
        max_keys: i32,
    ) -> Result<()> {
        let client = self.client()?;
        let display_prefix = prefix.unwrap_or_default();
        let mut continuation_token: Option<String> = None;

        loop {
            if self.cancellation_token.is_cancelled() {
                tracing::info!("Listing cancelled");
                break;
            }

            let output = client
                .list_objects_v2()
                .bucket(&self.bucket)
                .set_prefix(prefix.map(String::from))
                .set_continuation_token(continuation_token.clone())
                .max_keys(max_keys)
                .send()
                .await
                .map_err(|e| {
                    let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
                    tracing::error!(
                        bucket = self.bucket,
                        prefix = display_prefix,
                        s3_error_code = s3_error_code,
                        s3_error_message = s3_error_message,
                        "S3 ListObjectsV2 API call failed for s3://{}/{}: {} ({}).",
                        self.bucket,
                        display_prefix,
                        s3_error_code,
                        s3_error_message,
                    );
                    anyhow!(e)
                        .context("aws_sdk_s3::client::list_objects_v2() failed.")
                        .context(S3cleanerError::Connectivity(format!(
                            "listing s3://{}/{} failed: {s3_error_code} ({s3_error_message})",
                            self.bucket, display_prefix
                        )))
                })?;

            for object in output.contents() {
                if self.cancellation_token.is_cancelled() {
                    return Ok(());
                }

                let record = ObjectRecord::try_from(object)?;
                if let Err(e) = sender
                    .send(record)
                    .await
                    .context("async_channel::Sender::send() failed.")
                {
                    return if !sender.is_closed() { Err(e) } else { Ok(()) };
                }
            }

            if output.is_truncated() == Some(true) {
                continuation_token = output.next_continuation_token().map(String::from);
            } else {
                break;
            }
        }

        Ok(())
    }

    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        metadata: Option<HashMap<String, String>>,
    ) -> Result<()> {
        let content_length = body.len();

        self.client()?
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .set_metadata(metadata)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
                tracing::warn!(
                    bucket = self.bucket,
                    key = key,
                    content_length = content_length,
                    s3_error_code = s3_error_code,
                    s3_error_message = s3_error_message,
                    "S3 PutObject API call failed for s3://{}/{}: {} ({}).",
                    self.bucket,
                    key,
                    s3_error_code,
                    s3_error_message,
                );
                anyhow!(e).context("aws_sdk_s3::client::put_object() failed.")
            })?;

        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<DeleteObjectOutput> {
        self.client()?
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
                tracing::warn!(
                    bucket = self.bucket,
                    key = key,
                    s3_error_code = s3_error_code,
                    s3_error_message = s3_error_message,
                    "S3 DeleteObject API call failed for s3://{}/{}: {} ({}).",
                    self.bucket,
                    key,
                    s3_error_code,
                    s3_error_message,
                );
                anyhow!(e).context("aws_sdk_s3::client::delete_object() failed.")
            })
    }

    async fn delete_objects(&self, objects: Vec<ObjectIdentifier>) -> Result<DeleteObjectsOutput> {
        let object_count = objects.len();

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .context("Failed to build Delete request")?;

        self.client()?
            .delete_objects()
            .bucket(&self.bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| {
                let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
                tracing::error!(
                    bucket = self.bucket,
                    object_count = object_count,
                    s3_error_code = s3_error_code,
                    s3_error_message = s3_error_message,
                    "S3 DeleteObjects API call failed for {} objects in s3://{}: {} ({}).",
                    object_count,
                    self.bucket,
                    s3_error_code,
                    s3_error_message,
                );
                anyhow!(e).context("aws_sdk_s3::client::delete_objects() failed.")
            })
    }

    async fn bucket_exists(&self) -> Result<bool> {
        let result = self
            .client()?
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await;

        let e = match result {
            Ok(_) => return Ok(true),
            Err(e) => e,
        };

        let not_found = e
            .as_service_error()
            .is_some_and(|service_err| service_err.is_not_found())
            || e.raw_response()
                .is_some_and(|response| response.status().as_u16() == HTTP_STATUS_NOT_FOUND);
        if not_found {
            tracing::debug!(bucket = self.bucket, "bucket does not exist.");
            return Ok(false);
        }

        let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
        tracing::error!(
            bucket = self.bucket,
            s3_error_code = s3_error_code,
            s3_error_message = s3_error_message,
            "S3 HeadBucket API call failed for s3://{}: {} ({}).",
            self.bucket,
            s3_error_code,
            s3_error_message,
        );
        Err(anyhow!(e)
            .context("aws_sdk_s3::client::head_bucket() failed.")
            .context(S3cleanerError::Connectivity(format!(
                "cannot reach bucket {}: {s3_error_code} ({s3_error_message})",
                self.bucket
            ))))
    }

    async fn create_bucket(&self) -> Result<()> {
        let result = self
            .client()?
            .create_bucket()
            .bucket(&self.bucket)
            .set_create_bucket_configuration(self.create_bucket_configuration())
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|service_err| service_err.is_bucket_already_owned_by_you()) =>
            {
                tracing::debug!(bucket = self.bucket, "bucket is already owned by you.");
                Ok(())
            }
            Err(e) => {
                let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
                tracing::error!(
                    bucket = self.bucket,
                    s3_error_code = s3_error_code,
                    s3_error_message = s3_error_message,
                    "S3 CreateBucket API call failed for s3://{}: {} ({}).",
                    self.bucket,
                    s3_error_code,
                    s3_error_message,
                );
                Err(anyhow!(e)
                    .context("aws_sdk_s3::client::create_bucket() failed.")
                    .context(S3cleanerError::Connectivity(format!(
                        "cannot create bucket {}: {s3_error_code} ({s3_error_message})",
                        self.bucket
                    ))))
            }
        }
    }

    fn get_client(&self) -> Option<Arc<Client>> {
        self.client.clone()
    }
}
