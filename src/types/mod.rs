use std::collections::HashMap;
use std::fmt;
use std::fmt::{Debug, Formatter};

use anyhow::{Context, Result, anyhow};
use aws_sdk_s3::types::Object;
use aws_smithy_types_convert::date_time::DateTimeExt;
use chrono::{DateTime, Utc};
use zeroize_derive::{Zeroize, ZeroizeOnDrop};

pub mod error;
pub mod token;

/// Metadata key used for the ETag reported by the store at listing time.
pub const METADATA_KEY_ETAG: &str = "ETag";
/// Metadata key used for the storage class reported by the store at listing time.
pub const METADATA_KEY_STORAGE_CLASS: &str = "StorageClass";

/// One object as reported by the store.
///
/// `key` is the full object key (including any prefix used for listing).
/// `metadata` carries store-reported attributes for listed objects
/// (ETag, storage class) and user metadata for objects being uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRecord {
    pub key: String,
    pub last_modified: DateTime<Utc>,
    pub size: u64,
    pub metadata: Option<HashMap<String, String>>,
}

impl ObjectRecord {
    pub fn new(key: &str, last_modified: DateTime<Utc>, size: u64) -> Self {
        Self {
            key: key.to_string(),
            last_modified,
            size,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Looks up one metadata value. Missing maps and missing keys both yield `None`.
    pub fn metadata_value(&self, field: &str) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.get(field))
            .map(String::as_str)
    }
}

impl TryFrom<&Object> for ObjectRecord {
    type Error = anyhow::Error;

    fn try_from(object: &Object) -> Result<Self> {
        let key = object
            .key()
            .ok_or_else(|| anyhow!("listed object has no key."))?;
        let last_modified = object
            .last_modified()
            .ok_or_else(|| anyhow!("listed object has no LastModified: {key}"))?
            .to_chrono_utc()
            .with_context(|| format!("LastModified out of range: {key}"))?;
        let size = u64::try_from(object.size().unwrap_or(0)).unwrap_or(0);

        let mut metadata = HashMap::new();
        if let Some(e_tag) = object.e_tag() {
            metadata.insert(METADATA_KEY_ETAG.to_string(), e_tag.to_string());
        }
        if let Some(storage_class) = object.storage_class() {
            metadata.insert(
                METADATA_KEY_STORAGE_CLASS.to_string(),
                storage_class.as_str().to_string(),
            );
        }

        Ok(Self {
            key: key.to_string(),
            last_modified,
            size,
            metadata: if metadata.is_empty() {
                None
            } else {
                Some(metadata)
            },
        })
    }
}

/// Counters describing one cleanup run.
///
/// `total_size_bytes` is the size of every matched object, before the
/// `max_deletions` cap is applied. `planned_size_bytes` is the capped size.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanupSummary {
    pub total_objects: u64,
    pub matched_count: u64,
    pub planned_count: u64,
    pub total_size_bytes: u64,
    pub planned_size_bytes: u64,
    pub attempted_count: u64,
    pub succeeded_count: u64,
    pub failed_count: u64,
    pub dry_run: bool,
    pub capped: bool,
    pub report_written: bool,
    /// First planned objects, filled in dry-run mode only.
    pub preview: Vec<ObjectRecord>,
}

impl CleanupSummary {
    pub fn has_failure(&self) -> bool {
        self.failed_count > 0
    }
}

/// S3 storage path specification.
#[derive(Debug, Clone, PartialEq)]
pub enum StoragePath {
    S3 { bucket: String, prefix: String },
}

impl StoragePath {
    pub fn bucket(&self) -> &str {
        let StoragePath::S3 { bucket, .. } = self;
        bucket
    }

    pub fn prefix(&self) -> &str {
        let StoragePath::S3 { prefix, .. } = self;
        prefix
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let StoragePath::S3 { bucket, prefix } = self;
        write!(f, "s3://{bucket}/{prefix}")
    }
}

/// Credential sources for the store client.
#[derive(Debug, Clone)]
pub enum S3Credentials {
    Profile(String),
    Credentials { access_keys: AccessKeys },
    FromEnvironment,
}

/// Access key pair. Secret material is cleared from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AccessKeys {
    pub access_key: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Debug for AccessKeys {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut keys = f.debug_struct("AccessKeys");
        let session_token = self
            .session_token
            .as_ref()
            .map_or("None", |_| "** redacted **");
        keys.field("access_key", &self.access_key)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &session_token);
        keys.finish()
    }
}
