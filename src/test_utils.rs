//! Shared test utilities for the s3cleaner library crate.
//!
//! This module provides canonical helper functions used across multiple test
//! modules, plus an in-memory [`MockStorage`] that records every call.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_channel::Sender;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::operation::delete_object::DeleteObjectOutput;
use aws_sdk_s3::operation::delete_objects::DeleteObjectsOutput;
use aws_sdk_s3::types::{DeletedObject, Error as S3Error, ObjectIdentifier};
use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::storage::{Storage, StorageTrait};
use crate::types::ObjectRecord;
use crate::types::error::S3cleanerError;

/// Initialise a dummy tracing subscriber for tests.
///
/// Uses `try_init` so that only the first call in a process actually
/// installs the subscriber; subsequent calls are silently ignored.
pub(crate) fn init_dummy_tracing_subscriber() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("dummy=trace")
        .try_init();
}

/// Create a default [`Config`] suitable for most unit tests.
///
/// bucket=`"test-bucket"`, prefix=`"prefix/"`, dry run enabled.
pub(crate) fn make_test_config() -> Config {
    Config::for_target("test-bucket", "prefix/")
}

pub(crate) fn record_at(key: &str, last_modified: DateTime<Utc>, size: u64) -> ObjectRecord {
    ObjectRecord::new(key, last_modified, size)
}

/// Storage with an existing, empty bucket.
pub(crate) fn make_null_storage() -> Storage {
    Box::new(MockStorage::with_records(vec![]))
}

#[derive(Default)]
struct MockState {
    records: Vec<ObjectRecord>,
    bucket_exists: bool,
    fail_list: bool,
    failing_puts: HashSet<String>,
    list_prefixes: Vec<Option<String>>,
    put_keys: Vec<String>,
    create_bucket_calls: usize,
    delete_objects_calls: Vec<usize>,
    delete_object_calls: Vec<String>,
    // key -> S3 error code reported for that key
    failing_keys: HashMap<String, String>,
    // a chunk containing any of these keys fails at the transport level
    failing_chunk_keys: HashSet<String>,
}

/// In-memory store bound to `test-bucket`.
///
/// Clones share state, so a test can keep one handle for assertions and
/// hand a boxed clone to the code under test.
#[derive(Clone)]
pub(crate) struct MockStorage {
    state: Arc<Mutex<MockState>>,
}

impl MockStorage {
    pub(crate) fn with_records(records: Vec<ObjectRecord>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                records,
                bucket_exists: true,
                ..Default::default()
            })),
        }
    }

    pub(crate) fn without_bucket(self) -> Self {
        self.state.lock().unwrap().bucket_exists = false;
        self
    }

    pub(crate) fn failing_list(self) -> Self {
        self.state.lock().unwrap().fail_list = true;
        self
    }

    /// Report `code` for `key` in every DeleteObjects / DeleteObject call.
    pub(crate) fn failing_key(self, key: &str, code: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_keys
            .insert(key.to_string(), code.to_string());
        self
    }

    /// Fail the whole DeleteObjects request when it contains `key`.
    pub(crate) fn failing_chunk_containing(self, key: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_chunk_keys
            .insert(key.to_string());
        self
    }

    pub(crate) fn failing_put(self, key: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_puts
            .insert(key.to_string());
        self
    }

    pub(crate) fn list_prefixes(&self) -> Vec<Option<String>> {
        self.state.lock().unwrap().list_prefixes.clone()
    }

    pub(crate) fn create_bucket_calls(&self) -> usize {
        self.state.lock().unwrap().create_bucket_calls
    }

    /// Number of keys in each DeleteObjects call, in call order.
    pub(crate) fn delete_objects_calls(&self) -> Vec<usize> {
        self.state.lock().unwrap().delete_objects_calls.clone()
    }

    pub(crate) fn delete_object_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().delete_object_calls.clone()
    }

    pub(crate) fn delete_call_count(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.delete_objects_calls.len() + state.delete_object_calls.len()
    }

    pub(crate) fn put_keys(&self) -> Vec<String> {
        self.state.lock().unwrap().put_keys.clone()
    }

    pub(crate) fn remaining_keys(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .records
            .iter()
            .map(|record| record.key.clone())
            .collect()
    }
}

#[async_trait]
impl StorageTrait for MockStorage {
    fn bucket(&self) -> &str {
        "test-bucket"
    }

    async fn list_objects(
        &self,
        sender: &Sender<ObjectRecord>,
        prefix: Option<&str>,
        _max_keys: i32,
    ) -> Result<()> {
        let records = {
            let mut state = self.state.lock().unwrap();
            state.list_prefixes.push(prefix.map(str::to_string));
            if state.fail_list {
                return Err(anyhow!(S3cleanerError::Connectivity(
                    "listing failed".to_string()
                )));
            }
            state
                .records
                .iter()
                .filter(|record| prefix.is_none_or(|prefix| record.key.starts_with(prefix)))
                .cloned()
                .collect::<Vec<_>>()
        };

        for record in records {
            if sender.send(record).await.is_err() {
                return Ok(());
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
        let mut state = self.state.lock().unwrap();
        if state.failing_puts.contains(key) {
            return Err(anyhow!("AccessDenied: upload failed for {key}"));
        }
        state.put_keys.push(key.to_string());
        state.records.retain(|record| record.key != key);
        let mut record = ObjectRecord::new(key, Utc::now(), body.len() as u64);
        record.metadata = metadata;
        state.records.push(record);
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<DeleteObjectOutput> {
        let mut state = self.state.lock().unwrap();
        state.delete_object_calls.push(key.to_string());
        if let Some(code) = state.failing_keys.get(key) {
            return Err(anyhow!("{code}: delete failed for {key}"));
        }
        state.records.retain(|record| record.key != key);
        Ok(DeleteObjectOutput::builder().build())
    }

    async fn delete_objects(&self, objects: Vec<ObjectIdentifier>) -> Result<DeleteObjectsOutput> {
        let mut state = self.state.lock().unwrap();
        state.delete_objects_calls.push(objects.len());

        if objects
            .iter()
            .any(|object| state.failing_chunk_keys.contains(object.key()))
        {
            return Err(anyhow!("connection reset by peer"));
        }

        let mut deleted = Vec::new();
        let mut errors = Vec::new();
        for object in &objects {
            let key = object.key().to_string();
            match state.failing_keys.get(&key) {
                Some(code) => errors.push(
                    S3Error::builder()
                        .key(&key)
                        .code(code)
                        .message("mock failure")
                        .build(),
                ),
                None => {
                    state.records.retain(|record| record.key != key);
                    deleted.push(DeletedObject::builder().key(&key).build());
                }
            }
        }

        Ok(DeleteObjectsOutput::builder()
            .set_deleted(Some(deleted))
            .set_errors(Some(errors))
            .build())
    }

    async fn bucket_exists(&self) -> Result<bool> {
        Ok(self.state.lock().unwrap().bucket_exists)
    }

    async fn create_bucket(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.create_bucket_calls += 1;
        state.bucket_exists = true;
        Ok(())
    }

    fn get_client(&self) -> Option<Arc<Client>> {
        None
    }
}
