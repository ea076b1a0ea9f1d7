//! Shared integration test infrastructure.
//!
//! Provides `InMemoryStorage`, a `StorageTrait` implementation over a
//! vector of records, and helpers that build a config from command-line
//! arguments and run the cleanup pipeline against it.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_channel::Sender;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::operation::delete_object::DeleteObjectOutput;
use aws_sdk_s3::operation::delete_objects::DeleteObjectsOutput;
use aws_sdk_s3::types::{DeletedObject, Error as S3Error, ObjectIdentifier};
use chrono::{DateTime, Duration, Utc};
use s3cleaner_rs::config::args::build_config_from_args;
use s3cleaner_rs::{
    CleanupPipeline, CleanupSummary, Config, ObjectRecord, StorageTrait,
    create_pipeline_cancellation_token,
};

pub const BUCKET: &str = "integration-bucket";

#[derive(Default)]
struct StoreState {
    records: Vec<ObjectRecord>,
    delete_objects_calls: Vec<usize>,
    delete_object_calls: usize,
    failing_keys: HashSet<String>,
}

/// In-memory store. Clones share state.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStorage {
    pub fn new(records: Vec<ObjectRecord>) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState {
                records,
                ..Default::default()
            })),
        }
    }

    /// Report an `AccessDenied` error for `key` on every delete.
    pub fn fail_key(&self, key: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_keys
            .insert(key.to_string());
    }

    pub fn keys(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .records
            .iter()
            .map(|record| record.key.clone())
            .collect()
    }

    pub fn delete_objects_calls(&self) -> Vec<usize> {
        self.state.lock().unwrap().delete_objects_calls.clone()
    }

    pub fn delete_call_count(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.delete_objects_calls.len() + state.delete_object_calls
    }
}

#[async_trait]
impl StorageTrait for InMemoryStorage {
    fn bucket(&self) -> &str {
        BUCKET
    }

    async fn list_objects(
        &self,
        sender: &Sender<ObjectRecord>,
        prefix: Option<&str>,
        _max_keys: i32,
    ) -> Result<()> {
        let records: Vec<ObjectRecord> = self
            .state
            .lock()
            .unwrap()
            .records
            .iter()
            .filter(|record| prefix.is_none_or(|prefix| record.key.starts_with(prefix)))
            .cloned()
            .collect();

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
        state.records.retain(|record| record.key != key);
        let mut record = ObjectRecord::new(key, Utc::now(), body.len() as u64);
        record.metadata = metadata;
        state.records.push(record);
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<DeleteObjectOutput> {
        let mut state = self.state.lock().unwrap();
        state.delete_object_calls += 1;
        if state.failing_keys.contains(key) {
            return Err(anyhow!("AccessDenied: {key}"));
        }
        state.records.retain(|record| record.key != key);
        Ok(DeleteObjectOutput::builder().build())
    }

    async fn delete_objects(&self, objects: Vec<ObjectIdentifier>) -> Result<DeleteObjectsOutput> {
        let mut state = self.state.lock().unwrap();
        state.delete_objects_calls.push(objects.len());

        let mut deleted = Vec::new();
        let mut errors = Vec::new();
        for object in &objects {
            let key = object.key();
            if state.failing_keys.contains(key) {
                errors.push(
                    S3Error::builder()
                        .key(key)
                        .code("AccessDenied")
                        .message("Access Denied")
                        .build(),
                );
            } else {
                state.records.retain(|record| record.key != key);
                deleted.push(DeletedObject::builder().key(key).build());
            }
        }

        Ok(DeleteObjectsOutput::builder()
            .set_deleted(Some(deleted))
            .set_errors(Some(errors))
            .build())
    }

    async fn bucket_exists(&self) -> Result<bool> {
        Ok(true)
    }

    async fn create_bucket(&self) -> Result<()> {
        Ok(())
    }

    fn get_client(&self) -> Option<Arc<Client>> {
        None
    }
}

/// Record last modified `days` days ago.
pub fn record_days_old(key: &str, days: i64, size: u64) -> ObjectRecord {
    ObjectRecord::new(key, Utc::now() - Duration::days(days), size)
}

pub fn record_at(key: &str, last_modified: DateTime<Utc>, size: u64) -> ObjectRecord {
    ObjectRecord::new(key, last_modified, size)
}

/// Build a config from s3cleaner arguments (without the program name).
pub fn build_config(args: Vec<&str>) -> Config {
    let mut full_args = vec!["s3cleaner"];
    full_args.extend(args);
    build_config_from_args(full_args).unwrap()
}

pub async fn run_pipeline(config: Config, storage: &InMemoryStorage) -> Result<CleanupSummary> {
    let pipeline = CleanupPipeline::with_storage(
        config,
        Box::new(storage.clone()),
        create_pipeline_cancellation_token(),
    );
    pipeline.run().await
}
