//! Test data population and bucket inspection.
//!
//! Used by the `s3populate` binary to build a bucket that exercises every
//! s3cleaner filter: workspace-style key patterns across several age
//! categories, plus a fixed set of edge-case objects.
//!
//! The store assigns `LastModified` at upload time, so the intended age of
//! each generated object is recorded in its user metadata instead.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::PopulateConfig;
use crate::deleter::{BatchDeleter, DeletionResult, MAX_BATCH_SIZE};
use crate::report::{ReportExporter, format_size_human};
use crate::storage::{self, Storage, ensure_bucket};
use crate::types::ObjectRecord;
use crate::types::token::PipelineCancellationToken;

pub const METADATA_KEY_DATE_CATEGORY: &str = "date_category";
pub const METADATA_KEY_PATTERN_TYPE: &str = "pattern_type";
pub const METADATA_KEY_FILE_TYPE: &str = "file_type";
pub const METADATA_KEY_CREATED_BY: &str = "created_by";

const CREATED_BY: &str = "s3populate";
const SPECIAL_FILE_TYPE: &str = "special_test_case";
const ROOT_PREFIX: &str = "root";

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;

// `{}` is replaced by `<category>_<index>`.
const FILE_PATTERNS: [(&str, u64, u64); 15] = [
    ("models/experiments/exp_{}/model.pkl", 100 * KIB, 500 * KIB),
    ("models/experiments/exp_{}/logs.txt", KIB, 10 * KIB),
    ("models/experiments/exp_{}/config.yaml", 512, 2 * KIB),
    ("data/training/batch_{}/images.tar.gz", MIB, 10 * MIB),
    ("data/training/batch_{}/labels.json", 50 * KIB, 200 * KIB),
    ("results/eval_{}/metrics.json", KIB, 5 * KIB),
    ("results/eval_{}/confusion_matrix.png", 100 * KIB, 300 * KIB),
    ("logs/training_{}.log", 10 * KIB, 100 * KIB),
    ("temp/temp_{}.tmp", KIB, 50 * KIB),
    ("cache/cache_{}.dat", 10 * KIB, 200 * KIB),
    ("docs/report_{}.pdf", 500 * KIB, 2000 * KIB),
    ("configs/config_{}.json", 512, 4 * KIB),
    ("misc/file_{}.txt", KIB, 10 * KIB),
    ("misc/file_{}.log", 5 * KIB, 50 * KIB),
    ("misc/file_{}.bak", 100 * KIB, 1000 * KIB),
];

const SPECIAL_OBJECTS: [(&str, u64); 12] = [
    ("EXCLUDE_ME/important.txt", KIB),
    ("keep/EXCLUDE_ME.log", 2 * KIB),
    ("temp/backup_EXCLUDE_ME.bak", 4 * KIB),
    ("large_files/huge_model.bin", 50 * MIB),
    ("large_files/dataset.tar", 100 * MIB),
    ("tiny/empty.txt", 0),
    ("tiny/small.log", 10),
    ("special/file with spaces.txt", KIB),
    ("special/file-with-dashes.log", 2 * KIB),
    ("special/file_with_underscores.dat", KIB),
    ("test_dates/today.txt", KIB),
    ("test_dates/yesterday.log", 2 * KIB),
];

/// Intended age of a generated object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeCategory {
    /// 6 to 12 months old.
    VeryOld,
    /// 1 to 3 months old.
    Old,
    /// 1 to 2 weeks old.
    Recent,
    /// Last 2 days.
    VeryRecent,
}

impl AgeCategory {
    pub const ALL: [AgeCategory; 4] = [
        AgeCategory::VeryOld,
        AgeCategory::Old,
        AgeCategory::Recent,
        AgeCategory::VeryRecent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeCategory::VeryOld => "very_old",
            AgeCategory::Old => "old",
            AgeCategory::Recent => "recent",
            AgeCategory::VeryRecent => "very_recent",
        }
    }
}

/// An object to be uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct TestObject {
    pub key: String,
    pub size: u64,
    pub metadata: HashMap<String, String>,
}

/// Generate up to `num_files` pattern objects under `prefix`.
///
/// Every pattern gets two to four objects per age category. Sizes are
/// spread evenly across the pattern's range, from its minimum to its
/// maximum. The output is deterministic.
pub fn generate_test_objects(prefix: &str, num_files: u32) -> Vec<TestObject> {
    let mut objects = Vec::new();

    for (pattern_index, (template, min_size, max_size)) in FILE_PATTERNS.into_iter().enumerate() {
        let pattern_type = template.split('/').next().unwrap_or(template);

        for (category_index, category) in AgeCategory::ALL.iter().enumerate() {
            let files_in_category = 2 + (pattern_index + category_index) % 3;

            for i in 0..files_in_category {
                if objects.len() >= num_files as usize {
                    return objects;
                }

                let name = template.replace("{}", &format!("{}_{i:03}", category.as_str()));
                let size = min_size + (max_size - min_size) * i as u64 / (files_in_category as u64 - 1);
                let metadata = HashMap::from([
                    (METADATA_KEY_DATE_CATEGORY.to_string(), category.as_str().to_string()),
                    (METADATA_KEY_PATTERN_TYPE.to_string(), pattern_type.to_string()),
                    (METADATA_KEY_CREATED_BY.to_string(), CREATED_BY.to_string()),
                ]);

                objects.push(TestObject {
                    key: format!("{prefix}{name}"),
                    size,
                    metadata,
                });
            }
        }
    }

    objects
}

/// The fixed edge-case objects: exclude-pattern keys, large, empty and
/// tiny objects, and keys with spaces and dashes.
pub fn special_test_objects(prefix: &str) -> Vec<TestObject> {
    SPECIAL_OBJECTS
        .iter()
        .map(|(name, size)| TestObject {
            key: format!("{prefix}{name}"),
            size: *size,
            metadata: HashMap::from([
                (METADATA_KEY_FILE_TYPE.to_string(), SPECIAL_FILE_TYPE.to_string()),
                (METADATA_KEY_CREATED_BY.to_string(), CREATED_BY.to_string()),
            ]),
        })
        .collect()
}

/// Object body of `size` bytes. Bodies under 1 KiB are printable text.
pub fn generate_content(size: u64) -> Vec<u8> {
    let size = size as usize;
    if size < KIB as usize {
        const TEXT: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789 \n";
        TEXT.iter().copied().cycle().take(size).collect()
    } else {
        vec![0u8; size]
    }
}

/// Outcome of an upload round.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UploadResult {
    pub uploaded_count: u64,
    pub failed_count: u64,
    pub uploaded_bytes: u64,
}

/// Upload `objects` with at most `concurrency` uploads in flight.
///
/// Failed uploads are logged and counted. They never stop the others.
pub async fn upload_objects(
    target: &Storage,
    objects: Vec<TestObject>,
    concurrency: u16,
) -> UploadResult {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1) as usize));
    let mut join_handles = Vec::with_capacity(objects.len());
    let mut result = UploadResult::default();

    for object in objects {
        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            result.failed_count += 1;
            continue;
        };

        let target = target.clone();
        join_handles.push(tokio::spawn(async move {
            let _permit = permit;
            let body = generate_content(object.size);
            match target
                .put_object(&object.key, body, Some(object.metadata))
                .await
            {
                Ok(()) => {
                    info!(key = object.key, size = object.size, "object has been uploaded.");
                    Some(object.size)
                }
                Err(e) => {
                    warn!(
                        key = object.key,
                        error = format!("{e:#}"),
                        "object could not be uploaded."
                    );
                    None
                }
            }
        }));
    }

    for join_handle in join_handles {
        match join_handle.await {
            Ok(Some(size)) => {
                result.uploaded_count += 1;
                result.uploaded_bytes += size;
            }
            Ok(None) => result.failed_count += 1,
            Err(e) => {
                error!("upload worker has failed: {}", e);
                result.failed_count += 1;
            }
        }
    }

    result
}

/// List every object under `prefix` (the whole bucket when empty).
pub async fn list_all(target: &Storage, prefix: &str, max_keys: i32) -> Result<Vec<ObjectRecord>> {
    let (sender, receiver) = async_channel::unbounded();
    let prefix = if prefix.is_empty() { None } else { Some(prefix) };

    let result = target.list_objects(&sender, prefix, max_keys).await;
    sender.close();
    result?;

    let mut records = Vec::with_capacity(receiver.len());
    while let Ok(record) = receiver.try_recv() {
        records.push(record);
    }
    Ok(records)
}

/// Delete every object under `prefix`.
pub async fn clean_bucket(
    target: &Storage,
    prefix: &str,
    max_keys: i32,
    concurrency: u16,
) -> Result<DeletionResult> {
    let keys: Vec<String> = list_all(target, prefix, max_keys)
        .await?
        .into_iter()
        .map(|record| record.key)
        .collect();

    if keys.is_empty() {
        info!(bucket = target.bucket(), prefix = prefix, "bucket was already empty.");
        return Ok(DeletionResult::default());
    }

    let result = BatchDeleter::new(target.clone(), MAX_BATCH_SIZE as u16)
        .execute_keys(&keys, concurrency)
        .await;

    info!(
        succeeded_count = result.succeeded_count,
        failed_count = result.failed_count,
        "bucket has been cleaned."
    );
    Ok(result)
}

/// Aggregate view of a listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BucketSummary {
    pub total_files: u64,
    pub total_size: u64,
    /// Object count per top-level key segment. Keys without `/` count
    /// under `root`.
    pub prefixes: BTreeMap<String, u64>,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
    pub smallest: Option<u64>,
    pub largest: Option<u64>,
}

impl BucketSummary {
    pub fn from_records(records: &[ObjectRecord]) -> Self {
        let mut summary = BucketSummary::default();

        for record in records {
            summary.total_files += 1;
            summary.total_size += record.size;

            let top_level = match record.key.split_once('/') {
                Some((top_level, _)) => top_level,
                None => ROOT_PREFIX,
            };
            *summary.prefixes.entry(top_level.to_string()).or_default() += 1;

            summary.oldest = Some(
                summary
                    .oldest
                    .map_or(record.last_modified, |oldest| oldest.min(record.last_modified)),
            );
            summary.newest = Some(
                summary
                    .newest
                    .map_or(record.last_modified, |newest| newest.max(record.last_modified)),
            );
            summary.smallest = Some(summary.smallest.map_or(record.size, |s| s.min(record.size)));
            summary.largest = Some(summary.largest.map_or(record.size, |l| l.max(record.size)));
        }

        summary
    }

    pub fn is_empty(&self) -> bool {
        self.total_files == 0
    }

    pub fn average_size(&self) -> Option<f64> {
        (self.total_files > 0).then(|| self.total_size as f64 / self.total_files as f64)
    }
}

impl fmt::Display for BucketSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "Bucket is empty");
        }

        writeln!(f, "Bucket Summary:")?;
        writeln!(f, "  Total files: {}", self.total_files)?;
        writeln!(
            f,
            "  Total size: {} bytes ({})",
            self.total_size,
            format_size_human(self.total_size)
        )?;
        writeln!(f, "  Files by prefix:")?;
        for (prefix, count) in &self.prefixes {
            writeln!(f, "    {prefix}/: {count} files")?;
        }
        if let (Some(oldest), Some(newest)) = (self.oldest, self.newest) {
            writeln!(
                f,
                "  Date range: {} to {}",
                oldest.format("%Y-%m-%d"),
                newest.format("%Y-%m-%d")
            )?;
        }
        if let (Some(smallest), Some(largest)) = (self.smallest, self.largest) {
            writeln!(f, "  Size range: {smallest} to {largest} bytes")?;
        }
        if let Some(average) = self.average_size() {
            writeln!(f, "  Average size: {average:.0} bytes")?;
        }
        Ok(())
    }
}

/// s3cleaner invocations that exercise the populated data.
pub fn example_commands(bucket: &str) -> Vec<String> {
    vec![
        "# Dry run - files older than 7 days:".to_string(),
        format!("s3cleaner s3://{bucket}/ --older-than 7d"),
        String::new(),
        "# Temporary files, skipping anything marked EXCLUDE_ME:".to_string(),
        format!("s3cleaner s3://{bucket}/ --key-prefix temp/ --exclude EXCLUDE_ME"),
        String::new(),
        "# Large files over 10MB:".to_string(),
        format!("s3cleaner s3://{bucket}/ --min-size 10MB"),
        String::new(),
        "# Report of all log files:".to_string(),
        format!("s3cleaner s3://{bucket}/ --suffix .log --report log_files.csv"),
        String::new(),
        "# Actual deletion with a safety limit:".to_string(),
        format!("s3cleaner s3://{bucket}/ --older-than 30d --max-deletions 10 --confirm"),
    ]
}

/// What one populate run did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PopulateOutcome {
    pub bucket_created: bool,
    pub cleaned: Option<DeletionResult>,
    pub uploaded: Option<UploadResult>,
    pub summary: BucketSummary,
    pub report_written: bool,
}

/// Drives one `s3populate` run.
pub struct Populator {
    config: PopulateConfig,
    target: Storage,
}

impl Populator {
    pub async fn new(config: PopulateConfig, cancellation_token: PipelineCancellationToken) -> Self {
        let target = storage::create_storage(
            config.target.clone(),
            config.target_client_config.clone(),
            cancellation_token,
        )
        .await;

        Self::with_storage(config, target)
    }

    pub fn with_storage(config: PopulateConfig, target: Storage) -> Self {
        Self { config, target }
    }

    /// Make sure the bucket exists, then clean, upload, summarize and
    /// export as configured.
    ///
    /// Failing to reach the store aborts the run. Upload failures and a
    /// failed report export do not.
    pub async fn run(&self) -> Result<PopulateOutcome> {
        let prefix = self.config.target.prefix();
        let mut outcome = PopulateOutcome {
            bucket_created: ensure_bucket(&self.target).await?,
            ..Default::default()
        };

        if !self.config.list_only {
            if self.config.clean_first {
                outcome.cleaned = Some(
                    clean_bucket(
                        &self.target,
                        prefix,
                        self.config.max_keys,
                        self.config.concurrency,
                    )
                    .await?,
                );
            }

            if self.config.num_files > 0 {
                let mut objects = generate_test_objects(prefix, self.config.num_files);
                objects.extend(special_test_objects(prefix));

                info!(object_count = objects.len(), "upload has started.");
                let uploaded = upload_objects(&self.target, objects, self.config.concurrency).await;
                info!(
                    uploaded_count = uploaded.uploaded_count,
                    failed_count = uploaded.failed_count,
                    "upload has been completed."
                );
                outcome.uploaded = Some(uploaded);
            }
        }

        let records = list_all(&self.target, prefix, self.config.max_keys).await?;
        outcome.summary = BucketSummary::from_records(&records);

        if let Some(report_path) = self.config.export_report.as_ref() {
            match ReportExporter::default().export(&records, report_path) {
                Ok(_) => outcome.report_written = true,
                Err(e) => warn!(
                    path = %report_path.display(),
                    error = format!("{e:#}"),
                    "report could not be written."
                ),
            }
        }

        Ok(outcome)
    }
}
