/*!
# Overview
s3cleaner-rs deletes objects from S3-compatible buckets (AWS S3, MinIO)
selected by age, size and key patterns.

## Features
- **Filtering**: relative age (`7d`), absolute date, size bounds, key
  substrings, suffix and key prefix, combined with AND semantics
- **Safety**: dry run by default, a `max_deletions` cap, a CSV report of
  the deletion plan before anything is deleted
- **Batching**: DeleteObjects requests of up to 1000 keys, with a bounded
  number of batches in flight
- **Library-First**: the `s3cleaner` CLI is a thin wrapper over this crate

## As a Library

```toml
[dependencies]
s3cleaner-rs = "0.1"
tokio = { version = "1", features = ["full"] }
```

```no_run
use s3cleaner_rs::config::args::parse_from_args;
use s3cleaner_rs::{CleanupPipeline, Config, create_pipeline_cancellation_token};

#[tokio::main]
async fn main() {
    let args = vec!["s3cleaner", "s3://my-bucket/temp/", "--older-than", "7d"];

    let config = Config::try_from(parse_from_args(args).unwrap()).unwrap();
    let pipeline = CleanupPipeline::new(config, create_pipeline_cancellation_token()).await;

    match pipeline.run().await {
        Ok(summary) => println!("{} objects would be deleted", summary.planned_count),
        Err(e) => eprintln!("{e:#}"),
    }
}
```
*/

#![allow(clippy::collapsible_if)]

pub mod cleaner;
pub mod config;
pub mod deleter;
pub mod filters;
pub mod lister;
pub mod planner;
pub mod populate;
pub mod report;
pub mod stage;
pub mod storage;
pub mod types;

pub use cleaner::CleanupPipeline;
pub use config::args::{CLIArgs, PopulateArgs, build_config_from_args, parse_from_args};
pub use config::{Config, FilterConfig, PopulateConfig};
pub use deleter::{BatchDeleter, DeletionResult, FailedKey};
pub use filters::FilterSpec;
pub use planner::DeletionPlan;
pub use populate::{BucketSummary, Populator};
pub use report::ReportExporter;
pub use storage::{Storage, StorageTrait, ensure_bucket};
pub use types::error::{S3cleanerError, exit_code_from_error, is_cancelled_error};
pub use types::token::{PipelineCancellationToken, create_pipeline_cancellation_token};
pub use types::{CleanupSummary, ObjectRecord, StoragePath};

#[cfg(test)]
mod test_utils;
