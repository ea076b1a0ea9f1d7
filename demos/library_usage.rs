//! Example: Using s3cleaner-rs as a library.
//!
//! This example demonstrates how to:
//! 1. Build a [`Config`] from CLI-style arguments
//! 2. Run the [`CleanupPipeline`] and inspect the summary
//! 3. Run a second pass when some deletions failed
//!
//! Run with:
//! ```sh
//! cargo run --example library_usage -- s3://my-bucket/temp/ --older-than 7d
//! ```

use anyhow::{Result, anyhow};
use s3cleaner_rs::{
    CleanupPipeline, CleanupSummary, Config, build_config_from_args,
    create_pipeline_cancellation_token,
};

async fn run_once(config: &Config) -> Result<CleanupSummary> {
    let pipeline = CleanupPipeline::new(config.clone(), create_pipeline_cancellation_token()).await;
    pipeline.run().await
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = vec!["s3cleaner".to_string()];
    args.extend(std::env::args().skip(1));

    let config = build_config_from_args(args).map_err(|e| anyhow!(e))?;

    let summary = run_once(&config).await?;
    println!(
        "listed {} objects, {} matched, {} planned",
        summary.total_objects, summary.matched_count, summary.planned_count
    );
    for record in &summary.preview {
        println!("  would delete: {} ({} bytes)", record.key, record.size);
    }

    // Keys that failed to delete are still in the bucket, so listing the
    // same prefix again picks them up.
    if !summary.dry_run && summary.has_failure() {
        let retry = run_once(&config).await?;
        println!(
            "second pass: {} deleted, {} failed",
            retry.succeeded_count, retry.failed_count
        );
    }

    Ok(())
}
