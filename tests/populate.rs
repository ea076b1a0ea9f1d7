//! The population tool against the in-memory store, followed by cleanups
//! over the generated data.

mod common;

use common::{InMemoryStorage, build_config, run_pipeline};
use s3cleaner_rs::populate::{Populator, generate_test_objects, special_test_objects};
use s3cleaner_rs::{PopulateConfig, StoragePath};

fn populate_config(num_files: u32) -> PopulateConfig {
    PopulateConfig {
        target: StoragePath::S3 {
            bucket: common::BUCKET.to_string(),
            prefix: String::new(),
        },
        target_client_config: None,
        tracing_config: None,
        num_files,
        clean_first: false,
        list_only: false,
        export_report: None,
        concurrency: 8,
        max_keys: 1000,
    }
}

#[tokio::test]
async fn populated_bucket_supports_cleanup_filters() {
    let storage = InMemoryStorage::default();

    let outcome = Populator::with_storage(populate_config(50), Box::new(storage.clone()))
        .run()
        .await
        .unwrap();

    let expected = generate_test_objects("", 50).len() + special_test_objects("").len();
    assert_eq!(outcome.summary.total_files as usize, expected);

    let config = build_config(vec![
        "s3://integration-bucket/",
        "--suffix",
        ".log",
        "--exclude",
        "EXCLUDE_ME",
    ]);
    let summary = run_pipeline(config, &storage).await.unwrap();

    assert!(summary.matched_count > 0);
    assert!(
        summary
            .preview
            .iter()
            .all(|record| record.key.ends_with(".log") && !record.key.contains("EXCLUDE_ME"))
    );
}

#[tokio::test]
async fn large_objects_are_found_by_size() {
    let storage = InMemoryStorage::default();
    Populator::with_storage(populate_config(1), Box::new(storage.clone()))
        .run()
        .await
        .unwrap();

    let config = build_config(vec!["s3://integration-bucket/", "--min-size", "10MB"]);
    let summary = run_pipeline(config, &storage).await.unwrap();

    assert_eq!(summary.matched_count, 2);
}
