pub mod args;

use std::path::PathBuf;

use aws_smithy_types::checksum_config::RequestChecksumCalculation;

use crate::types::{S3Credentials, StoragePath};

/// Main configuration for a cleanup run.
///
/// Holds the target bucket/prefix, client settings, the raw filter strings,
/// the run limits (`max_deletions`, `concurrency`, `batch_size`) and the
/// report options. Filter strings are kept raw and parsed by the pipeline
/// when the run starts so that relative ages are measured from that moment.
///
/// # Quick Start
///
/// ```
/// use s3cleaner_rs::Config;
///
/// let mut config = Config::for_target("test-bucket", "temp/");
/// config.filter_config.older_than = Some("7d".to_string());
/// config.max_deletions = Some(100);
/// assert!(config.dry_run);
/// assert_eq!(config.concurrency, 4);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub target: StoragePath,
    pub target_client_config: Option<ClientConfig>,
    pub tracing_config: Option<TracingConfig>,
    pub filter_config: FilterConfig,
    /// Effective dry-run flag. `--confirm` on the command line clears it.
    pub dry_run: bool,
    pub max_deletions: Option<u64>,
    pub concurrency: u16,
    pub batch_size: u16,
    pub max_keys: i32,
    pub object_listing_queue_size: u32,
    pub report_path: Option<PathBuf>,
    pub report_fields: Vec<String>,
    pub preview_count: usize,
    pub warn_as_error: bool,
    pub auto_complete_shell: Option<clap_complete::shells::Shell>,
}

impl Config {
    /// Create a `Config` with CLI defaults for the given bucket and prefix.
    /// The result is a dry run until `dry_run` is cleared.
    pub fn for_target(bucket: &str, prefix: &str) -> Self {
        Config {
            target: StoragePath::S3 {
                bucket: bucket.to_string(),
                prefix: prefix.to_string(),
            },
            ..Config::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            target: StoragePath::S3 {
                bucket: String::new(),
                prefix: String::new(),
            },
            target_client_config: None,
            tracing_config: None,
            filter_config: FilterConfig::default(),
            dry_run: true,
            max_deletions: None,
            concurrency: 4,
            batch_size: 1000,
            max_keys: 1000,
            object_listing_queue_size: 200_000,
            report_path: None,
            report_fields: Vec::new(),
            preview_count: 20,
            warn_as_error: false,
            auto_complete_shell: None,
        }
    }
}

/// Configuration of the test-data population tool.
#[derive(Debug, Clone)]
pub struct PopulateConfig {
    pub target: StoragePath,
    pub target_client_config: Option<ClientConfig>,
    pub tracing_config: Option<TracingConfig>,
    pub num_files: u32,
    pub clean_first: bool,
    pub list_only: bool,
    pub export_report: Option<PathBuf>,
    pub concurrency: u16,
    pub max_keys: i32,
}

/// Store client configuration.
///
/// `endpoint_url` points the client at an S3-compatible service such as
/// MinIO; such services usually also need `force_path_style`.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub credential: S3Credentials,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
    pub retry_config: RetryConfig,
    pub cli_timeout_config: CLITimeoutConfig,
    pub request_checksum_calculation: RequestChecksumCalculation,
}

/// Retry configuration for SDK operations (standard mode, exponential backoff).
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub aws_max_attempts: u32,
    pub initial_backoff_milliseconds: u64,
}

#[derive(Debug, Clone)]
pub struct CLITimeoutConfig {
    pub operation_timeout_milliseconds: Option<u64>,
    pub operation_attempt_timeout_milliseconds: Option<u64>,
    pub connect_timeout_milliseconds: Option<u64>,
    pub read_timeout_milliseconds: Option<u64>,
}

/// Tracing (logging) configuration.
#[derive(Debug, Clone, Copy)]
pub struct TracingConfig {
    pub tracing_level: log::Level,
    pub json_tracing: bool,
    pub aws_sdk_tracing: bool,
    pub span_events_tracing: bool,
    pub disable_color_tracing: bool,
}

/// Raw filter strings as given by the user.
///
/// Parsed into a [`FilterSpec`](crate::filters::FilterSpec) at run start.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterConfig {
    pub older_than: Option<String>,
    pub since: Option<String>,
    pub min_size: Option<String>,
    pub max_size: Option<String>,
    pub exclude: Vec<String>,
    pub include: Vec<String>,
    pub suffix: Option<String>,
    pub key_prefix: Option<String>,
}

impl FilterConfig {
    /// True when at least one criterion narrows the selection.
    ///
    /// Exclusion patterns only remove objects from an otherwise
    /// unrestricted selection, so they do not count.
    pub fn has_selective_filter(&self) -> bool {
        self.older_than.is_some()
            || self.since.is_some()
            || self.min_size.is_some()
            || self.max_size.is_some()
            || self.suffix.is_some()
            || !self.include.is_empty()
            || self.key_prefix.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_dummy_tracing_subscriber;

    #[test]
    fn config_for_target_sets_bucket_and_prefix() {
        init_dummy_tracing_subscriber();

        let config = Config::for_target("my-bucket", "logs/2024/");
        assert_eq!(config.target.bucket(), "my-bucket");
        assert_eq!(config.target.prefix(), "logs/2024/");
    }

    #[test]
    fn config_default_is_a_dry_run() {
        init_dummy_tracing_subscriber();

        let config = Config::default();
        assert!(config.dry_run);
        assert!(config.max_deletions.is_none());
        assert!(config.report_path.is_none());
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.preview_count, 20);
        assert_eq!(config.max_keys, 1000);
        assert!(!config.warn_as_error);
    }

    #[test]
    fn filter_config_default_is_not_selective() {
        init_dummy_tracing_subscriber();

        assert!(!FilterConfig::default().has_selective_filter());
    }

    #[test]
    fn exclude_alone_is_not_selective() {
        init_dummy_tracing_subscriber();

        let filter_config = FilterConfig {
            exclude: vec!["important".to_string()],
            ..Default::default()
        };
        assert!(!filter_config.has_selective_filter());
    }

    #[test]
    fn each_criterion_is_selective() {
        init_dummy_tracing_subscriber();

        let candidates = [
            FilterConfig {
                older_than: Some("7d".to_string()),
                ..Default::default()
            },
            FilterConfig {
                since: Some("2024-01-01".to_string()),
                ..Default::default()
            },
            FilterConfig {
                min_size: Some("1MB".to_string()),
                ..Default::default()
            },
            FilterConfig {
                max_size: Some("1KB".to_string()),
                ..Default::default()
            },
            FilterConfig {
                suffix: Some(".tmp".to_string()),
                ..Default::default()
            },
            FilterConfig {
                include: vec!["cache".to_string()],
                ..Default::default()
            },
            FilterConfig {
                key_prefix: Some("temp/".to_string()),
                ..Default::default()
            },
        ];

        for filter_config in candidates {
            assert!(filter_config.has_selective_filter(), "{filter_config:?}");
        }
    }
}
