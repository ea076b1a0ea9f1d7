use std::ffi::OsString;
use std::path::PathBuf;

use clap::builder::NonEmptyStringValueParser;
use clap::{ArgAction, Parser};

use crate::config::{Config, FilterConfig};
use crate::types::StoragePath;

pub mod common;
pub mod populate;
pub mod value_parser {
    pub mod human_bytes;
    pub mod time_filter;
    pub mod url;
}

pub use common::CommonArgs;
pub use populate::PopulateArgs;

use value_parser::human_bytes::check_human_bytes;
use value_parser::time_filter::{check_older_than, check_since};


const DEFAULT_DRY_RUN: bool = true;
const DEFAULT_CONFIRM: bool = false;
const DEFAULT_CONCURRENCY: u16 = 4;
const DEFAULT_BATCH_SIZE: u16 = 1000;
const DEFAULT_PREVIEW_COUNT: usize = 20;
const DEFAULT_MAX_KEYS: i32 = 1000;
const DEFAULT_OBJECT_LISTING_QUEUE_SIZE: u32 = 200000;
const DEFAULT_WARN_AS_ERROR: bool = false;

const MAX_BATCH_SIZE: u16 = 1000;

const ERROR_MESSAGE_INVALID_TARGET: &str =
    "Target must be an S3 path starting with 's3://' (e.g., s3://bucket/prefix).";
const ERROR_MESSAGE_NO_FILTER: &str = "At least one filter is required: --older-than, --since, --min-size, --max-size, --suffix, --include or --key-prefix.";
const ERROR_MESSAGE_CONCURRENCY_ZERO: &str = "Concurrency must be at least 1.";
const ERROR_MESSAGE_BATCH_SIZE_ZERO: &str = "Batch size must be at least 1.";
const ERROR_MESSAGE_BATCH_SIZE_TOO_LARGE: &str = "Batch size must be at most 1000 (S3 API limit).";
const ERROR_MESSAGE_MAX_KEYS_OUT_OF_RANGE: &str = "Max keys must be between 1 and 1000.";
const ERROR_MESSAGE_OBJECT_LISTING_QUEUE_SIZE_ZERO: &str =
    "Object listing queue size must be at least 1.";

pub(crate) fn check_s3_target(s: &str) -> Result<String, String> {
    if s.starts_with("s3://") && s.len() > 5 {
        Ok(s.to_string())
    } else {
        Err(ERROR_MESSAGE_INVALID_TARGET.to_string())
    }
}

/// Split `s3://bucket[/prefix]` into bucket and prefix.
pub(crate) fn parse_target(uri: &str) -> Result<StoragePath, String> {
    let Some(without_scheme) = uri.strip_prefix("s3://") else {
        return Err(ERROR_MESSAGE_INVALID_TARGET.to_string());
    };

    let (bucket, prefix) = match without_scheme.split_once('/') {
        Some((bucket, prefix)) => (bucket.to_string(), prefix.to_string()),
        None => (without_scheme.to_string(), String::new()),
    };

    if bucket.is_empty() {
        return Err(ERROR_MESSAGE_INVALID_TARGET.to_string());
    }

    Ok(StoragePath::S3 { bucket, prefix })
}

/// s3cleaner - Filter-driven bulk deletion for S3-compatible object stores.
///
/// Lists the target prefix, selects objects by age, size and key patterns,
/// and deletes them in batches. Runs as a dry run unless --confirm is given.
///
/// Example:
///   s3cleaner s3://my-bucket/temp/ --older-than 7d
///   s3cleaner s3://my-bucket/ --suffix .log --exclude important --confirm
///   s3cleaner s3://my-bucket/ --min-size 100MB --report large.csv
#[derive(Parser, Clone, Debug)]
#[command(name = "s3cleaner", version, about, long_about = None)]
pub struct CLIArgs {
    #[arg(
        env,
        help = "s3://<BUCKET_NAME>[/prefix]",
        value_parser = check_s3_target,
        default_value_if("auto_complete_shell", clap::builder::ArgPredicate::IsPresent, "s3://ignored"),
        required = false,
    )]
    pub target: String,

    /// Only show what would be deleted. On by default; see --confirm.
    #[arg(
        long,
        env,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_value_t = DEFAULT_DRY_RUN,
        default_missing_value = "true",
        help_heading = "General"
    )]
    pub dry_run: bool,

    /// Actually delete the matched objects. Overrides --dry-run.
    #[arg(long, env, default_value_t = DEFAULT_CONFIRM, help_heading = "General")]
    pub confirm: bool,

    /// Select objects last modified at least this long ago: <n><unit>, unit one of d, h, m, w.
    #[arg(long, env, value_parser = check_older_than, help_heading = "Filter")]
    pub older_than: Option<String>,

    /// Select objects last modified at or after this date (e.g. 2024-01-01 or RFC 3339).
    #[arg(long, env, value_parser = check_since, help_heading = "Filter")]
    pub since: Option<String>,

    /// Skip objects whose key contains this string. Repeatable.
    #[arg(long, env, action = ArgAction::Append, value_parser = NonEmptyStringValueParser::new(), help_heading = "Filter")]
    pub exclude: Vec<String>,

    /// Select only objects whose key contains one of these strings. Repeatable.
    #[arg(long, env, action = ArgAction::Append, value_parser = NonEmptyStringValueParser::new(), help_heading = "Filter")]
    pub include: Vec<String>,

    /// Select only objects whose key ends with this string (e.g. .log).
    #[arg(long, env, value_parser = NonEmptyStringValueParser::new(), help_heading = "Filter")]
    pub suffix: Option<String>,

    /// Select only objects whose full key starts with this string.
    #[arg(long, env, value_parser = NonEmptyStringValueParser::new(), help_heading = "Filter")]
    pub key_prefix: Option<String>,

    /// Select objects of at least this size.
    #[arg(
        long,
        env,
        value_parser = check_human_bytes,
        help_heading = "Filter",
        long_help = r#"Select objects larger than or equal to given size.
Units are binary: KB, KiB and K all mean 1024 bytes. Allowed: B, K, M, G, T, P"#
    )]
    pub min_size: Option<String>,

    /// Select objects of at most this size.
    #[arg(
        long,
        env,
        value_parser = check_human_bytes,
        help_heading = "Filter",
        long_help = r#"Select objects smaller than or equal to given size.
Units are binary: KB, KiB and K all mean 1024 bytes. Allowed: B, K, M, G, T, P"#
    )]
    pub max_size: Option<String>,

    /// Delete at most this many objects. Matches beyond the cap are left alone.
    #[arg(long, env, help_heading = "Safety")]
    pub max_deletions: Option<u64>,

    /// Number of delete batches in flight at once.
    #[arg(long, env, default_value_t = DEFAULT_CONCURRENCY, help_heading = "Deletion")]
    pub concurrency: u16,

    /// Keys per DeleteObjects request (1-1000). 1 uses DeleteObject per key.
    #[arg(long, env, default_value_t = DEFAULT_BATCH_SIZE, help_heading = "Deletion")]
    pub batch_size: u16,

    /// Number of planned objects shown in dry-run mode.
    #[arg(long, env, default_value_t = DEFAULT_PREVIEW_COUNT, help_heading = "Report")]
    pub preview_count: usize,

    /// Write the deletion plan to this CSV file.
    #[arg(long, env, help_heading = "Report")]
    pub report: Option<PathBuf>,

    /// Additional report column, taken from object metadata (e.g. ETag, StorageClass). Repeatable.
    #[arg(long, env, action = ArgAction::Append, value_parser = NonEmptyStringValueParser::new(), help_heading = "Report")]
    pub report_field: Vec<String>,

    #[command(flatten)]
    pub common: CommonArgs,

    /// Max keys per listing request.
    #[arg(long, env, default_value_t = DEFAULT_MAX_KEYS, help_heading = "Advanced")]
    pub max_keys: i32,

    /// Object listing channel queue size.
    #[arg(long, env, default_value_t = DEFAULT_OBJECT_LISTING_QUEUE_SIZE, help_heading = "Advanced")]
    pub object_listing_queue_size: u32,

    /// Exit with code 3 when some deletions failed.
    #[arg(long, env, default_value_t = DEFAULT_WARN_AS_ERROR, help_heading = "Advanced")]
    pub warn_as_error: bool,

    /// Generate shell completions.
    #[arg(long, env, help_heading = "Advanced")]
    pub auto_complete_shell: Option<clap_complete::shells::Shell>,
}

/// Parse command-line arguments into a `CLIArgs` struct.
///
/// # Example
///
/// ```
/// use s3cleaner_rs::config::args::parse_from_args;
///
/// let args = vec!["s3cleaner", "s3://my-bucket/temp/", "--older-than", "7d"];
/// let cli_args = parse_from_args(args).unwrap();
/// assert!(cli_args.dry_run);
/// assert!(!cli_args.confirm);
/// ```
pub fn parse_from_args<I, T>(args: I) -> Result<CLIArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    CLIArgs::try_parse_from(args)
}

/// Parse arguments and build a Config in one step.
pub fn build_config_from_args<I, T>(args: I) -> Result<Config, String>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli_args = CLIArgs::try_parse_from(args).map_err(|e| e.to_string())?;
    Config::try_from(cli_args)
}

impl CLIArgs {
    fn validate(&self) -> Result<(), String> {
        if self.concurrency == 0 {
            return Err(ERROR_MESSAGE_CONCURRENCY_ZERO.to_string());
        }
        if self.batch_size == 0 {
            return Err(ERROR_MESSAGE_BATCH_SIZE_ZERO.to_string());
        }
        if self.batch_size > MAX_BATCH_SIZE {
            return Err(ERROR_MESSAGE_BATCH_SIZE_TOO_LARGE.to_string());
        }
        if !(1..=1000).contains(&self.max_keys) {
            return Err(ERROR_MESSAGE_MAX_KEYS_OUT_OF_RANGE.to_string());
        }
        if self.object_listing_queue_size == 0 {
            return Err(ERROR_MESSAGE_OBJECT_LISTING_QUEUE_SIZE_ZERO.to_string());
        }
        if self.auto_complete_shell.is_none() && !self.build_filter_config().has_selective_filter() {
            return Err(ERROR_MESSAGE_NO_FILTER.to_string());
        }
        self.common.validate()
    }

    fn build_filter_config(&self) -> FilterConfig {
        FilterConfig {
            older_than: self.older_than.clone(),
            since: self.since.clone(),
            min_size: self.min_size.clone(),
            max_size: self.max_size.clone(),
            exclude: self.exclude.clone(),
            include: self.include.clone(),
            suffix: self.suffix.clone(),
            key_prefix: self.key_prefix.clone(),
        }
    }
}

impl TryFrom<CLIArgs> for Config {
    type Error = String;

    fn try_from(args: CLIArgs) -> Result<Self, Self::Error> {
        args.validate()?;

        Ok(Config {
            target: parse_target(&args.target)?,
            target_client_config: Some(args.common.build_client_config()),
            tracing_config: args.common.build_tracing_config(),
            filter_config: args.build_filter_config(),
            dry_run: args.dry_run && !args.confirm,
            max_deletions: args.max_deletions,
            concurrency: args.concurrency,
            batch_size: args.batch_size,
            max_keys: args.max_keys,
            object_listing_queue_size: args.object_listing_queue_size,
            report_path: args.report,
            report_fields: args.report_field,
            preview_count: args.preview_count,
            warn_as_error: args.warn_as_error,
            auto_complete_shell: args.auto_complete_shell,
        })
    }
}
