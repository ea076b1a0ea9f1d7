use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;

use crate::config::PopulateConfig;
use crate::config::args::{CommonArgs, check_s3_target, parse_target};

const DEFAULT_NUM_FILES: u32 = 50;
const DEFAULT_CONCURRENCY: u16 = 4;
const DEFAULT_MAX_KEYS: i32 = 1000;

const ERROR_MESSAGE_CONCURRENCY_ZERO: &str = "Concurrency must be at least 1.";
const ERROR_MESSAGE_MAX_KEYS_OUT_OF_RANGE: &str = "Max keys must be between 1 and 1000.";

/// s3populate - Create a test data set for s3cleaner.
///
/// Ensures the bucket exists, uploads objects that follow common workspace
/// key patterns across several age categories, and prints a bucket summary
/// with example s3cleaner commands.
///
/// Example:
///   s3populate s3://test-bucket --endpoint-url http://localhost:9000 --force-path-style
///   s3populate s3://test-bucket --list-only
///   s3populate s3://test-bucket/sandbox/ --clean-first --num-files 100
#[derive(Parser, Clone, Debug)]
#[command(name = "s3populate", version, about, long_about = None)]
pub struct PopulateArgs {
    #[arg(env, help = "s3://<BUCKET_NAME>[/prefix]", value_parser = check_s3_target)]
    pub target: String,

    /// Approximate number of objects to generate before the fixed edge cases.
    #[arg(long, env, default_value_t = DEFAULT_NUM_FILES, help_heading = "Populate")]
    pub num_files: u32,

    /// Delete every object under the target before uploading.
    #[arg(long, env, help_heading = "Populate")]
    pub clean_first: bool,

    /// Only print the bucket summary.
    #[arg(long, env, conflicts_with = "clean_first", help_heading = "Populate")]
    pub list_only: bool,

    /// Export the full listing to this CSV file.
    #[arg(long, env, help_heading = "Populate")]
    pub export_report: Option<PathBuf>,

    /// Number of uploads and delete batches in flight at once.
    #[arg(long, env, default_value_t = DEFAULT_CONCURRENCY, help_heading = "Populate")]
    pub concurrency: u16,

    /// Max keys per listing request.
    #[arg(long, env, default_value_t = DEFAULT_MAX_KEYS, help_heading = "Advanced")]
    pub max_keys: i32,

    #[command(flatten)]
    pub common: CommonArgs,
}

pub fn parse_populate_args<I, T>(args: I) -> Result<PopulateArgs, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    PopulateArgs::try_parse_from(args)
}

impl PopulateArgs {
    fn validate(&self) -> Result<(), String> {
        if self.concurrency == 0 {
            return Err(ERROR_MESSAGE_CONCURRENCY_ZERO.to_string());
        }
        if !(1..=1000).contains(&self.max_keys) {
            return Err(ERROR_MESSAGE_MAX_KEYS_OUT_OF_RANGE.to_string());
        }
        self.common.validate()
    }
}

impl TryFrom<PopulateArgs> for PopulateConfig {
    type Error = String;

    fn try_from(args: PopulateArgs) -> Result<Self, Self::Error> {
        args.validate()?;

        Ok(PopulateConfig {
            target: parse_target(&args.target)?,
            target_client_config: Some(args.common.build_client_config()),
            tracing_config: args.common.build_tracing_config(),
            num_files: args.num_files,
            clean_first: args.clean_first,
            list_only: args.list_only,
            export_report: args.export_report,
            concurrency: args.concurrency,
            max_keys: args.max_keys,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_defaults() {
        let args = parse_populate_args(["s3populate", "s3://test-bucket"]).unwrap();
        let config = PopulateConfig::try_from(args).unwrap();

        assert_eq!(config.target.bucket(), "test-bucket");
        assert_eq!(config.target.prefix(), "");
        assert_eq!(config.num_files, 50);
        assert!(!config.clean_first);
        assert!(!config.list_only);
        assert!(config.export_report.is_none());
    }

    #[test]
    fn parse_all_options() {
        let args = parse_populate_args([
            "s3populate",
            "s3://test-bucket/sandbox/",
            "--num-files",
            "100",
            "--clean-first",
            "--export-report",
            "listing.csv",
            "--endpoint-url",
            "http://localhost:9000",
            "--force-path-style",
        ])
        .unwrap();
        let config = PopulateConfig::try_from(args).unwrap();

        assert_eq!(config.target.prefix(), "sandbox/");
        assert_eq!(config.num_files, 100);
        assert!(config.clean_first);
        assert_eq!(config.export_report, Some(PathBuf::from("listing.csv")));
        let client_config = config.target_client_config.unwrap();
        assert_eq!(
            client_config.endpoint_url.as_deref(),
            Some("http://localhost:9000")
        );
        assert!(client_config.force_path_style);
    }

    #[test]
    fn list_only_conflicts_with_clean_first() {
        assert!(
            parse_populate_args(["s3populate", "s3://b", "--list-only", "--clean-first"]).is_err()
        );
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let args = parse_populate_args(["s3populate", "s3://b", "--concurrency", "0"]).unwrap();

        assert_eq!(
            PopulateConfig::try_from(args).unwrap_err(),
            ERROR_MESSAGE_CONCURRENCY_ZERO
        );
    }
}
