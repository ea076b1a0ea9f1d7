use anyhow::Result;
use clap::Parser;
use tracing::{error, trace};

use s3cleaner_rs::config::PopulateConfig;
use s3cleaner_rs::populate::{PopulateOutcome, Populator, example_commands};
use s3cleaner_rs::{PopulateArgs, create_pipeline_cancellation_token, exit_code_from_error};

#[path = "../s3cleaner/tracing_init.rs"]
mod tracing_init;

/// s3populate - Create a test data set for s3cleaner.
///
/// This binary is a thin wrapper over `s3cleaner_rs::populate`.
#[tokio::main]
async fn main() -> Result<()> {
    let config = match PopulateConfig::try_from(PopulateArgs::parse()) {
        Ok(config) => config,
        Err(error_message) => {
            clap::Error::raw(clap::error::ErrorKind::ValueValidation, error_message).exit()
        }
    };

    if let Some(tracing_config) = config.tracing_config.as_ref() {
        tracing_init::init_tracing(tracing_config);
    }

    trace!("config = {:?}", config);

    let bucket = config.target.bucket().to_string();
    let list_only = config.list_only;
    let populator = Populator::new(config, create_pipeline_cancellation_token()).await;

    match populator.run().await {
        Ok(outcome) => {
            println!("{}", format_outcome(&outcome, &bucket, list_only));
            Ok(())
        }
        Err(e) => {
            error!("s3populate failed: {:#}", e);
            std::process::exit(exit_code_from_error(&e));
        }
    }
}

fn format_outcome(outcome: &PopulateOutcome, bucket: &str, list_only: bool) -> String {
    let mut lines = Vec::new();

    if outcome.bucket_created {
        lines.push(format!("Created bucket: {bucket}"));
    }
    if let Some(cleaned) = outcome.cleaned.as_ref() {
        lines.push(format!(
            "Cleaned bucket: {} objects deleted, {} failed",
            cleaned.succeeded_count, cleaned.failed_count
        ));
    }
    if let Some(uploaded) = outcome.uploaded.as_ref() {
        lines.push(format!(
            "Population complete: {} objects uploaded, {} failed",
            uploaded.uploaded_count, uploaded.failed_count
        ));
    }

    lines.push(outcome.summary.to_string());

    if outcome.report_written {
        lines.push("Report exported.".to_string());
    }

    if !list_only {
        lines.push("Example s3cleaner commands:".to_string());
        lines.extend(
            example_commands(bucket)
                .into_iter()
                .map(|command| format!("  {command}")),
        );
    }

    lines.join("\n")
}
