use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use tracing::{debug, error, trace};

use s3cleaner_rs::config::Config;
use s3cleaner_rs::{
    CLIArgs, CleanupPipeline, create_pipeline_cancellation_token, exit_code_from_error,
    is_cancelled_error,
};

mod ctrl_c_handler;
mod summary;
mod tracing_init;

const EXIT_CODE_WARNING: i32 = 3;

/// s3cleaner - Filter-driven bulk deletion for S3-compatible object stores.
///
/// This binary is a thin wrapper over the s3cleaner-rs library.
#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config_exit_if_err();

    if let Some(shell) = config.auto_complete_shell {
        generate(
            shell,
            &mut CLIArgs::command(),
            "s3cleaner",
            &mut std::io::stdout(),
        );

        return Ok(());
    }

    start_tracing_if_necessary(&config);

    trace!("config = {:?}", config);

    let exit_code = run(config).await;
    if exit_code != 0 {
        std::process::exit(exit_code);
    }

    Ok(())
}

fn load_config_exit_if_err() -> Config {
    match Config::try_from(CLIArgs::parse()) {
        Ok(config) => config,
        Err(error_message) => {
            clap::Error::raw(clap::error::ErrorKind::ValueValidation, error_message).exit()
        }
    }
}

fn start_tracing_if_necessary(config: &Config) -> bool {
    let Some(tracing_config) = config.tracing_config.as_ref() else {
        return false;
    };

    tracing_init::init_tracing(tracing_config);
    true
}

/// Run the cleanup and return the process exit code.
async fn run(config: Config) -> i32 {
    let cancellation_token = create_pipeline_cancellation_token();
    ctrl_c_handler::spawn_ctrl_c_handler(cancellation_token.clone());

    let start_time = tokio::time::Instant::now();
    debug!("cleanup pipeline start.");

    let pipeline = CleanupPipeline::new(config.clone(), cancellation_token).await;
    let result = pipeline.run().await;

    let duration_sec = format!("{:.3}", start_time.elapsed().as_secs_f32());

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            if is_cancelled_error(&e) {
                println!("Operation cancelled by user");
                debug!(duration_sec = duration_sec, "cleanup cancelled by user.");
                return 0;
            }

            error!(duration_sec = duration_sec, "s3cleaner failed: {:#}", e);
            return exit_code_from_error(&e);
        }
    };

    if summary::is_show_summary_needed(&config) {
        println!("{}", summary::format_summary(&summary));
    }

    debug!(duration_sec = duration_sec, "s3cleaner has been completed.");

    exit_code_for(&config, summary.has_failure())
}

fn exit_code_for(config: &Config, has_failure: bool) -> i32 {
    if has_failure && config.warn_as_error {
        EXIT_CODE_WARNING
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusty_fork::rusty_fork_test;
    use s3cleaner_rs::config::args::parse_from_args;

    rusty_fork_test! {
        #[test]
        fn with_tracing() {
            let args = vec![
                "s3cleaner",
                "-v",
                "s3://test-bucket/prefix/",
                "--older-than",
                "7d",
            ];

            let config = Config::try_from(parse_from_args(args).unwrap()).unwrap();
            assert!(start_tracing_if_necessary(&config));
        }

        #[test]
        fn without_tracing() {
            let args = vec![
                "s3cleaner",
                "-qqq",
                "s3://test-bucket/prefix/",
                "--older-than",
                "7d",
            ];

            let config = Config::try_from(parse_from_args(args).unwrap()).unwrap();
            assert!(!start_tracing_if_necessary(&config));
        }
    }

    #[test]
    fn partial_failure_exits_zero_unless_warn_as_error() {
        let mut config = Config::for_target("test-bucket", "");
        assert_eq!(exit_code_for(&config, false), 0);
        assert_eq!(exit_code_for(&config, true), 0);

        config.warn_as_error = true;
        assert_eq!(exit_code_for(&config, false), 0);
        assert_eq!(exit_code_for(&config, true), 3);
    }
}
