// Tracing subscriber shared by the s3cleaner and s3populate binaries.

use std::env;
use std::io::IsTerminal;

use tracing_subscriber::fmt::format::FmtSpan;

use s3cleaner_rs::config::TracingConfig;

const EVENT_FILTER_ENV_VAR: &str = "RUST_LOG";

const CRATE_TARGETS: [&str; 3] = ["s3cleaner_rs", "s3cleaner", "s3populate"];
const AWS_SDK_TARGETS: [&str; 3] = ["aws_smithy_runtime", "aws_config", "aws_sigv4"];

pub fn init_tracing(config: &TracingConfig) {
    let fmt_span = if config.span_events_tracing {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let (event_filter, show_target) =
        select_event_filter(config, env::var(EVENT_FILTER_ENV_VAR).ok());

    let subscriber_builder = tracing_subscriber::fmt()
        .with_writer(std::io::stdout)
        .compact()
        .with_ansi(!config.disable_color_tracing && std::io::stdout().is_terminal())
        .with_span_events(fmt_span)
        .with_env_filter(event_filter)
        .with_target(show_target);

    if config.json_tracing {
        subscriber_builder.json().init();
    } else {
        subscriber_builder.init();
    }
}

/// Returns the env-filter directive and whether event targets are shown.
///
/// `--aws-sdk-tracing` wins over `RUST_LOG`. Targets are hidden only when
/// the output is restricted to this crate's own binaries.
fn select_event_filter(config: &TracingConfig, env_filter: Option<String>) -> (String, bool) {
    let level = config.tracing_level;

    if config.aws_sdk_tracing {
        let directives = CRATE_TARGETS
            .iter()
            .chain(AWS_SDK_TARGETS.iter())
            .map(|target| format!("{target}={level}"))
            .collect::<Vec<_>>();
        return (directives.join(","), true);
    }

    if let Some(env_filter) = env_filter {
        return (env_filter, true);
    }

    let directives = CRATE_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>();
    (directives.join(","), false)
}
