// CLEANUP SUMMARY block printed to stdout after a run.

use s3cleaner_rs::config::Config;
use s3cleaner_rs::report::format_size_human;
use s3cleaner_rs::types::CleanupSummary;

const RULE: &str = "==================================================";

/// Whether to print the summary block.
///
/// JSON logging also goes to stdout, so the plain-text block is left out.
pub fn is_show_summary_needed(config: &Config) -> bool {
    config
        .tracing_config
        .as_ref()
        .is_none_or(|tracing_config| !tracing_config.json_tracing)
}

pub fn format_summary(summary: &CleanupSummary) -> String {
    let mut lines = vec![
        RULE.to_string(),
        "CLEANUP SUMMARY".to_string(),
        RULE.to_string(),
        format!("Total objects listed: {}", summary.total_objects),
        format!("Objects matching filters: {}", summary.matched_count),
        format!(
            "Total size of matched objects: {} ({} bytes)",
            format_size_human(summary.total_size_bytes),
            summary.total_size_bytes
        ),
    ];

    if summary.capped {
        lines.push(format!(
            "Objects planned (capped by --max-deletions): {} ({})",
            summary.planned_count,
            format_size_human(summary.planned_size_bytes)
        ));
    }
    if summary.report_written {
        lines.push("Report: written".to_string());
    }

    if summary.dry_run {
        if !summary.preview.is_empty() {
            lines.push(format!("First {} objects to delete:", summary.preview.len()));
            for record in &summary.preview {
                lines.push(format!(
                    "  {} ({}, {})",
                    record.key,
                    format_size_human(record.size),
                    record.last_modified.format("%Y-%m-%d %H:%M:%S")
                ));
            }
        }
        lines.push("MODE: DRY RUN (no objects deleted)".to_string());
        lines.push("Use --confirm to perform actual deletions".to_string());
    } else {
        lines.push("MODE: ACTUAL DELETION".to_string());
        lines.push(format!("Objects attempted: {}", summary.attempted_count));
        lines.push(format!("Objects deleted: {}", summary.succeeded_count));
        lines.push(format!("Failed deletions: {}", summary.failed_count));
    }

    lines.push(RULE.to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use s3cleaner_rs::types::ObjectRecord;

    #[test]
    fn dry_run_summary_lists_preview() {
        let summary = CleanupSummary {
            total_objects: 10,
            matched_count: 2,
            planned_count: 2,
            total_size_bytes: 2048,
            planned_size_bytes: 2048,
            dry_run: true,
            preview: vec![ObjectRecord::new(
                "temp/a.tmp",
                Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
                1024,
            )],
            ..Default::default()
        };

        let text = format_summary(&summary);

        assert!(text.contains("CLEANUP SUMMARY"));
        assert!(text.contains("Total objects listed: 10"));
        assert!(text.contains("Objects matching filters: 2"));
        assert!(text.contains("2.0 KiB (2048 bytes)"));
        assert!(text.contains("temp/a.tmp (1.0 KiB, 2024-03-01 12:00:00)"));
        assert!(text.contains("MODE: DRY RUN"));
        assert!(!text.contains("Objects deleted"));
    }

    #[test]
    fn deletion_summary_shows_counts() {
        let summary = CleanupSummary {
            matched_count: 1500,
            planned_count: 1000,
            attempted_count: 1000,
            succeeded_count: 998,
            failed_count: 2,
            capped: true,
            dry_run: false,
            ..Default::default()
        };

        let text = format_summary(&summary);

        assert!(text.contains("capped by --max-deletions): 1000"));
        assert!(text.contains("MODE: ACTUAL DELETION"));
        assert!(text.contains("Objects deleted: 998"));
        assert!(text.contains("Failed deletions: 2"));
    }

    #[test]
    fn summary_hidden_with_json_tracing() {
        let mut config = Config::for_target("b", "");
        assert!(is_show_summary_needed(&config));

        config.tracing_config = Some(s3cleaner_rs::config::TracingConfig {
            tracing_level: log::Level::Info,
            json_tracing: true,
            aws_sdk_tracing: false,
            span_events_tracing: false,
            disable_color_tracing: false,
        });
        assert!(!is_show_summary_needed(&config));
    }
}
