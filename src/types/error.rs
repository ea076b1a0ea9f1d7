use anyhow::Error;
use thiserror::Error;

/// Application-level error types for s3cleaner-rs.
///
/// Library functions return `anyhow::Result`; these variants are attached
/// as the error or as context so that callers can classify a failure with
/// `downcast_ref`.
///
/// ## Exit Codes
///
/// - 0: Cancelled
/// - 1: Connectivity, ReportWrite and anything unclassified
/// - 2: InvalidFilter, InvalidConfig
/// - 3: PartialDeletionFailure
#[derive(Error, Debug, PartialEq)]
pub enum S3cleanerError {
    /// Listing, bucket probing or authentication against the store failed.
    #[error("Store connectivity error: {0}")]
    Connectivity(String),

    /// A time or size filter string could not be parsed.
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The CSV report could not be written. Never fatal to a run.
    #[error("Report write error: {0}")]
    ReportWrite(String),

    /// Some keys in the plan could not be deleted.
    #[error("Partial deletion failure: {succeeded} deleted, {failed} failed")]
    PartialDeletionFailure { succeeded: u64, failed: u64 },

    #[error("Operation cancelled by user")]
    Cancelled,
}

impl S3cleanerError {
    pub fn exit_code(&self) -> i32 {
        match self {
            S3cleanerError::Cancelled => 0,
            S3cleanerError::InvalidFilter(_) | S3cleanerError::InvalidConfig(_) => 2,
            S3cleanerError::PartialDeletionFailure { .. } => 3,
            _ => 1,
        }
    }
}

/// Check if an anyhow::Error wraps a cancellation error.
pub fn is_cancelled_error(e: &Error) -> bool {
    if let Some(err) = e.downcast_ref::<S3cleanerError>() {
        return *err == S3cleanerError::Cancelled;
    }
    false
}

/// Check if an anyhow::Error wraps a connectivity error.
pub fn is_connectivity_error(e: &Error) -> bool {
    matches!(
        e.downcast_ref::<S3cleanerError>(),
        Some(S3cleanerError::Connectivity(_))
    )
}

/// Extract the exit code from an anyhow::Error, defaulting to 1.
pub fn exit_code_from_error(e: &Error) -> i32 {
    if let Some(err) = e.downcast_ref::<S3cleanerError>() {
        return err.exit_code();
    }
    1
}
