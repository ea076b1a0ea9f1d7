/// Token that aborts a cleanup run before any object is deleted.
///
/// The listing stages stop when it fires, and
/// [`CleanupPipeline`](crate::CleanupPipeline) checks it once the deletion
/// plan is built. Once deletion has begun the token is ignored.
pub type PipelineCancellationToken = tokio_util::sync::CancellationToken;

/// Create a new [`PipelineCancellationToken`].
///
/// # Example
///
/// ```
/// use s3cleaner_rs::create_pipeline_cancellation_token;
///
/// let token = create_pipeline_cancellation_token();
/// assert!(!token.is_cancelled());
///
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
pub fn create_pipeline_cancellation_token() -> PipelineCancellationToken {
    tokio_util::sync::CancellationToken::new()
}
