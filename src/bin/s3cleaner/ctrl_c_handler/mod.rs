// Ctrl+C turns into a cancellation of the cleanup run.
//
// The pipeline stops looking at the token once deletion starts, so a
// signal received after that point lets the running batches finish.

use s3cleaner_rs::PipelineCancellationToken;
use tokio::task::JoinHandle;
use tokio::{select, signal};
use tracing::{debug, warn};

pub fn spawn_ctrl_c_handler(cancellation_token: PipelineCancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        select! {
            _ = cancellation_token.cancelled() => {
                debug!("cleanup finished or cancelled, ctrl-c handler exits.")
            }
            signal = signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!(error = %e, "cannot listen for ctrl-c.");
                    return;
                }
                warn!("ctrl-c received, cancelling the cleanup run.");
                cancellation_token.cancel();
            }
        }
    })
}
