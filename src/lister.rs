use anyhow::{Result, anyhow};
use tracing::debug;

use crate::stage::Stage;

/// Lists the target prefix and feeds the records into the pipeline.
///
/// The lister is the entry point of the pipeline:
///
/// ```text
/// ObjectLister → CompoundFilter → planner
/// ```
///
/// It has no `receiver` channel and writes listed objects to
/// `stage.sender`. Pagination is handled by the storage implementation.
pub struct ObjectLister {
    stage: Stage,
}

impl ObjectLister {
    pub fn new(stage: Stage) -> Self {
        Self { stage }
    }

    /// List every object under the configured prefix.
    ///
    /// `max_keys` is the page size of each listing request, not a limit on
    /// the number of objects listed. Listing errors are returned unchanged
    /// and abort the run.
    pub async fn list_target(&self, max_keys: i32) -> Result<()> {
        debug!("list target objects has started.");

        let Some(sender) = self.stage.sender.as_ref() else {
            return Err(anyhow!("object lister has no sender."));
        };
        let prefix = self.stage.config.target.prefix();
        let prefix = if prefix.is_empty() { None } else { Some(prefix) };

        let result = self
            .stage
            .target
            .list_objects(sender, prefix, max_keys)
            .await;
        sender.close();
        result?;

        debug!("list target objects has been completed.");
        Ok(())
    }
}
