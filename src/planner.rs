//! Turns the filtered listing into a bounded deletion plan.

use async_channel::Receiver;
use tracing::{info, warn};

use crate::types::ObjectRecord;

/// Objects selected for deletion, in listing order.
///
/// `matched_count` and `total_size_bytes` describe every matching object,
/// before the `max_deletions` cap was applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeletionPlan {
    pub records: Vec<ObjectRecord>,
    pub matched_count: u64,
    pub total_size_bytes: u64,
}

impl DeletionPlan {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.records.iter().map(|record| record.key.clone()).collect()
    }

    pub fn planned_size_bytes(&self) -> u64 {
        self.records.iter().map(|record| record.size).sum()
    }

    /// True when the cap removed matching objects from the plan.
    pub fn is_truncated(&self) -> bool {
        (self.records.len() as u64) < self.matched_count
    }
}

/// Materialize `filtered` and cap it at `max_deletions`.
///
/// The first `max_deletions` records are kept in the order they arrive;
/// no sort is applied.
pub fn plan<I>(filtered: I, max_deletions: Option<u64>) -> DeletionPlan
where
    I: IntoIterator<Item = ObjectRecord>,
{
    let mut deletion_plan = DeletionPlan::default();
    for record in filtered {
        deletion_plan.push(record, max_deletions);
    }
    deletion_plan.log_cap(max_deletions);

    deletion_plan
}

/// Same as [`plan`], reading the filtered records from a pipeline channel
/// until it is closed.
pub async fn plan_from_receiver(
    receiver: Receiver<ObjectRecord>,
    max_deletions: Option<u64>,
) -> DeletionPlan {
    let mut deletion_plan = DeletionPlan::default();
    while let Ok(record) = receiver.recv().await {
        deletion_plan.push(record, max_deletions);
    }
    deletion_plan.log_cap(max_deletions);

    deletion_plan
}

impl DeletionPlan {
    fn push(&mut self, record: ObjectRecord, max_deletions: Option<u64>) {
        self.matched_count += 1;
        self.total_size_bytes += record.size;
        if max_deletions.is_none_or(|max| (self.records.len() as u64) < max) {
            self.records.push(record);
        }
    }

    fn log_cap(&self, max_deletions: Option<u64>) {
        if self.is_truncated() {
            warn!(
                matched_count = self.matched_count,
                max_deletions = max_deletions,
                planned_count = self.records.len(),
                "deletion plan capped by --max-deletions."
            );
        } else {
            info!(
                matched_count = self.matched_count,
                total_size_bytes = self.total_size_bytes,
                "deletion plan has been built."
            );
        }
    }
}
