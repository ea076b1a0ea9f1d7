//! Cleanup pipeline orchestrator.
//!
//! Connects the stages of one cleanup run:
//!
//! ```text
//! ObjectLister → CompoundFilter → planner → [report] → BatchDeleter
//! ```
//!
//! Listing and filtering stream through bounded channels. The planner is
//! the one eager point: the whole filtered set is collected so that the
//! `max_deletions` cap is exact before any deletion starts.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_channel::Receiver;
use chrono::SecondsFormat;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::deleter::BatchDeleter;
use crate::filters::{CompoundFilter, FilterSpec, ObjectFilter};
use crate::lister::ObjectLister;
use crate::planner::{self, DeletionPlan};
use crate::report::ReportExporter;
use crate::stage::Stage;
use crate::storage::{self, Storage};
use crate::types::error::S3cleanerError;
use crate::types::token::PipelineCancellationToken;
use crate::types::{CleanupSummary, ObjectRecord};

/// One cleanup run over a bucket prefix.
///
/// ## Usage
///
/// ```no_run
/// # async fn example() {
/// use s3cleaner_rs::{CleanupPipeline, Config, create_pipeline_cancellation_token};
///
/// let mut config = Config::for_target("my-bucket", "temp/");
/// config.filter_config.older_than = Some("7d".to_string());
///
/// let pipeline = CleanupPipeline::new(config, create_pipeline_cancellation_token()).await;
/// let summary = pipeline.run().await.unwrap();
/// println!("{} objects would be deleted", summary.planned_count);
/// # }
/// ```
pub struct CleanupPipeline {
    config: Config,
    target: Storage,
    cancellation_token: PipelineCancellationToken,
    has_error: Arc<AtomicBool>,
    has_panic: Arc<AtomicBool>,
    errors: Arc<Mutex<VecDeque<anyhow::Error>>>,
    listed_counter: Arc<AtomicU64>,
}

impl CleanupPipeline {
    /// Create the pipeline and its S3 storage from `config`.
    pub async fn new(config: Config, cancellation_token: PipelineCancellationToken) -> Self {
        let target = storage::create_storage(
            config.target.clone(),
            config.target_client_config.clone(),
            cancellation_token.clone(),
        )
        .await;

        Self::with_storage(config, target, cancellation_token)
    }

    /// Create the pipeline over an existing storage.
    pub fn with_storage(
        config: Config,
        target: Storage,
        cancellation_token: PipelineCancellationToken,
    ) -> Self {
        Self {
            config,
            target,
            cancellation_token,
            has_error: Arc::new(AtomicBool::new(false)),
            has_panic: Arc::new(AtomicBool::new(false)),
            errors: Arc::new(Mutex::new(VecDeque::new())),
            listed_counter: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn has_panic(&self) -> bool {
        self.has_panic.load(Ordering::SeqCst)
    }

    /// Run the cleanup.
    ///
    /// Filter strings are parsed before the store is contacted. Listing
    /// failures abort the run. Deletion failures are counted in the
    /// returned summary and never abort it. A report that cannot be
    /// written is logged and the run continues.
    pub async fn run(&self) -> Result<CleanupSummary> {
        let spec = FilterSpec::from_config(&self.config.filter_config)?;

        info!(
            storage_path = %self.config.target,
            dry_run = self.config.dry_run,
            max_deletions = self.config.max_deletions,
            "cleanup has started."
        );

        let (listed, lister_handle) = self.list_target();
        let (filtered, filter_handle) = self.filter_objects(listed, spec);
        let plan = planner::plan_from_receiver(filtered, self.config.max_deletions).await;
        for join_handle in [lister_handle, filter_handle] {
            if let Err(e) = join_handle.await {
                error!("pipeline stage supervisor failed: {}", e);
            }
        }

        if let Some(e) = self.take_first_error() {
            return Err(e);
        }
        if self.cancellation_token.is_cancelled() {
            return Err(anyhow!(S3cleanerError::Cancelled));
        }

        let mut summary = CleanupSummary {
            total_objects: self.listed_counter.load(Ordering::SeqCst),
            matched_count: plan.matched_count,
            planned_count: plan.len() as u64,
            total_size_bytes: plan.total_size_bytes,
            planned_size_bytes: plan.planned_size_bytes(),
            dry_run: self.config.dry_run,
            capped: plan.is_truncated(),
            ..Default::default()
        };

        summary.report_written = self.write_report(&plan);

        if plan.is_empty() {
            info!(
                total_objects = summary.total_objects,
                "no objects matched the filters."
            );
            return Ok(summary);
        }

        if self.config.dry_run {
            summary.preview = self.preview(&plan);
            return Ok(summary);
        }

        let result = BatchDeleter::new(self.target.clone(), self.config.batch_size)
            .execute(&plan, self.config.concurrency)
            .await;

        summary.attempted_count = result.attempted_count;
        summary.succeeded_count = result.succeeded_count;
        summary.failed_count = result.failed_count;
        if let Some(partial_failure) = result.partial_failure() {
            warn!(
                succeeded_count = result.succeeded_count,
                failed_count = result.failed_count,
                "{}",
                partial_failure
            );
        }

        info!(
            matched_count = summary.matched_count,
            succeeded_count = summary.succeeded_count,
            failed_count = summary.failed_count,
            "cleanup has been completed."
        );

        Ok(summary)
    }

    fn write_report(&self, plan: &DeletionPlan) -> bool {
        let Some(report_path) = self.config.report_path.as_ref() else {
            return false;
        };

        match ReportExporter::new(self.config.report_fields.clone())
            .export(&plan.records, report_path)
        {
            Ok(_) => true,
            Err(e) => {
                warn!(
                    path = %report_path.display(),
                    error = format!("{e:#}"),
                    "report could not be written. continuing."
                );
                false
            }
        }
    }

    fn preview(&self, plan: &DeletionPlan) -> Vec<ObjectRecord> {
        let preview: Vec<ObjectRecord> = plan
            .records
            .iter()
            .take(self.config.preview_count)
            .cloned()
            .collect();

        for record in &preview {
            info!(
                key = record.key,
                size = record.size,
                last_modified = record
                    .last_modified
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
                "[dry-run] would delete."
            );
        }
        if plan.len() > preview.len() {
            info!(
                remaining = plan.len() - preview.len(),
                "[dry-run] more objects would be deleted."
            );
        }

        preview
    }

    fn take_first_error(&self) -> Option<anyhow::Error> {
        if !self.has_error.load(Ordering::SeqCst) {
            return None;
        }
        self.errors.lock().unwrap().pop_front()
    }

    fn create_stage(
        &self,
        receiver: Option<Receiver<ObjectRecord>>,
    ) -> (Stage, Receiver<ObjectRecord>) {
        let (sender, next_receiver) =
            async_channel::bounded(self.config.object_listing_queue_size as usize);

        let stage = Stage::new(
            self.config.clone(),
            dyn_clone::clone_box(&*self.target),
            receiver,
            Some(sender),
            self.cancellation_token.clone(),
        );

        (stage, next_receiver)
    }

    fn list_target(&self) -> (Receiver<ObjectRecord>, JoinHandle<()>) {
        let (stage, receiver) = self.create_stage(None);

        let max_keys = self.config.max_keys;
        let has_error = self.has_error.clone();
        let has_panic = self.has_panic.clone();
        let error_list = self.errors.clone();
        let cancellation_token = self.cancellation_token.clone();

        let join_handle = tokio::spawn(async move {
            let lister = ObjectLister::new(stage);
            let join_result = tokio::spawn(async move { lister.list_target(max_keys).await }).await;

            match join_result {
                Ok(Ok(())) => {
                    debug!("object lister completed successfully.");
                }
                Ok(Err(e)) => {
                    cancellation_token.cancel();
                    has_error.store(true, Ordering::SeqCst);
                    error!("object lister failed: {:#}", e);
                    error_list.lock().unwrap().push_back(e);
                }
                Err(e) => {
                    cancellation_token.cancel();
                    has_error.store(true, Ordering::SeqCst);
                    has_panic.store(true, Ordering::SeqCst);
                    error!("object lister task panicked: {}", e);
                    error_list
                        .lock()
                        .unwrap()
                        .push_back(anyhow!("object lister task panicked: {}", e));
                }
            }
        });

        (receiver, join_handle)
    }

    fn filter_objects(
        &self,
        listed: Receiver<ObjectRecord>,
        spec: FilterSpec,
    ) -> (Receiver<ObjectRecord>, JoinHandle<()>) {
        let (stage, receiver) = self.create_stage(Some(listed));
        let filter = CompoundFilter::new(stage, spec, self.listed_counter.clone());

        let has_error = self.has_error.clone();
        let has_panic = self.has_panic.clone();
        let error_list = self.errors.clone();
        let cancellation_token = self.cancellation_token.clone();

        let join_handle = tokio::spawn(async move {
            let join_result = tokio::spawn(async move { filter.filter().await }).await;

            match join_result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    cancellation_token.cancel();
                    has_error.store(true, Ordering::SeqCst);
                    error!("filter stage failed: {:#}", e);
                    error_list.lock().unwrap().push_back(e);
                }
                Err(e) => {
                    cancellation_token.cancel();
                    has_error.store(true, Ordering::SeqCst);
                    has_panic.store(true, Ordering::SeqCst);
                    error!("filter task panicked: {}", e);
                    error_list
                        .lock()
                        .unwrap()
                        .push_back(anyhow!("filter task panicked: {}", e));
                }
            }
        });

        (receiver, join_handle)
    }
}
