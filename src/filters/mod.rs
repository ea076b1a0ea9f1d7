//! Object selection.
//!
//! A [`FilterSpec`] is built once per run from the raw [`FilterConfig`]
//! strings. [`FilterSpec::matches`] applies the criteria in a fixed order
//! and stops at the first one that rejects:
//!
//! 1. modified before `min_date`
//! 2. modified after `max_date`
//! 3. smaller than `min_size_bytes`
//! 4. larger than `max_size_bytes`
//! 5. key contains an exclude substring
//! 6. key contains none of the include substrings
//! 7. key lacks the required suffix
//! 8. key lacks the required prefix
//!
//! All criteria are conjunctive, so the order only decides which one is
//! logged as the reason, never the resulting set.
//!
//! [`filter`] applies a spec lazily to any iterator of records. Inside the
//! pipeline the same predicate runs as a channel stage ([`CompoundFilter`]).

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::FilterConfig;
use crate::stage::{SendResult, Stage};
use crate::types::ObjectRecord;

pub mod affix;
pub mod compound;
pub mod mtime;
pub mod pattern;
pub mod size;

pub use compound::CompoundFilter;
pub use mtime::{parse_time_filter, parse_time_filter_at};
pub use size::parse_size_filter;

/// Selection criteria. Unset fields do not restrict the selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    pub min_date: Option<DateTime<Utc>>,
    pub max_date: Option<DateTime<Utc>>,
    pub min_size_bytes: Option<u64>,
    pub max_size_bytes: Option<u64>,
    pub exclude_substrings: Vec<String>,
    pub include_substrings: Vec<String>,
    pub required_suffix: Option<String>,
    pub required_prefix: Option<String>,
}

impl FilterSpec {
    /// Build a spec from raw strings, measuring relative ages from now.
    pub fn from_config(config: &FilterConfig) -> Result<Self> {
        Self::from_config_at(Utc::now(), config)
    }

    pub fn from_config_at(now: DateTime<Utc>, config: &FilterConfig) -> Result<Self> {
        let (min_date, max_date) =
            parse_time_filter_at(now, config.older_than.as_deref(), config.since.as_deref())?;
        let (min_size_bytes, max_size_bytes) =
            parse_size_filter(config.min_size.as_deref(), config.max_size.as_deref())?;

        Ok(Self {
            min_date,
            max_date,
            min_size_bytes,
            max_size_bytes,
            exclude_substrings: config.exclude.clone(),
            include_substrings: config.include.clone(),
            required_suffix: config.suffix.clone(),
            required_prefix: config.key_prefix.clone(),
        })
    }

    pub fn matches(&self, record: &ObjectRecord) -> bool {
        mtime::is_modified_on_or_after(record, self)
            && mtime::is_modified_on_or_before(record, self)
            && size::is_larger_or_equal(record, self)
            && size::is_smaller_or_equal(record, self)
            && pattern::is_not_excluded(record, self)
            && pattern::is_included(record, self)
            && affix::has_required_suffix(record, self)
            && affix::has_required_prefix(record, self)
    }
}

/// Lazily keep the records matching `spec`, preserving input order.
pub fn filter<'a, I>(records: I, spec: &'a FilterSpec) -> impl Iterator<Item = ObjectRecord> + 'a
where
    I: IntoIterator<Item = ObjectRecord>,
    I::IntoIter: 'a,
{
    records.into_iter().filter(move |record| spec.matches(record))
}

/// A pipeline stage that forwards only selected objects.
#[async_trait]
pub trait ObjectFilter {
    async fn filter(&self) -> Result<()>;
}

/// Receive-and-filter loop shared by filter stages.
pub struct ObjectFilterBase<'a> {
    name: &'a str,
    base: Stage,
}

impl ObjectFilterBase<'_> {
    /// Objects for which `filter_fn` returns `true` are sent to the next stage.
    pub async fn filter<F>(&self, filter_fn: F) -> Result<()>
    where
        F: Fn(&ObjectRecord) -> bool,
    {
        let Some(receiver) = self.base.receiver.as_ref() else {
            return Err(anyhow!("filter stage {} has no receiver.", self.name));
        };

        loop {
            tokio::task::yield_now().await;
            if self.base.cancellation_token.is_cancelled() {
                debug!(name = self.name, "filter has been cancelled.");
                return Ok(());
            }

            match receiver.recv().await {
                Ok(object) => {
                    if !filter_fn(&object) {
                        continue;
                    }

                    if self.base.send(object).await? == SendResult::Closed {
                        return Ok(());
                    }
                }
                Err(_) => {
                    debug!(name = self.name, "filter has been completed.");
                    return Ok(());
                }
            }
        }
    }
}
