//! The pipeline's single filter stage.
//!
//! Applies a whole [`FilterSpec`] to every listed object and counts how
//! many objects went through it, so that the summary can report the size
//! of the listing alongside the number of matches.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use async_trait::async_trait;

use crate::filters::{FilterSpec, ObjectFilter, ObjectFilterBase};
use crate::stage::Stage;

const FILTER_NAME: &str = "CompoundFilter";

pub struct CompoundFilter<'a> {
    base: ObjectFilterBase<'a>,
    spec: FilterSpec,
    listed_counter: Arc<AtomicU64>,
}

impl CompoundFilter<'_> {
    pub fn new(base: Stage, spec: FilterSpec, listed_counter: Arc<AtomicU64>) -> Self {
        Self {
            base: ObjectFilterBase {
                base,
                name: FILTER_NAME,
            },
            spec,
            listed_counter,
        }
    }
}

#[async_trait]
impl ObjectFilter for CompoundFilter<'_> {
    async fn filter(&self) -> Result<()> {
        self.base
            .filter(|record| {
                self.listed_counter.fetch_add(1, Ordering::SeqCst);
                self.spec.matches(record)
            })
            .await
    }
}
