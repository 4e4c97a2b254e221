//! Zero-downtime index remap: create destination, copy, verify counts, drop source.
//!
//! The server-side copy runs asynchronously with no completion signal, so
//! convergence is inferred by polling the destination's document count with
//! a quadratic backoff. The source index is deleted only after the destination
//! count has been observed equal to the source's pre-copy count. A copy that
//! never converges leaves the source untouched and fails the step.

use std::time::Duration;

use serde_json::{Map, Value};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::api::SearchApi;
use crate::config::DEFAULT_RETRY_BUDGET;
use crate::error::StepError;
use crate::es_index::DEFAULT_POLL_FILTER;
use crate::execution::{StepResult, StepStatus};
use crate::probe;

#[derive(Debug, Clone)]
pub struct RemapOperation {
    pub source_index: String,
    pub destination_index: String,
    pub mappings: Map<String, Value>,
    pub retry_budget: u32,
    pub poll_filter: String,
    pub backoff_unit: Duration,
}

impl RemapOperation {
    /// Remap `source_index` in place; the destination defaults to the source.
    pub fn new(source_index: impl Into<String>) -> Self {
        let source_index = source_index.into();
        Self {
            destination_index: source_index.clone(),
            source_index,
            mappings: Map::new(),
            retry_budget: DEFAULT_RETRY_BUDGET,
            poll_filter: DEFAULT_POLL_FILTER.to_string(),
            backoff_unit: Duration::from_secs(1),
        }
    }

    pub fn to(mut self, destination_index: impl Into<String>) -> Self {
        self.destination_index = destination_index.into();
        self
    }

    pub fn with_mappings(mut self, mappings: Map<String, Value>) -> Self {
        self.mappings = mappings;
        self
    }

    pub fn with_retry_budget(mut self, retry_budget: u32) -> Self {
        self.retry_budget = retry_budget;
        self
    }

    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    pub async fn run<A: SearchApi + ?Sized>(&self, api: &A) -> StepResult {
        let old_count = api
            .document_count(&self.source_index, &self.poll_filter)
            .await
            .map_err(|err| StepError::Lookup(format!("{err:#}")))?;

        match old_count {
            Some(n) if n > 0 => self.copy_and_swap(api, n).await,
            _ => self.ensure_empty_target(api).await,
        }
    }

    /// Nothing to migrate: the original target just needs to exist with the mapping.
    async fn ensure_empty_target<A: SearchApi + ?Sized>(&self, api: &A) -> StepResult {
        if probe::index_exists(api, &self.source_index).await {
            if self.mappings.is_empty() {
                info!(
                    "remap: {} exists with no documents, leaving it in place",
                    self.source_index
                );
            } else {
                warn!(
                    "remap: {} exists with no documents, requested mapping not applied",
                    self.source_index
                );
            }
            return Ok(StepStatus::AlreadySatisfied);
        }
        api.create_index(&self.source_index, &self.mappings).await?;
        info!("remap: created {} directly, no documents to migrate", self.source_index);
        Ok(StepStatus::Applied)
    }

    async fn copy_and_swap<A: SearchApi + ?Sized>(&self, api: &A, old_count: u64) -> StepResult {
        if self.destination_index == self.source_index {
            return Err(StepError::InvalidRemap(format!(
                "cannot copy {} documents of {} onto itself",
                old_count, self.source_index
            )));
        }

        api.create_index(&self.destination_index, &self.mappings)
            .await?;
        api.reindex(&self.source_index, &self.destination_index)
            .await?;
        info!(
            "remap: copying {} documents {} -> {}",
            old_count, self.source_index, self.destination_index
        );

        let mut observed = None;
        for attempt in 1..=self.retry_budget {
            match api
                .document_count(&self.destination_index, &self.poll_filter)
                .await
            {
                Ok(count) => observed = count,
                Err(err) => warn!(
                    "remap: count of {} failed (attempt {}/{}): {err:#}",
                    self.destination_index, attempt, self.retry_budget
                ),
            }

            if counts_converged(old_count, observed) {
                api.delete_index(&self.source_index).await?;
                info!(
                    "remap: {} converged at {} documents after {} attempts, dropped {}",
                    self.destination_index, old_count, attempt, self.source_index
                );
                return Ok(StepStatus::Applied);
            }

            if attempt < self.retry_budget {
                sleep(backoff_delay(attempt, self.backoff_unit)).await;
            }
        }

        warn!(
            "remap: {} not converged, keeping {} (expected={} observed={:?})",
            self.destination_index, self.source_index, old_count, observed
        );
        Err(StepError::NotConverged {
            source_index: self.source_index.clone(),
            dest_index: self.destination_index.clone(),
            attempts: self.retry_budget,
            expected: old_count,
            observed,
        })
    }
}

/// Wait after failed poll attempt `attempt` (1-indexed): `attempt²` units.
pub fn backoff_delay(attempt: u32, unit: Duration) -> Duration {
    unit.saturating_mul(attempt.saturating_mul(attempt))
}

/// Both counts defined, non-zero, and equal.
pub fn counts_converged(old_count: u64, update_count: Option<u64>) -> bool {
    old_count > 0 && update_count == Some(old_count)
}
