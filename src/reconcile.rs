//! Request-type state machine sequencing the remap, dashboard, alerting, and
//! document-deletion steps for one invocation.

use std::time::Duration;

use serde_json::Value;
use tracing::{error, info, warn};

use crate::alerting;
use crate::api::SearchApi;
use crate::config::{Config, DEFAULT_RETRY_BUDGET};
use crate::dashboard;
use crate::error::StepError;
use crate::es_index::{self, DEFAULT_POLL_FILTER};
use crate::execution::{ExecutionLog, Step, StepResult, StepStatus};
use crate::probe;
use crate::remap::RemapOperation;
use crate::request::{ReconciliationRequest, RequestType};

#[derive(Debug, Clone, Copy)]
pub struct ReconcileSettings {
    pub retry_budget: u32,
    pub backoff_unit: Duration,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            retry_budget: DEFAULT_RETRY_BUDGET,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl From<&Config> for ReconcileSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            retry_budget: cfg.remap_retry_budget,
            backoff_unit: cfg.backoff_unit(),
        }
    }
}

pub struct Reconciler<'a, A: SearchApi + ?Sized> {
    api: &'a A,
    settings: ReconcileSettings,
}

impl<'a, A: SearchApi + ?Sized> Reconciler<'a, A> {
    pub fn new(api: &'a A, settings: ReconcileSettings) -> Self {
        Self { api, settings }
    }

    pub async fn run(&self, req: &ReconciliationRequest) -> ExecutionLog {
        let mut log = ExecutionLog::new();
        match &req.request_type {
            RequestType::Create => self.apply(req, false, &mut log).await,
            RequestType::Update => self.apply(req, true, &mut log).await,
            RequestType::Delete => {
                info!("reconcile: delete requested, domain artifacts are left to the domain lifecycle");
                log.push(Step::Delete, true);
            }
            RequestType::Invalid(_) => {
                error!("reconcile: request type {} is not valid", req.request_type);
            }
        }
        info!("reconcile: overall execution {}", log);
        log
    }

    async fn apply(&self, req: &ReconciliationRequest, update: bool, log: &mut ExecutionLog) {
        if !req.mappings.is_empty() {
            self.remap(req, log).await;
        }

        if req.initialize_dashboard {
            dashboard::initialize(self.api, &req.index, update, log).await;
        }

        if let Some(alert) = req.sns_alert() {
            let res = alerting::ensure_destination(self.api, &alert, update).await;
            log.record(Step::Destination, res);
        }

        if let Some(range) = &req.document_delete_range {
            let res = self.delete_documents(&req.index, range).await;
            log.record(Step::DeleteDocuments, res);
        }

        if req.monitor_enabled() {
            let res = alerting::reconcile_monitor(
                self.api,
                &req.sns_alert_name,
                &req.monitor,
                &req.index,
                update,
            )
            .await;
            log.record(Step::Monitor, res);
        }
    }

    /// Populated indices go through a temporary copy so the original name can
    /// be recreated with the new mapping; empty ones are created directly.
    async fn remap(&self, req: &ReconciliationRequest, log: &mut ExecutionLog) {
        let index = req.index.as_str();
        if index.is_empty() {
            log.record(
                Step::Remap,
                Err(StepError::Precondition("mappings given without an index".into())),
            );
            return;
        }

        let count = match self.api.document_count(index, DEFAULT_POLL_FILTER).await {
            Ok(count) => count,
            Err(err) => {
                log.record(Step::Remap, Err(StepError::Lookup(format!("{err:#}"))));
                return;
            }
        };

        match count {
            Some(n) if n > 0 => {
                let temporary = es_index::temporary_index_name(index);
                info!("reconcile: {} holds {} documents, remapping via {}", index, n, temporary);
                let first = self.operation(index).to(&temporary).run(self.api).await;
                let moved = first.is_ok();
                log.record(Step::RemapToTemporary, first);
                if !moved {
                    return;
                }
                let second = self
                    .operation(&temporary)
                    .to(index)
                    .with_mappings(req.mappings.clone())
                    .run(self.api)
                    .await;
                log.record(Step::Remap, second);
            }
            _ => {
                let temporary = es_index::temporary_index_name(index);
                if let Some(stranded) = self.stranded_documents(&temporary).await {
                    info!(
                        "reconcile: {} holds {} documents from an interrupted remap, copying back into {}",
                        temporary, stranded, index
                    );
                    let res = self
                        .operation(&temporary)
                        .to(index)
                        .with_mappings(req.mappings.clone())
                        .run(self.api)
                        .await;
                    log.record(Step::Remap, res);
                    return;
                }
                let res = self
                    .operation(index)
                    .with_mappings(req.mappings.clone())
                    .run(self.api)
                    .await;
                log.record(Step::Remap, res);
            }
        }
    }

    /// Documents left in `temporary` when an earlier run dropped the original
    /// index but never copied them back.
    async fn stranded_documents(&self, temporary: &str) -> Option<u64> {
        if !probe::index_exists(self.api, temporary).await {
            return None;
        }
        match self.api.document_count(temporary, DEFAULT_POLL_FILTER).await {
            Ok(Some(n)) if n > 0 => Some(n),
            Ok(_) => None,
            Err(err) => {
                warn!("reconcile: count of {} failed: {err:#}", temporary);
                None
            }
        }
    }

    fn operation(&self, source: &str) -> RemapOperation {
        RemapOperation::new(source)
            .with_retry_budget(self.settings.retry_budget)
            .with_backoff_unit(self.settings.backoff_unit)
    }

    async fn delete_documents(&self, index: &str, range: &Value) -> StepResult {
        if index.is_empty() {
            return Err(StepError::Precondition(
                "document delete range given without an index".into(),
            ));
        }
        self.api.delete_documents(index, range).await?;
        Ok(StepStatus::Applied)
    }
}
