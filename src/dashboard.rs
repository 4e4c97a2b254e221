//! Index pattern and dashboard initialization.

use tracing::info;

use crate::api::SearchApi;
use crate::error::StepError;
use crate::es_index;
use crate::execution::{ExecutionLog, Step, StepResult, StepStatus};
use crate::probe;

/// Ensure the index pattern for `index`, then a dashboard titled `index`.
///
/// The dashboard is only created once both the index and its pattern exist.
/// Existing resources are skipped on create and overwritten on update.
pub async fn initialize<A: SearchApi + ?Sized>(
    api: &A,
    index: &str,
    update: bool,
    log: &mut ExecutionLog,
) {
    let pattern_id = es_index::index_pattern_id_for(index);
    let (pattern_result, current) = ensure_index_pattern(api, &pattern_id, index, update).await;
    log.record(Step::IndexPattern, pattern_result);

    let dashboard_result = ensure_dashboard(api, index, current.as_deref(), update).await;
    log.record(Step::Dashboard, dashboard_result);
}

async fn ensure_index_pattern<A: SearchApi + ?Sized>(
    api: &A,
    pattern_id: &str,
    title: &str,
    update: bool,
) -> (StepResult, Option<String>) {
    if pattern_id.is_empty() {
        let err = StepError::Precondition(format!("no index pattern id derivable from {title:?}"));
        return (Err(err), None);
    }

    let current = probe::index_pattern_id(api, pattern_id, title).await;
    if current.as_deref() == Some(pattern_id) {
        if !update {
            info!("dashboard: index pattern {} already exists", pattern_id);
            return (Ok(StepStatus::AlreadySatisfied), current);
        }
        return match api.set_index_pattern(pattern_id, title, true).await {
            Ok(()) => {
                info!("dashboard: overwrote index pattern {}", pattern_id);
                (Ok(StepStatus::Applied), current)
            }
            Err(err) => (Err(err.into()), current),
        };
    }

    if let Err(err) = api.set_index_pattern(pattern_id, title, false).await {
        return (Err(err.into()), current);
    }
    info!("dashboard: created index pattern {} for {}", pattern_id, title);
    let current = probe::index_pattern_id(api, pattern_id, title).await;
    (Ok(StepStatus::Applied), current)
}

async fn ensure_dashboard<A: SearchApi + ?Sized>(
    api: &A,
    title: &str,
    pattern: Option<&str>,
    update: bool,
) -> StepResult {
    if pattern.is_none() {
        return Err(StepError::Precondition(format!(
            "index pattern for {title} is not visible"
        )));
    }
    if !probe::index_exists(api, title).await {
        return Err(StepError::Precondition(format!("index {title} does not exist")));
    }

    match probe::dashboard_id(api, title).await {
        Some(id) if !update => {
            info!("dashboard: {} already exists ({})", title, id);
            Ok(StepStatus::AlreadySatisfied)
        }
        Some(id) => {
            api.set_dashboard(title, Some(&id)).await?;
            info!("dashboard: overwrote {} ({})", title, id);
            Ok(StepStatus::Applied)
        }
        None => {
            api.set_dashboard(title, None).await?;
            info!("dashboard: created {}", title);
            Ok(StepStatus::Applied)
        }
    }
}
