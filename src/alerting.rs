//! SNS alert destination and scheduled monitor reconciliation.

use tracing::{info, warn};

use crate::api::SearchApi;
use crate::error::StepError;
use crate::execution::{StepResult, StepStatus};
use crate::request::{MonitorRequest, SnsAlert};
use crate::types::Lookup;

/// Ensure one destination named `alert.name` bound to the alert's topic and role.
///
/// Absent destinations are created. Present ones are left alone on create and
/// updated in place on update.
pub async fn ensure_destination<A: SearchApi + ?Sized>(
    api: &A,
    alert: &SnsAlert,
    update: bool,
) -> StepResult {
    let existing = match api.get_alert_destination(&alert.name).await {
        Lookup::Found(id) => Some(id),
        Lookup::Absent => None,
        Lookup::Failed(reason) => return Err(StepError::Lookup(reason)),
    };

    match existing {
        Some(id) if !update => {
            info!("alerting: destination {} already exists ({})", alert.name, id);
            Ok(StepStatus::AlreadySatisfied)
        }
        Some(id) => {
            api.set_alert_destination(&alert.name, &alert.topic_arn, &alert.role_arn, Some(&id))
                .await?;
            info!("alerting: updated destination {} ({})", alert.name, id);
            Ok(StepStatus::Applied)
        }
        None => {
            api.set_alert_destination(&alert.name, &alert.topic_arn, &alert.role_arn, None)
                .await?;
            info!("alerting: created destination {}", alert.name);
            Ok(StepStatus::Applied)
        }
    }
}

/// Create or update the monitor bound to destination `alert_name`.
///
/// Skipped when the destination is absent; a failed destination read fails
/// the step. On update the existing monitor is looked up by name so the write
/// targets it.
pub async fn reconcile_monitor<A: SearchApi + ?Sized>(
    api: &A,
    alert_name: &str,
    monitor: &MonitorRequest,
    index: &str,
    update: bool,
) -> StepResult {
    let destination_id = match api.get_alert_destination(alert_name).await {
        Lookup::Found(id) => id,
        Lookup::Absent => {
            warn!(
                "alerting: destination {} not found, skipping monitor {}",
                alert_name, monitor.name
            );
            return Ok(StepStatus::NotApplicable);
        }
        Lookup::Failed(reason) => {
            warn!(
                "alerting: destination {} lookup failed, monitor {} not reconciled: {}",
                alert_name, monitor.name, reason
            );
            return Err(StepError::Lookup(reason));
        }
    };

    let spec = monitor.bind(destination_id, index);

    if !update {
        api.set_monitor(&spec, None).await?;
        info!("alerting: created monitor {}", spec.name);
        return Ok(StepStatus::Applied);
    }

    let existing = match api.get_monitor(&spec.name).await {
        Lookup::Found(id) => Some(id),
        Lookup::Absent => None,
        Lookup::Failed(reason) => return Err(StepError::Lookup(reason)),
    };
    api.set_monitor(&spec, existing.as_deref()).await?;
    match existing {
        Some(id) => info!("alerting: updated monitor {} ({})", spec.name, id),
        None => info!("alerting: monitor {} not found, created it", spec.name),
    }
    Ok(StepStatus::Applied)
}
